use socmap::{AccessMode, BusConfig, BusHandler, Region, RegionAllocator, RegionTable, SocError};

fn new_bus() -> BusHandler {
    BusHandler::new(BusConfig::default()).unwrap()
}

#[test]
fn cached_region_is_placed_after_existing_regions() {
    let mut bus = new_bus();
    bus.add_region("rom", Region::new(0, 0x1_0000)).unwrap();

    let placed = bus.add_region("buffer", Region::unplaced(0x1000)).unwrap();
    assert_eq!(placed.origin, Some(0x1_0000));
    assert!(placed.cached);
    assert_eq!(bus.regions().get("buffer"), Some(&placed));
}

#[test]
fn allocation_skips_blockers_and_keeps_alignment() {
    let mut bus = new_bus();
    bus.add_region("a", Region::new(0x0000, 0x1000)).unwrap();
    bus.add_region("b", Region::new(0x1000, 0x1000)).unwrap();
    bus.add_region("c", Region::new(0x4000, 0x1000)).unwrap();

    let placed = bus.add_region("buffer", Region::unplaced(0x2000)).unwrap();
    assert_eq!(placed.origin, Some(0x2000));

    // 0x4000 is taken by c, 0x5000..0x8000 is free but 0x4000-aligned candidates start at 0x8000.
    let placed = bus.add_region("frame", Region::unplaced(0x4000)).unwrap();
    assert_eq!(placed.origin, Some(0x8000));
}

#[test]
fn allocated_region_keeps_requested_mode() {
    let mut bus = new_bus();
    let placed = bus
        .add_region("bootrom", Region::unplaced(0x1000).with_mode(AccessMode::Read))
        .unwrap();
    assert_eq!(placed.origin, Some(0));
    assert_eq!(placed.mode, AccessMode::Read);
}

#[test]
fn uncached_regions_are_placed_inside_io() {
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();

    let first = bus
        .add_region("uart", Region::unplaced(0x1000).with_cached(false))
        .unwrap();
    let second = bus
        .add_region("spi", Region::unplaced(0x1000).with_cached(false))
        .unwrap();
    assert_eq!(first.origin, Some(0x8000_0000));
    assert_eq!(second.origin, Some(0x8000_1000));
    assert!(!second.cached);
}

#[test]
fn uncached_allocation_without_io_fails() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_region("uart", Region::unplaced(0x1000).with_cached(false)),
        Err(SocError::InsufficientAddressSpace {
            name: "uart".to_string(),
            size: 0x1000,
            cached: false,
        })
    );
}

#[test]
fn full_address_space_fails_allocation() {
    let mut bus = new_bus();
    bus.add_region("low", Region::new(0, 0x8000_0000)).unwrap();
    bus.add_region("high", Region::new(0x8000_0000, 0x4000_0000))
        .unwrap();

    assert_eq!(
        bus.add_region("big", Region::unplaced(0x8000_0000)),
        Err(SocError::InsufficientAddressSpace {
            name: "big".to_string(),
            size: 0x8000_0000,
            cached: true,
        })
    );
    // The remaining quarter still takes smaller regions.
    let placed = bus.add_region("small", Region::unplaced(0x1000)).unwrap();
    assert_eq!(placed.origin, Some(0xC000_0000));
}

#[test]
fn whole_address_space_is_never_allocatable() {
    // The search space has an exclusive upper bound, so a region covering every address never fits.
    let io = RegionTable::new();
    let allocated = RegionTable::new();
    let allocator = RegionAllocator::new(32, &io, &allocated);
    assert!(matches!(
        allocator.allocate("all", 1 << 32, true),
        Err(SocError::InsufficientAddressSpace { .. })
    ));
    assert_eq!(
        allocator.allocate("half", 1 << 31, true).unwrap().origin,
        Some(0)
    );
}

#[test]
fn unplaced_region_must_be_power_of_two() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_region("odd", Region::unplaced(0x3000)),
        Err(SocError::MisalignedRegion {
            name: "odd".to_string(),
            origin: None,
            size: 0x3000,
        })
    );
}
