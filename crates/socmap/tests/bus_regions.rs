use std::collections::BTreeMap;

use socmap::{
    AccessMode, BusConfig, BusHandler, BusInterface, BusStandard, Region, RegionKind,
    ReservedRegion, SocError, WidthConverter, RESERVED_REGION_SIZE,
};

fn new_bus() -> BusHandler {
    BusHandler::new(BusConfig::default()).unwrap()
}

#[test]
fn rom_and_sram_then_overlapping_region_is_rejected() {
    let mut bus = new_bus();
    bus.add_region("rom", Region::new(0x0000_0000, 0x0001_0000))
        .unwrap();
    bus.add_region("sram", Region::new(0x1000_0000, 0x0000_2000))
        .unwrap();

    let err = bus
        .add_region("boot", Region::new(0x0000_8000, 0x0000_4000))
        .unwrap_err();
    assert_eq!(
        err,
        SocError::RegionOverlap("rom".to_string(), "boot".to_string())
    );
    // A rejected region is not recorded.
    assert!(!bus.regions().contains("boot"));
    assert_eq!(bus.regions().len(), 2);
}

#[test]
fn region_names_are_unique_across_tables() {
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    assert_eq!(
        bus.add_region("io0", Region::new(0x1000, 0x1000)),
        Err(SocError::DuplicateRegionName("io0".to_string()))
    );
    bus.add_region("flash", Region::linker(0x2000_0000, 0x10_0000))
        .unwrap();
    assert_eq!(
        bus.add_region("flash", Region::linker(0x3000_0000, 0x10_0000)),
        Err(SocError::DuplicateRegionName("flash".to_string()))
    );
}

#[test]
fn misaligned_regions_are_rejected() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_region("odd", Region::new(0x1000, 0x3000)),
        Err(SocError::MisalignedRegion {
            name: "odd".to_string(),
            origin: Some(0x1000),
            size: 0x3000,
        })
    );
    assert_eq!(
        bus.add_region("shifted", Region::new(0x1000, 0x2000)),
        Err(SocError::MisalignedRegion {
            name: "shifted".to_string(),
            origin: Some(0x1000),
            size: 0x2000,
        })
    );
    assert!(matches!(
        bus.add_region("empty", Region::new(0, 0)),
        Err(SocError::MisalignedRegion { .. })
    ));
}

#[test]
fn uncached_region_outside_io_is_rejected() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_region("periph", Region::new(0x9000_0000, 0x1000).with_cached(false)),
        Err(SocError::UncachedRegionOutsideIO {
            name: "periph".to_string(),
            origin: 0x9000_0000,
            size: 0x1000,
        })
    );

    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    bus.add_region("periph", Region::new(0x9000_0000, 0x1000).with_cached(false))
        .unwrap();
}

#[test]
fn uncached_region_ending_at_io_boundary_is_rejected() {
    // Containment uses an exclusive upper bound: the region's end must be strictly below the IO
    // region's end, so the last page of an IO window cannot host an uncached region.
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x1000_0000))
        .unwrap();

    assert!(matches!(
        bus.add_region("last", Region::new(0x8FFF_F000, 0x1000).with_cached(false)),
        Err(SocError::UncachedRegionOutsideIO { .. })
    ));
    bus.add_region("before_last", Region::new(0x8FFF_E000, 0x1000).with_cached(false))
        .unwrap();
}

#[test]
fn cached_regions_ignore_io_regions() {
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    // IO regions live in their own overlap class.
    bus.add_region("main_ram", Region::new(0x8000_0000, 0x1000_0000))
        .unwrap();
}

#[test]
fn io_regions_overlap_check_among_themselves() {
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    assert_eq!(
        bus.add_region("io1", Region::io(0xC000_0000, 0x1000_0000)),
        Err(SocError::RegionOverlap("io0".to_string(), "io1".to_string()))
    );
}

#[test]
fn linker_regions_are_never_overlap_checked_or_decoded() {
    let mut bus = new_bus();
    bus.add_region("rom", Region::new(0, 0x8000)).unwrap();
    bus.add_region("rom_data", Region::linker(0, 0x1000))
        .unwrap();
    bus.add_region("rom_data2", Region::linker(0, 0x1000))
        .unwrap();

    assert_eq!(bus.linker_regions().len(), 2);
    assert!(bus.declares_region("rom_data"));
    assert_eq!(
        bus.decoder("rom_data"),
        Err(SocError::UnknownRegionName("rom_data".to_string()))
    );
}

#[test]
fn unplaced_io_region_is_rejected() {
    let mut bus = new_bus();
    let region = Region {
        kind: RegionKind::Io,
        cached: false,
        ..Region::unplaced(0x1000)
    };
    assert_eq!(
        bus.add_region("io0", region),
        Err(SocError::UnplacedRegion {
            name: "io0".to_string(),
            kind: RegionKind::Io,
        })
    );
}

#[test]
fn regions_by_origin_is_sorted() {
    let mut bus = new_bus();
    bus.add_region("sram", Region::new(0x1000_0000, 0x2000))
        .unwrap();
    bus.add_region("rom", Region::new(0, 0x8000)).unwrap();
    bus.add_region("main_ram", Region::new(0x4000_0000, 0x1000_0000))
        .unwrap();

    let names: Vec<_> = bus.regions_by_origin().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["rom", "sram", "main_ram"]);
}

#[test]
fn reserved_regions_are_applied_at_construction() {
    let mut reserved_regions = BTreeMap::new();
    reserved_regions.insert("bootrom".to_string(), ReservedRegion::Origin(0x2000_0000));
    reserved_regions.insert(
        "scratch".to_string(),
        ReservedRegion::Region(Region::new(0x3000_0000, 0x1000).with_mode(AccessMode::Write)),
    );
    let bus = BusHandler::new(BusConfig {
        reserved_regions,
        ..BusConfig::default()
    })
    .unwrap();

    assert_eq!(
        bus.regions().get("bootrom"),
        Some(&Region::new(0x2000_0000, RESERVED_REGION_SIZE))
    );
    assert_eq!(
        bus.regions().get("scratch").map(|r| r.mode),
        Some(AccessMode::Write)
    );
}

#[test]
fn reserved_region_conflicts_fail_construction() {
    let mut reserved_regions = BTreeMap::new();
    reserved_regions.insert("a".to_string(), ReservedRegion::Origin(0x0000_0000));
    reserved_regions.insert("b".to_string(), ReservedRegion::Region(Region::new(0x80_0000, 0x1000)));
    let err = BusHandler::new(BusConfig {
        reserved_regions,
        ..BusConfig::default()
    })
    .unwrap_err();
    assert_eq!(err, SocError::RegionOverlap("a".to_string(), "b".to_string()));
}

#[test]
fn unsupported_bus_configuration_fails_construction() {
    assert_eq!(
        BusHandler::new(BusConfig {
            data_width: 16,
            ..BusConfig::default()
        })
        .unwrap_err(),
        SocError::UnsupportedConfiguration {
            field: "bus.data_width",
            value: "16".to_string(),
        }
    );
    assert!(matches!(
        BusHandler::new(BusConfig {
            address_width: 64,
            ..BusConfig::default()
        }),
        Err(SocError::UnsupportedConfiguration {
            field: "bus.address_width",
            ..
        })
    ));
    assert_eq!("wishbone".parse::<BusStandard>(), Ok(BusStandard::Wishbone));
    assert_eq!(
        "axi".parse::<BusStandard>(),
        Err(SocError::UnsupportedConfiguration {
            field: "bus.standard",
            value: "axi".to_string(),
        })
    );
}

#[test]
fn bus_standard_is_checked_when_deserialized() {
    let config: BusConfig = serde_json::from_str(r#"{ "standard": "wishbone" }"#).unwrap();
    assert_eq!(config.standard, BusStandard::Wishbone);

    let err = serde_json::from_str::<BusConfig>(r#"{ "standard": "axi" }"#).unwrap_err();
    assert!(err.to_string().contains("unsupported bus.standard: axi"));
}

#[test]
fn regions_past_the_address_space_are_rejected() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_region("far", Region::new(0x1_0000_0000, 0x1000)),
        Err(SocError::RegionOutsideAddressSpace {
            name: "far".to_string(),
            origin: 0x1_0000_0000,
            size: 0x1000,
            address_width: 32,
        })
    );
    assert!(matches!(
        bus.add_region("far_io", Region::io(0x1_0000_0000, 0x1_0000_0000)),
        Err(SocError::RegionOutsideAddressSpace { .. })
    ));
    assert!(bus.regions().get("far").is_none());

    // Regions ending exactly at the top of the space still fit.
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    bus.add_region("top", Region::new(0xFFFF_F000, 0x1000))
        .unwrap();
}

#[test]
fn masters_are_auto_named_and_width_adapted() {
    let mut bus = new_bus();
    assert_eq!(
        bus.add_master(None, BusInterface::new(32)).unwrap(),
        "master0"
    );
    assert_eq!(
        bus.add_master(Some("dma"), BusInterface::new(64)).unwrap(),
        "dma"
    );
    assert_eq!(
        bus.add_master(None, BusInterface::new(32)).unwrap(),
        "master2"
    );

    assert_eq!(bus.master("master0").unwrap().converter, None);
    let dma = bus.master("dma").unwrap();
    assert_eq!(dma.converter, Some(WidthConverter { from: 64, to: 32 }));
    assert_eq!(dma.data_width(), 32);

    assert_eq!(
        bus.add_master(Some("dma"), BusInterface::new(32)),
        Err(SocError::DuplicateMasterName("dma".to_string()))
    );
}

#[test]
fn slave_registration_rules() {
    let mut bus = new_bus();
    let wb = BusInterface::new(32);

    assert_eq!(
        bus.add_slave(None, wb, None),
        Err(SocError::MissingNameOrRegion)
    );
    assert_eq!(
        bus.add_slave(Some("spiflash"), wb, None),
        Err(SocError::UnknownRegionName("spiflash".to_string()))
    );

    bus.add_region("spiflash", Region::new(0x2000_0000, 0x100_0000))
        .unwrap();
    assert_eq!(bus.add_slave(Some("spiflash"), wb, None).unwrap(), "spiflash");
    assert_eq!(
        bus.add_slave(Some("spiflash"), wb, None),
        Err(SocError::DuplicateSlaveName("spiflash".to_string()))
    );

    let name = bus
        .add_slave(None, BusInterface::new(64), Some(Region::new(0x3000_0000, 0x1000)))
        .unwrap();
    assert_eq!(name, "slave1");
    assert!(bus.regions().contains("slave1"));
    assert_eq!(
        bus.slave("slave1").unwrap().converter,
        Some(WidthConverter { from: 64, to: 32 })
    );

    assert_eq!(
        bus.add_slave(Some("flash_data"), wb, Some(Region::linker(0x4000_0000, 0x1000))),
        Err(SocError::UndecodedSlaveRegion {
            name: "flash_data".to_string(),
            kind: RegionKind::Linker,
        })
    );
}

#[test]
fn slave_with_unplaced_region_is_allocated() {
    let mut bus = new_bus();
    bus.add_region("rom", Region::new(0, 0x1_0000)).unwrap();
    bus.add_slave(Some("buffer"), BusInterface::new(32), Some(Region::unplaced(0x4000)))
        .unwrap();
    assert_eq!(
        bus.regions().get("buffer").and_then(|r| r.origin),
        Some(0x1_0000)
    );
}

#[test]
fn display_dumps_tables() {
    let mut bus = new_bus();
    bus.add_region("io0", Region::io(0x8000_0000, 0x8000_0000))
        .unwrap();
    bus.add_region("rom", Region::new(0, 0x8000)).unwrap();
    bus.add_master(Some("cpu_bus0"), BusInterface::new(32))
        .unwrap();

    let text = bus.to_string();
    assert!(text.starts_with("32-bit wishbone Bus, 4GiB Address Space."));
    assert!(text.contains("IO Regions: (1)"));
    assert!(text.contains("Bus Regions: (1)"));
    assert!(text.contains("Origin: 0x00000000, Size: 0x00008000, Mode: RW, Cached: true"));
    assert!(text.contains("- cpu_bus0"));
}
