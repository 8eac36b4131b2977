use crate::error::{Result, SocError};
use crate::overlap::RegionTable;
use crate::region::Region;

/// First-fit placement of bus regions that were declared without an origin.
///
/// Cached regions are placed anywhere in the bus address space; uncached regions are placed
/// inside one of the declared IO regions, in declaration order. On a conflict with an already
/// placed region the search skips past that region (re-aligned to the requested size) instead of
/// probing every aligned slot.
#[derive(Debug, Clone, Copy)]
pub struct RegionAllocator<'a> {
    address_width: u32,
    io_regions: &'a RegionTable,
    allocated: &'a RegionTable,
}

impl<'a> RegionAllocator<'a> {
    pub fn new(address_width: u32, io_regions: &'a RegionTable, allocated: &'a RegionTable) -> Self {
        Self {
            address_width,
            io_regions,
            allocated,
        }
    }

    /// Finds a `size`-byte region that does not overlap anything in the allocated table.
    ///
    /// `size` must already be a power of two; the returned origin is a multiple of it.
    pub fn allocate(&self, name: &str, size: u64, cached: bool) -> Result<Region> {
        debug_assert!(size.is_power_of_two());
        tracing::info!(
            "allocating {} region {name} of size 0x{size:08x}",
            if cached { "cached" } else { "IO" }
        );

        let main = [Region::new(0, 1u64 << self.address_width)];
        let io: Vec<Region> = self.io_regions.iter().map(|(_, r)| *r).collect();
        let search_spaces: &[Region] = if cached { &main } else { &io };

        for space in search_spaces {
            let Some(window) = space.range() else {
                continue;
            };
            let mut next = align_up(window.start, size);
            while let Some(origin) = next {
                let candidate = Region::new(origin, size).with_cached(cached);
                if !candidate.is_within(space) {
                    break;
                }
                let blocker = self
                    .allocated
                    .iter()
                    .find(|(_, placed)| placed.overlaps(&candidate));
                match blocker {
                    Some((blocker_name, placed)) => {
                        let end = placed.range().map_or(origin + size, |r| r.end);
                        tracing::debug!(
                            "candidate 0x{origin:08x} for {name} overlaps {blocker_name}, skipping to 0x{end:08x}"
                        );
                        next = align_up(end, size);
                    }
                    None => return Ok(candidate),
                }
            }
        }

        Err(SocError::InsufficientAddressSpace {
            name: name.to_string(),
            size,
            cached,
        })
    }
}

fn align_up(value: u64, align: u64) -> Option<u64> {
    debug_assert!(align.is_power_of_two());
    Some(value.checked_add(align - 1)? & !(align - 1))
}
