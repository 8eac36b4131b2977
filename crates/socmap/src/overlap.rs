use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::region::Region;

/// Name -> [`Region`] table that preserves insertion order.
///
/// Insertion order matters: overlap reports name the earlier declaration first, and the
/// allocator scans regions in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionTable {
    entries: Vec<(String, Region)>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, region)| region)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Region)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), r))
    }

    /// Entries ordered by origin (unplaced regions first), ties kept in insertion order.
    pub fn sorted_by_origin(&self) -> Vec<(&str, &Region)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by_key(|(_, region)| region.origin);
        sorted
    }

    pub(crate) fn insert(&mut self, name: &str, region: Region) {
        debug_assert!(!self.contains(name));
        self.entries.push((name.to_string(), region));
    }
}

impl Serialize for RegionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, region) in &self.entries {
            map.serialize_entry(name, region)?;
        }
        map.end()
    }
}

/// Returns the first overlapping pair of regions, scanning pairwise in iteration order.
///
/// Linker regions never participate. The scan is quadratic; region tables hold a few dozen
/// entries at most.
pub fn find_overlap<'a, I>(regions: I) -> Option<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a Region)>,
{
    let regions: Vec<_> = regions.into_iter().collect();
    for (i, (n0, r0)) in regions.iter().enumerate() {
        for (n1, r1) in &regions[i + 1..] {
            if r0.overlaps(r1) {
                return Some((n0.to_string(), n1.to_string()));
            }
        }
    }
    None
}
