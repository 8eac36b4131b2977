use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::{Result, SocError};

/// Fixed-capacity name -> location allocator.
///
/// Shared by the CSR and IRQ handlers, which only differ in how the capacity is derived and in
/// the label used in diagnostics (`space`). Names and location numbers are both unique.
#[derive(Debug, Clone, Serialize)]
pub struct LocHandler {
    space: &'static str,
    capacity: u32,
    locs: BTreeMap<String, u32>,
    #[serde(skip)]
    used: BTreeSet<u32>,
}

impl LocHandler {
    pub fn new(space: &'static str, capacity: u32) -> Self {
        Self {
            space,
            capacity,
            locs: BTreeMap::new(),
            used: BTreeSet::new(),
        }
    }

    pub fn space(&self) -> &'static str {
        self.space
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.locs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.locs.get(name).copied()
    }

    /// Name of the entry holding `slot`, if any.
    pub fn owner(&self, slot: u32) -> Option<&str> {
        self.locs
            .iter()
            .find(|(_, n)| **n == slot)
            .map(|(name, _)| name.as_str())
    }

    /// Entries ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.locs.iter().map(|(name, n)| (name.as_str(), *n))
    }

    /// Entries ordered by location number.
    pub fn by_location(&self) -> Vec<(&str, u32)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by_key(|(_, n)| *n);
        sorted
    }

    /// Registers `name`, at location `n` when given, else at the first free location.
    ///
    /// With `reuse_if_exists`, re-registering a known name returns its current location without
    /// consuming another one (and ignores `n`).
    pub fn add(&mut self, name: &str, n: Option<u32>, reuse_if_exists: bool) -> Result<u32> {
        if reuse_if_exists {
            if let Some(existing) = self.get(name) {
                tracing::info!("{name} {} reused at location {existing}", self.space);
                return Ok(existing);
            }
        }
        if self.locs.contains_key(name) {
            return Err(self.reject(SocError::DuplicateLocationName {
                space: self.space,
                name: name.to_string(),
            }));
        }

        let (n, allocated) = match n {
            Some(n) => {
                if let Some(owner) = self.owner(n) {
                    return Err(self.reject(SocError::DuplicateLocationNumber {
                        space: self.space,
                        slot: n,
                        owner: owner.to_string(),
                    }));
                }
                if n >= self.capacity {
                    return Err(self.reject(SocError::LocationOutOfRange {
                        space: self.space,
                        slot: n,
                        capacity: self.capacity,
                    }));
                }
                (n, false)
            }
            None => (self.alloc(name)?, true),
        };

        self.locs.insert(name.to_string(), n);
        self.used.insert(n);
        tracing::info!(
            "{name} {} {} at location {n}",
            self.space,
            if allocated { "allocated" } else { "added" }
        );
        Ok(n)
    }

    /// First location in `[0, capacity)` not yet taken.
    pub fn alloc(&self, name: &str) -> Result<u32> {
        match (0..self.capacity).find(|n| !self.used.contains(n)) {
            Some(n) => Ok(n),
            None => {
                tracing::debug!("no free {} location for {name}", self.space);
                Err(self.reject(SocError::CapacityExhausted {
                    space: self.space,
                    capacity: self.capacity,
                }))
            }
        }
    }

    pub(crate) fn reject(&self, err: SocError) -> SocError {
        tracing::error!("{err}\n{self}");
        err
    }
}

impl fmt::Display for LocHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.locs.is_empty() {
            return Ok(());
        }
        write!(f, "{} Locations: ({})", self.space, self.locs.len())?;
        for (name, n) in self.by_location() {
            write!(f, "\n- {name:<20}: {n}")?;
        }
        Ok(())
    }
}
