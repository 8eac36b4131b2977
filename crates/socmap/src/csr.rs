use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocError};
use crate::loc::LocHandler;
use crate::region::CsrRegion;

pub const SUPPORTED_DATA_WIDTHS: [u32; 2] = [8, 32];
pub const SUPPORTED_ADDRESS_WIDTHS: [u32; 2] = [14, 15];
pub const SUPPORTED_ALIGNMENTS: [u32; 2] = [32, 64];
pub const SUPPORTED_PAGINGS: [u32; 1] = [0x800];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsrConfig {
    pub data_width: u32,
    pub address_width: u32,
    /// Register alignment in bits; must be at least `data_width`.
    pub alignment: u32,
    /// Bytes of bus address space per CSR location.
    pub paging: u32,
    pub reserved_csrs: BTreeMap<String, u32>,
}

impl Default for CsrConfig {
    fn default() -> Self {
        Self {
            data_width: 32,
            address_width: 14,
            alignment: 32,
            paging: 0x800,
            reserved_csrs: BTreeMap::new(),
        }
    }
}

/// A master of the CSR bus (typically the bridge from the system bus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrInterface {
    pub data_width: u32,
}

impl CsrInterface {
    pub const fn new(data_width: u32) -> Self {
        Self { data_width }
    }
}

/// Allocates CSR locations (pages of `paging` bytes) and tracks the CSR bus masters.
///
/// The number of locations is `4 * 2^address_width / paging`: the CSR address is a word address,
/// hence the factor of four.
#[derive(Debug, Clone, Serialize)]
pub struct CsrHandler {
    data_width: u32,
    address_width: u32,
    alignment: u32,
    paging: u32,
    locs: LocHandler,
    masters: Vec<(String, CsrInterface)>,
    regions: Vec<(String, CsrRegion)>,
}

impl CsrHandler {
    pub fn new(config: CsrConfig) -> Result<Self> {
        tracing::info!("creating new CSR handler");

        if !SUPPORTED_DATA_WIDTHS.contains(&config.data_width) {
            return Err(unsupported("csr.data_width", config.data_width));
        }
        if !SUPPORTED_ADDRESS_WIDTHS.contains(&config.address_width) {
            return Err(unsupported("csr.address_width", config.address_width));
        }
        if !SUPPORTED_ALIGNMENTS.contains(&config.alignment) || config.data_width > config.alignment
        {
            return Err(unsupported("csr.alignment", config.alignment));
        }
        if !SUPPORTED_PAGINGS.contains(&config.paging) {
            return Err(unsupported("csr.paging", config.paging));
        }

        let capacity = ((4u64 << config.address_width) / u64::from(config.paging)) as u32;
        let mut csr = Self {
            data_width: config.data_width,
            address_width: config.address_width,
            alignment: config.alignment,
            paging: config.paging,
            locs: LocHandler::new("CSR", capacity),
            masters: Vec::new(),
            regions: Vec::new(),
        };
        tracing::info!("{}", csr.summary());

        for (name, n) in config.reserved_csrs {
            csr.add(&name, Some(n), false)?;
        }

        tracing::info!("CSR handler created");
        Ok(csr)
    }

    pub fn data_width(&self) -> u32 {
        self.data_width
    }

    pub fn address_width(&self) -> u32 {
        self.address_width
    }

    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    pub fn paging(&self) -> u32 {
        self.paging
    }

    pub fn capacity(&self) -> u32 {
        self.locs.capacity()
    }

    pub fn locs(&self) -> &LocHandler {
        &self.locs
    }

    pub fn add(&mut self, name: &str, n: Option<u32>, reuse_if_exists: bool) -> Result<u32> {
        self.locs.add(name, n, reuse_if_exists)
    }

    pub fn alloc(&self, name: &str) -> Result<u32> {
        self.locs.alloc(name)
    }

    /// Location of the CSR bank `name`, or of its `memory` when given (`<name>_<memory>`).
    pub fn address_map(&self, name: &str, memory: Option<&str>) -> Result<u32> {
        let name = match memory {
            Some(memory) => format!("{name}_{memory}"),
            None => name.to_string(),
        };
        self.locs.get(&name).ok_or_else(|| {
            self.locs.reject(SocError::UndefinedLocation {
                space: "CSR",
                name,
            })
        })
    }

    pub fn masters(&self) -> impl Iterator<Item = (&str, &CsrInterface)> {
        self.masters.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Registers a CSR bus master, auto-named `master<N>` when `name` is `None`.
    ///
    /// No width conversion exists on the CSR bus, so the master must match the CSR data width.
    pub fn add_master(&mut self, name: Option<&str>, master: CsrInterface) -> Result<String> {
        let name = name.map_or_else(|| format!("master{}", self.masters.len()), str::to_string);
        if self.masters.iter().any(|(n, _)| *n == name) {
            return Err(self.locs.reject(SocError::DuplicateMasterName(name)));
        }
        if master.data_width != self.data_width {
            return Err(self.locs.reject(SocError::DataWidthMismatch {
                name,
                actual: master.data_width,
                expected: self.data_width,
            }));
        }
        self.masters.push((name.clone(), master));
        tracing::info!("{name} added as CSR master");
        Ok(name)
    }

    /// CSR regions computed at finalize time, ordered by origin.
    pub fn regions(&self) -> &[(String, CsrRegion)] {
        &self.regions
    }

    pub(crate) fn set_regions(&mut self, mut regions: Vec<(String, CsrRegion)>) {
        regions.sort_by_key(|(_, region)| region.origin);
        self.regions = regions;
    }

    fn summary(&self) -> String {
        format!(
            "{}-bit CSR Bus, {}KiB Address Space, {}B Paging (Up to {} Locations).",
            self.data_width,
            (1u64 << self.address_width) as f64 / 1024.0,
            self.paging,
            self.locs.capacity()
        )
    }
}

impl fmt::Display for CsrHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())?;
        if !self.locs.is_empty() {
            write!(f, "\n{}", self.locs)?;
        }
        Ok(())
    }
}

fn unsupported(field: &'static str, value: u32) -> SocError {
    SocError::UnsupportedConfiguration {
        field,
        value: value.to_string(),
    }
}
