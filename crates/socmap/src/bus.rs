use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::allocator::RegionAllocator;
use crate::decoder::AddressDecoder;
use crate::error::{Result, SocError};
use crate::overlap::{find_overlap, RegionTable};
use crate::region::{Region, RegionKind};

pub const SUPPORTED_DATA_WIDTHS: [u32; 2] = [32, 64];
pub const SUPPORTED_ADDRESS_WIDTHS: [u32; 1] = [32];

/// Size given to a reserved region declared by origin only.
pub const RESERVED_REGION_SIZE: u64 = 0x100_0000;

/// Default interconnect timeout, in bus cycles.
pub const DEFAULT_TIMEOUT_CYCLES: u64 = 1_000_000;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum BusStandard {
    #[default]
    Wishbone,
}

impl FromStr for BusStandard {
    type Err = SocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wishbone" => Ok(BusStandard::Wishbone),
            other => Err(SocError::UnsupportedConfiguration {
                field: "bus.standard",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for BusStandard {
    type Error = SocError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for BusStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusStandard::Wishbone => f.write_str("wishbone"),
        }
    }
}

/// A region reserved at construction, either as a full [`Region`] or as a bare origin (which
/// reserves [`RESERVED_REGION_SIZE`] bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReservedRegion {
    Origin(u64),
    Region(Region),
}

impl ReservedRegion {
    pub fn into_region(self) -> Region {
        match self {
            ReservedRegion::Origin(origin) => Region::new(origin, RESERVED_REGION_SIZE),
            ReservedRegion::Region(region) => region,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub standard: BusStandard,
    pub data_width: u32,
    pub address_width: u32,
    /// Cycles before the interconnect aborts a stalled transaction; `None` disables the timeout.
    pub timeout: Option<u64>,
    /// Applied in key order when the handler is created.
    pub reserved_regions: BTreeMap<String, ReservedRegion>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            standard: BusStandard::Wishbone,
            data_width: 32,
            address_width: 32,
            timeout: Some(DEFAULT_TIMEOUT_CYCLES),
            reserved_regions: BTreeMap::new(),
        }
    }
}

/// A bus interface handed over by a collaborator (CPU bus, DMA port, memory port, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusInterface {
    pub data_width: u32,
}

impl BusInterface {
    pub const fn new(data_width: u32) -> Self {
        Self { data_width }
    }
}

/// Data-width bridge inserted between an interface and the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidthConverter {
    pub from: u32,
    pub to: u32,
}

/// An interface attached to the bus, with the converter that adapts it if one was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusPort {
    pub interface: BusInterface,
    pub converter: Option<WidthConverter>,
}

impl BusPort {
    /// Data width seen by the interconnect.
    pub fn data_width(&self) -> u32 {
        self.converter
            .map_or(self.interface.data_width, |converter| converter.to)
    }
}

/// Owns the system bus: its masters, slaves and the three region tables.
#[derive(Debug, Clone, Serialize)]
pub struct BusHandler {
    standard: BusStandard,
    data_width: u32,
    address_width: u32,
    timeout: Option<u64>,
    masters: Vec<(String, BusPort)>,
    slaves: Vec<(String, BusPort)>,
    regions: RegionTable,
    io_regions: RegionTable,
    linker_regions: RegionTable,
}

impl BusHandler {
    pub fn new(config: BusConfig) -> Result<Self> {
        tracing::info!("creating new bus handler");

        if !SUPPORTED_DATA_WIDTHS.contains(&config.data_width) {
            return Err(unsupported("bus.data_width", config.data_width));
        }
        if !SUPPORTED_ADDRESS_WIDTHS.contains(&config.address_width) {
            return Err(unsupported("bus.address_width", config.address_width));
        }

        let mut bus = Self {
            standard: config.standard,
            data_width: config.data_width,
            address_width: config.address_width,
            timeout: config.timeout,
            masters: Vec::new(),
            slaves: Vec::new(),
            regions: RegionTable::new(),
            io_regions: RegionTable::new(),
            linker_regions: RegionTable::new(),
        };
        tracing::info!(
            "{}-bit {} bus, {}GiB address space",
            bus.data_width,
            bus.standard,
            bus.address_space_gib()
        );

        for (name, reserved) in config.reserved_regions {
            bus.add_region(&name, reserved.into_region())?;
        }

        tracing::info!("bus handler created");
        Ok(bus)
    }

    pub fn standard(&self) -> BusStandard {
        self.standard
    }

    pub fn data_width(&self) -> u32 {
        self.data_width
    }

    pub fn address_width(&self) -> u32 {
        self.address_width
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    pub fn io_regions(&self) -> &RegionTable {
        &self.io_regions
    }

    pub fn linker_regions(&self) -> &RegionTable {
        &self.linker_regions
    }

    /// Decoded bus regions ordered by origin.
    pub fn regions_by_origin(&self) -> Vec<(&str, &Region)> {
        self.regions.sorted_by_origin()
    }

    /// Whether `name` is declared as a bus or linker region.
    pub fn declares_region(&self, name: &str) -> bool {
        self.regions.contains(name) || self.linker_regions.contains(name)
    }

    pub fn masters(&self) -> impl Iterator<Item = (&str, &BusPort)> {
        self.masters.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn slaves(&self) -> impl Iterator<Item = (&str, &BusPort)> {
        self.slaves.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn master(&self, name: &str) -> Option<&BusPort> {
        self.masters().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    pub fn slave(&self, name: &str) -> Option<&BusPort> {
        self.slaves().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    /// Declares a region, placing it first when it has no origin.
    ///
    /// Returns the region as stored.
    pub fn add_region(&mut self, name: &str, region: Region) -> Result<Region> {
        if self.regions.contains(name)
            || self.io_regions.contains(name)
            || self.linker_regions.contains(name)
        {
            return Err(self.reject(SocError::DuplicateRegionName(name.to_string())));
        }
        if !region.is_aligned() {
            return Err(self.reject(SocError::MisalignedRegion {
                name: name.to_string(),
                origin: region.origin,
                size: region.size,
            }));
        }

        if region.origin.is_none() {
            if region.kind != RegionKind::Bus {
                return Err(self.reject(SocError::UnplacedRegion {
                    name: name.to_string(),
                    kind: region.kind,
                }));
            }
            let placed = RegionAllocator::new(self.address_width, &self.io_regions, &self.regions)
                .allocate(name, region.size, region.cached)
                .map_err(|err| self.reject(err))?
                .with_mode(region.mode);
            self.regions.insert(name, placed);
            tracing::info!("{name} region allocated {placed}");
            return Ok(placed);
        }

        if region.kind != RegionKind::Linker && !self.fits_address_space(&region) {
            return Err(self.reject(SocError::RegionOutsideAddressSpace {
                name: name.to_string(),
                origin: region.origin.unwrap_or_default(),
                size: region.size,
                address_width: self.address_width,
            }));
        }

        match region.kind {
            RegionKind::Io => {
                self.check_overlap(RegionTableKind::Io, name, &region)?;
                self.io_regions.insert(name, region);
            }
            RegionKind::Linker => {
                self.linker_regions.insert(name, region);
            }
            RegionKind::Bus => {
                if !region.cached && !self.is_io(&region) {
                    return Err(self.reject(SocError::UncachedRegionOutsideIO {
                        name: name.to_string(),
                        origin: region.origin.unwrap_or_default(),
                        size: region.size,
                    }));
                }
                self.check_overlap(RegionTableKind::Bus, name, &region)?;
                self.regions.insert(name, region);
            }
        }
        tracing::info!("{name} {} region added {region}", region.kind);
        Ok(region)
    }

    /// Registers a bus master, auto-named `master<N>` when `name` is `None`.
    ///
    /// Returns the name the master was registered under.
    pub fn add_master(&mut self, name: Option<&str>, interface: BusInterface) -> Result<String> {
        let name = name.map_or_else(|| format!("master{}", self.masters.len()), str::to_string);
        if self.master(&name).is_some() {
            return Err(self.reject(SocError::DuplicateMasterName(name)));
        }
        let port = self.adapt(&name, interface);
        self.masters.push((name.clone(), port));
        tracing::info!("{name} added as bus master");
        Ok(name)
    }

    /// Registers a bus slave.
    ///
    /// With a `region`, the region is declared under the slave's name first; without one, a bus
    /// region of that name must already exist. A slave without a name is auto-named `slave<N>`.
    pub fn add_slave(
        &mut self,
        name: Option<&str>,
        interface: BusInterface,
        region: Option<Region>,
    ) -> Result<String> {
        if name.is_none() && region.is_none() {
            return Err(self.reject(SocError::MissingNameOrRegion));
        }
        let name = name.map_or_else(|| format!("slave{}", self.slaves.len()), str::to_string);
        if self.slave(&name).is_some() {
            return Err(self.reject(SocError::DuplicateSlaveName(name)));
        }
        match region {
            Some(region) => {
                if !region.kind.is_decoded() {
                    return Err(self.reject(SocError::UndecodedSlaveRegion {
                        name,
                        kind: region.kind,
                    }));
                }
                self.add_region(&name, region)?;
            }
            None => {
                if !self.regions.contains(&name) {
                    return Err(self.reject(SocError::UnknownRegionName(name)));
                }
            }
        }
        let port = self.adapt(&name, interface);
        self.slaves.push((name.clone(), port));
        tracing::info!("{name} added as bus slave");
        Ok(name)
    }

    /// Address decoder for the bus region `name`.
    pub fn decoder(&self, name: &str) -> Result<AddressDecoder> {
        let region = self
            .regions
            .get(name)
            .ok_or_else(|| SocError::UnknownRegionName(name.to_string()))?;
        self.decoder_for(name, region)
    }

    /// Address decoder for an arbitrary region on this bus.
    pub fn decoder_for(&self, name: &str, region: &Region) -> Result<AddressDecoder> {
        AddressDecoder::new(name, region, self.data_width, self.address_width)
            .map_err(|err| self.reject(err))
    }

    fn adapt(&self, name: &str, interface: BusInterface) -> BusPort {
        let converter = (interface.data_width != self.data_width).then(|| {
            tracing::info!(
                "{name} bus converted from {}-bit to {}-bit",
                interface.data_width,
                self.data_width
            );
            WidthConverter {
                from: interface.data_width,
                to: self.data_width,
            }
        });
        BusPort {
            interface,
            converter,
        }
    }

    fn is_io(&self, region: &Region) -> bool {
        self.io_regions.iter().any(|(_, io)| region.is_within(io))
    }

    fn fits_address_space(&self, region: &Region) -> bool {
        let end = region.origin.and_then(|origin| origin.checked_add(region.size));
        end.map_or(false, |end| end <= 1u64 << self.address_width)
    }

    fn check_overlap(&self, table: RegionTableKind, name: &str, region: &Region) -> Result<()> {
        let existing = match table {
            RegionTableKind::Bus => &self.regions,
            RegionTableKind::Io => &self.io_regions,
        };
        match find_overlap(existing.iter().chain(std::iter::once((name, region)))) {
            Some((a, b)) => Err(self.reject(SocError::RegionOverlap(a, b))),
            None => Ok(()),
        }
    }

    fn reject(&self, err: SocError) -> SocError {
        tracing::error!("{err}\n{self}");
        err
    }

    fn address_space_gib(&self) -> f64 {
        (1u64 << self.address_width) as f64 / (1u64 << 30) as f64
    }
}

#[derive(Clone, Copy)]
enum RegionTableKind {
    Bus,
    Io,
}

fn unsupported(field: &'static str, value: impl ToString) -> SocError {
    SocError::UnsupportedConfiguration {
        field,
        value: value.to_string(),
    }
}

fn write_table(f: &mut fmt::Formatter<'_>, title: &str, table: &RegionTable) -> fmt::Result {
    if table.is_empty() {
        return Ok(());
    }
    write!(f, "\n{title} Regions: ({})", table.len())?;
    for (name, region) in table.sorted_by_origin() {
        write!(f, "\n{name:<20}: {region}")?;
    }
    Ok(())
}

impl fmt::Display for BusHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-bit {} Bus, {}GiB Address Space.",
            self.data_width,
            self.standard,
            self.address_space_gib()
        )?;
        write_table(f, "IO", &self.io_regions)?;
        write_table(f, "Linker", &self.linker_regions)?;
        write_table(f, "Bus", &self.regions)?;
        if !self.masters.is_empty() {
            write!(f, "\nBus Masters: ({})", self.masters.len())?;
            for (name, _) in &self.masters {
                write!(f, "\n- {name}")?;
            }
        }
        if !self.slaves.is_empty() {
            write!(f, "\nBus Slaves: ({})", self.slaves.len())?;
            for (name, _) in &self.slaves {
                write!(f, "\n- {name}")?;
            }
        }
        Ok(())
    }
}
