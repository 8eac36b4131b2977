//! Address ranges declared on the system bus.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Access mode advertised by a region.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessMode {
    #[serde(rename = "r")]
    Read,
    #[serde(rename = "w")]
    Write,
    #[default]
    #[serde(rename = "rw")]
    ReadWrite,
}

impl AccessMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessMode::Read => "r",
            AccessMode::Write => "w",
            AccessMode::ReadWrite => "rw",
        }
    }
}

/// The closed set of region flavours.
///
/// - [`RegionKind::Bus`] regions are decoded by the interconnect and must not overlap each other.
/// - [`RegionKind::Io`] regions mark non-cacheable address space. They only overlap-check against
///   other IO regions and are never decoded.
/// - [`RegionKind::Linker`] regions only exist in the address map handed to software (e.g. data
///   that lives in flash and is reached indirectly). They are never overlap-checked or decoded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    #[default]
    Bus,
    Io,
    Linker,
}

impl RegionKind {
    pub fn checks_overlap(self) -> bool {
        !matches!(self, RegionKind::Linker)
    }

    pub fn is_decoded(self) -> bool {
        matches!(self, RegionKind::Bus)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RegionKind::Bus => "Bus",
            RegionKind::Io => "IO",
            RegionKind::Linker => "Linker",
        })
    }
}

/// An address range with mode and caching attributes.
///
/// `origin == None` means "allocate for me"; only [`RegionKind::Bus`] regions can be allocated.
/// Once a region is stored in a handler table it always has an origin and is never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    pub origin: Option<u64>,
    pub size: u64,
    pub mode: AccessMode,
    pub cached: bool,
    pub kind: RegionKind,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            origin: None,
            size: 0,
            mode: AccessMode::ReadWrite,
            cached: true,
            kind: RegionKind::Bus,
        }
    }
}

impl Region {
    /// Cached read-write bus region at a fixed origin.
    pub fn new(origin: u64, size: u64) -> Self {
        Self {
            origin: Some(origin),
            size,
            ..Self::default()
        }
    }

    /// Bus region the bus handler places itself.
    pub fn unplaced(size: u64) -> Self {
        Self {
            size,
            ..Self::default()
        }
    }

    pub fn io(origin: u64, size: u64) -> Self {
        Self {
            origin: Some(origin),
            size,
            cached: false,
            kind: RegionKind::Io,
            ..Self::default()
        }
    }

    pub fn linker(origin: u64, size: u64) -> Self {
        Self {
            origin: Some(origin),
            size,
            kind: RegionKind::Linker,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: AccessMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Half-open byte range covered by the region, if it has been placed.
    pub fn range(&self) -> Option<Range<u64>> {
        let origin = self.origin?;
        Some(origin..origin.saturating_add(self.size))
    }

    /// Size is a non-zero power of two and the origin (when set) is a multiple of it.
    pub fn is_aligned(&self) -> bool {
        self.size.is_power_of_two() && self.origin.map_or(true, |origin| origin % self.size == 0)
    }

    /// Two placed regions overlap iff neither lies entirely below the other.
    ///
    /// Linker regions never overlap anything.
    pub fn overlaps(&self, other: &Region) -> bool {
        if !self.kind.checks_overlap() || !other.kind.checks_overlap() {
            return false;
        }
        let (Some(a), Some(b)) = (self.range(), other.range()) else {
            return false;
        };
        !(a.end <= b.start) && !(b.end <= a.start)
    }

    /// Whether `self` lies inside `container`.
    ///
    /// The upper bound is strict: a region whose last byte is the container's last byte is
    /// *not* considered inside. Callers rely on this to keep the final byte of an IO window free.
    pub fn is_within(&self, container: &Region) -> bool {
        let (Some(inner), Some(outer)) = (self.range(), container.range()) else {
            return false;
        };
        inner.start >= outer.start && inner.end < outer.end
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(origin) = self.origin {
            write!(f, "Origin: 0x{origin:08x}, ")?;
        }
        write!(
            f,
            "Size: 0x{:08x}, Mode: {}, Cached: {}",
            self.size,
            self.mode.as_str().to_uppercase(),
            self.cached
        )
    }
}

/// What a CSR page is backing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsrObject {
    /// A bank of control/status registers belonging to a component.
    Bank(String),
    /// A memory exposed through the CSR space (`<component>_<memory>` location).
    Memory { component: String, memory: String },
}

/// Address of one CSR page, derived from its location number at finalize time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrRegion {
    pub origin: u64,
    pub busword: u32,
    pub object: CsrObject,
}
