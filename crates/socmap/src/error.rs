use thiserror::Error;

use crate::region::RegionKind;

pub type Result<T> = std::result::Result<T, SocError>;

/// Every way a composition can be rejected.
///
/// All of these are fatal: the caller that triggered the error is expected to abandon the
/// composition rather than retry. The handler that detected the violation has already logged a
/// dump of its tables at `error` level by the time the error is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocError {
    #[error("unsupported {field}: {value}")]
    UnsupportedConfiguration { field: &'static str, value: String },

    #[error("region {0} already declared")]
    DuplicateRegionName(String),

    #[error("{0} already declared as bus master")]
    DuplicateMasterName(String),

    #[error("{0} already declared as bus slave")]
    DuplicateSlaveName(String),

    #[error("{space} name {name} already used")]
    DuplicateLocationName { space: &'static str, name: String },

    #[error("{space} location {slot} already used (by {owner})")]
    DuplicateLocationNumber {
        space: &'static str,
        slot: u32,
        owner: String,
    },

    #[error("region overlap between {0} and {1}")]
    RegionOverlap(String, String),

    #[error(
        "region {name} is misaligned (origin={origin:#x?}, size={size:#x}); size must be a power of two and origin a multiple of size"
    )]
    MisalignedRegion {
        name: String,
        origin: Option<u64>,
        size: u64,
    },

    #[error("region {name} is not cached but not inside an IO region (origin={origin:#010x}, size={size:#x})")]
    UncachedRegionOutsideIO { name: String, origin: u64, size: u64 },

    #[error("region {name} lies outside the {address_width}-bit address space (origin={origin:#x}, size={size:#x})")]
    RegionOutsideAddressSpace {
        name: String,
        origin: u64,
        size: u64,
        address_width: u32,
    },

    #[error("not enough address space to allocate {name} ({size:#x} bytes, cached={cached})")]
    InsufficientAddressSpace {
        name: String,
        size: u64,
        cached: bool,
    },

    #[error("not enough {space} locations (capacity {capacity})")]
    CapacityExhausted { space: &'static str, capacity: u32 },

    #[error("{space} location {slot} out of range (up to {capacity})")]
    LocationOutOfRange {
        space: &'static str,
        slot: u32,
        capacity: u32,
    },

    #[error("unsupported IRQ count: {0} (up to 32)")]
    UnsupportedIrqCount(u32),

    #[error("undefined {space} location {name}")]
    UndefinedLocation { space: &'static str, name: String },

    #[error("bus slave needs at least a name or a region")]
    MissingNameOrRegion,

    #[error("unable to find region {0}")]
    UnknownRegionName(String),

    #[error("{0} region must be defined as bus or linker region")]
    MissingRequiredRegion(String),

    #[error("no event source found on {0}")]
    MissingEventSource(String),

    #[error("{name} data width mismatch ({actual} vs {expected})")]
    DataWidthMismatch {
        name: String,
        actual: u32,
        expected: u32,
    },

    #[error("decoder region {name} origin {origin:#010x} is not aligned on size {size:#x}")]
    UnalignedDecoderRegion { name: String, origin: u64, size: u64 },

    #[error("bus slave {name} needs a decoded region, got a {kind} region")]
    UndecodedSlaveRegion { name: String, kind: RegionKind },

    #[error("{kind} region {name} has no origin and cannot be allocated")]
    UnplacedRegion { name: String, kind: RegionKind },

    #[error("constant {0} already declared")]
    DuplicateConstant(String),

    #[error("component {0} already declared")]
    DuplicateComponentName(String),
}
