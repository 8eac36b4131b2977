#![forbid(unsafe_code)]

//! Address-space and location allocation for a composed system-on-chip.
//!
//! A [`Soc`] is built in two phases:
//!
//! 1. **Declaration.** Collaborators register bus regions, bus masters/slaves, CSR locations and
//!    interrupt lines, in any order. Every call is validated immediately against the global
//!    invariants (no overlapping regions, uncached regions inside IO space, power-of-two aligned
//!    sizes, fixed location capacities) and fails with a [`SocError`] otherwise.
//! 2. **Finalization.** [`Soc::finalize`] consumes the system and produces a [`SocMap`]: the bus
//!    interconnect with one [`AddressDecoder`] per slave, the CSR page map, the interrupt wiring
//!    and the constant table for software generation.
//!
//! ```
//! use socmap::{AccessMode, BusInterface, Soc, SocConfig};
//!
//! let mut soc = Soc::new(SocConfig::default()).unwrap();
//! soc.add_rom("rom", 0x0000_0000, 0x1_0000).unwrap();
//! soc.add_ram("sram", 0x1000_0000, 0x2000, AccessMode::ReadWrite).unwrap();
//! soc.add_master(None, BusInterface::new(32)).unwrap();
//!
//! let map = soc.finalize().unwrap();
//! let interconnect = map.bus_interconnect.as_ref().unwrap();
//! assert_eq!(interconnect.route(0x1000_0004), Some("sram"));
//! ```

mod allocator;
mod bus;
mod component;
mod constants;
mod csr;
mod decoder;
mod error;
mod finalize;
mod interconnect;
mod irq;
mod loc;
mod overlap;
mod region;
mod soc;

pub use allocator::RegionAllocator;
pub use bus::{
    BusConfig, BusHandler, BusInterface, BusPort, BusStandard, ReservedRegion, WidthConverter,
    DEFAULT_TIMEOUT_CYCLES, RESERVED_REGION_SIZE,
};
pub use component::{CpuDescriptor, Peripheral, PeripheralKind, SdramSettings, UartKind};
pub use constants::{Constant, ConstantTable};
pub use csr::{CsrConfig, CsrHandler, CsrInterface};
pub use decoder::AddressDecoder;
pub use error::{Result, SocError};
pub use finalize::{SocMap, CPU_REQUIRED_REGIONS};
pub use interconnect::{BusInterconnect, CsrInterconnect, IrqWire};
pub use irq::{IrqConfig, IrqHandler, MAX_IRQS};
pub use loc::LocHandler;
pub use overlap::{find_overlap, RegionTable};
pub use region::{AccessMode, CsrObject, CsrRegion, Region, RegionKind};
pub use soc::{LocSpace, Soc, SocConfig, CSR_REGION};
