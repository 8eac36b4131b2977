//! Descriptions of the components a system is composed from.
//!
//! Components are external collaborators: this crate only records what the address map needs
//! to know about them (do they raise interrupts, which constants and memories sit behind their
//! CSR location, which buses and interrupts a CPU brings along).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bus::BusInterface;
use crate::constants::Constant;
use crate::error::{Result, SocError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UartKind {
    /// Sink that accepts and drops every byte.
    Stub,
    Stream,
    /// UART that also masters the bus (`uart_bridge`).
    Bridge,
    Crossover,
    JtagAtlantic,
    JtagUart,
    /// UART behind a PHY attached to the named platform pads.
    Serial(String),
}

impl UartKind {
    /// Whether the UART sits behind a dedicated `uart_phy` component.
    pub fn has_phy(&self) -> bool {
        matches!(
            self,
            UartKind::JtagAtlantic | UartKind::JtagUart | UartKind::Serial(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeripheralKind {
    Controller,
    Cpu,
    Ram,
    Rom,
    CsrBridge,
    Timer,
    Identifier { identifier: String },
    Uart { kind: UartKind, baudrate: u32 },
    UartPhy,
    Sdram,
    Other,
}

/// A registered component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peripheral {
    pub kind: PeripheralKind,
    /// Exposes an event (interrupt) signal that can be wired to a CPU interrupt line.
    pub event_source: bool,
    /// Constants published by the component's CSR bank, promoted as `<NAME>_<CONSTANT>`.
    pub csr_constants: Vec<(String, Constant)>,
    /// Memories mapped through the CSR space, each at location `<name>_<memory>`.
    pub csr_memories: Vec<String>,
}

impl Peripheral {
    pub fn new(kind: PeripheralKind) -> Self {
        Self {
            kind,
            event_source: false,
            csr_constants: Vec::new(),
            csr_memories: Vec::new(),
        }
    }

    pub fn with_event_source(mut self) -> Self {
        self.event_source = true;
        self
    }

    pub fn with_csr_constant(mut self, name: &str, value: impl Into<Constant>) -> Self {
        self.csr_constants.push((name.to_string(), value.into()));
        self
    }

    pub fn with_csr_memory(mut self, memory: &str) -> Self {
        self.csr_memories.push(memory.to_string());
        self
    }
}

/// What the address map needs to know about a CPU core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuDescriptor {
    pub name: String,
    pub variant: String,
    /// Bus masters the core brings (instruction/data buses, ...), registered as `cpu_bus<N>`.
    pub buses: Vec<BusInterface>,
    /// Interrupt lines the core uses internally, by name.
    pub interrupts: BTreeMap<String, u32>,
    /// `(origin, size)` of the uncached windows the core expects.
    pub io_regions: Vec<(u64, u64)>,
    pub reset_address: Option<u64>,
    /// Whether the core has external interrupt inputs to wire peripherals to.
    pub interrupt_lines: bool,
}

impl Default for CpuDescriptor {
    fn default() -> Self {
        Self::none()
    }
}

impl CpuDescriptor {
    pub const NONE: &'static str = "none";

    /// Placeholder for systems without a CPU.
    pub fn none() -> Self {
        Self {
            name: Self::NONE.to_string(),
            variant: "standard".to_string(),
            buses: Vec::new(),
            interrupts: BTreeMap::new(),
            io_regions: Vec::new(),
            reset_address: None,
            interrupt_lines: false,
        }
    }

    pub fn is_none(&self) -> bool {
        self.name == Self::NONE
    }

    /// Variant name without `+extension` suffixes.
    pub fn base_variant(&self) -> &str {
        self.variant.split('+').next().unwrap_or_default()
    }
}

/// SDRAM geometry needed to size the `main_ram` region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdramSettings {
    pub bankbits: u32,
    pub rowbits: u32,
    pub colbits: u32,
    /// Width of the DRAM data bus, in bits.
    pub databits: u32,
    /// Width of the controller port exposed to the system, in bits.
    pub port_data_width: u32,
}

impl SdramSettings {
    /// Capacity in bytes.
    ///
    /// Fails when the geometry does not fit a 64-bit byte count.
    pub fn size(&self) -> Result<u64> {
        let words = self
            .bankbits
            .checked_add(self.rowbits)
            .and_then(|bits| bits.checked_add(self.colbits))
            .and_then(|bits| 1u64.checked_shl(bits));
        match words.and_then(|words| words.checked_mul(u64::from(self.databits))) {
            Some(bits) => Ok(bits / 8),
            None => Err(SocError::UnsupportedConfiguration {
                field: "sdram.geometry",
                value: format!(
                    "{} bank, {} row, {} column bits of {} data bits",
                    self.bankbits, self.rowbits, self.colbits, self.databits
                ),
            }),
        }
    }
}
