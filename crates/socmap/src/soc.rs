use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::bus::{BusConfig, BusHandler, BusInterface};
use crate::component::{CpuDescriptor, Peripheral, PeripheralKind, SdramSettings, UartKind};
use crate::constants::{Constant, ConstantTable};
use crate::csr::{CsrConfig, CsrHandler, CsrInterface};
use crate::error::{Result, SocError};
use crate::irq::{IrqConfig, IrqHandler};
use crate::region::{AccessMode, Region};

/// Name of the bus region (and slave) backing the CSR space.
pub const CSR_REGION: &str = "csr";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocConfig {
    /// System clock frequency in Hz.
    pub sys_clk_freq: u64,
    pub bus: BusConfig,
    pub csr: CsrConfig,
    pub irq: IrqConfig,
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            sys_clk_freq: 100_000_000,
            bus: BusConfig::default(),
            csr: CsrConfig::default(),
            irq: IrqConfig::default(),
        }
    }
}

/// Which location allocator [`Soc::add_loc`] targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocSpace {
    Csr,
    Irq,
}

/// A system being composed.
///
/// Collaborators declare regions, masters, slaves and locations in any order; every call is
/// checked immediately. [`Soc::finalize`] then consumes the system and produces the frozen
/// [`SocMap`](crate::SocMap), so nothing can be declared after finalization and a system is
/// finalized at most once:
///
/// ```compile_fail
/// use socmap::{Soc, SocConfig};
///
/// let soc = Soc::new(SocConfig::default()).unwrap();
/// let copy = soc.clone();
/// soc.finalize().unwrap();
/// copy.finalize().unwrap();
/// ```
///
/// ```compile_fail
/// use socmap::{Region, Soc, SocConfig};
///
/// let mut soc = Soc::new(SocConfig::default()).unwrap();
/// let map = soc.finalize().unwrap();
/// soc.add_region("late", Region::new(0, 0x1000)).unwrap();
/// ```
#[derive(Debug)]
pub struct Soc {
    pub(crate) sys_clk_freq: u64,
    pub(crate) bus: BusHandler,
    pub(crate) csr: CsrHandler,
    pub(crate) irq: IrqHandler,
    pub(crate) constants: ConstantTable,
    pub(crate) peripherals: BTreeMap<String, Peripheral>,
    pub(crate) cpu: Option<CpuDescriptor>,
    pub(crate) controller: Option<String>,
    pub(crate) cpu_reset_source: Option<String>,
}

impl Soc {
    pub fn new(config: SocConfig) -> Result<Self> {
        tracing::info!("creating new SoC");

        let mut soc = Self {
            sys_clk_freq: config.sys_clk_freq,
            bus: BusHandler::new(config.bus)?,
            csr: CsrHandler::new(config.csr)?,
            irq: IrqHandler::new(config.irq)?,
            constants: ConstantTable::new(),
            peripherals: BTreeMap::new(),
            cpu: None,
            controller: None,
            cpu_reset_source: None,
        };
        tracing::info!("initial SoC:\n{}\n{}\n{}", soc.bus, soc.csr, soc.irq);

        soc.add_config("CLOCK_FREQUENCY", soc.sys_clk_freq)?;
        Ok(soc)
    }

    pub fn sys_clk_freq(&self) -> u64 {
        self.sys_clk_freq
    }

    pub fn bus(&self) -> &BusHandler {
        &self.bus
    }

    pub fn csr(&self) -> &CsrHandler {
        &self.csr
    }

    pub fn irq(&self) -> &IrqHandler {
        &self.irq
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn peripheral(&self, name: &str) -> Option<&Peripheral> {
        self.peripherals.get(name)
    }

    pub fn cpu(&self) -> Option<&CpuDescriptor> {
        self.cpu.as_ref()
    }

    // Registration -------------------------------------------------------------------------------

    pub fn add_region(&mut self, name: &str, region: Region) -> Result<Region> {
        self.bus.add_region(name, region)
    }

    pub fn add_master(&mut self, name: Option<&str>, interface: BusInterface) -> Result<String> {
        self.bus.add_master(name, interface)
    }

    pub fn add_slave(
        &mut self,
        name: Option<&str>,
        interface: BusInterface,
        region: Option<Region>,
    ) -> Result<String> {
        self.bus.add_slave(name, interface, region)
    }

    pub fn add_loc(
        &mut self,
        space: LocSpace,
        name: &str,
        n: Option<u32>,
        reuse_if_exists: bool,
    ) -> Result<u32> {
        match space {
            LocSpace::Csr => self.csr.add(name, n, reuse_if_exists),
            LocSpace::Irq => self.irq.add(name, n, reuse_if_exists),
        }
    }

    /// CSR location of `name` (or of its `memory`).
    pub fn address_map(&self, name: &str, memory: Option<&str>) -> Result<u32> {
        self.csr.address_map(name, memory)
    }

    /// Decoded bus regions ordered by origin.
    pub fn regions(&self) -> Vec<(&str, &Region)> {
        self.bus.regions_by_origin()
    }

    pub fn add_constant(&mut self, name: &str, value: impl Into<Constant>) -> Result<()> {
        self.constants.add_constant(name, value)
    }

    pub fn add_config(&mut self, name: &str, value: impl Into<Constant>) -> Result<()> {
        self.constants.add_config(name, value)
    }

    /// Registers a component under a unique name.
    pub fn add_peripheral(&mut self, name: &str, peripheral: Peripheral) -> Result<()> {
        self.check_if_exists(name)?;
        self.peripherals.insert(name.to_string(), peripheral);
        Ok(())
    }

    // Components ---------------------------------------------------------------------------------

    /// System controller: CSR bank, CPU reset source and bus-error counter.
    pub fn add_controller(&mut self, name: &str) -> Result<()> {
        self.add_peripheral(name, Peripheral::new(PeripheralKind::Controller))?;
        self.csr.add(name, None, true)?;
        self.controller = Some(name.to_string());
        Ok(())
    }

    pub fn add_ram(&mut self, name: &str, origin: u64, size: u64, mode: AccessMode) -> Result<()> {
        self.check_if_exists(name)?;
        let region = Region::new(origin, size).with_mode(mode);
        let interface = BusInterface::new(self.bus.data_width());
        self.bus.add_slave(Some(name), interface, Some(region))?;
        let kind = match mode {
            AccessMode::Read => PeripheralKind::Rom,
            _ => PeripheralKind::Ram,
        };
        self.peripherals
            .insert(name.to_string(), Peripheral::new(kind));
        tracing::info!("RAM {name} added {region}");
        Ok(())
    }

    pub fn add_rom(&mut self, name: &str, origin: u64, size: u64) -> Result<()> {
        self.add_ram(name, origin, size, AccessMode::Read)
    }

    /// Bridge from the system bus into the CSR space at `origin`.
    ///
    /// The CSR window is uncached, so an IO region covering it must already be declared.
    pub fn add_csr_bridge(&mut self, origin: u64) -> Result<()> {
        self.check_if_exists("csr_bridge")?;
        let size = 1u64 << (self.csr.address_width() + 2);
        let region = Region::new(origin, size).with_cached(false);
        let interface = BusInterface::new(self.bus.data_width());
        self.bus.add_slave(Some(CSR_REGION), interface, Some(region))?;
        self.csr
            .add_master(Some("bridge"), CsrInterface::new(self.csr.data_width()))?;
        self.peripherals.insert(
            "csr_bridge".to_string(),
            Peripheral::new(PeripheralKind::CsrBridge),
        );
        self.add_config("CSR_DATA_WIDTH", self.csr.data_width())?;
        self.add_config("CSR_ALIGNMENT", self.csr.alignment())?;
        Ok(())
    }

    pub fn add_cpu(&mut self, cpu: CpuDescriptor) -> Result<()> {
        self.check_if_exists("cpu")?;
        if !cpu.is_none() {
            for (n, bus) in cpu.buses.iter().enumerate() {
                self.bus.add_master(Some(&format!("cpu_bus{n}")), *bus)?;
            }
            self.csr.add("cpu", None, true)?;
            for (name, n) in &cpu.interrupts {
                self.irq.add(name, Some(*n), false)?;
            }
            if let Some(controller) = &self.controller {
                self.cpu_reset_source = Some(controller.clone());
            }
            if let Some(reset_address) = cpu.reset_address {
                self.add_config("CPU_RESET_ADDR", reset_address)?;
            }
        }
        for (n, (origin, size)) in cpu.io_regions.iter().enumerate() {
            self.bus
                .add_region(&format!("io{n}"), Region::io(*origin, *size))?;
        }
        self.add_config("CPU_TYPE", cpu.name.as_str())?;
        self.add_config("CPU_VARIANT", cpu.base_variant())?;
        self.peripherals
            .insert("cpu".to_string(), Peripheral::new(PeripheralKind::Cpu));
        self.cpu = Some(cpu);
        Ok(())
    }

    pub fn add_timer(&mut self, name: &str) -> Result<()> {
        self.add_peripheral(
            name,
            Peripheral::new(PeripheralKind::Timer).with_event_source(),
        )?;
        self.csr.add(name, None, true)?;
        self.irq.add(name, None, true)?;
        Ok(())
    }

    /// Read-only identification string, exposed as the CSR memory `<name>_mem`.
    pub fn add_identifier(
        &mut self,
        name: &str,
        identifier: &str,
        build_time: Option<&str>,
    ) -> Result<()> {
        let identifier = match build_time {
            Some(build_time) => format!("{identifier} {build_time}"),
            None => identifier.to_string(),
        };
        self.add_peripheral(
            name,
            Peripheral::new(PeripheralKind::Identifier { identifier }).with_csr_memory("mem"),
        )?;
        self.csr.add(&format!("{name}_mem"), None, true)?;
        Ok(())
    }

    pub fn add_uart(&mut self, kind: UartKind, baudrate: u32) -> Result<()> {
        self.check_if_exists("uart")?;
        if kind.has_phy() {
            self.add_peripheral("uart_phy", Peripheral::new(PeripheralKind::UartPhy))?;
        }
        if kind == UartKind::Bridge {
            self.bus
                .add_master(Some("uart_bridge"), BusInterface::new(32))?;
        }
        self.peripherals.insert(
            "uart".to_string(),
            Peripheral::new(PeripheralKind::Uart { kind, baudrate }).with_event_source(),
        );
        self.csr.add("uart_phy", None, true)?;
        self.csr.add("uart", None, true)?;
        self.irq.add("uart", None, true)?;
        Ok(())
    }

    /// SDRAM controller mapped as `main_ram` at `origin`.
    ///
    /// The region covers the whole device (capped by `size`). A non-zero `l2_cache_size` is raised
    /// to at least two controller words and rounded down to a power of two before being recorded.
    pub fn add_sdram(
        &mut self,
        name: &str,
        settings: SdramSettings,
        origin: u64,
        size: Option<u64>,
        l2_cache_size: u64,
    ) -> Result<()> {
        self.check_if_exists(name)?;
        let device_size = settings.size()?;
        self.csr.add(name, None, false)?;

        let sdram_size = match size {
            Some(size) => device_size.min(size),
            None => device_size,
        };
        let interface = BusInterface::new(self.bus.data_width());
        self.bus.add_slave(
            Some("main_ram"),
            interface,
            Some(Region::new(origin, sdram_size)),
        )?;

        let l2_cache_size = if l2_cache_size == 0 {
            0
        } else {
            let port_bytes = u64::from(settings.port_data_width) / 8;
            prev_power_of_two(l2_cache_size.max(2 * port_bytes))
        };
        self.add_config("L2_SIZE", l2_cache_size)?;

        self.peripherals
            .insert(name.to_string(), Peripheral::new(PeripheralKind::Sdram));
        Ok(())
    }

    fn check_if_exists(&self, name: &str) -> Result<()> {
        if self.peripherals.contains_key(name) {
            tracing::error!("{name} component already declared");
            return Err(SocError::DuplicateComponentName(name.to_string()));
        }
        Ok(())
    }
}

fn prev_power_of_two(value: u64) -> u64 {
    debug_assert!(value > 0);
    1 << (63 - value.leading_zeros())
}
