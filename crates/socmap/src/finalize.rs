use std::fmt;

use serde::Serialize;

use crate::bus::BusHandler;
use crate::constants::ConstantTable;
use crate::csr::CsrHandler;
use crate::error::{Result, SocError};
use crate::interconnect::{BusInterconnect, CsrInterconnect, IrqWire};
use crate::irq::IrqHandler;
use crate::region::{CsrObject, CsrRegion};
use crate::soc::{Soc, CSR_REGION};

/// Regions every CPU needs to boot, as bus or linker regions.
pub const CPU_REQUIRED_REGIONS: [&str; 2] = ["rom", "sram"];

/// The frozen result of composing a system.
#[derive(Debug, Clone, Serialize)]
pub struct SocMap {
    pub sys_clk_freq: u64,
    pub bus: BusHandler,
    pub csr: CsrHandler,
    pub irq: IrqHandler,
    pub constants: ConstantTable,
    /// `None` when the bus has no master or no slave.
    pub bus_interconnect: Option<BusInterconnect>,
    /// Component counting bus errors (interconnect timeouts).
    pub bus_error_sink: Option<String>,
    /// Component driving the CPU reset.
    pub cpu_reset_source: Option<String>,
    /// `None` when no CSR master is registered.
    pub csr_interconnect: Option<CsrInterconnect>,
    /// Sorted by line.
    pub irq_wiring: Vec<IrqWire>,
}

impl SocMap {
    /// CSR regions ordered by origin.
    pub fn csr_regions(&self) -> &[(String, CsrRegion)] {
        self.csr.regions()
    }
}

impl Soc {
    /// Runs the finalizer: builds the interconnects, places the CSR pages, checks the CPU
    /// requirements and wires interrupts.
    pub fn finalize(mut self) -> Result<SocMap> {
        tracing::info!(
            "finalized SoC:\n{}\n{}\n{}",
            self.bus,
            self.csr,
            self.irq
        );

        // Bus interconnect.
        let masters: Vec<String> = self.bus.masters().map(|(n, _)| n.to_string()).collect();
        let slaves = self
            .bus
            .slaves()
            .map(|(name, _)| {
                self.bus
                    .decoder(name)
                    .map(|decoder| (name.to_string(), decoder))
            })
            .collect::<Result<Vec<_>>>()?;
        let bus_interconnect = (!masters.is_empty() && !slaves.is_empty()).then(|| {
            BusInterconnect {
                masters,
                slaves,
                register: true,
                timeout_cycles: self.bus.timeout(),
            }
        });
        let bus_error_sink = match (&bus_interconnect, self.bus.timeout()) {
            (Some(_), Some(_)) => self.controller.clone(),
            _ => None,
        };

        // CSR banks, regions and interconnect.
        let banks = self.csr.locs().by_location();
        let mut csr_regions = Vec::with_capacity(banks.len());
        let mut bank_constants = Vec::new();
        if !banks.is_empty() {
            let csr_base = match self.bus.regions().get(CSR_REGION).and_then(|r| r.origin) {
                Some(origin) => origin,
                None => {
                    tracing::error!("CSR locations declared without a {CSR_REGION} bus region\n{}", self.bus);
                    return Err(SocError::MissingRequiredRegion(CSR_REGION.to_string()));
                }
            };
            for (name, n) in &banks {
                let origin = csr_base + u64::from(self.csr.paging()) * u64::from(*n);
                csr_regions.push((
                    name.to_string(),
                    CsrRegion {
                        origin,
                        busword: self.csr.data_width(),
                        object: self.csr_object(name),
                    },
                ));
                if let Some(peripheral) = self.peripherals.get(*name) {
                    for (constant, value) in &peripheral.csr_constants {
                        bank_constants.push((format!("{name}_{constant}"), value.clone()));
                    }
                }
            }
        }
        let csr_masters: Vec<String> = self.csr.masters().map(|(n, _)| n.to_string()).collect();
        let csr_interconnect = (!csr_masters.is_empty()).then(|| CsrInterconnect {
            masters: csr_masters,
            slaves: banks.iter().map(|(name, _)| name.to_string()).collect(),
        });
        self.csr.set_regions(csr_regions);
        for (name, value) in bank_constants {
            self.constants.add_constant(&name, value)?;
        }

        // CPU requirements and interrupts.
        let mut irq_wiring = Vec::new();
        if let Some(cpu) = &self.cpu {
            if !cpu.is_none() {
                for required in CPU_REQUIRED_REGIONS {
                    if !self.bus.declares_region(required) {
                        tracing::error!("CPU needs {required} region\n{}", self.bus);
                        return Err(SocError::MissingRequiredRegion(required.to_string()));
                    }
                }
            }
            if cpu.interrupt_lines {
                for (name, line) in self.irq.locs().iter() {
                    if cpu.interrupts.contains_key(name) {
                        continue;
                    }
                    match self.peripherals.get(name) {
                        Some(peripheral) if peripheral.event_source => {}
                        _ => {
                            return Err(self
                                .irq
                                .reject(SocError::MissingEventSource(name.to_string())))
                        }
                    }
                    irq_wiring.push(IrqWire {
                        line,
                        source: name.to_string(),
                    });
                    self.constants
                        .add_constant(&format!("{name}_INTERRUPT"), line)?;
                }
            }
        }
        irq_wiring.sort_by_key(|wire| wire.line);

        Ok(SocMap {
            sys_clk_freq: self.sys_clk_freq,
            bus: self.bus,
            csr: self.csr,
            irq: self.irq,
            constants: self.constants,
            bus_interconnect,
            bus_error_sink,
            cpu_reset_source: self.cpu_reset_source,
            csr_interconnect,
            irq_wiring,
        })
    }

    fn csr_object(&self, location: &str) -> CsrObject {
        for (component, peripheral) in &self.peripherals {
            for memory in &peripheral.csr_memories {
                if location.strip_prefix(component.as_str()).and_then(|rest| rest.strip_prefix('_'))
                    == Some(memory.as_str())
                {
                    return CsrObject::Memory {
                        component: component.clone(),
                        memory: memory.clone(),
                    };
                }
            }
        }
        CsrObject::Bank(location.to_string())
    }
}

impl fmt::Display for SocMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.bus)?;
        writeln!(f, "{}", self.csr)?;
        writeln!(f, "{}", self.irq)?;
        if !self.csr.regions().is_empty() {
            write!(f, "CSR Regions: ({})", self.csr.regions().len())?;
            for (name, region) in self.csr.regions() {
                write!(f, "\n{name:<20}: Origin: 0x{:08x}", region.origin)?;
            }
            writeln!(f)?;
        }
        if !self.irq_wiring.is_empty() {
            write!(f, "IRQ Wiring: ({})", self.irq_wiring.len())?;
            for wire in &self.irq_wiring {
                write!(f, "\n- {:<20}: {}", wire.source, wire.line)?;
            }
            writeln!(f)?;
        }
        write!(f, "{}", self.constants)
    }
}
