//! JSON description of a system, applied to a [`Soc`] in declaration order.

use std::collections::BTreeMap;

use serde::Deserialize;
use socmap::{
    AccessMode, BusInterface, CpuDescriptor, LocSpace, Peripheral, PeripheralKind, Region,
    SdramSettings, Soc, SocConfig, UartKind,
};

const DEFAULT_BAUDRATE: u32 = 115_200;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SocDescription {
    #[serde(default)]
    pub config: SocConfig,
    #[serde(default)]
    pub components: Vec<Component>,
}

/// One declaration. Order matters: locations are allocated first-come, and the CPU picks up
/// the reset source from a controller declared before it.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Controller {
        name: String,
    },
    Cpu(CpuDescriptor),
    Ram {
        name: String,
        origin: u64,
        size: u64,
        #[serde(default)]
        mode: AccessMode,
    },
    Rom {
        name: String,
        origin: u64,
        size: u64,
    },
    CsrBridge {
        origin: u64,
    },
    Timer {
        name: String,
    },
    Identifier {
        name: String,
        identifier: String,
        build_time: Option<String>,
    },
    Uart {
        kind: UartKind,
        #[serde(default = "default_baudrate")]
        baudrate: u32,
    },
    Sdram {
        name: String,
        settings: SdramSettings,
        origin: u64,
        size: Option<u64>,
        #[serde(default)]
        l2_cache_size: u64,
    },
    /// A generic component with an optional CSR bank and interrupt.
    Peripheral {
        name: String,
        #[serde(default)]
        event_source: bool,
        #[serde(default)]
        csr: bool,
        #[serde(default)]
        irq: bool,
        #[serde(default)]
        csr_constants: BTreeMap<String, u64>,
    },
    Region {
        name: String,
        region: Region,
    },
    Master {
        name: Option<String>,
        data_width: u32,
    },
    Slave {
        name: Option<String>,
        data_width: u32,
        region: Option<Region>,
    },
    Csr {
        name: String,
        location: Option<u32>,
    },
    Irq {
        name: String,
        location: Option<u32>,
    },
    Constant {
        name: String,
        value: u64,
    },
}

fn default_baudrate() -> u32 {
    DEFAULT_BAUDRATE
}

impl SocDescription {
    pub fn build(self) -> socmap::Result<Soc> {
        let mut soc = Soc::new(self.config)?;
        for component in self.components {
            component.apply(&mut soc)?;
        }
        Ok(soc)
    }
}

impl Component {
    pub fn apply(self, soc: &mut Soc) -> socmap::Result<()> {
        match self {
            Component::Controller { name } => soc.add_controller(&name),
            Component::Cpu(cpu) => soc.add_cpu(cpu),
            Component::Ram {
                name,
                origin,
                size,
                mode,
            } => soc.add_ram(&name, origin, size, mode),
            Component::Rom { name, origin, size } => soc.add_rom(&name, origin, size),
            Component::CsrBridge { origin } => soc.add_csr_bridge(origin),
            Component::Timer { name } => soc.add_timer(&name),
            Component::Identifier {
                name,
                identifier,
                build_time,
            } => soc.add_identifier(&name, &identifier, build_time.as_deref()),
            Component::Uart { kind, baudrate } => soc.add_uart(kind, baudrate),
            Component::Sdram {
                name,
                settings,
                origin,
                size,
                l2_cache_size,
            } => soc.add_sdram(&name, settings, origin, size, l2_cache_size),
            Component::Peripheral {
                name,
                event_source,
                csr,
                irq,
                csr_constants,
            } => {
                let mut peripheral = Peripheral::new(PeripheralKind::Other);
                if event_source {
                    peripheral = peripheral.with_event_source();
                }
                for (constant, value) in csr_constants {
                    peripheral = peripheral.with_csr_constant(&constant, value);
                }
                soc.add_peripheral(&name, peripheral)?;
                if csr {
                    soc.add_loc(LocSpace::Csr, &name, None, true)?;
                }
                if irq {
                    soc.add_loc(LocSpace::Irq, &name, None, true)?;
                }
                Ok(())
            }
            Component::Region { name, region } => soc.add_region(&name, region).map(drop),
            Component::Master { name, data_width } => soc
                .add_master(name.as_deref(), BusInterface::new(data_width))
                .map(drop),
            Component::Slave {
                name,
                data_width,
                region,
            } => soc
                .add_slave(name.as_deref(), BusInterface::new(data_width), region)
                .map(drop),
            Component::Csr { name, location } => {
                soc.add_loc(LocSpace::Csr, &name, location, false).map(drop)
            }
            Component::Irq { name, location } => {
                soc.add_loc(LocSpace::Irq, &name, location, false).map(drop)
            }
            Component::Constant { name, value } => soc.add_constant(&name, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_components() {
        let description: SocDescription = serde_json::from_str(
            r#"{
                "config": { "sys_clk_freq": 50000000, "irq": { "n_irqs": 16 } },
                "components": [
                    { "type": "controller", "name": "ctrl" },
                    { "type": "rom", "name": "rom", "origin": 0, "size": 32768 },
                    { "type": "uart", "kind": { "serial": "serial" } },
                    { "type": "region", "name": "io0",
                      "region": { "origin": 2147483648, "size": 2147483648, "cached": false, "kind": "io" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(description.config.sys_clk_freq, 50_000_000);
        assert_eq!(description.config.irq.n_irqs, 16);
        assert_eq!(description.components.len(), 4);
        assert!(matches!(
            &description.components[2],
            Component::Uart { kind: UartKind::Serial(pads), baudrate: DEFAULT_BAUDRATE } if pads == "serial"
        ));

        let soc = description.build().unwrap();
        assert_eq!(soc.sys_clk_freq(), 50_000_000);
        assert_eq!(soc.irq().capacity(), 16);
        assert!(soc.bus().io_regions().contains("io0"));
        assert_eq!(soc.csr().locs().get("uart"), Some(2));
    }

    #[test]
    fn unknown_component_type_is_rejected() {
        let err = serde_json::from_str::<SocDescription>(
            r#"{ "components": [ { "type": "dma", "name": "dma0" } ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("dma"));
    }
}
