use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocError};
use crate::loc::LocHandler;

/// Interrupt lines a CPU can expose.
pub const MAX_IRQS: u32 = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrqConfig {
    pub n_irqs: u32,
    pub reserved_irqs: BTreeMap<String, u32>,
}

impl Default for IrqConfig {
    fn default() -> Self {
        Self {
            n_irqs: MAX_IRQS,
            reserved_irqs: BTreeMap::new(),
        }
    }
}

/// Allocates interrupt line numbers.
#[derive(Debug, Clone, Serialize)]
pub struct IrqHandler {
    locs: LocHandler,
}

impl IrqHandler {
    pub fn new(config: IrqConfig) -> Result<Self> {
        tracing::info!("creating new IRQ handler");
        if config.n_irqs > MAX_IRQS {
            return Err(SocError::UnsupportedIrqCount(config.n_irqs));
        }

        let mut irq = Self {
            locs: LocHandler::new("IRQ", config.n_irqs),
        };
        tracing::info!("IRQ handler (up to {} locations)", config.n_irqs);

        for (name, n) in config.reserved_irqs {
            irq.add(&name, Some(n), false)?;
        }

        tracing::info!("IRQ handler created");
        Ok(irq)
    }

    pub fn capacity(&self) -> u32 {
        self.locs.capacity()
    }

    pub fn locs(&self) -> &LocHandler {
        &self.locs
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.locs.get(name)
    }

    pub fn add(&mut self, name: &str, n: Option<u32>, reuse_if_exists: bool) -> Result<u32> {
        self.locs.add(name, n, reuse_if_exists)
    }

    pub fn alloc(&self, name: &str) -> Result<u32> {
        self.locs.alloc(name)
    }

    pub(crate) fn reject(&self, err: SocError) -> SocError {
        self.locs.reject(err)
    }
}

impl fmt::Display for IrqHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IRQ Handler (up to {} Locations).", self.locs.capacity())?;
        if !self.locs.is_empty() {
            write!(f, "\n{}", self.locs)?;
        }
        Ok(())
    }
}
