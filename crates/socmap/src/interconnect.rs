use serde::Serialize;

use crate::decoder::AddressDecoder;

/// Shared bus interconnect between every master and every decoded slave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusInterconnect {
    pub masters: Vec<String>,
    /// Slaves in registration order; earlier slaves win when decoders overlap.
    pub slaves: Vec<(String, AddressDecoder)>,
    /// Outputs are registered (one cycle of latency).
    pub register: bool,
    pub timeout_cycles: Option<u64>,
}

impl BusInterconnect {
    /// Slave that claims the byte `address`, if any.
    pub fn route(&self, address: u64) -> Option<&str> {
        self.slaves
            .iter()
            .find(|(_, decoder)| decoder.matches(address))
            .map(|(name, _)| name.as_str())
    }
}

/// CSR bus between the CSR masters and the CSR banks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsrInterconnect {
    pub masters: Vec<String>,
    /// Bank names in location order.
    pub slaves: Vec<String>,
}

/// A peripheral event signal connected to a CPU interrupt input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IrqWire {
    pub line: u32,
    pub source: String,
}
