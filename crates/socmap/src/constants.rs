//! Flat constant table handed to firmware/software generation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SocError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    Int(u64),
    Str(String),
    /// Defined without a value.
    Flag,
}

impl From<u64> for Constant {
    fn from(value: u64) -> Self {
        Constant::Int(value)
    }
}

impl From<u32> for Constant {
    fn from(value: u32) -> Self {
        Constant::Int(u64::from(value))
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::Str(value.to_string())
    }
}

impl From<String> for Constant {
    fn from(value: String) -> Self {
        Constant::Str(value)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Str(value) => write!(f, "{value:?}"),
            Constant::Flag => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ConstantTable {
    constants: BTreeMap<String, Constant>,
}

impl ConstantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Looks up a constant; `name` is matched case-insensitively like on insertion.
    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.constants.get(&name.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constant)> {
        self.constants.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Adds `NAME = value`. Keys are stored upper-cased and may only be defined once.
    pub fn add_constant(&mut self, name: &str, value: impl Into<Constant>) -> Result<()> {
        let name = name.to_uppercase();
        if self.constants.contains_key(&name) {
            tracing::error!("{name} constant already declared");
            return Err(SocError::DuplicateConstant(name));
        }
        self.constants.insert(name, value.into());
        Ok(())
    }

    /// Adds `CONFIG_<NAME>`. String values become the flag `CONFIG_<NAME>_<VALUE>` instead.
    pub fn add_config(&mut self, name: &str, value: impl Into<Constant>) -> Result<()> {
        let name = format!("CONFIG_{name}");
        match value.into() {
            Constant::Str(value) => self.add_constant(&format!("{name}_{value}"), Constant::Flag),
            value => self.add_constant(&name, value),
        }
    }
}

impl fmt::Display for ConstantTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constants: ({})", self.constants.len())?;
        for (name, value) in &self.constants {
            match value {
                Constant::Flag => write!(f, "\n- {name}")?,
                value => write!(f, "\n- {name:<30}: {value}")?,
            }
        }
        Ok(())
    }
}
