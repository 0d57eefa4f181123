use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{CycleAssets, CycleConfig, FeeModel};
use crate::error::{InvalidCycleConfig, UnknownVariant};

/// A cycle variant as written in the config file.
///
/// Only `alt`, `starting_capital` and `fee` are required; the remaining legs default to the
/// USDT/ETH/BRL bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSpec {
    pub alt: String,
    pub starting_capital: f64,
    #[serde(default)]
    pub fee: FeeModel,
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default = "default_bridge")]
    pub bridge: String,
    #[serde(default = "default_cross")]
    pub cross: String,
}

fn default_base() -> String {
    "USDT".to_string()
}

fn default_bridge() -> String {
    "ETH".to_string()
}

fn default_cross() -> String {
    "BRL".to_string()
}

impl CycleSpec {
    pub fn into_config(self, variant: &str) -> Result<CycleConfig, InvalidCycleConfig> {
        let Self {
            alt,
            starting_capital,
            fee,
            base,
            bridge,
            cross,
        } = self;

        let assets = CycleAssets {
            base: base.to_ascii_uppercase(),
            bridge: bridge.to_ascii_uppercase(),
            cross: cross.to_ascii_uppercase(),
            alt: alt.to_ascii_uppercase(),
        };

        CycleConfig::try_new(variant, assets, starting_capital, fee)
    }
}

/// Every cycle variant the process knows about, keyed by lowercase variant name.
#[derive(Debug, Clone)]
pub struct CycleCatalog {
    configs: BTreeMap<String, CycleConfig>,
}

struct BuiltinCycle {
    variant: &'static str,
    alt: &'static str,
    starting_capital: f64,
    fee: FeeModel,
}

// 0.07 per trade over four trades, plus a fixed cost scaled with the capital
const BUILTIN_CYCLES: [BuiltinCycle; 2] = [
    BuiltinCycle {
        variant: "ada-1000",
        alt: "ADA",
        starting_capital: 1000.0,
        fee: FeeModel::PerLeg {
            per_leg: 0.07,
            fixed: 0.6 * 10.0,
        },
    },
    BuiltinCycle {
        variant: "wif-100",
        alt: "WIF",
        starting_capital: 100.0,
        fee: FeeModel::PerLeg {
            per_leg: 0.07,
            fixed: 0.6,
        },
    },
];

impl CycleCatalog {
    /// The two variants that ship with the binary.
    pub fn builtin() -> Self {
        let configs = BUILTIN_CYCLES
            .iter()
            .map(|builtin| {
                let cfg = CycleConfig::new_unchecked(
                    builtin.variant,
                    CycleAssets::via_eth_brl(builtin.alt),
                    builtin.starting_capital,
                    builtin.fee,
                );
                (cfg.variant.clone(), cfg)
            })
            .collect();

        Self { configs }
    }

    /// Adds variants from configuration data. A spec with the name of an existing variant
    /// replaces it.
    pub fn extend<I>(mut self, specs: I) -> Result<Self, InvalidCycleConfig>
    where
        I: IntoIterator<Item = (String, CycleSpec)>,
    {
        for (variant, spec) in specs {
            let cfg = spec.into_config(&variant)?;
            self.configs.insert(cfg.variant.clone(), cfg);
        }
        Ok(self)
    }

    pub fn get(&self, variant: &str) -> Result<CycleConfig, UnknownVariant> {
        self.configs
            .get(&variant.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| UnknownVariant {
                name: variant.to_string(),
            })
    }

    pub fn variants(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }
}
