//! Static description of one quadrangular cycle variant.
//!
//! A cycle walks `base -> bridge -> cross -> alt -> base`, e.g.
//! `USDT -> ETH -> BRL -> ADA -> USDT`, through four order books:
//!
//! | leg | book            | side taken | produces |
//! |-----|-----------------|------------|----------|
//! | 1   | `bridge`/`base` | ask (buy)  | bridge   |
//! | 2   | `bridge`/`cross`| bid (sell) | cross    |
//! | 3   | `alt`/`cross`   | ask (buy)  | alt      |
//! | 4   | `alt`/`base`    | bid (sell) | base     |

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{InvalidCycleConfig, UnknownVariant};

mod catalog;
pub use catalog::{CycleCatalog, CycleSpec};

pub const LEG_COUNT: usize = 4;

/// Transaction cost of one full cycle, in base currency.
///
/// The total is an opaque constant subtracted from the cycle output. It is not scaled by trade
/// size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeModel {
    Flat { amount: f64 },
    PerLeg { per_leg: f64, fixed: f64 },
}

impl FeeModel {
    pub fn total(&self) -> f64 {
        match *self {
            FeeModel::Flat { amount } => amount,
            FeeModel::PerLeg { per_leg, fixed } => per_leg * LEG_COUNT as f64 + fixed,
        }
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        FeeModel::Flat { amount: 0.0 }
    }
}

/// The four assets a cycle passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleAssets {
    pub base: String,
    pub bridge: String,
    pub cross: String,
    pub alt: String,
}

impl CycleAssets {
    /// USDT -> ETH -> BRL -> `alt` -> USDT
    pub fn via_eth_brl(alt: &str) -> Self {
        Self {
            base: "USDT".to_string(),
            bridge: "ETH".to_string(),
            cross: "BRL".to_string(),
            alt: alt.to_ascii_uppercase(),
        }
    }

    /// Exchange symbols of the four legs, in traversal order.
    pub fn legs(&self) -> [String; LEG_COUNT] {
        [
            format!("{}{}", self.bridge, self.base),
            format!("{}{}", self.bridge, self.cross),
            format!("{}{}", self.alt, self.cross),
            format!("{}{}", self.alt, self.base),
        ]
    }

    /// Asset held after each leg.
    pub fn leg_outputs(&self) -> [&str; LEG_COUNT] {
        [&self.bridge, &self.cross, &self.alt, &self.base]
    }
}

impl Display for CycleAssets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{}->{}->{}->{}",
            self.base, self.bridge, self.cross, self.alt, self.base
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleConfig {
    pub variant: String,
    pub assets: CycleAssets,
    pub legs: [String; LEG_COUNT],
    pub starting_capital: f64,
    pub fee_model: FeeModel,
}

impl CycleConfig {
    pub fn try_new(
        variant: &str,
        assets: CycleAssets,
        starting_capital: f64,
        fee_model: FeeModel,
    ) -> Result<Self, InvalidCycleConfig> {
        let invalid = |reason: String| InvalidCycleConfig {
            variant: variant.to_string(),
            reason,
        };

        if !starting_capital.is_finite() || starting_capital <= 0.0 {
            return Err(invalid(format!(
                "starting capital must be positive and finite, got {starting_capital}"
            )));
        }

        let fee_total = fee_model.total();
        if !fee_total.is_finite() || fee_total < 0.0 {
            return Err(invalid(format!(
                "fee total must be non-negative and finite, got {fee_total}"
            )));
        }

        if [&assets.base, &assets.bridge, &assets.cross, &assets.alt]
            .iter()
            .any(|asset| asset.is_empty())
        {
            return Err(invalid("asset names must not be empty".to_string()));
        }

        Ok(Self::new_unchecked(variant, assets, starting_capital, fee_model))
    }

    /// Skips validation; only for constants covered by tests.
    pub(crate) fn new_unchecked(
        variant: &str,
        assets: CycleAssets,
        starting_capital: f64,
        fee_model: FeeModel,
    ) -> Self {
        Self {
            variant: variant.to_ascii_lowercase(),
            legs: assets.legs(),
            assets,
            starting_capital,
            fee_model,
        }
    }

    pub fn fee_total(&self) -> f64 {
        self.fee_model.total()
    }
}

impl Display for CycleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, capital {} {})",
            self.variant, self.assets, self.starting_capital, self.assets.base
        )
    }
}

/// Builds one of the built-in cycle variants by name, e.g. `ada-1000` or `wif-100`.
pub fn build_config(variant: &str) -> Result<CycleConfig, UnknownVariant> {
    CycleCatalog::builtin().get(variant)
}
