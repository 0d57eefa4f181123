use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{CycleAssets, LEG_COUNT};

/// Outcome of evaluating one traversal of a cycle.
///
/// Values are kept at full precision; rounding happens only when a result is displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub timestamp: DateTime<Utc>,
    pub variant: String,
    pub assets: CycleAssets,
    pub starting_capital: f64,
    /// Quantity held after each leg, in the asset that leg produces.
    pub amounts: [f64; LEG_COUNT],
    pub fee_total: f64,
    pub profit_or_loss: f64,
    pub is_profitable: bool,
}

impl CycleResult {
    /// Base currency returned by the last leg, before fees.
    pub fn final_amount(&self) -> f64 {
        self.amounts[LEG_COUNT - 1]
    }

    pub fn report(&self) -> CycleReport<'_> {
        CycleReport(self)
    }

    /// `timestamp,amount1,amount2,amount3,amount4,profit_or_loss` at full precision.
    pub fn record_row(&self) -> String {
        let [a1, a2, a3, a4] = self.amounts;
        format!(
            "{},{a1},{a2},{a3},{a4},{}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.profit_or_loss
        )
    }
}

impl Display for CycleResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let verdict = if self.is_profitable { "PROFIT" } else { "LOSS" };
        write!(
            f,
            "{} {}: {:.2} {}",
            self.variant, verdict, self.profit_or_loss, self.assets.base
        )
    }
}

/// Multi-line human report of a [`CycleResult`].
///
/// Bought quantities (legs 1 and 3) are shown with 6 decimals, currency amounts with 2.
pub struct CycleReport<'a>(&'a CycleResult);

impl Display for CycleReport<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.0;
        let CycleAssets {
            base,
            bridge,
            cross,
            alt,
        } = &r.assets;
        let [bridge_bought, cross_received, alt_bought, base_received] = r.amounts;

        writeln!(f, "Starting Capital ({base}): {:.2}", r.starting_capital)?;
        writeln!(
            f,
            "{bridge} bought at best ask price: {bridge_bought:.6} {bridge}"
        )?;
        writeln!(
            f,
            "{cross} received after selling {bridge} at best bid price: {cross_received:.2} {cross}"
        )?;
        writeln!(
            f,
            "{alt} bought with {cross} at best ask price: {alt_bought:.6} {alt}"
        )?;
        writeln!(
            f,
            "{base} received after selling {alt} at best bid price: {base_received:.2} {base}"
        )?;
        writeln!(f, "Trading Fee: {:.2}", r.fee_total)?;
        writeln!(f, "Profit/Loss: {:.2} {base}", r.profit_or_loss)?;

        let verdict = if r.is_profitable { "PROFIT" } else { "LOSS" };
        write!(
            f,
            "Arbitrage compute result = {verdict}: {:.2} {base}",
            r.profit_or_loss
        )
    }
}
