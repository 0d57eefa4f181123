use std::{
    fs::{self, OpenOptions},
    io::Write as _,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use color_eyre::eyre::{self, WrapErr as _};
use tracing::info;

use crate::result::CycleResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The result was only logged.
    Logged,
    /// The result was logged and appended to the record file at this path.
    Persisted(PathBuf),
}

/// Receives every evaluated cycle.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait ResultSink: Send + Sync {
    fn record(&mut self, result: &CycleResult) -> eyre::Result<RecordOutcome>;
}

/// Logs every result and appends profitable ones to an hourly CSV file.
#[derive(Debug, Clone)]
pub struct RecordFileSink {
    records_dir: PathBuf,
}

impl RecordFileSink {
    pub fn new(records_dir: impl Into<PathBuf>) -> Self {
        Self {
            records_dir: records_dir.into(),
        }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// `profit-<variant>-<ddmmYYYYHH>.csv`, one file per variant and hour.
    pub fn record_file_name(result: &CycleResult, at: DateTime<Utc>) -> String {
        format!("profit-{}-{}.csv", result.variant, at.format("%d%m%Y%H"))
    }

    fn append(&self, result: &CycleResult) -> eyre::Result<PathBuf> {
        fs::create_dir_all(&self.records_dir).wrap_err_with(|| {
            format!(
                "failed to create records directory {}",
                self.records_dir.display()
            )
        })?;

        let path = self
            .records_dir
            .join(Self::record_file_name(result, result.timestamp));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .wrap_err_with(|| format!("failed to open record file {}", path.display()))?;
        writeln!(file, "{}", result.record_row())
            .wrap_err_with(|| format!("failed to append to record file {}", path.display()))?;

        Ok(path)
    }
}

impl ResultSink for RecordFileSink {
    fn record(&mut self, result: &CycleResult) -> eyre::Result<RecordOutcome> {
        info!(
            variant = %result.variant,
            profitable = result.is_profitable,
            "\n{}",
            result.report()
        );

        if !result.is_profitable {
            return Ok(RecordOutcome::Logged);
        }

        let path = self.append(result)?;
        info!(variant = %result.variant, path = %path.display(), "Profit logged to file");

        Ok(RecordOutcome::Persisted(path))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;

    use super::*;
    use crate::cycle::CycleAssets;

    fn result(alt: &str, capital: f64, profit_or_loss: f64, hour: u32) -> CycleResult {
        CycleResult {
            timestamp: Utc.with_ymd_and_hms(2024, 11, 3, hour, 30, 0).unwrap(),
            variant: format!("{}-{capital}", alt.to_ascii_lowercase()),
            assets: CycleAssets::via_eth_brl(alt),
            starting_capital: capital,
            amounts: [0.05, 500.0, 100.0, 110.0],
            fee_total: 0.88,
            profit_or_loss,
            is_profitable: profit_or_loss > 0.0,
        }
    }

    #[test]
    fn file_name_encodes_variant_and_hour() {
        let r = result("WIF", 100.0, 9.12, 14);
        assert_eq!(
            RecordFileSink::record_file_name(&r, r.timestamp),
            "profit-wif-100-0311202414.csv"
        );
    }

    #[test]
    fn variants_sharing_alt_and_capital_get_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordFileSink::new(dir.path());

        let builtin = result("ADA", 1000.0, 93.72, 14);
        let mut cheap = result("ADA", 1000.0, 100.0, 14);
        cheap.variant = "ada-cheap".to_string();
        cheap.fee_total = 0.0;

        let builtin_outcome = sink.record(&builtin).unwrap();
        let cheap_outcome = sink.record(&cheap).unwrap();

        assert_eq!(
            builtin_outcome,
            RecordOutcome::Persisted(dir.path().join("profit-ada-1000-0311202414.csv"))
        );
        assert_eq!(
            cheap_outcome,
            RecordOutcome::Persisted(dir.path().join("profit-ada-cheap-0311202414.csv"))
        );

        let cheap_rows = fs::read_to_string(dir.path().join("profit-ada-cheap-0311202414.csv"))
            .unwrap();
        assert_eq!(cheap_rows.lines().count(), 1);
        assert!(cheap_rows.ends_with(",100\n"));
    }

    #[test]
    fn losses_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordFileSink::new(dir.path().join("compute"));

        let outcome = sink.record(&result("ADA", 1000.0, -110.31, 14)).unwrap();

        assert_eq!(outcome, RecordOutcome::Logged);
        assert!(!sink.records_dir().exists());
    }

    #[test]
    fn profits_are_appended_to_the_hourly_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = RecordFileSink::new(dir.path().join("compute"));

        let first = sink.record(&result("WIF", 100.0, 9.12, 14)).unwrap();
        let second = sink.record(&result("WIF", 100.0, 1.5, 14)).unwrap();
        let next_hour = sink.record(&result("WIF", 100.0, 2.0, 15)).unwrap();

        let expected = dir.path().join("compute").join("profit-wif-100-0311202414.csv");
        assert_eq!(first, RecordOutcome::Persisted(expected.clone()));
        assert_eq!(second, RecordOutcome::Persisted(expected.clone()));
        assert_ne!(next_hour, first);

        let contents = fs::read_to_string(expected).unwrap();
        assert_eq!(
            contents,
            "2024-11-03 14:30:00,0.05,500,100,110,9.12\n\
             2024-11-03 14:30:00,0.05,500,100,110,1.5\n"
        );
    }
}
