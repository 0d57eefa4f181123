use std::{collections::BTreeSet, sync::OnceLock};

use color_eyre::eyre::{self, WrapErr as _};
use quadra_core::config::Config;
use tracing::Subscriber;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{EnvFilter, Layer as _, fmt, layer::SubscriberExt as _};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// Builds a subscriber that writes to stdout and to one hourly rotated file per enabled
/// variant in `cfg.log_dir`.
///
/// A variant's file only receives events emitted inside its `poller` span. The returned guards
/// flush the file writers on drop and must be held for as long as logs should be written.
pub fn get_subscriber(
    cfg: &Config,
) -> eyre::Result<(impl Subscriber + Send + Sync, Vec<WorkerGuard>)> {
    // use RUST_LOG if set, otherwise the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cfg.log_level))
        .wrap_err("failed to parse log level")?
        .add_directive("hyper=warn".parse().expect("well-formed"))
        .add_directive("reqwest=warn".parse().expect("well-formed"));

    let variants: BTreeSet<String> = cfg
        .variants
        .iter()
        .map(|variant| variant.to_ascii_lowercase())
        .collect();

    let mut guards = Vec::with_capacity(variants.len());
    let variant_layers = variants
        .iter()
        .map(|variant| -> eyre::Result<_> {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::HOURLY)
                .filename_prefix(format!("compute-{variant}"))
                .filename_suffix("log")
                .max_log_files(cfg.log_max_files)
                .build(&cfg.log_dir)
                .wrap_err_with(|| {
                    format!("failed to open log directory {}", cfg.log_dir.display())
                })?;
            let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
            guards.push(guard);

            let variant_filter = EnvFilter::builder()
                .with_regex(false)
                .parse(format!("[poller{{variant={variant}}}]=info"))
                .wrap_err_with(|| format!("variant `{variant}` can't be used as a log filter"))?;

            Ok(fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(variant_filter)
                .boxed())
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let stdout_layer = fmt::layer().with_file(true).with_line_number(true);

    let subscriber = tracing_subscriber::Registry::default()
        .with(filter)
        .with(stdout_layer)
        .with(variant_layers);

    Ok((subscriber, guards))
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    TELEMETRY_INIT
        .set(())
        .expect("global tracing subscriber already set");
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tracing::info;

    use super::*;

    fn log_contents(dir: &Path, variant: &str) -> String {
        let prefix = format!("compute-{variant}.");
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix))
            })
            .map(|path| fs::read_to_string(path).unwrap())
            .collect()
    }

    #[test]
    fn each_variant_logs_to_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            variants: vec!["ADA-1000".to_string(), "wif-100".to_string()],
            log_level: "info".to_string(),
            log_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let (subscriber, guards) = get_subscriber(&cfg).unwrap();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!("poller", variant = %"ada-1000").in_scope(|| {
                info!("ada cycle evaluated");
            });
            tracing::info_span!("poller", variant = %"wif-100").in_scope(|| {
                info!("wif cycle evaluated");
            });
            info!("service started");
        });
        // flushes the non-blocking writers
        drop(guards);

        let ada = log_contents(dir.path(), "ada-1000");
        assert!(ada.contains("ada cycle evaluated"));
        assert!(!ada.contains("wif cycle evaluated"));
        assert!(!ada.contains("service started"));

        let wif = log_contents(dir.path(), "wif-100");
        assert!(wif.contains("wif cycle evaluated"));
        assert!(!wif.contains("ada cycle evaluated"));
    }
}
