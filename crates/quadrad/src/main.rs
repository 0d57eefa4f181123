use std::{process::ExitCode, sync::Arc};

use color_eyre::eyre::{self, eyre};
use quadra_core::{
    config::Config,
    source::{BinanceQuoteSource, QuoteSource},
};
use quadrad::{
    Quadra,
    telemetry::{self, init_subscriber},
};
use tokio::{
    select,
    signal::unix::{SignalKind, signal},
};
use tracing::{error, info, instrument, warn};

fn main() -> ExitCode {
    // set up config
    let cfg: Config = match Config::load() {
        Err(err) => {
            eprintln!("failed to read config:\n{err:?}");
            return ExitCode::FAILURE;
        }
        Ok(cfg) => cfg,
    };
    eprintln!("starting with config:\n{cfg:?}");

    // set up tracing, the guards flush the log files on exit
    let (tracing_subscriber, _log_guards) = match telemetry::get_subscriber(&cfg) {
        Err(err) => {
            eprintln!("failed to set up logging:\n{err:?}");
            return ExitCode::FAILURE;
        }
        Ok(telemetry) => telemetry,
    };
    init_subscriber(tracing_subscriber);

    // the binance client blocks, so it is created and dropped outside the runtime
    let source: Arc<dyn QuoteSource> = Arc::new(BinanceQuoteSource::new(&cfg.binance));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(%e, "failed to start tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let exit_code = runtime.block_on(run(cfg, Arc::clone(&source)));

    drop(runtime);
    drop(source);
    exit_code
}

async fn run(cfg: Config, source: Arc<dyn QuoteSource>) -> ExitCode {
    // spawn service
    let mut quadra = match Quadra::spawn(cfg, source) {
        Ok(quadra) => quadra,
        Err(e) => {
            error!(error = ?e, "failed initializing quadra");
            return ExitCode::FAILURE;
        }
    };

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting sigterm listener on unix should always work");
    let mut sigint = signal(SignalKind::interrupt())
        .expect("setting sigint listener on unix should always work");

    let exit_reason = select! {
        _ = sigterm.recv() => Ok("received SIGTERM"),
        _ = sigint.recv() => Ok("received SIGINT"),
        res = &mut quadra => {
            res.and_then(|()| Err(eyre!("quadra service exited")))
        },
    };

    shutdown(exit_reason, quadra).await
}

#[instrument(skip_all)]
async fn shutdown(reason: eyre::Result<&str>, service: Quadra) -> ExitCode {
    let exit_code = match reason {
        Ok(reason) => {
            info!(reason, "shutting down");
            if let Err(e) = service.shutdown().await {
                warn!(%e, "shutting down");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "quadra service exited unexpectedly");
            ExitCode::FAILURE
        }
    };
    info!("shutdown successful");
    exit_code
}
