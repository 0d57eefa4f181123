use std::{sync::Arc, time::Duration};

use color_eyre::eyre::{self, WrapErr as _};
use futures::future::select_all;
use quadra_core::{
    config::Config, evaluator::ArbitrageEvaluator, sink::RecordFileSink, source::QuoteSource,
};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::poller;

pub(super) struct Quadra {
    shutdown_token: CancellationToken,
    poller_handles: Vec<poller::Handle>,
}

impl Quadra {
    pub(super) fn new(
        cfg: Config,
        source: Arc<dyn QuoteSource>,
        shutdown_token: CancellationToken,
    ) -> eyre::Result<Self> {
        if cfg.variants.is_empty() {
            eyre::bail!("no cycle variants configured");
        }

        let catalog = cfg.catalog().wrap_err("failed to build cycle catalog")?;
        info!(
            known = ?catalog.variants().collect::<Vec<_>>(),
            enabled = ?cfg.variants,
            "🔁 Loaded cycle variants"
        );

        let poller_handles = cfg
            .variants
            .iter()
            .map(|variant| {
                let cycle = catalog.get(variant)?;
                info!(%cycle, legs = ?cycle.legs, fee = cycle.fee_total(), "Initialized cycle");

                poller::Builder {
                    evaluator: ArbitrageEvaluator::new(cycle),
                    source: Arc::clone(&source),
                    sink: Box::new(RecordFileSink::new(cfg.records_dir.clone())),
                    poll_interval: cfg.poll_interval(),
                    shutdown_token: shutdown_token.child_token(),
                }
                .build()
                .wrap_err_with(|| format!("failed to start poller for `{variant}`"))
            })
            .collect::<eyre::Result<Vec<poller::Handle>>>()?;

        Ok(Self {
            shutdown_token,
            poller_handles,
        })
    }

    pub(super) async fn run(mut self) -> eyre::Result<()> {
        let reason: eyre::Result<&'static str> = select! {
            biased;

            () = self.shutdown_token.cancelled() => Ok("received shutdown signal"),

            // pollers only stop on their own when something went wrong
            (res, _, _) = select_all(self.poller_handles.iter_mut()) => match res {
                Ok(()) => Ok("poller exited"),
                Err(e) => Err(e),
            },
        };

        self.shutdown(&reason).await;
        reason.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn shutdown(mut self, reason: &eyre::Result<&'static str>) {
        const WAIT_BEFORE_ABORT: Duration = Duration::from_secs(25);

        // trigger the shutdown token in case it wasn't triggered yet
        self.shutdown_token.cancel();

        let message = format!(
            "waiting {} for all pollers to shutdown before aborting",
            humantime::format_duration(WAIT_BEFORE_ABORT)
        );
        match reason {
            Ok(reason) => info!(%reason, message),
            Err(reason) => error!(%reason, message),
        };

        for handle in &mut self.poller_handles {
            if let Err(e) = handle.shutdown(WAIT_BEFORE_ABORT).await {
                error!(variant = %handle.variant(), error = %e, "Failed to shutdown poller");
            }
        }
    }
}
