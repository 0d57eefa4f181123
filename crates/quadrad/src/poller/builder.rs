use std::{sync::Arc, time::Duration};

use color_eyre::eyre;
use quadra_core::{evaluator::ArbitrageEvaluator, sink::ResultSink, source::QuoteSource};
use tokio_util::sync::CancellationToken;

use super::{Handle, Worker};

pub struct Builder {
    pub evaluator: ArbitrageEvaluator,
    pub source: Arc<dyn QuoteSource>,
    pub sink: Box<dyn ResultSink>,
    pub poll_interval: Duration,
    pub shutdown_token: CancellationToken,
}

impl Builder {
    pub fn build(self) -> eyre::Result<Handle> {
        let Self {
            evaluator,
            source,
            sink,
            poll_interval,
            shutdown_token,
        } = self;

        if poll_interval.is_zero() {
            eyre::bail!("poll interval must be non-zero");
        }

        let variant = evaluator.config().variant.clone();

        let worker = Worker {
            evaluator,
            source,
            sink,
            poll_interval,
            shutdown_token: shutdown_token.clone(),
        };

        let worker_handle = tokio::task::spawn(async move { worker.run().await });

        Ok(Handle {
            variant,
            shutdown_token,
            worker_handle: Some(worker_handle),
        })
    }
}
