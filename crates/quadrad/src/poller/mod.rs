//! Per-variant worker that polls quotes on a fixed interval and evaluates the cycle.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll, ready},
    time::Duration,
};

use chrono::Utc;
use color_eyre::eyre::{self, WrapErr as _};
use futures::{Future, FutureExt as _};
use quadra_core::{
    cycle::LEG_COUNT,
    error::{EvaluationError, QuoteUnavailable},
    evaluator::ArbitrageEvaluator,
    quote::Quote,
    sink::{RecordOutcome, ResultSink},
    source::QuoteSource,
};
use tokio::{select, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

pub use builder::Builder;
mod builder;

pub struct Handle {
    variant: String,
    shutdown_token: CancellationToken,
    worker_handle: Option<tokio::task::JoinHandle<eyre::Result<()>>>,
}

impl Handle {
    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Cancels the worker and waits up to `timeout` for it to exit before aborting it.
    pub async fn shutdown(&mut self, timeout: Duration) -> eyre::Result<()> {
        self.shutdown_token.cancel();

        // already completed and reaped through the `Future` impl
        let Some(mut task) = self.worker_handle.take() else {
            return Ok(());
        };

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(res) => flatten_worker_result(&self.variant, res),
            Err(_) => {
                task.abort();
                Err(eyre::eyre!(
                    "poller for `{}` did not stop within {}, aborted",
                    self.variant,
                    humantime::format_duration(timeout)
                ))
            }
        }
    }
}

// Awaiting the handle resolves when the worker exits on its own
impl Future for Handle {
    type Output = eyre::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let task = self
            .worker_handle
            .as_mut()
            .expect("poller handle must not be polled after completion");

        let res = ready!(task.poll_unpin(cx));
        self.worker_handle = None;

        Poll::Ready(flatten_worker_result(&self.variant, res))
    }
}

fn flatten_worker_result(
    variant: &str,
    res: Result<eyre::Result<()>, tokio::task::JoinError>,
) -> eyre::Result<()> {
    match res {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e).wrap_err_with(|| format!("poller for `{variant}` returned with err")),
        Err(e) => Err(e).wrap_err_with(|| format!("poller for `{variant}` panicked")),
    }
}

/// What happened in a single polling cycle.
#[derive(Debug)]
pub(crate) enum CycleOutcome {
    QuotesUnavailable(QuoteUnavailable),
    Invalid(EvaluationError),
    Recorded(RecordOutcome),
    SinkFailed(eyre::Report),
}

struct Worker {
    evaluator: ArbitrageEvaluator,
    source: Arc<dyn QuoteSource>,
    sink: Box<dyn ResultSink>,
    poll_interval: Duration,
    shutdown_token: CancellationToken,
}

impl Worker {
    #[instrument(name = "poller", skip_all, fields(variant = %self.evaluator.config().variant))]
    async fn run(mut self) -> eyre::Result<()> {
        info!(
            cycle = %self.evaluator.config(),
            interval = %humantime::format_duration(self.poll_interval),
            "Starting poller"
        );

        let mut timer = tokio::time::interval(self.poll_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;

                () = self.shutdown_token.cancelled() => {
                    info!("Poller received shutdown signal");
                    break Ok(());
                }

                _ = timer.tick() => {
                    let outcome = self.poll_once().await?;
                    debug!(?outcome, "=============== END ===============");
                }
            }
        }
    }

    /// Fetches the four legs, evaluates them and hands the result to the sink.
    ///
    /// Only a panicking quote fetch is returned as an error; everything else is a skipped or
    /// recorded cycle.
    async fn poll_once(&mut self) -> eyre::Result<CycleOutcome> {
        let fetch = fetch_quotes(
            Arc::clone(&self.source),
            self.evaluator.config().legs.clone(),
        );
        let quotes = match fetch.await? {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!(error = %e, "Skipping cycle, quote unavailable");
                return Ok(CycleOutcome::QuotesUnavailable(e));
            }
        };

        for quote in &quotes {
            info!(%quote, "Fetched best prices");
        }

        let result = match self.evaluator.evaluate(&quotes, Utc::now()) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Skipping cycle, invalid quote");
                return Ok(CycleOutcome::Invalid(e));
            }
        };

        match self.sink.record(&result) {
            Ok(outcome) => Ok(CycleOutcome::Recorded(outcome)),
            Err(e) => {
                error!(error = ?e, %result, "Failed to record cycle result");
                Ok(CycleOutcome::SinkFailed(e))
            }
        }
    }

}

/// Runs the blocking fetch off the runtime. Owns its inputs so the worker is not borrowed
/// across the await.
async fn fetch_quotes(
    source: Arc<dyn QuoteSource>,
    legs: [String; LEG_COUNT],
) -> eyre::Result<Result<[Quote; LEG_COUNT], QuoteUnavailable>> {
    tokio::task::spawn_blocking(move || fetch_legs(source.as_ref(), &legs))
        .await
        .wrap_err("quote fetch task panicked")
}

/// Fetches every leg in order, stopping at the first unavailable quote.
fn fetch_legs(
    source: &dyn QuoteSource,
    legs: &[String; LEG_COUNT],
) -> Result<[Quote; LEG_COUNT], QuoteUnavailable> {
    let [leg1, leg2, leg3, leg4] = legs;
    Ok([
        source.best_prices(leg1)?,
        source.best_prices(leg2)?,
        source.best_prices(leg3)?,
        source.best_prices(leg4)?,
    ])
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mockall::predicate::eq;
    use quadra_core::{
        cycle::build_config,
        error::InvalidQuoteReason,
        sink::MockResultSink,
        source::MockQuoteSource,
    };
    use tokio::sync::mpsc;

    use super::*;

    const WIF_PROFIT: [(&str, f64, f64); 4] = [
        ("ETHUSDT", 2000.0, 2000.0),
        ("ETHBRL", 10_000.0, 10_000.0),
        ("WIFBRL", 5.0, 5.0),
        ("WIFUSDT", 1.1, 1.1),
    ];

    fn source_with(prices: [(&'static str, f64, f64); 4]) -> MockQuoteSource {
        let mut source = MockQuoteSource::new();
        for (symbol, bid, ask) in prices {
            source
                .expect_best_prices()
                .with(eq(symbol))
                .returning(move |_| Ok(Quote::new(symbol, bid, ask)));
        }
        source
    }

    fn worker(source: MockQuoteSource, sink: MockResultSink) -> Worker {
        Worker {
            evaluator: ArbitrageEvaluator::new(build_config("wif-100").unwrap()),
            source: Arc::new(source),
            sink: Box::new(sink),
            poll_interval: Duration::from_secs(15),
            shutdown_token: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn profitable_cycle_reaches_the_sink() {
        let mut sink = MockResultSink::new();
        sink.expect_record()
            .withf(|result| result.is_profitable && result.variant == "wif-100")
            .times(1)
            .returning(|_| Ok(RecordOutcome::Persisted(PathBuf::from("profit.csv"))));

        let mut worker = worker(source_with(WIF_PROFIT), sink);

        let outcome = worker.poll_once().await.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Recorded(RecordOutcome::Persisted(_))
        ));
    }

    #[tokio::test]
    async fn unavailable_quote_skips_the_cycle() {
        let mut source = MockQuoteSource::new();
        source
            .expect_best_prices()
            .with(eq("ETHUSDT"))
            .times(1)
            .returning(|symbol| Ok(Quote::new(symbol, 2000.0, 2001.0)));
        source
            .expect_best_prices()
            .with(eq("ETHBRL"))
            .times(1)
            .returning(|symbol| {
                Err(QuoteUnavailable {
                    symbol: symbol.to_string(),
                    reason: "connection reset".to_string(),
                })
            });
        // no expectation for the later legs: fetching them would panic the mock

        let mut sink = MockResultSink::new();
        sink.expect_record().times(0);

        let mut worker = worker(source, sink);

        let outcome = worker.poll_once().await.unwrap();
        match outcome {
            CycleOutcome::QuotesUnavailable(e) => assert_eq!(e.symbol, "ETHBRL"),
            other => panic!("expected unavailable quote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_quote_skips_the_cycle() {
        let mut prices = WIF_PROFIT;
        prices[2].2 = 0.0;

        let mut sink = MockResultSink::new();
        sink.expect_record().times(0);

        let mut worker = worker(source_with(prices), sink);

        let outcome = worker.poll_once().await.unwrap();
        match outcome {
            CycleOutcome::Invalid(EvaluationError::InvalidQuote(e)) => {
                assert_eq!(e.symbol, "WIFBRL");
                assert!(matches!(e.reason, InvalidQuoteReason::NonPositive(_)));
            }
            other => panic!("expected invalid quote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sink_failure_does_not_stop_the_worker() {
        let mut sink = MockResultSink::new();
        sink.expect_record()
            .times(2)
            .returning(|_| Err(eyre::eyre!("disk full")));

        let mut worker = worker(source_with(WIF_PROFIT), sink);

        assert!(matches!(
            worker.poll_once().await.unwrap(),
            CycleOutcome::SinkFailed(_)
        ));
        assert!(matches!(
            worker.poll_once().await.unwrap(),
            CycleOutcome::SinkFailed(_)
        ));
    }

    #[tokio::test]
    async fn handle_shuts_down_a_running_worker() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut sink = MockResultSink::new();
        sink.expect_record().returning(move |result| {
            tx.send(result.profit_or_loss).unwrap();
            Ok(RecordOutcome::Logged)
        });

        let mut handle = Builder {
            evaluator: ArbitrageEvaluator::new(build_config("wif-100").unwrap()),
            source: Arc::new(source_with(WIF_PROFIT)),
            sink: Box::new(sink),
            poll_interval: Duration::from_secs(15),
            shutdown_token: CancellationToken::new(),
        }
        .build()
        .unwrap();
        assert_eq!(handle.variant(), "wif-100");

        // first tick fires immediately
        let profit_or_loss = rx.recv().await.unwrap();
        assert!((profit_or_loss - 9.12).abs() < 1e-9);

        handle.shutdown(Duration::from_secs(5)).await.unwrap();
        // a second shutdown is a no-op
        handle.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn next_evaluation_waits_for_the_poll_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut sink = MockResultSink::new();
        sink.expect_record().returning(move |result| {
            tx.send(result.variant.clone()).unwrap();
            Ok(RecordOutcome::Logged)
        });

        let poll_interval = Duration::from_secs(15);
        let mut handle = Builder {
            evaluator: ArbitrageEvaluator::new(build_config("wif-100").unwrap()),
            source: Arc::new(source_with(WIF_PROFIT)),
            sink: Box::new(sink),
            poll_interval,
            shutdown_token: CancellationToken::new(),
        }
        .build()
        .unwrap();

        // first tick fires immediately
        assert_eq!(rx.recv().await.unwrap(), "wif-100");

        tokio::time::advance(poll_interval - Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err(), "evaluated before the interval elapsed");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(rx.recv().await.unwrap(), "wif-100");
        assert!(rx.try_recv().is_err(), "evaluated twice on one tick");

        handle.shutdown(Duration::from_secs(5)).await.unwrap();
    }

    #[test]
    fn worker_loop_is_spawnable() {
        fn assert_send<T: Send + 'static>(_: T) {}

        let worker = worker(MockQuoteSource::new(), MockResultSink::new());
        assert_send(worker.run());
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let err = Builder {
            evaluator: ArbitrageEvaluator::new(build_config("ada-1000").unwrap()),
            source: Arc::new(MockQuoteSource::new()),
            sink: Box::new(MockResultSink::new()),
            poll_interval: Duration::ZERO,
            shutdown_token: CancellationToken::new(),
        }
        .build()
        .err()
        .expect("zero interval must fail");

        assert!(err.to_string().contains("non-zero"));
    }
}
