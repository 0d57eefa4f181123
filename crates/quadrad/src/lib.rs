use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use color_eyre::eyre::{self, Context as _};
use quadra_core::{config::Config, source::QuoteSource};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

mod poller;
mod quadra;
pub mod telemetry;

/// The [`Quadra`] service returned by [`Quadra::spawn`].
pub struct Quadra {
    shutdown_token: CancellationToken,
    task: Option<JoinHandle<eyre::Result<()>>>,
}

impl Quadra {
    /// Spawns one poller per configured cycle variant, all reading from `source`.
    ///
    /// # Errors
    /// Returns an error if a configured variant is unknown or invalid.
    pub fn spawn(cfg: Config, source: Arc<dyn QuoteSource>) -> eyre::Result<Self> {
        let shutdown_token = CancellationToken::new();
        let inner = quadra::Quadra::new(cfg, source, shutdown_token.child_token())?;
        let task = tokio::spawn(inner.run());

        Ok(Self {
            shutdown_token,
            task: Some(task),
        })
    }

    /// Shuts down Quadra, in turn waiting for its pollers to shut down.
    ///
    /// # Errors
    /// Returns an error if an error occured during shutdown.
    ///
    /// # Panics
    /// Panics if called twice
    pub async fn shutdown(mut self) -> eyre::Result<()> {
        self.shutdown_token.cancel();
        flatten_join_result(
            self.task
                .take()
                .expect("shutdown must only be called once")
                .await,
        )
    }
}

impl Future for Quadra {
    type Output = eyre::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        use futures::future::FutureExt as _;

        let task = self
            .task
            .as_mut()
            .expect("quadra must not be polled after completion");
        task.poll_unpin(cx).map(flatten_join_result)
    }
}

fn flatten_join_result<T>(res: Result<eyre::Result<T>, JoinError>) -> eyre::Result<T> {
    match res {
        Ok(Ok(res)) => Ok(res),
        Ok(Err(e)) => Err(e).wrap_err("task returned with error"),
        Err(e) => Err(e).wrap_err("task panicked"),
    }
}
