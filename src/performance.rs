//! Timing for RPC round trips. Only reports when `LOG_PERF` is set.
use std::{
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
    time::{Duration, Instant},
};

use pin_project::pin_project;
use tracing::debug;

use crate::env::ENV_CONFIG;

#[pin_project]
pub struct Timed<Fut: Future> {
    #[pin]
    inner: Fut,
    label: String,
    started_at: Option<Instant>,
}

fn report(label: &str, elapsed: Duration) {
    if ENV_CONFIG.log_perf {
        debug!(label, elapsed_ms = elapsed.as_millis() as u64, "{label} took {elapsed:.2?}");
    }
}

impl<Fut: Future> Future for Timed<Fut> {
    type Output = Fut::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
        let this = self.project();
        // The clock starts on first poll, not on construction.
        let started_at = *this.started_at.get_or_insert_with(Instant::now);
        let output = ready!(this.inner.poll(cx));
        report(this.label, started_at.elapsed());
        Poll::Ready(output)
    }
}

pub trait TimedExt: Future + Sized {
    fn timed(self, label: &str) -> Timed<Self> {
        Timed {
            inner: self,
            label: label.to_string(),
            started_at: None,
        }
    }
}

impl<Fut: Future> TimedExt for Fut {}
