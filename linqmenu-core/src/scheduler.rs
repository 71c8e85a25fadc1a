//! Fixed-interval polling of a snapshot fetch.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, warn};

use crate::model::MenuSnapshot;
use crate::ports::PortError;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// A poll cycle that did not produce a snapshot.
#[error("Update failed: {0}")]
pub struct UpdateFailed(pub String);

#[derive(Debug, Clone)]
/// Result of one poll cycle.
pub enum PollOutcome {
    /// Fresh snapshot replacing the previous one.
    Snapshot(MenuSnapshot),
    /// The cycle failed; consumers keep their last good snapshot.
    Failed(UpdateFailed),
}

/// Drives a fetch function on a fixed interval.
pub trait Scheduler {
    /// Run `fetch` right away and then every `every`, yielding one outcome per cycle.
    ///
    /// A cycle only starts after the previous one finished; ticks missed while a
    /// fetch was running are delayed rather than replayed.
    fn schedule<F, Fut>(&self, every: Duration, fetch: F) -> BoxStream<'static, PollOutcome>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<MenuSnapshot, PortError>> + Send + 'static;
}

#[derive(Debug, Default, Clone, Copy)]
/// [`Scheduler`] backed by a `tokio` interval timer.
pub struct IntervalScheduler;

impl Scheduler for IntervalScheduler {
    fn schedule<F, Fut>(&self, every: Duration, fetch: F) -> BoxStream<'static, PollOutcome>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<MenuSnapshot, PortError>> + Send + 'static,
    {
        let period = every.max(MIN_INTERVAL);
        let state: (Option<Interval>, F) = (None, fetch);

        stream::unfold(state, move |(ticker, mut fetch)| async move {
            // the timer needs a runtime, so it is created on first poll
            let mut ticker = ticker.unwrap_or_else(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;

            let outcome = match fetch().await {
                Ok(snapshot) => {
                    debug!(days = snapshot.menus.len(), "poll cycle finished");
                    PollOutcome::Snapshot(snapshot)
                }
                Err(err) => {
                    warn!(error = %err, "poll cycle failed");
                    PollOutcome::Failed(UpdateFailed(err.to_string()))
                }
            };

            Some((outcome, (Some(ticker), fetch)))
        })
        .boxed()
    }
}
