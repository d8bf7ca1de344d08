//! Per-run execution context.

use crate::cancellation::CancellationToken;
use crate::config::StudioConfig;
use crate::core::{StageEvent, StageId};
use crate::errors::{ProviderError, StudioError};
use crate::events::{EventSink, NoOpEventSink};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Everything a runner needs besides its inputs.
///
/// Callers build one with [`RunContext::new`] and the `with_*` methods; the
/// [`StageDriver`](super::StageDriver) stamps the run id and its event sink
/// onto a copy before handing it to the runner.
#[derive(Clone)]
pub struct RunContext {
    /// Id of the current run.
    pub run_id: Uuid,
    /// Cooperative cancellation.
    pub cancel: Arc<CancellationToken>,
    /// Fixed pause between items of a batch stage.
    pub item_delay: Duration,
    /// Where runners report per-item progress.
    pub events: Arc<dyn EventSink>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Creates a context with a fresh token and no item delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::nil(),
            cancel: Arc::new(CancellationToken::new()),
            item_delay: Duration::ZERO,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Creates a context paced by `config.item_delay_ms`.
    #[must_use]
    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new().with_item_delay(config.item_delay())
    }

    /// Shares an existing cancellation token.
    #[must_use]
    pub fn with_cancel(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets the pause between batch items.
    #[must_use]
    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub(crate) fn for_run(&self, run_id: Uuid, events: Arc<dyn EventSink>) -> Self {
        Self {
            run_id,
            cancel: Arc::clone(&self.cancel),
            item_delay: self.item_delay,
            events,
        }
    }

    /// Fails with [`StudioError::Cancelled`] if cancellation was requested.
    pub fn check_cancelled(&self) -> Result<(), StudioError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled_error());
        }
        Ok(())
    }

    /// Awaits a provider call, abandoning it if the run is cancelled first.
    pub async fn guard<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, StudioError> {
        tokio::select! {
            biased;
            result = call => result.map_err(StudioError::from),
            () = self.cancel.cancelled() => Err(self.cancelled_error()),
        }
    }

    /// Sleeps for the item delay, waking early on cancellation.
    pub async fn pause_between_items(&self) -> Result<(), StudioError> {
        if !self.item_delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(self.item_delay) => {}
                () = self.cancel.cancelled() => {}
            }
        }
        self.check_cancelled()
    }

    /// Reports that item `index` of `total` is done.
    pub async fn item_generated(&self, stage: StageId, index: usize, total: usize) {
        self.events
            .emit(StageEvent::item_generated(stage, index, total))
            .await;
    }

    fn cancelled_error(&self) -> StudioError {
        StudioError::Cancelled(
            self.cancel
                .reason()
                .unwrap_or_else(|| "cancelled".to_string()),
        )
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("run_id", &self.run_id)
            .field("cancel", &self.cancel)
            .field("item_delay", &self.item_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_passes_result_through() {
        let ctx = RunContext::new();
        let value = ctx.guard(async { Ok::<_, ProviderError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_guard_abandons_on_cancel() {
        let ctx = RunContext::new();
        ctx.cancel.cancel("user stopped");

        let err = ctx
            .guard(std::future::pending::<Result<(), ProviderError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Cancelled(ref r) if r == "user stopped"));
    }

    #[tokio::test]
    async fn test_pause_wakes_on_cancel() {
        let ctx = RunContext::new().with_item_delay(Duration::from_secs(3600));
        let token = Arc::clone(&ctx.cancel);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel("stop");
        });

        let result = tokio::time::timeout(Duration::from_secs(5), ctx.pause_between_items()).await;
        assert!(matches!(result, Ok(Err(StudioError::Cancelled(_)))));
    }
}
