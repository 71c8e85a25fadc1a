//! High-level service facade binding a menu source to one configuration.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;

use crate::model::{MenuRequest, MenuSnapshot};
use crate::ports::{MenuSource, PortError};
use crate::scheduler::{PollOutcome, Scheduler};

/// Public entry point for fetching menus for a configured school.
pub struct MenuService {
    source: Arc<dyn MenuSource>,
    request: MenuRequest,
}

impl MenuService {
    /// Create a new service fetching `request` from `source`.
    #[must_use]
    pub fn new(source: Arc<dyn MenuSource>, request: MenuRequest) -> Self {
        Self { source, request }
    }

    /// The request issued on every cycle.
    #[must_use]
    pub fn request(&self) -> &MenuRequest {
        &self.request
    }

    /// Run a single fetch cycle.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] if the source fails the cycle.
    pub async fn refresh(&self) -> Result<MenuSnapshot, PortError> {
        self.source.fetch(&self.request).await
    }

    /// Poll the source with `scheduler`, one outcome per cycle.
    pub fn watch<S: Scheduler>(&self, scheduler: &S, every: Duration) -> BoxStream<'static, PollOutcome> {
        let source = Arc::clone(&self.source);
        let request = self.request.clone();

        scheduler.schedule(every, move || {
            let source = Arc::clone(&source);
            let request = request.clone();
            async move { source.fetch(&request).await }
        })
    }
}
