//! Lifecycle listener.
//!
//! Receives entity lifecycle events from the persistence layer and drives the
//! incremental paths of the [`Populator`]. A `Flushed` event closes the current
//! unit of work.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use crate::errors::IndexError;
use crate::output::ProgressSink;
use crate::populator::{IndexOutcome, PopulateSummary, Populator};
use crate::source::Entity;

/// Default capacity of the event channel.
pub const DEFAULT_CHANNEL_BUFFER: usize = 1000;

/// An entity lifecycle event.
#[derive(Clone)]
pub enum LifecycleEvent {
    Persisted(Arc<dyn Entity>),
    Updated(Arc<dyn Entity>),
    Removed(Arc<dyn Entity>),
    /// The persistence layer finished a flush cycle.
    Flushed,
}

impl LifecycleEvent {
    fn kind(&self) -> &'static str {
        match self {
            Self::Persisted(_) => "persisted",
            Self::Updated(_) => "updated",
            Self::Removed(_) => "removed",
            Self::Flushed => "flushed",
        }
    }
}

impl fmt::Debug for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Create an event channel with the default capacity.
pub fn channel() -> (mpsc::Sender<LifecycleEvent>, mpsc::Receiver<LifecycleEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Forwards lifecycle events to a [`Populator`].
///
/// While disabled, events are dropped. A full reindex run through
/// [`EntityListener::populate`] disables the listener for its duration.
pub struct EntityListener {
    populator: Arc<Populator>,
    enabled: AtomicBool,
    events_handled: AtomicU64,
    events_dropped: AtomicU64,
}

impl EntityListener {
    /// Create an enabled listener.
    pub fn new(populator: Arc<Populator>) -> Self {
        Self {
            populator,
            enabled: AtomicBool::new(true),
            events_handled: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        debug!(enabled, "Entity listener toggled");
    }

    pub fn events_handled(&self) -> u64 {
        self.events_handled.load(Ordering::Relaxed)
    }

    pub fn events_dropped(&self) -> u64 {
        self.events_dropped.load(Ordering::Relaxed)
    }

    /// Handle one event.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - If the listener is disabled or the event closed a unit of work
    /// * `Ok(Some(IndexOutcome))` - What the populator did with the entity
    pub async fn handle(&self, event: LifecycleEvent) -> Result<Option<IndexOutcome>, IndexError> {
        if !self.is_enabled() {
            self.events_dropped.fetch_add(1, Ordering::Relaxed);
            debug!(event = ?event, "Listener disabled, dropping event");
            return Ok(None);
        }

        let outcome = match event {
            LifecycleEvent::Persisted(entity) | LifecycleEvent::Updated(entity) => {
                Some(self.populator.index(&*entity).await?)
            }
            LifecycleEvent::Removed(entity) => Some(self.populator.remove(&*entity).await?),
            LifecycleEvent::Flushed => {
                self.populator.end_unit_of_work().await;
                None
            }
        };
        self.events_handled.fetch_add(1, Ordering::Relaxed);
        Ok(outcome)
    }

    /// Consume events until every sender is dropped.
    ///
    /// Stops at the first failing event and returns its error.
    #[instrument(skip(self, events))]
    pub async fn run(&self, mut events: mpsc::Receiver<LifecycleEvent>) -> Result<(), IndexError> {
        info!("Entity listener started");

        while let Some(event) = events.recv().await {
            let kind = event.kind();
            if let Err(e) = self.handle(event).await {
                error!(error = %e, event = kind, "Failed to handle lifecycle event");
                return Err(e);
            }
        }

        info!(
            events_handled = self.events_handled(),
            events_dropped = self.events_dropped(),
            "Entity listener stopped"
        );
        Ok(())
    }

    /// Run a full reindex with the listener disabled, restoring its previous state after.
    pub async fn populate(
        &self,
        output: &dyn ProgressSink,
        scope: Option<&str>,
    ) -> Result<PopulateSummary, IndexError> {
        let was_enabled = self.enabled.swap(false, Ordering::SeqCst);
        let result = self.populator.populate(output, scope).await;
        self.enabled.store(was_enabled, Ordering::SeqCst);
        result
    }
}
