//! Conversion Tracker
//!
//! Polls the status of one submitted conversion on a fixed interval until
//! it reaches a terminal status, runs out of retries or is cancelled.
//!
//! Each tracking session runs as its own task and owns its
//! [`ConversionRecord`]; observers read it through the [`TrackingHandle`]
//! and, optionally, a shared sink cell.
//!
//! Guarantees:
//! - the first poll is issued immediately, later ones every `poll_interval`
//! - responses that would move the record backwards are discarded
//! - a terminal status freezes the record and stops polling
//! - after `cancel()` returns, the record and the sink are never written again
//! - `max_poll_retries` consecutive transport failures end tracking with
//!   [`EtcherError::Tracking`]; the record is kept as last seen

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use etcher_core::effects::EtcherService;
use etcher_core::{
    BlockIndex, ConversionRecord, Dynamic, EtcherError, Identity, Result, SchemaAdapter,
    StatusTransition, Subscription, TrackerConfig,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

/// How a tracking session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingOutcome {
    /// A terminal status was reached
    Settled(ConversionRecord),
    /// Stopped by `cancel()`
    Cancelled(ConversionRecord),
    /// Retry budget exhausted
    Failed {
        /// Record as last seen
        record: ConversionRecord,
        /// Always [`EtcherError::Tracking`]
        error: EtcherError,
    },
}

impl TrackingOutcome {
    /// Record at the end of tracking.
    pub fn record(&self) -> &ConversionRecord {
        match self {
            Self::Settled(record) | Self::Cancelled(record) => record,
            Self::Failed { record, .. } => record,
        }
    }
}

struct TrackingShared {
    record: Dynamic<ConversionRecord>,
    sink: Option<Dynamic<Option<ConversionRecord>>>,
    /// Held while publishing so `cancel` cannot interleave with a write.
    cancelled: Mutex<bool>,
    cancel_tx: watch::Sender<bool>,
    polls: AtomicU32,
}

impl TrackingShared {
    /// Publish unless cancelled; returns whether the write happened.
    fn publish(&self, record: &ConversionRecord) -> bool {
        let cancelled = self.cancelled.lock();
        if *cancelled {
            return false;
        }
        self.record.set(record.clone());
        if let Some(sink) = &self.sink {
            sink.set(Some(record.clone()));
        }
        true
    }

    fn cancel(&self) {
        *self.cancelled.lock() = true;
        let _ = self.cancel_tx.send(true);
    }
}

/// Handle to one tracking session. Clones observe the same session.
#[derive(Clone)]
pub struct TrackingHandle {
    id: Uuid,
    block_index: BlockIndex,
    shared: Arc<TrackingShared>,
    outcome: watch::Receiver<Option<TrackingOutcome>>,
}

impl std::fmt::Debug for TrackingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingHandle")
            .field("id", &self.id)
            .field("block_index", &self.block_index)
            .field("status", &self.shared.record.get().status)
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl TrackingHandle {
    /// Unique id of this tracking session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Conversion being tracked.
    pub fn block_index(&self) -> BlockIndex {
        self.block_index
    }

    /// Record as last published.
    pub fn record(&self) -> ConversionRecord {
        self.shared.record.get()
    }

    /// Subscribe to record updates.
    pub fn subscribe(&self) -> Subscription<ConversionRecord> {
        self.shared.record.subscribe()
    }

    /// Polls issued so far, failed ones included.
    pub fn polls(&self) -> u32 {
        self.shared.polls.load(Ordering::Acquire)
    }

    /// Stop tracking. No record update is published after this returns.
    pub fn cancel(&self) {
        if !self.is_finished() {
            tracing::debug!(tracking_id = %self.id, block_index = self.block_index, "Cancelling tracking");
        }
        self.shared.cancel();
    }

    /// Whether the session has ended, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// Outcome, once finished.
    pub fn outcome(&self) -> Option<TrackingOutcome> {
        self.outcome.borrow().clone()
    }

    /// Wait for the session to end.
    ///
    /// `Ok` with the frozen record on a terminal status,
    /// [`EtcherError::Cancelled`] on cancellation, [`EtcherError::Tracking`]
    /// when retries ran out.
    pub async fn wait(&self) -> Result<ConversionRecord> {
        let mut outcome = self.outcome.clone();
        loop {
            let current = outcome.borrow_and_update().clone();
            match current {
                Some(TrackingOutcome::Settled(record)) => return Ok(record),
                Some(TrackingOutcome::Cancelled(_)) => return Err(EtcherError::Cancelled),
                Some(TrackingOutcome::Failed { error, .. }) => return Err(error),
                None => {}
            }
            if outcome.changed().await.is_err() {
                // Task is gone without reporting; treat as cancelled.
                return Err(EtcherError::Cancelled);
            }
        }
    }
}

/// Spawns tracking sessions.
#[derive(Clone)]
pub struct ConversionTracker {
    service: Arc<dyn EtcherService>,
    adapter: SchemaAdapter,
    config: TrackerConfig,
}

impl std::fmt::Debug for ConversionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionTracker")
            .field("generation", &self.adapter.generation())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConversionTracker {
    /// Tracker polling `service`, decoding through `adapter`.
    pub fn new(service: Arc<dyn EtcherService>, adapter: SchemaAdapter, config: TrackerConfig) -> Self {
        Self {
            service,
            adapter,
            config,
        }
    }

    /// Start tracking `block_index`. Must be called within a Tokio runtime.
    pub fn track(&self, identity: Identity, block_index: BlockIndex) -> TrackingHandle {
        self.spawn(identity, block_index, None)
    }

    /// Like [`track`](Self::track), also mirroring every record update into
    /// `sink`.
    pub fn track_into(
        &self,
        identity: Identity,
        block_index: BlockIndex,
        sink: Dynamic<Option<ConversionRecord>>,
    ) -> TrackingHandle {
        self.spawn(identity, block_index, Some(sink))
    }

    fn spawn(
        &self,
        identity: Identity,
        block_index: BlockIndex,
        sink: Option<Dynamic<Option<ConversionRecord>>>,
    ) -> TrackingHandle {
        let id = Uuid::new_v4();
        let record = ConversionRecord::new(block_index);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let shared = Arc::new(TrackingShared {
            record: Dynamic::new(record.clone()),
            sink,
            cancelled: Mutex::new(false),
            cancel_tx,
            polls: AtomicU32::new(0),
        });
        shared.publish(&record);

        let task = PollTask {
            id,
            identity,
            record,
            service: self.service.clone(),
            adapter: self.adapter.clone(),
            config: self.config.clone(),
            shared: shared.clone(),
            cancel_rx,
        };
        tracing::info!(tracking_id = %id, block_index, "Tracking conversion");
        tokio::spawn(async move {
            let outcome = task.run().await;
            let _ = outcome_tx.send(Some(outcome));
        });

        TrackingHandle {
            id,
            block_index,
            shared,
            outcome: outcome_rx,
        }
    }
}

struct PollTask {
    id: Uuid,
    identity: Identity,
    record: ConversionRecord,
    service: Arc<dyn EtcherService>,
    adapter: SchemaAdapter,
    config: TrackerConfig,
    shared: Arc<TrackingShared>,
    cancel_rx: watch::Receiver<bool>,
}

impl PollTask {
    async fn run(mut self) -> TrackingOutcome {
        let block_index = self.record.block_index;
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            if *self.cancel_rx.borrow() {
                break;
            }
            tokio::select! {
                _ = self.cancel_rx.changed() => break,
                _ = interval.tick() => {}
            }

            let result = tokio::select! {
                _ = self.cancel_rx.changed() => break,
                result = self.service.conversion_status(&self.identity, block_index) => result,
            };
            self.shared.polls.fetch_add(1, Ordering::AcqRel);

            let wire = match result {
                Ok(wire) => {
                    failures = 0;
                    wire
                }
                Err(error) => {
                    failures += 1;
                    tracing::warn!(
                        tracking_id = %self.id,
                        block_index,
                        failures,
                        %error,
                        "Status poll failed"
                    );
                    if failures > self.config.max_poll_retries {
                        tracing::error!(tracking_id = %self.id, block_index, "Tracking gave up");
                        return TrackingOutcome::Failed {
                            record: self.record,
                            error: EtcherError::Tracking {
                                block_index,
                                attempts: failures,
                                last_error: error,
                            },
                        };
                    }
                    continue;
                }
            };

            let status = self.adapter.decode_conversion_status(&wire);
            match self.record.apply(status) {
                StatusTransition::Advanced => {
                    tracing::debug!(
                        tracking_id = %self.id,
                        block_index,
                        status = %self.record.status,
                        "Conversion advanced"
                    );
                    if !self.shared.publish(&self.record) {
                        break;
                    }
                }
                StatusTransition::Unchanged => {}
                StatusTransition::Discarded => {
                    tracing::debug!(
                        tracking_id = %self.id,
                        block_index,
                        current = %self.record.status,
                        "Discarded out-of-order status"
                    );
                }
            }

            if self.record.is_terminal() {
                tracing::info!(
                    tracking_id = %self.id,
                    block_index,
                    status = %self.record.status,
                    "Conversion settled"
                );
                return TrackingOutcome::Settled(self.record);
            }
        }

        tracing::debug!(tracking_id = %self.id, block_index, "Tracking cancelled");
        // An advance that lost the race with cancel was never published.
        TrackingOutcome::Cancelled(self.shared.record.get())
    }
}
