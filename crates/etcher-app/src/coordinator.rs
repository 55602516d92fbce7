//! Workflow Coordinator
//!
//! Single entry point for the frontend: sign-in, deposit addresses,
//! conversion submission with tracking, and etching. Every step publishes
//! its result into [`WorkflowSignals`]; failures also publish a [`Notice`].
//!
//! Mutating operations (`submit_conversion`, `etch`) share one in-flight
//! slot. A call arriving while the slot is taken fails immediately with
//! [`EtcherError::ConcurrentOperation`]; it is never queued or retried.

use std::sync::Arc;

use etcher_core::effects::{DelegationProvider, EtcherService};
use etcher_core::{
    BlockIndex, ConversionRecord, DepositAddresses, EtcherConfig, EtcherError, EtchingRequest,
    EtchingResult, Identity, MutatingOperation, Principal, Result, SchemaAdapter,
};
use parking_lot::Mutex;

use crate::retry::QueryRetryPolicy;
use crate::session::SessionManager;
use crate::signals::{Notice, WorkflowSignals, WorkflowSnapshot};
use crate::tracker::{ConversionTracker, TrackingHandle};

/// Releases the mutating-operation slot on drop, including when the
/// operation's future is dropped mid-call.
struct OperationGuard<'a> {
    slot: &'a Mutex<Option<MutatingOperation>>,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}

/// Orchestrates the client workflow.
pub struct WorkflowCoordinator {
    config: EtcherConfig,
    adapter: SchemaAdapter,
    service: Arc<dyn EtcherService>,
    session: SessionManager,
    tracker: ConversionTracker,
    queries: QueryRetryPolicy,
    signals: WorkflowSignals,
    addresses: Mutex<Option<(Principal, DepositAddresses)>>,
    in_flight: Mutex<Option<MutatingOperation>>,
    tracking: Mutex<Option<TrackingHandle>>,
}

impl std::fmt::Debug for WorkflowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCoordinator")
            .field("generation", &self.adapter.generation())
            .field("session", &self.session)
            .field("in_flight", &*self.in_flight.lock())
            .finish_non_exhaustive()
    }
}

impl WorkflowCoordinator {
    /// Validate `config` and wire the components together.
    pub fn new(
        config: EtcherConfig,
        service: Arc<dyn EtcherService>,
        provider: Arc<dyn DelegationProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let adapter = SchemaAdapter::new(config.interface_generation);
        let session = SessionManager::new(provider, &config);
        let tracker = ConversionTracker::new(service.clone(), adapter.clone(), config.tracker.clone());
        let signals = WorkflowSignals::with_session(session.status_signal());

        tracing::info!(
            network = %config.network,
            backend = %config.backend_canister_id,
            generation = %config.interface_generation,
            "Workflow coordinator ready"
        );

        Ok(Self {
            queries: QueryRetryPolicy::from_config(&config),
            config,
            adapter,
            service,
            session,
            tracker,
            signals,
            addresses: Mutex::new(None),
            in_flight: Mutex::new(None),
            tracking: Mutex::new(None),
        })
    }

    // ─── Session ────────────────────────────────────────────────────────────

    /// Sign in; concurrent callers share one delegation flow.
    pub async fn login(&self) -> Result<Identity> {
        let result = self.session.login().await;
        self.report("login", result)
    }

    /// Sign out. Drops cached addresses and stops tracking; the last
    /// conversion record stays readable.
    pub fn logout(&self) {
        self.session.logout();
        self.addresses.lock().take();
        self.signals.deposit_addresses.set(None);
        self.cancel_tracking();
    }

    /// Identity if signed in.
    pub fn current_identity(&self) -> Option<Identity> {
        self.session.current_identity()
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// Deposit addresses of the signed-in identity, fetched once per session.
    pub async fn get_deposit_addresses(&self) -> Result<DepositAddresses> {
        let result = self.fetch_deposit_addresses().await;
        self.report("get_deposit_addresses", result)
    }

    async fn fetch_deposit_addresses(&self) -> Result<DepositAddresses> {
        let identity = self.session.require_identity()?;
        let cached = self
            .addresses
            .lock()
            .as_ref()
            .filter(|(principal, _)| principal == identity.principal())
            .map(|(_, addresses)| addresses.clone());
        if let Some(addresses) = cached {
            return Ok(addresses);
        }

        let (native, ledger_asset) = futures::try_join!(
            self.queries.run("native_deposit_address", || {
                self.service.native_deposit_address(&identity)
            }),
            self.queries.run("ledger_deposit_address", || {
                self.service.ledger_deposit_address(&identity)
            }),
        )?;
        let addresses = DepositAddresses {
            native,
            ledger_asset,
        };

        // A logout during the fetch leaves nothing to cache for.
        if !self
            .session
            .current_identity()
            .is_some_and(|current| current.same_session(&identity))
        {
            return Err(EtcherError::NotAuthenticated);
        }
        *self.addresses.lock() = Some((identity.principal().clone(), addresses.clone()));
        self.signals.deposit_addresses.set(Some(addresses.clone()));
        tracing::info!(principal = %identity.principal(), "Deposit addresses loaded");
        Ok(addresses)
    }

    /// Native currency balance, in the smallest unit.
    pub async fn native_balance(&self) -> Result<u64> {
        let result = self.query_balance().await;
        self.report("native_balance", result)
    }

    async fn query_balance(&self) -> Result<u64> {
        let identity = self.session.require_identity()?;
        self.queries
            .run("native_balance", || self.service.native_balance(&identity))
            .await
    }

    /// Fee charged for a conversion. Only the newest interface offers this.
    pub async fn estimate_conversion_fee(&self) -> Result<u64> {
        let result = self.query_fee().await;
        self.report("estimate_conversion_fee", result)
    }

    async fn query_fee(&self) -> Result<u64> {
        if !self.adapter.supports_fee_estimation() {
            return Err(EtcherError::Unsupported {
                operation: "estimate_conversion_fee",
                generation: self.adapter.generation(),
            });
        }
        let identity = self.session.require_identity()?;
        self.queries
            .run("estimate_conversion_fee", || {
                self.service.estimate_conversion_fee(&identity)
            })
            .await
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    /// Convert the deposited native balance and start tracking the result.
    ///
    /// Fails with [`EtcherError::InsufficientBalance`] without submitting
    /// when the balance is below the configured minimum. The submission
    /// itself is issued exactly once.
    pub async fn submit_conversion(&self) -> Result<BlockIndex> {
        let result = self.submit().await;
        self.report("submit_conversion", result)
    }

    async fn submit(&self) -> Result<BlockIndex> {
        let identity = self.session.require_identity()?;
        let _guard = self.begin(MutatingOperation::SubmitConversion)?;

        let balance = self
            .queries
            .run("native_balance", || self.service.native_balance(&identity))
            .await?;
        let minimum = self.config.min_conversion_balance;
        if balance < minimum {
            tracing::info!(balance, minimum, "Conversion skipped: balance below minimum");
            return Err(EtcherError::InsufficientBalance { balance, minimum });
        }

        let block_index = self
            .service
            .submit_conversion(&identity)
            .await
            .map_err(EtcherError::Transport)?;
        tracing::info!(block_index, balance, "Conversion submitted");

        self.start_tracking(identity, block_index);
        Ok(block_index)
    }

    /// Etch a rune. Encoding errors surface before anything is sent; the
    /// remote call is issued exactly once.
    pub async fn etch(&self, request: EtchingRequest) -> Result<EtchingResult> {
        let result = self.submit_etching(&request).await;
        self.report("etch", result)
    }

    async fn submit_etching(&self, request: &EtchingRequest) -> Result<EtchingResult> {
        let identity = self.session.require_identity()?;
        let wire = self.adapter.encode_etching_request(request)?;
        let _guard = self.begin(MutatingOperation::Etch)?;

        tracing::info!(rune = %request.rune_name, generation = %self.adapter.generation(), "Etching");
        let reply = self
            .service
            .etch(&identity, wire)
            .await
            .map_err(EtcherError::Transport)?;
        let result = self.adapter.decode_etching_result(&reply)?;

        tracing::info!(
            rune = %request.rune_name,
            commit_txid = %result.commit_txid,
            reveal_txid = %result.reveal_txid,
            "Etching accepted"
        );
        self.signals.last_etching.set(Some(result.clone()));
        Ok(result)
    }

    fn begin(&self, operation: MutatingOperation) -> Result<OperationGuard<'_>> {
        let mut slot = self.in_flight.lock();
        if let Some(in_flight) = *slot {
            tracing::debug!(%operation, %in_flight, "Rejected concurrent mutating operation");
            return Err(EtcherError::ConcurrentOperation { in_flight });
        }
        *slot = Some(operation);
        Ok(OperationGuard {
            slot: &self.in_flight,
        })
    }

    // ─── Tracking ───────────────────────────────────────────────────────────

    fn start_tracking(&self, identity: Identity, block_index: BlockIndex) {
        let handle = {
            let mut tracking = self.tracking.lock();
            // Previous session must stop writing the shared cell first.
            if let Some(previous) = tracking.take() {
                previous.cancel();
            }
            let handle =
                self.tracker
                    .track_into(identity, block_index, self.signals.conversion.clone());
            *tracking = Some(handle.clone());
            handle
        };

        let notice = self.signals.notice.clone();
        tokio::spawn(async move {
            match handle.wait().await {
                Ok(record) => {
                    if let Some(settled) = Notice::for_conversion(&record) {
                        notice.set(Some(settled));
                    }
                }
                Err(EtcherError::Cancelled) => {}
                Err(error) => notice.set(Some(Notice::from_error(&error))),
            }
        });
    }

    /// Stop the current tracking session, if any.
    pub fn cancel_tracking(&self) {
        if let Some(handle) = self.tracking.lock().take() {
            handle.cancel();
        }
    }

    /// Handle of the current tracking session.
    pub fn tracking(&self) -> Option<TrackingHandle> {
        self.tracking.lock().clone()
    }

    /// Last known record of the most recent conversion.
    pub fn conversion_record(&self) -> Option<ConversionRecord> {
        self.signals.conversion.get()
    }

    // ─── State surface ──────────────────────────────────────────────────────

    /// State cells for the frontend.
    pub fn signals(&self) -> &WorkflowSignals {
        &self.signals
    }

    /// Current value of every state cell.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.signals.snapshot()
    }

    /// Clear the pending notice.
    pub fn dismiss_notice(&self) {
        self.signals.notice.set(None);
    }

    /// Session manager.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Schema adapter for the configured generation.
    pub fn adapter(&self) -> &SchemaAdapter {
        &self.adapter
    }

    /// Validated configuration.
    pub fn config(&self) -> &EtcherConfig {
        &self.config
    }

    fn report<T>(&self, operation: &'static str, result: Result<T>) -> Result<T> {
        if let Err(error) = &result {
            tracing::warn!(operation, %error, category = %error.category(), "Workflow step failed");
            self.signals.notice.set(Some(Notice::from_error(error)));
        }
        result
    }
}

impl Drop for WorkflowCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.tracking.get_mut().take() {
            handle.cancel();
        }
    }
}
