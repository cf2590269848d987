//! Periodic catalog reconciliation.
//!
//! Every tick rebuilds the full catalog from the decision runtime and compares it with the
//! published baseline. A changed catalog replaces the registry contents and triggers one
//! `tools/list_changed` broadcast. A failed rebuild counts as "no change" so a runtime outage
//! never unpublishes tools.

use crate::notifier::ToolListNotifier;
use crate::registry::ToolRegistry;
use decision_mcp_openapi_tools::{
    CatalogDiff, CatalogScope, CatalogSnapshot, DecisionServiceSource, FailurePolicy,
    assemble_catalog,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilerState {
    Idle,
    Polling,
    Stopped,
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Changed(CatalogDiff),
    /// The rebuild failed; the baseline is kept.
    Failed,
    /// Shutdown began while the rebuild was in flight; its result was dropped.
    Cancelled,
}

pub struct CatalogReconciler {
    source: Arc<dyn DecisionServiceSource>,
    scope: CatalogScope,
    baseline: CatalogSnapshot,
    registry: Arc<ToolRegistry>,
    notifier: Arc<dyn ToolListNotifier>,
    state: Arc<Mutex<ReconcilerState>>,
    cancel: CancellationToken,
}

impl CatalogReconciler {
    /// `baseline` is the catalog currently published in `registry`.
    pub fn new(
        source: Arc<dyn DecisionServiceSource>,
        scope: CatalogScope,
        baseline: CatalogSnapshot,
        registry: Arc<ToolRegistry>,
        notifier: Arc<dyn ToolListNotifier>,
    ) -> Self {
        Self {
            source,
            scope,
            baseline,
            registry,
            notifier,
            state: Arc::new(Mutex::new(ReconcilerState::Idle)),
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn baseline(&self) -> &CatalogSnapshot {
        &self.baseline
    }

    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        *self.state.lock()
    }

    /// Run one rebuild-and-compare cycle.
    pub async fn poll_once(&mut self) -> PollOutcome {
        if self.cancel.is_cancelled() {
            return PollOutcome::Cancelled;
        }
        *self.state.lock() = ReconcilerState::Polling;
        let outcome = self.rebuild().await;
        let mut state = self.state.lock();
        if *state == ReconcilerState::Polling {
            *state = ReconcilerState::Idle;
        }
        outcome
    }

    async fn rebuild(&mut self) -> PollOutcome {
        let fresh = match assemble_catalog(
            self.source.as_ref(),
            &self.scope,
            FailurePolicy::AbortOnFailure,
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "catalog refresh failed; keeping published tools");
                return PollOutcome::Failed;
            }
        };

        if self.cancel.is_cancelled() {
            tracing::debug!("discarding catalog refresh finished after shutdown");
            return PollOutcome::Cancelled;
        }

        let diff = self.baseline.diff(&fresh);
        if !diff.is_changed() {
            tracing::debug!(tools = fresh.len(), "tool catalog unchanged");
            return PollOutcome::Unchanged;
        }

        tracing::info!(
            previous = diff.previous_count,
            current = diff.current_count,
            added = ?diff.added,
            removed = ?diff.removed,
            schema_changed = ?diff.schema_changed,
            "tool catalog changed"
        );
        self.registry.replace(&fresh);
        self.baseline = fresh;
        self.notifier.notify_tool_list_changed().await;
        PollOutcome::Changed(diff)
    }

    /// Start polling every `period`, the first poll one period from now.
    #[must_use]
    pub fn spawn(self, period: Duration) -> ReconcilerHandle {
        let cancel = self.cancel.clone();
        let state = self.state.clone();
        let task = tokio::spawn(self.run(period));
        ReconcilerHandle {
            cancel,
            state,
            task: Mutex::new(Some(task)),
        }
    }

    async fn run(mut self, period: Duration) {
        let cancel = self.cancel.clone();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval_ms = period.as_millis(), "catalog reconciler started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // One cycle at a time; shutdown drops an in-flight cycle before it can commit.
            tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.poll_once() => {
                    tracing::trace!(?outcome, "catalog poll finished");
                }
            }
        }

        *self.state.lock() = ReconcilerState::Stopped;
        tracing::info!("catalog reconciler stopped");
    }
}

/// Control handle of a spawned [`CatalogReconciler`].
pub struct ReconcilerHandle {
    cancel: CancellationToken,
    state: Arc<Mutex<ReconcilerState>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcilerHandle {
    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        *self.state.lock()
    }

    /// Stop polling and wait for the loop to exit. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "catalog reconciler task failed");
            }
        }
        *self.state.lock() = ReconcilerState::Stopped;
    }
}

impl Drop for ReconcilerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use decision_mcp_runtime_client::{MetadataEntry, RuntimeClientError};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn document(operations: &[(&str, Value)]) -> Value {
        let mut paths = serde_json::Map::new();
        for (op, schema) in operations {
            paths.insert(
                format!("/{op}"),
                json!({
                    "post": {
                        "operationId": op,
                        "requestBody": {"content": {"application/json": {"schema": schema}}}
                    }
                }),
            );
        }
        json!({"info": {"x-ibm-ads-decision-service-name": "Svc"}, "paths": paths})
    }

    #[derive(Default)]
    struct FakeRuntime {
        document: Mutex<Value>,
        failing: AtomicBool,
    }

    impl FakeRuntime {
        fn with(operations: &[(&str, Value)]) -> Arc<Self> {
            let fake = Self::default();
            *fake.document.lock() = document(operations);
            Arc::new(fake)
        }

        fn set(&self, operations: &[(&str, Value)]) {
            *self.document.lock() = document(operations);
        }
    }

    #[async_trait]
    impl DecisionServiceSource for FakeRuntime {
        async fn list_decision_service_ids(
            &self,
            _deployment_space: &str,
        ) -> Result<Vec<String>, RuntimeClientError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RuntimeClientError::Transport("connection refused".to_string()));
            }
            Ok(vec!["svc".to_string()])
        }

        async fn fetch_openapi_document(
            &self,
            _deployment_space: &str,
            _decision_service_id: &str,
        ) -> Result<Value, RuntimeClientError> {
            Ok(self.document.lock().clone())
        }

        async fn fetch_operation_metadata(
            &self,
            _deployment_space: &str,
            _decision_id: &str,
        ) -> Result<HashMap<String, MetadataEntry>, RuntimeClientError> {
            Ok(HashMap::new())
        }
    }

    #[derive(Default)]
    struct CountingNotifier(AtomicUsize);

    #[async_trait]
    impl ToolListNotifier for CountingNotifier {
        async fn notify_tool_list_changed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn object() -> Value {
        json!({"type": "object"})
    }

    async fn reconciler(
        runtime: Arc<FakeRuntime>,
    ) -> (CatalogReconciler, Arc<ToolRegistry>, Arc<CountingNotifier>) {
        let scope = CatalogScope::default();
        let baseline = assemble_catalog(runtime.as_ref(), &scope, FailurePolicy::AbortOnFailure)
            .await
            .unwrap();
        let registry = Arc::new(ToolRegistry::from_snapshot(&baseline));
        let notifier = Arc::new(CountingNotifier::default());
        let reconciler = CatalogReconciler::new(
            runtime,
            scope,
            baseline,
            registry.clone(),
            notifier.clone(),
        );
        (reconciler, registry, notifier)
    }

    #[tokio::test]
    async fn unchanged_catalog_does_not_notify() {
        let runtime = FakeRuntime::with(&[("a", object()), ("b", object())]);
        let (mut reconciler, _registry, notifier) = reconciler(runtime).await;

        assert_eq!(reconciler.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
        assert_eq!(reconciler.state(), ReconcilerState::Idle);
    }

    #[tokio::test]
    async fn renamed_tool_with_same_count_notifies_once() {
        let runtime = FakeRuntime::with(&[("a", object()), ("b", object())]);
        let (mut reconciler, registry, notifier) = reconciler(runtime.clone()).await;

        runtime.set(&[("a", object()), ("c", object())]);
        match reconciler.poll_once().await {
            PollOutcome::Changed(diff) => {
                assert_eq!(diff.removed, vec!["Svc_b"]);
                assert_eq!(diff.added, vec!["Svc_c"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        assert_eq!(registry.tool_names(), vec!["Svc_a", "Svc_c"]);

        // The new catalog is the baseline now.
        assert_eq!(reconciler.poll_once().await, PollOutcome::Unchanged);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn schema_change_notifies() {
        let runtime = FakeRuntime::with(&[("a", object())]);
        let (mut reconciler, registry, notifier) = reconciler(runtime.clone()).await;

        runtime.set(&[(
            "a",
            json!({"type": "object", "properties": {"x": {"type": "string"}}}),
        )]);
        assert!(matches!(
            reconciler.poll_once().await,
            PollOutcome::Changed(_)
        ));
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
        let tool = registry.get("Svc_a").unwrap();
        assert!(tool.descriptor.input_schema["properties"].get("x").is_some());
    }

    #[tokio::test]
    async fn failed_rebuild_keeps_published_tools() {
        let runtime = FakeRuntime::with(&[("a", object())]);
        let (mut reconciler, registry, notifier) = reconciler(runtime.clone()).await;

        runtime.failing.store(true, Ordering::SeqCst);
        assert_eq!(reconciler.poll_once().await, PollOutcome::Failed);
        assert_eq!(registry.tool_names(), vec!["Svc_a"]);
        assert_eq!(reconciler.baseline().tool_names(), vec!["Svc_a"]);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn spawned_loop_picks_up_changes_and_stops_cleanly() {
        let runtime = FakeRuntime::with(&[("a", object())]);
        let (reconciler, registry, notifier) = reconciler(runtime.clone()).await;

        let handle = reconciler.spawn(Duration::from_millis(20));
        runtime.set(&[("a", object()), ("b", object())]);

        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len() != 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);

        handle.shutdown().await;
        assert_eq!(handle.state(), ReconcilerState::Stopped);
        handle.shutdown().await;

        // No cycle runs after shutdown.
        runtime.set(&[("z", object())]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.tool_names(), vec!["Svc_a", "Svc_b"]);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn poll_after_cancel_is_discarded() {
        let runtime = FakeRuntime::with(&[("a", object())]);
        let (mut reconciler, registry, notifier) = reconciler(runtime.clone()).await;

        reconciler.cancel.cancel();
        runtime.set(&[("b", object())]);
        assert_eq!(reconciler.poll_once().await, PollOutcome::Cancelled);
        assert_eq!(registry.tool_names(), vec!["Svc_a"]);
        assert_eq!(notifier.0.load(Ordering::SeqCst), 0);
    }
}
