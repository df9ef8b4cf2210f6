//! Mutation pipeline: validate → request → invalidate → toast, strictly in
//! that order for one submission.

use crate::cache::QueryCache;
use crate::toast::{Toast, ToastSink};
use crm_core::validation::Validate;
use crm_core::{CrmError, CrmResult};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a mutation touches and how success is announced.
#[derive(Debug, Clone)]
pub struct Mutation {
    invalidates: Vec<&'static str>,
    success: String,
}

impl Mutation {
    pub fn new(resource: &'static str, success: impl Into<String>) -> Self {
        Self {
            invalidates: vec![resource],
            success: success.into(),
        }
    }

    /// Also drop cached reads of another resource on success.
    pub fn also_invalidates(mut self, resource: &'static str) -> Self {
        self.invalidates.push(resource);
        self
    }

    pub fn success_message(&self) -> &str {
        &self.success
    }
}

pub struct MutationRunner {
    cache: Arc<QueryCache>,
    toasts: Arc<dyn ToastSink>,
    pending: AtomicUsize,
}

struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MutationRunner {
    pub fn new(cache: Arc<QueryCache>, toasts: Arc<dyn ToastSink>) -> Self {
        Self {
            cache,
            toasts,
            pending: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Whether a request is in flight. Views disable their submit button on
    /// it; concurrent submissions are still allowed through.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst) > 0
    }

    /// Validate `input`, then run `request`. Validation failures return
    /// before any network call and raise no toast; the view shows them next
    /// to the fields.
    pub async fn submit<V, T, Fut>(&self, mutation: Mutation, input: &V, request: Fut) -> CrmResult<T>
    where
        V: Validate + ?Sized,
        Fut: Future<Output = CrmResult<T>>,
    {
        if let Err(errors) = input.validate() {
            metrics::counter!("mutations.rejected").increment(1);
            debug!(errors = %errors, "Mutation input rejected");
            return Err(CrmError::Validation(errors));
        }
        self.execute(mutation, request).await
    }

    /// Run a mutation that carries no validated input, e.g. a delete.
    pub async fn execute<T, Fut>(&self, mutation: Mutation, request: Fut) -> CrmResult<T>
    where
        Fut: Future<Output = CrmResult<T>>,
    {
        let result = {
            self.pending.fetch_add(1, Ordering::SeqCst);
            let _guard = PendingGuard(&self.pending);
            request.await
        };

        match result {
            Ok(value) => {
                for resource in &mutation.invalidates {
                    self.cache.invalidate_resource(resource);
                }
                metrics::counter!("mutations.succeeded").increment(1);
                info!(resources = ?mutation.invalidates, "{}", mutation.success);
                self.toasts.show(Toast::success(mutation.success));
                Ok(value)
            }
            Err(e) => {
                metrics::counter!("mutations.failed").increment(1);
                warn!(resources = ?mutation.invalidates, error = %e, "Mutation failed");
                self.toasts.show(Toast::error(e.user_message()));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toast::{CaptureToasts, ToastKind};
    use crm_core::validation::FieldErrors;
    use serde_json::json;
    use std::sync::atomic::AtomicBool;

    struct Title(&'static str);

    impl Validate for Title {
        fn validate(&self) -> Result<(), FieldErrors> {
            let mut errors = FieldErrors::new();
            errors.require("title", self.0);
            errors.into_result()
        }
    }

    fn runner() -> (MutationRunner, Arc<CaptureToasts>) {
        let toasts = Arc::new(CaptureToasts::new());
        let cache = Arc::new(QueryCache::new());
        (MutationRunner::new(cache, toasts.clone()), toasts)
    }

    #[tokio::test]
    async fn test_success_invalidates_then_toasts() {
        let (runner, toasts) = runner();
        runner.cache().insert("faqs", "page=1", json!([]));
        runner.cache().insert("leads", "", json!([]));

        let cache = runner.cache().clone();
        let out = runner
            .submit(Mutation::new("faqs", "FAQ created"), &Title("Fees?"), async move {
                // Invalidation has not happened while the request runs.
                assert_eq!(cache.len(), 2);
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(out, 7);
        assert!(runner.cache().get("faqs", "page=1").is_none());
        assert!(runner.cache().get("leads", "").is_some());
        assert_eq!(toasts.toasts(), vec![Toast::success("FAQ created")]);
        assert!(!runner.is_pending());
    }

    #[tokio::test]
    async fn test_validation_blocks_request() {
        let (runner, toasts) = runner();
        let sent = AtomicBool::new(false);
        let err = runner
            .submit(Mutation::new("faqs", "FAQ created"), &Title("  "), async {
                sent.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CrmError::Validation(ref e) if e.for_field("title").is_some()));
        assert!(!sent.load(Ordering::SeqCst));
        assert_eq!(toasts.count(), 0);
    }

    #[tokio::test]
    async fn test_failure_toasts_server_message_and_keeps_cache() {
        let (runner, toasts) = runner();
        runner.cache().insert("leads", "", json!([]));

        let err = runner
            .execute::<(), _>(Mutation::new("leads", "Lead deleted"), async {
                Err(CrmError::Api {
                    status: 409,
                    message: "Lead has open appointments".into(),
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, CrmError::Api { status: 409, .. }));
        assert!(runner.cache().get("leads", "").is_some());
        let toast = toasts.last().unwrap();
        assert_eq!(toast.kind, ToastKind::Error);
        assert_eq!(toast.message, "Lead has open appointments");
    }

    #[tokio::test]
    async fn test_pending_while_in_flight() {
        let (runner, _toasts) = runner();
        let runner = Arc::new(runner);
        let (release, wait) = tokio::sync::oneshot::channel::<()>();

        let task = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .execute(Mutation::new("tasks", "Task completed"), async {
                        let _ = wait.await;
                        Ok(())
                    })
                    .await
            })
        };
        while !runner.is_pending() {
            tokio::task::yield_now().await;
        }
        release.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!runner.is_pending());
    }

    #[test]
    fn test_mutation_targets() {
        let m = Mutation::new("leads", "Lead converted").also_invalidates("students");
        assert_eq!(m.invalidates, vec!["leads", "students"]);
        assert_eq!(m.success_message(), "Lead converted");
    }
}
