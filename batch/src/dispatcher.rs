//! Sequential execution of bulk sub-requests.

use indexmap::IndexMap;
use serde_json::Value;
use shared::{counter, histogram};

use crate::call::{Call, Method};
use crate::error::DispatchError;
use crate::metrics_defs::{BULK_REJECTED, BULK_SIZE, BULK_SUBCALLS};
use crate::response::CallResponse;
use crate::router::CallRouter;

/// Default cap on sub-requests per bulk request.
pub const DEFAULT_CALL_LIMIT: usize = 20;

/// Runs the sub-requests of one bulk request, in order, against a
/// [`CallRouter`].
///
/// The dispatcher holds no state across requests; everything it
/// accumulates lives for one `dispatch` call. Execution is strictly
/// sequential so that later sub-requests observe the side effects of
/// earlier ones.
pub struct Dispatcher<R> {
    router: R,
    limit: usize,
}

impl<R: CallRouter> Dispatcher<R> {
    pub fn new(router: R) -> Self {
        Self {
            router,
            limit: DEFAULT_CALL_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// List mode: executes `calls` in input order and returns one response
    /// per executed call, in the same order.
    ///
    /// With `stop_on_error`, dispatch halts after the first response with
    /// status ≥ 400; the output then ends with that failing response and is
    /// shorter than the input. Otherwise the output always has the input's
    /// length. An empty input yields an empty output.
    ///
    /// A batch larger than the configured limit fails before any
    /// sub-request executes.
    pub async fn dispatch(
        &self,
        calls: &[Call],
        stop_on_error: bool,
        ctx: &R::Context,
    ) -> Result<Vec<CallResponse>, DispatchError> {
        self.check_limit(calls.len())?;

        let mut responses = Vec::with_capacity(calls.len());

        for call in calls {
            let response = self.execute_one(call, ctx).await;
            let failed = response.is_error();
            responses.push(response);

            if stop_on_error && failed {
                break;
            }
        }

        Ok(responses)
    }

    /// Named mode: executes each `name -> path` entry as an implicit GET
    /// and returns one object value per name.
    ///
    /// Entries are processed in lexicographic name order, whatever order
    /// the client sent them in, so partial results under `stop_on_error`
    /// are deterministic. A failing entry contributes
    /// `{"status", "error"}` as its value; it only halts the rest when
    /// `stop_on_error` is set.
    pub async fn dispatch_named(
        &self,
        queries: &[(String, String)],
        stop_on_error: bool,
        ctx: &R::Context,
    ) -> Result<IndexMap<String, Value>, DispatchError> {
        self.check_limit(queries.len())?;

        let mut entries: Vec<&(String, String)> = queries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut results = IndexMap::with_capacity(entries.len());

        for (name, path) in entries {
            let call = named_call(path);
            let response = self.execute_one(&call, ctx).await;
            let failed = response.is_error();
            results.insert(name.clone(), response.named_value());

            if stop_on_error && failed {
                break;
            }
        }

        Ok(results)
    }

    fn check_limit(&self, size: usize) -> Result<(), DispatchError> {
        if size > self.limit {
            counter!(BULK_REJECTED).increment(1);
            return Err(DispatchError::LimitExceeded {
                limit: self.limit,
                size,
            });
        }
        histogram!(BULK_SIZE).record(size as f64);
        Ok(())
    }

    async fn execute_one(&self, call: &Call, ctx: &R::Context) -> CallResponse {
        if let Err(e) = call.validate() {
            return CallResponse::error(e.status(), e.code(), &e.to_string());
        }

        counter!(BULK_SUBCALLS).increment(1);

        match self.router.execute(call, ctx).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(call = %call, error = %e, "sub-request failed unexpectedly");
                CallResponse::internal_error()
            }
        }
    }
}

/// Builds the implicit GET for a named-mode entry, parsing any query
/// string the path carries into call params.
fn named_call(path: &str) -> Call {
    match path.split_once('?') {
        Some((path, query)) => {
            let mut call = Call::new(Method::Get, path);
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                call = call.with_param(key.into_owned(), Value::String(value.into_owned()));
            }
            call
        }
        None => Call::new(Method::Get, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("router fault")]
    struct TestFault;

    /// Scripted router: outcome depends on the call path, every execution
    /// is recorded so tests can assert side-effect absence.
    struct RecordingRouter {
        log: Mutex<Vec<String>>,
    }

    impl RecordingRouter {
        fn new() -> Self {
            Self {
                log: Mutex::new(Vec::new()),
            }
        }

        fn executed(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallRouter for RecordingRouter {
        type Context = ();
        type Error = TestFault;

        async fn execute(&self, call: &Call, _ctx: &()) -> Result<CallResponse, TestFault> {
            self.log.lock().unwrap().push(call.path.clone());

            match call.path.as_str() {
                "/2/missing" => Ok(CallResponse::error(404, "not-found", "no such resource")),
                "/2/denied" => Ok(CallResponse::error(401, "unauthorized", "who are you")),
                "/2/boom" => Err(TestFault),
                path => Ok(CallResponse::ok(json!({
                    "path": path,
                    "params": call.params,
                }))),
            }
        }
    }

    fn calls(paths: &[&str]) -> Vec<Call> {
        paths.iter().map(|p| Call::new(Method::Get, *p)).collect()
    }

    #[tokio::test]
    async fn test_dispatch_preserves_order_and_length() {
        let dispatcher = Dispatcher::new(RecordingRouter::new());

        let input = calls(&["/2/a", "/2/missing", "/2/b"]);
        let responses = dispatcher.dispatch(&input, false, &()).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0].content["path"], "/2/a");
        assert_eq!(responses[1].status, 404);
        assert_eq!(responses[2].content["path"], "/2/b");
    }

    #[tokio::test]
    async fn test_stop_on_error_truncates_after_failure() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        let input = calls(&["/2/a", "/2/missing", "/2/b"]);
        let responses = dispatcher.dispatch(&input, true, &()).await.unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[1].status, 404);
        // the call after the failure never executed
        assert_eq!(router.executed(), ["/2/a", "/2/missing"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_empty_result() {
        let dispatcher = Dispatcher::new(RecordingRouter::new());
        let responses = dispatcher.dispatch(&[], true, &()).await.unwrap();
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_executes_nothing() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router).with_limit(3);

        let input = calls(&["/2/a", "/2/b", "/2/c", "/2/d"]);
        let err = dispatcher.dispatch(&input, false, &()).await.unwrap_err();

        assert_eq!(err, DispatchError::LimitExceeded { limit: 3, size: 4 });
        assert!(router.executed().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_call_fails_in_slot_without_executing() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        let input = vec![
            Call::new(Method::Get, "/2/a"),
            Call::new(Method::Get, "relative/path"),
            Call::new(Method::Get, "/2/b"),
        ];
        let responses = dispatcher.dispatch(&input, false, &()).await.unwrap();

        assert_eq!(responses[1].status, 400);
        assert_eq!(responses[1].content["error"]["code"], "malformed-call");
        // the malformed slot never reached the router
        assert_eq!(router.executed(), ["/2/a", "/2/b"]);
    }

    #[tokio::test]
    async fn test_router_fault_maps_to_generic_500() {
        let dispatcher = Dispatcher::new(RecordingRouter::new());

        let responses = dispatcher
            .dispatch(&calls(&["/2/boom", "/2/a"]), false, &())
            .await
            .unwrap();

        assert_eq!(responses[0].status, 500);
        assert_eq!(responses[0].content["error"]["code"], "internal-error");
        // a fault is a per-slot outcome, not a batch abort
        assert_eq!(responses[1].status, 200);
    }

    #[tokio::test]
    async fn test_stop_on_error_counts_fault_as_failure() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        let responses = dispatcher
            .dispatch(&calls(&["/2/boom", "/2/a"]), true, &())
            .await
            .unwrap();

        assert_eq!(responses.len(), 1);
        assert_eq!(router.executed(), ["/2/boom"]);
    }

    #[tokio::test]
    async fn test_named_dispatch_captures_failures_as_values() {
        let dispatcher = Dispatcher::new(RecordingRouter::new());

        let queries = vec![
            ("a".to_string(), "/2/x/1".to_string()),
            ("b".to_string(), "/2/missing".to_string()),
        ];
        let results = dispatcher.dispatch_named(&queries, false, &()).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results["a"]["path"], "/2/x/1");
        assert_eq!(results["b"]["status"], 404);
        assert_eq!(results["b"]["error"]["code"], "not-found");
    }

    #[tokio::test]
    async fn test_named_dispatch_processes_names_lexicographically() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        // client order: z first; processing order must be by name
        let queries = vec![
            ("zeta".to_string(), "/2/z".to_string()),
            ("alpha".to_string(), "/2/a".to_string()),
        ];
        let results = dispatcher.dispatch_named(&queries, false, &()).await.unwrap();

        assert_eq!(router.executed(), ["/2/a", "/2/z"]);
        let names: Vec<&String> = results.keys().collect();
        assert_eq!(names, ["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_named_dispatch_stop_on_error_partial_result() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        let queries = vec![
            ("c".to_string(), "/2/c".to_string()),
            ("a".to_string(), "/2/a".to_string()),
            ("b".to_string(), "/2/missing".to_string()),
        ];
        let results = dispatcher.dispatch_named(&queries, true, &()).await.unwrap();

        // a then b (failing); c never ran
        assert_eq!(results.len(), 2);
        assert!(results.contains_key("a"));
        assert_eq!(results["b"]["status"], 404);
        assert_eq!(router.executed(), ["/2/a", "/2/missing"]);
    }

    #[tokio::test]
    async fn test_named_dispatch_parses_subpath_query_string() {
        let router = RecordingRouter::new();
        let dispatcher = Dispatcher::new(&router);

        let queries = vec![(
            "messages".to_string(),
            "/2/data/message?refresh=true".to_string(),
        )];
        let results = dispatcher.dispatch_named(&queries, false, &()).await.unwrap();

        assert_eq!(results["messages"]["path"], "/2/data/message");
        assert_eq!(results["messages"]["params"]["refresh"], "true");
    }

    #[tokio::test]
    async fn test_named_dispatch_respects_limit() {
        let dispatcher = Dispatcher::new(RecordingRouter::new()).with_limit(1);

        let queries = vec![
            ("a".to_string(), "/2/a".to_string()),
            ("b".to_string(), "/2/b".to_string()),
        ];
        let err = dispatcher.dispatch_named(&queries, false, &()).await.unwrap_err();

        assert_eq!(err, DispatchError::LimitExceeded { limit: 1, size: 2 });
    }

    /// Sequential execution is a correctness requirement: later calls must
    /// observe earlier calls' side effects within the same batch.
    struct CountingRouter {
        count: Mutex<u64>,
    }

    #[async_trait]
    impl CallRouter for CountingRouter {
        type Context = ();
        type Error = TestFault;

        async fn execute(&self, call: &Call, _ctx: &()) -> Result<CallResponse, TestFault> {
            let mut count = self.count.lock().unwrap();
            match call.method {
                Method::Put => {
                    *count += 1;
                    Ok(CallResponse::created(json!({"total": *count})))
                }
                _ => Ok(CallResponse::ok(json!({"total": *count}))),
            }
        }
    }

    #[tokio::test]
    async fn test_later_calls_observe_earlier_effects() {
        let dispatcher = Dispatcher::new(CountingRouter {
            count: Mutex::new(0),
        });

        let input = vec![
            Call::new(Method::Put, "/2/data/message/1"),
            Call::new(Method::Put, "/2/data/message/2"),
            Call::new(Method::Get, "/2/data/message"),
        ];
        let responses = dispatcher.dispatch(&input, false, &()).await.unwrap();

        assert_eq!(responses[2].content["total"], 2);
    }
}
