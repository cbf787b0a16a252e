//! Bulk request dispatch.
//!
//! One HTTP request can carry many sub-requests. This crate owns the piece
//! that executes them: the [`Dispatcher`] takes an ordered list of
//! [`Call`]s (or a name-keyed set of lookup paths), runs each one against a
//! [`CallRouter`] under the caller's credential context, and collects one
//! [`CallResponse`] per executed call.
//!
//! # List mode
//!
//! ```json
//! POST /2/bulk?stopOnError=false
//! [
//!   {"method": "PUT", "path": "/2/data/message/1", "payload": {"text": "hi"}},
//!   {"method": "GET", "path": "/2/data/message", "params": {"refresh": true}}
//! ]
//! ```
//!
//! Sub-requests run sequentially, strictly in input order, so later calls
//! observe the side effects of earlier ones. The response is an array of
//! `{"status", "content"}` objects in the same order. With
//! `stopOnError=true` dispatch halts at the first status ≥ 400 and the
//! array ends with that failing response.
//!
//! # Named mode
//!
//! ```json
//! GET /2/bulk?vince=/credentials/3&schema=/schemas/message
//! ```
//!
//! Each named entry is an implicit GET; the response is one object keyed by
//! name. A failing entry contributes `{"status", "error"}` as its value and
//! never aborts the rest unless `stopOnError` is set. Entries are processed
//! in lexicographic name order so partial results are deterministic.
//!
//! # Failure channels
//!
//! Per-call failures (404, 401, 403, ...) are ordinary [`CallResponse`]
//! values; they never escape [`Dispatcher::dispatch`] as errors. Only
//! structural problems with the batch itself (size over the configured
//! limit) surface as [`DispatchError`]. Unexpected faults inside the router
//! are caught, logged, and mapped to a generic 500 response in that call's
//! slot.

pub mod call;
pub mod dispatcher;
pub mod error;
pub mod metrics_defs;
pub mod response;
pub mod router;

pub use call::{Call, Method};
pub use dispatcher::{DEFAULT_CALL_LIMIT, Dispatcher};
pub use error::{CallError, DispatchError};
pub use response::CallResponse;
pub use router::CallRouter;
