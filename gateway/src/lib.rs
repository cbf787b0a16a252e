//! The application kernel: route table, endpoint handlers, in-memory
//! store, credential context, and the hyper service that exposes them to
//! direct HTTP requests and bulk sub-requests alike, through the same
//! routing table.

pub mod api;
pub mod context;
pub mod errors;
pub mod metrics_defs;
pub mod router;
pub mod routes;
pub mod service;
pub mod store;
pub mod testutils;

pub use context::{Credentials, RequestContext, Role};
pub use errors::GatewayError;
pub use router::Gateway;
pub use service::GatewayService;
pub use store::Store;

/// Path prefix of the public API.
pub const API_PREFIX: &str = "/2";

/// Full path of the bulk endpoint.
pub const BULK_PATH: &str = "/2/bulk";
