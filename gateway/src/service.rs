//! The public HTTP service.
//!
//! One service handles the whole API surface: the bulk endpoints and every
//! direct endpoint, all through the same [`Gateway`] route table. Backend
//! resolution and authentication happen here, once per request; the
//! resulting [`RequestContext`] is the ambient context every bulk
//! sub-request inherits.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use batch::{Call, CallResponse, CallRouter, DispatchError, Dispatcher};
use http_body_util::{BodyExt, combinators::BoxBody};
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{AUTHORIZATION, HOST, HeaderMap};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use serde_json::Value;
use shared::http::{error_response, json_response};
use shared::{gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use crate::context::RequestContext;
use crate::errors::GatewayError;
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_INFLIGHT};
use crate::router::Gateway;
use crate::{API_PREFIX, BULK_PATH};

/// Reserved bulk query parameter; never a named-mode lookup name.
const STOP_ON_ERROR_PARAM: &str = "stopOnError";

#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<Inner>,
}

struct Inner {
    gateway: Arc<Gateway>,
    dispatcher: Dispatcher<Arc<Gateway>>,
}

impl GatewayService {
    pub fn new(gateway: Arc<Gateway>, max_calls: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher: Dispatcher::new(gateway.clone()).with_limit(max_calls),
                gateway,
            }),
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = Response<BoxBody<Bytes, GatewayError>>;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.handle(req).await) })
    }
}

impl Inner {
    async fn handle<B>(&self, req: Request<B>) -> Response<BoxBody<Bytes, GatewayError>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        gauge!(REQUESTS_INFLIGHT).increment(1.0);
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match self.try_handle(req).await {
            Ok(response) => response,
            Err(e) if e.is_internal() => {
                tracing::error!(%method, %path, error = %e, "request failed unexpectedly");
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal-error",
                    "unexpected server error",
                )
            }
            Err(e) => error_response(e.status(), e.code(), &e.to_string()),
        };

        histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());
        gauge!(REQUESTS_INFLIGHT).decrement(1.0);
        response
    }

    async fn try_handle<B>(
        &self,
        req: Request<B>,
    ) -> Result<Response<BoxBody<Bytes, GatewayError>>, GatewayError>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let (parts, body) = req.into_parts();

        let backend = self.resolve_backend(&parts)?;
        let ctx = self.authenticate(&backend, &parts.headers)?;

        let query = query_pairs(parts.uri.query());

        let body_bytes = BodyExt::collect(body)
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| GatewayError::Invalid(format!("failed to read request body: {e}")))?;

        if parts.uri.path().trim_end_matches('/') == BULK_PATH {
            self.handle_bulk(&parts.method, &query, &body_bytes, &ctx)
                .await
        } else {
            self.handle_direct(&parts.method, parts.uri.path(), &query, &body_bytes, &ctx)
                .await
        }
    }

    async fn handle_bulk(
        &self,
        method: &hyper::Method,
        query: &[(String, String)],
        body: &Bytes,
        ctx: &RequestContext,
    ) -> Result<Response<BoxBody<Bytes, GatewayError>>, GatewayError> {
        let stop_on_error = stop_on_error(query)?;

        match *method {
            hyper::Method::POST => {
                let calls: Vec<Call> = serde_json::from_slice(body).map_err(|e| {
                    GatewayError::Invalid(format!("malformed bulk request body: {e}"))
                })?;

                match self.dispatcher.dispatch(&calls, stop_on_error, ctx).await {
                    Ok(responses) => {
                        let value = serde_json::to_value(&responses).map_err(|e| {
                            GatewayError::Internal(format!("failed to serialize responses: {e}"))
                        })?;
                        Ok(json_response(StatusCode::OK, &value))
                    }
                    Err(e) => Ok(dispatch_error_response(&e)),
                }
            }
            hyper::Method::GET => {
                let queries: Vec<(String, String)> = query
                    .iter()
                    .filter(|(name, _)| name != STOP_ON_ERROR_PARAM)
                    .map(|(name, path)| (name.clone(), format!("{API_PREFIX}{path}")))
                    .collect();

                match self
                    .dispatcher
                    .dispatch_named(&queries, stop_on_error, ctx)
                    .await
                {
                    Ok(results) => {
                        let value = serde_json::to_value(&results).map_err(|e| {
                            GatewayError::Internal(format!("failed to serialize responses: {e}"))
                        })?;
                        Ok(json_response(StatusCode::OK, &value))
                    }
                    Err(e) => Ok(dispatch_error_response(&e)),
                }
            }
            _ => Err(GatewayError::MethodNotAllowed {
                path: BULK_PATH.to_string(),
            }),
        }
    }

    async fn handle_direct(
        &self,
        method: &hyper::Method,
        path: &str,
        query: &[(String, String)],
        body: &Bytes,
        ctx: &RequestContext,
    ) -> Result<Response<BoxBody<Bytes, GatewayError>>, GatewayError> {
        let method = convert_method(method, path)?;

        let mut call = Call::new(method, path);
        for (key, value) in query {
            call = call.with_param(key.clone(), Value::String(value.clone()));
        }
        if !body.is_empty() {
            let payload = serde_json::from_slice(body).map_err(|e| {
                GatewayError::Invalid(format!("request body is not valid JSON: {e}"))
            })?;
            call = call.with_payload(payload);
        }

        let response = self.gateway.execute(&call, ctx).await?;
        Ok(call_response_to_http(&response))
    }

    fn resolve_backend(&self, parts: &http::request::Parts) -> Result<String, GatewayError> {
        let host = parts
            .uri
            .host()
            .map(str::to_string)
            .or_else(|| {
                parts
                    .headers
                    .get(HOST)
                    .and_then(|h| h.to_str().ok())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                GatewayError::Invalid("a Host header is required to resolve the backend".to_string())
            })?;

        // strip port, then take the first label as the backend id
        let host = host.split(':').next().unwrap_or(&host);
        let backend = host.split('.').next().unwrap_or(host);

        if !self.gateway.store().has_backend(backend)? {
            return Err(GatewayError::NotFound(format!("no backend [{backend}]")));
        }
        Ok(backend.to_string())
    }

    /// The one batch-wide authorization event: basic credentials, checked
    /// against the backend's credentials records. No header means guest.
    fn authenticate(
        &self,
        backend: &str,
        headers: &HeaderMap,
    ) -> Result<RequestContext, GatewayError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(RequestContext::guest(backend));
        };

        let value = value.to_str().map_err(|_| {
            GatewayError::Unauthorized("invalid authorization header".to_string())
        })?;
        let encoded = value.strip_prefix("Basic ").ok_or_else(|| {
            GatewayError::Unauthorized("only basic authorization is supported".to_string())
        })?;
        let decoded = BASE64.decode(encoded.trim()).map_err(|_| {
            GatewayError::Unauthorized("invalid basic authorization token".to_string())
        })?;
        let decoded = String::from_utf8(decoded).map_err(|_| {
            GatewayError::Unauthorized("invalid basic authorization token".to_string())
        })?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            GatewayError::Unauthorized("invalid basic authorization token".to_string())
        })?;

        let record = self
            .gateway
            .store()
            .credentials_by_username(backend, username)?
            .filter(|record| record.password == password)
            .ok_or_else(|| GatewayError::Unauthorized("invalid credentials".to_string()))?;

        Ok(RequestContext::authenticated(
            backend,
            record.to_credentials(),
        ))
    }
}

fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(query) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect(),
        None => Vec::new(),
    }
}

fn stop_on_error(query: &[(String, String)]) -> Result<bool, GatewayError> {
    match query.iter().find(|(name, _)| name == STOP_ON_ERROR_PARAM) {
        None => Ok(false),
        Some((_, value)) => value.parse().map_err(|_| {
            GatewayError::Invalid(format!(
                "param [{STOP_ON_ERROR_PARAM}] is not a boolean: {value:?}"
            ))
        }),
    }
}

fn convert_method(method: &hyper::Method, path: &str) -> Result<batch::Method, GatewayError> {
    match *method {
        hyper::Method::GET => Ok(batch::Method::Get),
        hyper::Method::POST => Ok(batch::Method::Post),
        hyper::Method::PUT => Ok(batch::Method::Put),
        hyper::Method::DELETE => Ok(batch::Method::Delete),
        hyper::Method::PATCH => Ok(batch::Method::Patch),
        _ => Err(GatewayError::MethodNotAllowed {
            path: path.to_string(),
        }),
    }
}

fn call_response_to_http(response: &CallResponse) -> Response<BoxBody<Bytes, GatewayError>> {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    json_response(status, &response.content)
}

fn dispatch_error_response(error: &DispatchError) -> Response<BoxBody<Bytes, GatewayError>> {
    let status = StatusCode::from_u16(error.status()).unwrap_or(StatusCode::BAD_REQUEST);
    error_response(status, error.code(), &error.to_string())
}
