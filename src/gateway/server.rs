//! HTTP/1 front end for [`Gateway`]: routing, CORS and status mapping.

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Instant};

use anyhow::Context;
use bytes::Bytes;
use http::{HeaderValue, Method, Request, Response, StatusCode, header};
use http_body_util::{BodyExt, Full, Limited};
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::{
    foundation::error::{MemecapError, MemecapResult},
    gateway::{ops::Gateway, types::ErrorBody, upstream::Upstream},
};

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "POST, OPTIONS";

/// Routable gateway operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// `/select-template`
    SelectTemplate,
    /// `/generate-captions`
    GenerateCaptions,
    /// `/refine-caption`
    RefineCaption,
}

impl Route {
    /// Match a request path, ignoring one trailing slash.
    pub fn from_path(path: &str) -> Option<Self> {
        match path.strip_suffix('/').unwrap_or(path) {
            "/select-template" => Some(Self::SelectTemplate),
            "/generate-captions" => Some(Self::GenerateCaptions),
            "/refine-caption" => Some(Self::RefineCaption),
            _ => None,
        }
    }
}

/// HTTP status for a failed operation.
pub fn status_for(err: &MemecapError) -> StatusCode {
    match err {
        MemecapError::Validation(_) | MemecapError::Serde(_) => StatusCode::BAD_REQUEST,
        MemecapError::Upstream { .. }
        | MemecapError::MalformedResponse(_)
        | MemecapError::ResponseParse(_) => StatusCode::BAD_GATEWAY,
        MemecapError::ImageLoad(_)
        | MemecapError::UnsupportedEnvironment(_)
        | MemecapError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Serve one request. Never fails; every outcome becomes a response.
pub async fn handle<U, B>(gateway: &Gateway<U>, req: Request<B>) -> Response<Full<Bytes>>
where
    U: Upstream,
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let resp = route(gateway, req).await;
    tracing::info!(
        %method,
        %path,
        status = resp.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    resp
}

async fn route<U, B>(gateway: &Gateway<U>, req: Request<B>) -> Response<Full<Bytes>>
where
    U: Upstream,
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if req.method() == Method::OPTIONS {
        return respond(StatusCode::OK, Bytes::from_static(b"ok"));
    }
    let Some(route) = Route::from_path(req.uri().path()) else {
        return error_response(StatusCode::NOT_FOUND, "not found");
    };
    if req.method() != Method::POST {
        let mut resp = error_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        resp.headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static(ALLOW_METHODS));
        return resp;
    }

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) => {
            if err.is::<http_body_util::LengthLimitError>() {
                return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large");
            }
            return error_response(StatusCode::BAD_REQUEST, &format!("read body: {err}"));
        }
    };

    let result = match route {
        Route::SelectTemplate => match decode(&body) {
            Ok(r) => gateway.select_template(&r).await.and_then(encode),
            Err(e) => Err(e),
        },
        Route::GenerateCaptions => match decode(&body) {
            Ok(r) => gateway.generate_captions(&r).await.and_then(encode),
            Err(e) => Err(e),
        },
        Route::RefineCaption => match decode(&body) {
            Ok(r) => gateway.refine_caption(&r).await.and_then(encode),
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(json) => respond(StatusCode::OK, json),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                tracing::error!(route = ?route, error = %err, "operation failed");
            } else {
                tracing::debug!(route = ?route, error = %err, "request rejected");
            }
            error_response(status, &err.to_string())
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> MemecapResult<T> {
    serde_json::from_slice(body).map_err(|e| MemecapError::serde(format!("invalid JSON body: {e}")))
}

fn encode<T: serde::Serialize>(value: T) -> MemecapResult<Bytes> {
    serde_json::to_vec(&value)
        .map(Bytes::from)
        .map_err(|e| MemecapError::serde(format!("encode response: {e}")))
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(&ErrorBody {
        error: message.to_string(),
    })
    .map(Bytes::from)
    .unwrap_or_else(|_| Bytes::from_static(br#"{"error":"internal error"}"#));
    respond(status, body)
}

fn respond(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let json = status != StatusCode::OK || body.first() == Some(&b'{');
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    let headers = resp.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    if json {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }
    resp
}

/// Bind `addr` and serve until the task is cancelled.
pub async fn serve<U>(addr: SocketAddr, gateway: Arc<Gateway<U>>) -> MemecapResult<()>
where
    U: Upstream + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    serve_listener(listener, gateway).await
}

/// Serve connections from an already bound listener.
pub async fn serve_listener<U>(listener: TcpListener, gateway: Arc<Gateway<U>>) -> MemecapResult<()>
where
    U: Upstream + 'static,
{
    let local = listener.local_addr().context("listener address")?;
    tracing::info!(addr = %local, "gateway listening");
    loop {
        let (stream, peer) = listener.accept().await.context("accept connection")?;
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let gateway = Arc::clone(&gateway);
                async move { Ok::<_, Infallible>(handle(&gateway, req).await) }
            });
            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), svc)
                .await
            {
                tracing::debug!(%peer, error = %err, "connection closed with error");
            }
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/gateway/server.rs"]
mod tests;
