use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Accept loop for a hyper service. Each connection is handed off to its own
/// task; h1/h2 are auto-detected on the socket.
pub async fn run_http_service<S, E>(host: &str, port: u16, service: S) -> Result<(), E>
where
    S: Service<Request<Incoming>, Response = Response<BoxBody<Bytes, E>>, Error = E>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    E: From<std::io::Error> + std::error::Error + Send + Sync + 'static,
{
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "listening");
    let service_arc = Arc::new(service);

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let _ = stream.set_nodelay(true);
        let io = TokioIo::new(stream);
        let svc = service_arc.clone();

        tokio::spawn(async move {
            if let Err(e) = Builder::new(TokioExecutor::new())
                .serve_connection(io, svc)
                .await
            {
                tracing::debug!(%peer_addr, error = %e, "connection closed with error");
            }
        });
    }
}

/// Wrap bytes in a boxed body whose error type matches the service's.
pub fn full_body<E>(data: impl Into<Bytes>) -> BoxBody<Bytes, E> {
    Full::new(data.into()).map_err(|never| match never {}).boxed()
}

#[derive(Serialize)]
struct StatusBody {
    status: u16,
    message: String,
}

/// Plain `{status, message}` JSON response using the canonical reason phrase.
pub fn make_status_response<E>(status: StatusCode) -> Response<BoxBody<Bytes, E>> {
    let body = StatusBody {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("Unknown").to_string(),
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    json_response_from_bytes(status, bytes)
}

/// JSON response for an arbitrary serializable payload. Serialization failures
/// degrade to a 500 with an empty body rather than propagating.
pub fn make_json_response<T: Serialize, E>(
    status: StatusCode,
    value: &T,
) -> Response<BoxBody<Bytes, E>> {
    match serde_json::to_vec(value) {
        Ok(bytes) => json_response_from_bytes(status, bytes),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response body");
            json_response_from_bytes(StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
        }
    }
}

fn json_response_from_bytes<E>(status: StatusCode, bytes: Vec<u8>) -> Response<BoxBody<Bytes, E>> {
    let mut response = Response::new(full_body(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[tokio::test]
    async fn test_status_response_shape() {
        let response: Response<BoxBody<Bytes, Infallible>> =
            make_status_response(StatusCode::BAD_REQUEST);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["status"], 400);
        assert_eq!(parsed["message"], "Bad Request");
    }

    #[tokio::test]
    async fn test_json_response_content_type() {
        let response: Response<BoxBody<Bytes, Infallible>> =
            make_json_response(StatusCode::OK, &serde_json::json!({"ok": true}));
        assert_eq!(
            response.headers()[hyper::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
