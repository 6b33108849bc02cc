use crate::config::RelayPolicy;
use crate::errors::GatewayError;
use crate::metrics_defs::{RELAY_FAILED, SUBMISSIONS_ACCEPTED, SUBMISSIONS_REJECTED};
use crate::relay::RelayClient;
use aggregator::engine::Aggregator;
use aggregator::report::ReportBatch;
use aggregator::types::CellAggregate;
use flate2::read::GzDecoder;
use http_body_util::BodyExt;
use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode, header};
use serde::Serialize;
use shared::counter;
use shared::http::{full_body, make_json_response, make_status_response};
use std::io::Read;
use std::pin::Pin;
use std::sync::Arc;

type GatewayResponse = Response<BoxBody<Bytes, GatewayError>>;

/// HTTP surface of the service: batch ingestion plus the two read-side
/// queries against the durable aggregate.
#[derive(Clone)]
pub struct GatewayService {
    inner: Arc<Inner>,
}

struct Inner {
    aggregator: Arc<Aggregator>,
    relay: RelayClient,
    policy: RelayPolicy,
}

#[derive(Serialize)]
struct HexListResponse {
    status: u16,
    message: &'static str,
    data: Vec<CellAggregate>,
}

impl GatewayService {
    pub fn new(aggregator: Arc<Aggregator>, relay: RelayClient, policy: RelayPolicy) -> Self {
        GatewayService {
            inner: Arc::new(Inner {
                aggregator,
                relay,
                policy,
            }),
        }
    }

    async fn handle<B>(inner: Arc<Inner>, req: Request<B>) -> Result<GatewayResponse, GatewayError>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        match (req.method(), req.uri().path()) {
            (&Method::GET, "/") => Ok(make_json_response(
                StatusCode::OK,
                &serde_json::json!({"status": 200, "message": "radiomap REST API"}),
            )),
            (&Method::POST, "/v1/geosubmit") => Self::handle_geosubmit(inner, req).await,
            (&Method::GET, "/v1/hexes") => Self::handle_hexes(inner).await,
            (&Method::GET, "/v1/stats") => Self::handle_stats(inner).await,
            (&Method::GET, "/health") => Ok(Response::new(full_body("ok\n"))),
            _ => {
                tracing::debug!(
                    method = %req.method(),
                    path = %req.uri().path(),
                    "no route matched"
                );
                Ok(make_status_response(StatusCode::NOT_FOUND))
            }
        }
    }

    /// Accept a batch, forward it to the relay, and kick off background
    /// aggregation. The 200 only acknowledges acceptance: per-item merges may
    /// still be in flight when the caller sees the response.
    async fn handle_geosubmit<B>(
        inner: Arc<Inner>,
        req: Request<B>,
    ) -> Result<GatewayResponse, GatewayError>
    where
        B: hyper::body::Body + Send + 'static,
        B::Data: Send,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let encoding = req
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let body = req
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::RequestBodyError(e.to_string()))?
            .to_bytes();

        let decoded = match encoding.as_deref() {
            None => body,
            Some("gzip") => match gunzip(&body) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(error = %e, "rejecting submission with bad gzip body");
                    counter!(SUBMISSIONS_REJECTED).increment(1);
                    return Ok(make_status_response(StatusCode::BAD_REQUEST));
                }
            },
            Some(other) => {
                tracing::warn!(encoding = other, "rejecting unsupported content encoding");
                counter!(SUBMISSIONS_REJECTED).increment(1);
                return Ok(make_status_response(StatusCode::BAD_REQUEST));
            }
        };

        let batch: ReportBatch = match serde_json::from_slice(&decoded) {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "rejecting malformed batch");
                counter!(SUBMISSIONS_REJECTED).increment(1);
                return Ok(make_status_response(StatusCode::BAD_REQUEST));
            }
        };

        if let Err(e) = inner.relay.forward(&batch).await {
            counter!(RELAY_FAILED).increment(1);
            match inner.policy {
                RelayPolicy::RelayFirst => {
                    tracing::warn!(error = %e, "relay refused batch; dropping submission");
                    counter!(SUBMISSIONS_REJECTED).increment(1);
                    return Ok(make_status_response(StatusCode::BAD_REQUEST));
                }
                RelayPolicy::LocalFirst => {
                    tracing::warn!(error = %e, "relay refused batch; aggregating locally anyway");
                }
            }
        }

        let aggregator = Arc::clone(&inner.aggregator);
        let items = batch.items.len();
        tokio::spawn(async move {
            let summary = aggregator.ingest_batch(batch).await;
            tracing::info!(
                items,
                applied = summary.applied,
                skipped = summary.skipped,
                dropped = summary.dropped,
                failed = summary.failed,
                "batch aggregation finished"
            );
        });

        counter!(SUBMISSIONS_ACCEPTED).increment(1);
        Ok(make_status_response(StatusCode::OK))
    }

    async fn handle_hexes(inner: Arc<Inner>) -> Result<GatewayResponse, GatewayError> {
        match inner.aggregator.store().list_all().await {
            Ok(data) => Ok(make_json_response(
                StatusCode::OK,
                &HexListResponse {
                    status: 200,
                    message: "OK",
                    data,
                },
            )),
            Err(e) => {
                tracing::error!(error = %e, "failed to list aggregates");
                Ok(make_status_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }

    async fn handle_stats(inner: Arc<Inner>) -> Result<GatewayResponse, GatewayError> {
        match inner.aggregator.store().aggregate_stats().await {
            Ok(stats) => Ok(make_json_response(StatusCode::OK, &stats)),
            Err(e) => {
                tracing::error!(error = %e, "failed to compute stats");
                Ok(make_status_response(StatusCode::INTERNAL_SERVER_ERROR))
            }
        }
    }
}

impl Service<Request<Incoming>> for GatewayService {
    type Response = GatewayResponse;
    type Error = GatewayError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { Self::handle(inner, req).await })
    }
}

fn gunzip(data: &[u8]) -> Result<Bytes, GatewayError> {
    let mut decoder = GzDecoder::new(data);
    let mut decoded = Vec::new();
    decoder
        .read_to_end(&mut decoded)
        .map_err(|e| GatewayError::RequestBodyError(format!("invalid gzip body: {e}")))?;
    Ok(Bytes::from(decoded))
}
