//! Delivery to the ingestion API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::json;
use tracing::{debug, warn};
use tracking_core::{
    FinalizeRequest, InteractionSubmission, MetricSubmission, SelectionSubmission,
    SnapshotSubmission,
};
use url::Url;

use crate::error::DeliveryError;

/// One request's worth of tracking data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Interactions(Vec<InteractionSubmission>),
    Selection(SelectionSubmission),
    Snapshot(SnapshotSubmission),
    Metric(MetricSubmission),
    Finalize(FinalizeRequest),
}

impl Payload {
    pub fn path(&self) -> &'static str {
        match self {
            Self::Interactions(_) => "/api/track/interactions",
            Self::Selection(_) => "/api/track/selections",
            Self::Snapshot(_) => "/api/track/snapshots",
            Self::Metric(_) => "/api/track/metrics",
            Self::Finalize(_) => "/api/track/finalize",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Interactions(_) => "interactions",
            Self::Selection(_) => "selection",
            Self::Snapshot(_) => "snapshot",
            Self::Metric(_) => "metric",
            Self::Finalize(_) => "finalize",
        }
    }

    pub fn to_body(&self) -> Result<Vec<u8>, DeliveryError> {
        let encoded = match self {
            Self::Interactions(events) => serde_json::to_vec(&json!({ "events": events })),
            Self::Selection(s) => serde_json::to_vec(s),
            Self::Snapshot(s) => serde_json::to_vec(s),
            Self::Metric(m) => serde_json::to_vec(m),
            Self::Finalize(f) => serde_json::to_vec(f),
        };
        encoded.map_err(|e| DeliveryError::Encode(e.to_string()))
    }
}

/// Sends payloads to the ingestion API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send and wait for the response.
    async fn send(&self, payload: &Payload) -> Result<(), DeliveryError>;

    /// Fire and forget. No response is awaited and failures are dropped, so
    /// this is safe to call from teardown.
    fn beacon(&self, payload: Payload);
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let base = Url::parse(endpoint).map_err(|e| DeliveryError::Config(e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Config(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn url(&self, payload: &Payload) -> Result<Url, DeliveryError> {
        self.base
            .join(payload.path())
            .map_err(|e| DeliveryError::Config(e.to_string()))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &Payload) -> Result<(), DeliveryError> {
        let url = self.url(payload)?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_body()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        debug!(kind = payload.kind(), status = %status, "Delivered");
        Ok(())
    }

    fn beacon(&self, payload: Payload) {
        let (url, body) = match (self.url(&payload), payload.to_body()) {
            (Ok(url), Ok(body)) => (url, body),
            (Err(e), _) | (_, Err(e)) => {
                warn!(kind = payload.kind(), error = %e, "Dropping beacon");
                return;
            }
        };

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(kind = payload.kind(), "No runtime for beacon");
            return;
        };

        // Beacons carry a simple content type so they survive page teardown.
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body);
        handle.spawn(async move {
            if let Err(e) = request.send().await {
                debug!(error = %e, "Beacon failed");
            }
        });
    }
}
