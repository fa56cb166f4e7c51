//! Communication provider clients
//!
//! The provider step hands each request to a [`CommunicationProvider`]:
//! - `SimulatedProvider`: canned per-channel responses after a fixed latency
//! - `HttpProvider`: POSTs the request to an external provider service

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::pipeline::{CommunicationRequest, CommunicationType};

/// Dispatches a communication to whoever actually delivers it.
#[async_trait]
pub trait CommunicationProvider: Send + Sync {
    /// Send `request` and return the provider's response fields.
    async fn send_communication(&self, request: &CommunicationRequest) -> Result<Map<String, Value>>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Simulated Provider
// ═══════════════════════════════════════════════════════════════════════════

pub struct SimulatedProvider {
    latency: Duration,
}

impl SimulatedProvider {
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for SimulatedProvider {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATENCY)
    }
}

#[async_trait]
impl CommunicationProvider for SimulatedProvider {
    async fn send_communication(&self, request: &CommunicationRequest) -> Result<Map<String, Value>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        info!(
            worker_id = %request.worker_id,
            channel = %request.communication_type,
            "Sending communication via simulated provider"
        );

        let now = Utc::now().timestamp_millis();
        let response = match request.communication_type {
            CommunicationType::Call => json!({
                "providerId": "call-provider-1",
                "callId": format!("call-{now}"),
                "estimatedDuration": "300 seconds"
            }),
            CommunicationType::Sms => json!({
                "providerId": "sms-provider-1",
                "messageId": format!("sms-{now}"),
                "deliveryStatus": "SENT"
            }),
            CommunicationType::Email => json!({
                "providerId": "email-provider-1",
                "emailId": format!("email-{now}"),
                "deliveryStatus": "QUEUED"
            }),
            CommunicationType::Push => json!({
                "providerId": "push-provider-1",
                "notificationId": format!("push-{now}"),
                "deliveryStatus": "DELIVERED"
            }),
        };

        Ok(match response {
            Value::Object(fields) => fields,
            _ => Map::new(),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HTTP Provider
// ═══════════════════════════════════════════════════════════════════════════

/// Delivers communications through an external HTTP service (`PROVIDER_URL`).
pub struct HttpProvider {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }
}

#[async_trait]
impl CommunicationProvider for HttpProvider {
    async fn send_communication(&self, request: &CommunicationRequest) -> Result<Map<String, Value>> {
        let url = format!("{}/communications", self.endpoint.trim_end_matches('/'));
        info!(
            request_id = %request.id,
            channel = %request.communication_type,
            "Dispatching communication to {}",
            url
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "requestId": request.id,
                "workerId": request.worker_id,
                "communicationType": request.communication_type,
                "priority": request.priority,
                "payload": request.payload,
            }))
            .send()
            .await
            .context("Failed to send request to provider")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(
                request_id = %request.id,
                status = %status,
                "Provider returned error: {}",
                error_body
            );
            anyhow::bail!("provider returned {}: {}", status, error_body);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse provider response")?;

        Ok(match body {
            Value::Object(fields) => fields,
            other => {
                let mut fields = Map::new();
                fields.insert("response".to_string(), other);
                fields
            }
        })
    }
}
