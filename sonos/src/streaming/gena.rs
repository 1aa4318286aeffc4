//! HTTP side of event subscriptions: SUBSCRIBE, renewal and UNSUBSCRIBE.

use reqwest::{Client, Method, StatusCode};

use super::subscription::{SubscriptionError, SubscriptionResult};
use super::types::SubscriptionConfig;

/// Outcome of a renewal request that reached the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalOutcome {
    Renewed,
    /// The device no longer knows the SID (`412 Precondition Failed`)
    Expired,
    /// Any other status; the subscription is kept
    Rejected(StatusCode),
}

/// HTTP client for GENA requests against devices
#[derive(Debug, Clone)]
pub struct GenaClient {
    client: Client,
    device_port: u16,
    user_agent: String,
}

impl GenaClient {
    pub fn new(config: &SubscriptionConfig) -> SubscriptionResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SubscriptionError::InvalidConfiguration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            device_port: config.device_port,
            user_agent: config.user_agent.clone(),
        })
    }

    fn method(name: &'static str) -> SubscriptionResult<Method> {
        Method::from_bytes(name.as_bytes())
            .map_err(|e| SubscriptionError::SubscriptionFailed(format!("Invalid method {}: {}", name, e)))
    }

    fn host(&self, ip: &str) -> String {
        format!("{}:{}", ip, self.device_port)
    }

    fn url(&self, ip: &str, service_path: &str) -> String {
        format!("http://{}{}", self.host(ip), service_path)
    }

    /// `TIMEOUT` header value; `0` asks for a subscription that never expires.
    pub fn timeout_header(renewal_seconds: u32) -> String {
        if renewal_seconds == 0 {
            "Second-infinite".to_string()
        } else {
            format!("Second-{}", renewal_seconds)
        }
    }

    /// Open a subscription and return the SID assigned by the device.
    pub async fn subscribe(
        &self,
        ip: &str,
        service_path: &str,
        callback_url: &str,
        renewal_seconds: u32,
    ) -> SubscriptionResult<String> {
        let response = self
            .client
            .request(Self::method("SUBSCRIBE")?, self.url(ip, service_path))
            .header("HOST", self.host(ip))
            .header("USER-AGENT", &self.user_agent)
            .header("CALLBACK", format!("<{}>", callback_url))
            .header("NT", "upnp:event")
            .header("TIMEOUT", Self::timeout_header(renewal_seconds))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SubscriptionError::SubscriptionFailed(format!(
                "SUBSCRIBE {} on {} failed: HTTP {}",
                service_path,
                ip,
                response.status()
            )));
        }

        response
            .headers()
            .get("SID")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(SubscriptionError::MissingSid)
    }

    /// Extend an existing subscription.
    pub async fn renew(
        &self,
        ip: &str,
        service_path: &str,
        sid: &str,
        renewal_seconds: u32,
    ) -> SubscriptionResult<RenewalOutcome> {
        let response = self
            .client
            .request(Self::method("SUBSCRIBE")?, self.url(ip, service_path))
            .header("HOST", self.host(ip))
            .header("USER-AGENT", &self.user_agent)
            .header("SID", sid)
            .header("TIMEOUT", Self::timeout_header(renewal_seconds))
            .send()
            .await?;

        Ok(match response.status() {
            StatusCode::OK => RenewalOutcome::Renewed,
            StatusCode::PRECONDITION_FAILED => RenewalOutcome::Expired,
            status => RenewalOutcome::Rejected(status),
        })
    }

    /// Cancel a subscription. Returns whether the device confirmed with `200 OK`.
    pub async fn unsubscribe(&self, ip: &str, service_path: &str, sid: &str) -> SubscriptionResult<bool> {
        let response = self
            .client
            .request(Self::method("UNSUBSCRIBE")?, self.url(ip, service_path))
            .header("HOST", self.host(ip))
            .header("USER-AGENT", &self.user_agent)
            .header("SID", sid)
            .send()
            .await?;

        Ok(response.status() == StatusCode::OK)
    }
}
