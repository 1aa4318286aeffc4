use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::listener::UpnpEventListener;
use super::types::RENEWAL_MARGIN_SECONDS;

/// Error types for subscription operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Network communication error: {0}")]
    Network(String),

    #[error("Timeout occurred during operation: {0}")]
    Timeout(String),

    #[error("Failed to establish subscription: {0}")]
    SubscriptionFailed(String),

    #[error("Device response carried no SID header")]
    MissingSid,

    #[error("Renewal period of {0}s leaves no time to renew before expiry")]
    InvalidRenewalPeriod(u32),

    #[error("Callback server error: {0}")]
    CallbackServer(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Subscription runtime has been shut down")]
    RuntimeStopped,

    #[error("Invalid subscription configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<reqwest::Error> for SubscriptionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SubscriptionError::Timeout(err.to_string())
        } else {
            SubscriptionError::Network(err.to_string())
        }
    }
}

/// Result type for subscription operations
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// Delay between renewals for a subscription lasting `renewal_seconds`.
///
/// `0` disables renewal. Periods that leave no positive delay are rejected;
/// delays under a minute are accepted with a warning.
pub fn renewal_delay(renewal_seconds: u32) -> SubscriptionResult<Option<Duration>> {
    if renewal_seconds == 0 {
        return Ok(None);
    }

    let delay = i64::from(renewal_seconds) - i64::from(RENEWAL_MARGIN_SECONDS);
    if delay <= 0 {
        return Err(SubscriptionError::InvalidRenewalPeriod(renewal_seconds));
    }
    if delay < 60 {
        log::warn!(
            "Renewing every {}s is discouraged; devices may take up to 30s to answer a renewal",
            delay
        );
    }

    Ok(Some(Duration::from_secs(delay as u64)))
}

/// Live subscriptions keyed by SID
pub type SubscriptionTable = DashMap<String, Arc<Subscription>>;

/// One live subscription
pub struct Subscription {
    sid: String,
    device_ip: String,
    service_path: String,
    renewal_seconds: u32,
    renewal_task: Mutex<Option<JoinHandle<()>>>,
    last_seq: AtomicI64,
    listener: Arc<dyn UpnpEventListener>,
}

impl Subscription {
    pub fn new(
        sid: String,
        device_ip: String,
        service_path: String,
        renewal_seconds: u32,
        listener: Arc<dyn UpnpEventListener>,
    ) -> Self {
        Self {
            sid,
            device_ip,
            service_path,
            renewal_seconds,
            renewal_task: Mutex::new(None),
            last_seq: AtomicI64::new(-1),
            listener,
        }
    }

    pub fn sid(&self) -> &str {
        &self.sid
    }

    pub fn device_ip(&self) -> &str {
        &self.device_ip
    }

    pub fn service_path(&self) -> &str {
        &self.service_path
    }

    pub fn renewal_seconds(&self) -> u32 {
        self.renewal_seconds
    }

    pub fn listener(&self) -> Arc<dyn UpnpEventListener> {
        Arc::clone(&self.listener)
    }

    /// Last accepted sequence number, `-1` before the first event.
    pub fn last_sequence(&self) -> i64 {
        self.last_seq.load(Ordering::SeqCst)
    }

    /// Record `seq`. Returns `false` (and keeps the stored value) when the
    /// event is not newer than the last one seen.
    pub fn advance_sequence(&self, seq: u32) -> bool {
        let seq = i64::from(seq);
        self.last_seq
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| (seq > last).then_some(seq))
            .is_ok()
    }

    pub(crate) fn set_renewal_task(&self, task: JoinHandle<()>) {
        if let Some(previous) = self.renewal_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Stop the renewal task. Safe to call any number of times.
    pub fn cancel_renewal(&self) {
        if let Some(task) = self.renewal_task.lock().take() {
            task.abort();
        }
    }

    pub fn has_renewal_task(&self) -> bool {
        self.renewal_task.lock().is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("sid", &self.sid)
            .field("device_ip", &self.device_ip)
            .field("service_path", &self.service_path)
            .field("renewal_seconds", &self.renewal_seconds)
            .field("last_seq", &self.last_sequence())
            .finish()
    }
}
