use super::event::InboundEvent;
use super::subscription::SubscriptionError;

/// Receives the raw lifecycle of one subscription.
///
/// Every method has a no-op default so implementors only override what
/// they need. Callbacks run on a blocking worker, never on the task that
/// services the callback socket, so they may issue device commands.
pub trait UpnpEventListener: Send + Sync {
    /// First notification of a subscription (`SEQ: 0`), carrying the full
    /// current state of the service.
    fn on_initial_event(&self, _event: &InboundEvent) {}

    /// Any later notification.
    fn on_event(&self, _event: &InboundEvent) {}

    /// The device no longer knows the subscription.
    fn on_subscription_expired(&self) {}

    fn on_renewal_failed(&self, _error: &SubscriptionError) {}

    /// The subscription was cancelled on request.
    fn on_unsubscribed(&self) {}
}

/// Listener that writes every callback to the log
#[derive(Debug, Default, Clone)]
pub struct LoggingEventListener {
    label: String,
}

impl LoggingEventListener {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl UpnpEventListener for LoggingEventListener {
    fn on_initial_event(&self, event: &InboundEvent) {
        log::info!("[{}] initial event {} seq {}", self.label, event.sid, event.seq);
        for property in event.properties() {
            log::debug!("[{}]   {}", self.label, property.name);
        }
    }

    fn on_event(&self, event: &InboundEvent) {
        log::info!("[{}] event {} seq {}", self.label, event.sid, event.seq);
        for property in event.properties() {
            log::debug!("[{}]   {}", self.label, property.name);
        }
    }

    fn on_subscription_expired(&self) {
        log::info!("[{}] subscription expired", self.label);
    }

    fn on_renewal_failed(&self, error: &SubscriptionError) {
        log::warn!("[{}] renewal failed: {}", self.label, error);
    }

    fn on_unsubscribed(&self) {
        log::info!("[{}] unsubscribed", self.label);
    }
}
