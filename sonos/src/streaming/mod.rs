pub mod types;
pub mod subscription;
pub mod event;
pub mod listener;
pub mod gena;
pub mod callback_server;
pub mod runtime;

// Re-export key types for easier access
pub use types::SubscriptionConfig;
pub use subscription::{Subscription, SubscriptionError, SubscriptionResult};
pub use event::{InboundEvent, NotifyError, NotifyHeaders};
pub use listener::{LoggingEventListener, UpnpEventListener};
pub use runtime::SubscriptionRuntime;
