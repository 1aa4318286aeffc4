use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::registry::DeviceRegistry;
use crate::error::{Result, SonosError};
use crate::streaming::{SubscriptionConfig, SubscriptionError, SubscriptionRuntime};
use crate::transport::soap::{SoapClient, SoapConfig};

/// Everything the devices of one application share: the command client,
/// the listener registry and the subscription runtime.
///
/// The runtime is started on the first listener registration and lives
/// until [`ControlPoint::shutdown`] or until the control point is dropped.
pub struct ControlPoint {
    soap: SoapClient,
    registry: Arc<DeviceRegistry>,
    subscription_config: SubscriptionConfig,
    runtime: Mutex<Option<Arc<SubscriptionRuntime>>>,
    stopped: AtomicBool,
}

impl ControlPoint {
    pub fn new(subscription_config: SubscriptionConfig) -> Result<Self> {
        Self::with_soap_config(subscription_config, SoapConfig::default())
    }

    pub fn with_soap_config(subscription_config: SubscriptionConfig, soap_config: SoapConfig) -> Result<Self> {
        subscription_config.validate().map_err(SonosError::InvalidArgument)?;

        Ok(Self {
            soap: SoapClient::new(&soap_config)?,
            registry: Arc::new(DeviceRegistry::new()),
            subscription_config,
            runtime: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn soap(&self) -> &SoapClient {
        &self.soap
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    pub fn subscription_config(&self) -> &SubscriptionConfig {
        &self.subscription_config
    }

    /// The subscription runtime, started on first use.
    pub fn runtime(&self) -> Result<Arc<SubscriptionRuntime>> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(SubscriptionError::RuntimeStopped.into());
        }

        let mut guard = self.runtime.lock();
        if let Some(runtime) = guard.as_ref() {
            return Ok(Arc::clone(runtime));
        }

        let runtime = Arc::new(SubscriptionRuntime::start(self.subscription_config.clone())?);
        *guard = Some(Arc::clone(&runtime));
        Ok(runtime)
    }

    /// The subscription runtime if it has been started.
    pub fn running_runtime(&self) -> Option<Arc<SubscriptionRuntime>> {
        self.runtime.lock().clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Unsubscribe every device and stop the runtime. Later registrations
    /// fail with [`SubscriptionError::RuntimeStopped`].
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown();
        }
    }
}

impl Drop for ControlPoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ControlPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPoint")
            .field("port", &self.soap.port())
            .field("devices", &self.registry.len())
            .field("runtime", &self.runtime.lock().as_ref().map(|runtime| runtime.local_addr()))
            .finish()
    }
}
