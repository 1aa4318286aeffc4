use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::callback_server::{self, CallbackContext};
use super::gena::{GenaClient, RenewalOutcome};
use super::listener::UpnpEventListener;
use super::subscription::{renewal_delay, Subscription, SubscriptionError, SubscriptionResult, SubscriptionTable};
use super::types::SubscriptionConfig;

struct Shared {
    subscriptions: Arc<SubscriptionTable>,
    gena: GenaClient,
}

/// Owns the callback listener, the renewal tasks and the subscription table.
///
/// One runtime serves every device of a control point. The listener runs
/// on a dedicated thread with its own tokio runtime, so the blocking API
/// below can be used from any thread that is not itself an async task.
pub struct SubscriptionRuntime {
    config: SubscriptionConfig,
    shared: Arc<Shared>,
    handle: Handle,
    local_addr: SocketAddr,
    running: AtomicBool,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
    server_thread: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionRuntime {
    /// Bind the callback listener and start accepting notifications.
    pub fn start(config: SubscriptionConfig) -> SubscriptionResult<Self> {
        config.validate().map_err(SubscriptionError::InvalidConfiguration)?;

        let address = config.resolve_callback_address();

        let shared = Arc::new(Shared {
            subscriptions: Arc::new(SubscriptionTable::new()),
            gena: GenaClient::new(&config)?,
        });

        let context = Arc::new(CallbackContext {
            subscriptions: Arc::clone(&shared.subscriptions),
            read_timeout: config.read_timeout,
            idle_timeout: config.idle_timeout,
            server_header: config.user_agent.clone(),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (started_tx, started_rx) = std::sync::mpsc::sync_channel(1);

        let server_thread = std::thread::Builder::new()
            .name("sonos-upnp-events".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .thread_name("sonos-upnp-worker")
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = started_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                let bound = {
                    let _guard = runtime.enter();
                    warp::serve(callback_server::routes(context))
                        .try_bind_with_graceful_shutdown((address, 0), async move {
                            let _ = shutdown_rx.await;
                        })
                };
                let (local_addr, server) = match bound {
                    Ok(bound) => bound,
                    Err(e) => {
                        let _ = started_tx.send(Err(format!("Failed to bind {}: {}", address, e)));
                        return;
                    }
                };

                let _ = started_tx.send(Ok((runtime.handle().clone(), local_addr)));
                runtime.block_on(server);
                runtime.shutdown_timeout(Duration::from_secs(1));
                log::debug!("Event runtime stopped");
            })
            .map_err(|e| SubscriptionError::CallbackServer(format!("Failed to spawn listener thread: {}", e)))?;

        let (handle, local_addr) = started_rx
            .recv()
            .map_err(|_| SubscriptionError::CallbackServer("Listener thread exited during startup".to_string()))?
            .map_err(SubscriptionError::CallbackServer)?;

        log::info!("Subscription runtime listening on {}", local_addr);

        Ok(Self {
            config,
            shared,
            handle,
            local_addr,
            running: AtomicBool::new(true),
            shutdown_tx: Mutex::new(Some(shutdown_tx)),
            server_thread: Mutex::new(Some(server_thread)),
        })
    }

    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL devices deliver notifications to
    pub fn callback_url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe with the configured default renewal period.
    pub fn subscribe(
        &self,
        device_ip: &str,
        service_path: &str,
        listener: Arc<dyn UpnpEventListener>,
    ) -> SubscriptionResult<String> {
        self.subscribe_with_renewal(device_ip, service_path, self.config.default_renewal_seconds, listener)
    }

    /// Subscribe to `service_path` on the device at `device_ip` and return
    /// the SID.
    ///
    /// With `renewal_seconds > 0` the subscription is renewed a minute
    /// before it would expire; `0` requests an infinite subscription and
    /// never renews. Periods of a minute or less are rejected before
    /// anything is sent.
    pub fn subscribe_with_renewal(
        &self,
        device_ip: &str,
        service_path: &str,
        renewal_seconds: u32,
        listener: Arc<dyn UpnpEventListener>,
    ) -> SubscriptionResult<String> {
        if !self.is_running() {
            return Err(SubscriptionError::RuntimeStopped);
        }
        let delay = renewal_delay(renewal_seconds)?;

        let shared = Arc::clone(&self.shared);
        let callback_url = self.callback_url();
        let (ip, path) = (device_ip.to_string(), service_path.to_string());

        // Registered on the event runtime as soon as the SID is known.
        let subscription = self.run(async move {
            let sid = shared.gena.subscribe(&ip, &path, &callback_url, renewal_seconds).await?;
            let subscription = Arc::new(Subscription::new(sid.clone(), ip, path, renewal_seconds, listener));
            shared.subscriptions.insert(sid, Arc::clone(&subscription));
            Ok::<_, SubscriptionError>(subscription)
        })??;
        let sid = subscription.sid().to_string();

        log::debug!("Subscribed to {} on {} as {}", service_path, device_ip, sid);

        if let Some(delay) = delay {
            let task = self.spawn_renewal(Arc::clone(&subscription), delay);
            subscription.set_renewal_task(task);
        }

        Ok(sid)
    }

    fn spawn_renewal(&self, subscription: Arc<Subscription>, delay: Duration) -> tokio::task::JoinHandle<()> {
        let shared = Arc::clone(&self.shared);

        self.handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + delay, delay);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let renewal = shared
                    .gena
                    .renew(
                        subscription.device_ip(),
                        subscription.service_path(),
                        subscription.sid(),
                        subscription.renewal_seconds(),
                    )
                    .await;

                match renewal {
                    Ok(RenewalOutcome::Renewed) => {
                        log::debug!("Renewed subscription {}", subscription.sid());
                    }
                    Ok(RenewalOutcome::Rejected(status)) => {
                        log::error!(
                            "Unspecified error renewing subscription {}: HTTP {}",
                            subscription.sid(),
                            status
                        );
                    }
                    Ok(RenewalOutcome::Expired) => {
                        log::warn!("Subscription {} expired on the device", subscription.sid());
                        shared.subscriptions.remove(subscription.sid());
                        let listener = subscription.listener();
                        notify_listener(move || {
                            listener.on_renewal_failed(&SubscriptionError::SubscriptionFailed(
                                "412 Precondition Failed".to_string(),
                            ));
                            listener.on_subscription_expired();
                        })
                        .await;
                        break;
                    }
                    Err(e) => {
                        log::error!("Failed to renew subscription {}: {}", subscription.sid(), e);
                        shared.subscriptions.remove(subscription.sid());
                        let listener = subscription.listener();
                        notify_listener(move || listener.on_renewal_failed(&e)).await;
                        break;
                    }
                }
            }
        })
    }

    /// Cancel the subscription with the given SID. Returns `false` for an
    /// unknown SID or when the device did not confirm.
    pub fn unsubscribe(&self, sid: &str) -> bool {
        match self.shared.subscriptions.get(sid).map(|entry| Arc::clone(entry.value())) {
            Some(subscription) => self.cancel(&subscription),
            None => {
                log::warn!("Could not unsubscribe from {}: no such subscription", sid);
                false
            }
        }
    }

    /// Cancel the subscription covering `service_path` on `device_ip`.
    pub fn unsubscribe_by_service_path(&self, device_ip: &str, service_path: &str) -> bool {
        let found = self
            .shared
            .subscriptions
            .iter()
            .find(|entry| entry.device_ip() == device_ip && entry.service_path() == service_path)
            .map(|entry| Arc::clone(entry.value()));

        match found {
            Some(subscription) => self.cancel(&subscription),
            None => {
                log::warn!("Could not unsubscribe from {} on {}: no such subscription", service_path, device_ip);
                false
            }
        }
    }

    /// Cancel every live subscription. Returns how many were confirmed.
    pub fn unsubscribe_all(&self) -> usize {
        let all: Vec<Arc<Subscription>> = self
            .shared
            .subscriptions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        all.iter().filter(|subscription| self.cancel(subscription)).count()
    }

    fn cancel(&self, subscription: &Arc<Subscription>) -> bool {
        let gena = self.shared.gena.clone();
        let (ip, path, sid) = (
            subscription.device_ip().to_string(),
            subscription.service_path().to_string(),
            subscription.sid().to_string(),
        );

        match self.run(async move { gena.unsubscribe(&ip, &path, &sid).await }) {
            Ok(Ok(true)) => {
                subscription.cancel_renewal();
                self.shared.subscriptions.remove(subscription.sid());
                subscription.listener().on_unsubscribed();
                true
            }
            Ok(Ok(false)) => {
                log::error!("Device refused to unsubscribe {}", subscription.sid());
                false
            }
            Ok(Err(e)) | Err(e) => {
                log::error!("Failed to unsubscribe {}: {}", subscription.sid(), e);
                false
            }
        }
    }

    pub fn subscription(&self, sid: &str) -> Option<Arc<Subscription>> {
        self.shared.subscriptions.get(sid).map(|entry| Arc::clone(entry.value()))
    }

    pub fn subscription_ids(&self) -> Vec<String> {
        self.shared.subscriptions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.subscriptions.len()
    }

    /// Unsubscribe everything, stop the listener and the renewal tasks.
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        log::info!("Shutting down subscription runtime on {}", self.local_addr);

        let confirmed = self.unsubscribe_all();
        log::debug!("Unsubscribed {} subscription(s)", confirmed);

        for entry in self.shared.subscriptions.iter() {
            entry.cancel_renewal();
        }
        self.shared.subscriptions.clear();

        if let Some(shutdown_tx) = self.shutdown_tx.lock().take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(thread) = self.server_thread.lock().take() {
            if thread.thread().id() != std::thread::current().id() && thread.join().is_err() {
                log::error!("Event listener thread panicked");
            }
        }
    }

    /// Drive `future` on the event runtime and wait for its result.
    fn run<F, T>(&self, future: F) -> SubscriptionResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if self.shutdown_tx.lock().is_none() {
            return Err(SubscriptionError::RuntimeStopped);
        }

        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        self.handle.spawn(async move {
            let _ = tx.send(future.await);
        });

        rx.recv().map_err(|_| SubscriptionError::RuntimeStopped)
    }
}

impl Drop for SubscriptionRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SubscriptionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRuntime")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

/// Run listener callbacks off the async workers.
async fn notify_listener<F>(callback: F)
where
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = tokio::task::spawn_blocking(callback).await {
        log::error!("Event listener failed: {}", e);
    }
}
