use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, BufMut};
use futures::{Stream, TryStreamExt};
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

use super::event::{InboundEvent, NotifyHeaders, NotifyRequest};
use super::listener::UpnpEventListener;
use super::subscription::SubscriptionTable;

/// Bodies larger than this are cut off
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Status sent back for one inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStatus {
    Ok,
    BadRequest,
    PreconditionFailed,
}

impl CallbackStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CallbackStatus::Ok => StatusCode::OK,
            CallbackStatus::BadRequest => StatusCode::BAD_REQUEST,
            CallbackStatus::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        }
    }
}

/// Everything the NOTIFY handler needs
pub(crate) struct CallbackContext {
    pub subscriptions: Arc<SubscriptionTable>,
    pub read_timeout: Duration,
    pub idle_timeout: Duration,
    pub server_header: String,
}

/// What to do with one inbound request
pub(crate) enum Routed {
    Deliver {
        listener: Arc<dyn UpnpEventListener>,
        event: InboundEvent,
    },
    Reject(CallbackStatus),
}

#[derive(Debug)]
struct NotNotify;

impl warp::reject::Reject for NotNotify {}

/// The callback endpoint: NOTIFY on any path, answered once the body has
/// been read. Every other method gets `405`.
pub(crate) fn routes(context: Arc<CallbackContext>) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_context = warp::any().map(move || Arc::clone(&context));

    notify_method()
        .and(notify_headers())
        .and(warp::addr::remote())
        .and(warp::body::stream())
        .and(with_context)
        .and_then(handle_notify)
        .recover(handle_rejection)
}

fn notify_method() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::method()
        .and_then(|method: Method| async move {
            if method.as_str() == "NOTIFY" {
                Ok(())
            } else {
                Err(warp::reject::custom(NotNotify))
            }
        })
        .untuple_one()
}

fn notify_headers() -> impl Filter<Extract = (NotifyHeaders,), Error = Rejection> + Clone {
    warp::header::optional::<String>("host")
        .and(warp::header::optional::<usize>("content-length"))
        .and(warp::header::optional::<String>("nt"))
        .and(warp::header::optional::<String>("nts"))
        .and(warp::header::optional::<String>("sid"))
        .and(warp::header::optional::<String>("seq"))
        .map(
            |host: Option<String>,
             content_length: Option<usize>,
             nt: Option<String>,
             nts: Option<String>,
             sid: Option<String>,
             seq: Option<String>| NotifyHeaders {
                host,
                content_length,
                nt,
                nts,
                sid,
                seq,
            },
        )
}

async fn handle_notify<S, B>(
    headers: NotifyHeaders,
    peer: Option<SocketAddr>,
    body: S,
    context: Arc<CallbackContext>,
) -> Result<warp::reply::Response, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let peer = peer.map(|addr| addr.to_string()).unwrap_or_else(|| "unknown peer".to_string());
    let body = read_body(body, context.read_timeout, context.idle_timeout).await;

    match route(headers, &body, &context.subscriptions) {
        Routed::Deliver { listener, event } => {
            // The acknowledgement goes out while the listener runs.
            tokio::spawn(async move {
                let dispatched = tokio::task::spawn_blocking(move || {
                    if event.seq == 0 {
                        listener.on_initial_event(&event);
                    } else {
                        listener.on_event(&event);
                    }
                })
                .await;

                if let Err(e) = dispatched {
                    log::error!("Event listener failed while handling event from {}: {}", peer, e);
                }
            });
            Ok(reply(CallbackStatus::Ok, &context.server_header))
        }
        Routed::Reject(status) => {
            log::debug!("Answering {} to {}", status.status_code(), peer);
            Ok(reply(status, &context.server_header))
        }
    }
}

/// Drain the request body. Waits `read_timeout` for the first chunk, then
/// stops after `idle_timeout` of silence. A stalled peer ends up with
/// whatever arrived so far.
async fn read_body<S, B>(body: S, read_timeout: Duration, idle_timeout: Duration) -> Vec<u8>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let mut body = Box::pin(body);
    let mut received = Vec::new();

    loop {
        let wait = if received.is_empty() { read_timeout } else { idle_timeout };

        match tokio::time::timeout(wait, body.try_next()).await {
            Ok(Ok(Some(chunk))) => {
                received.put(chunk);
                if received.len() >= MAX_BODY_SIZE {
                    received.truncate(MAX_BODY_SIZE);
                    break;
                }
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                log::debug!("Error reading event body: {}", e);
                break;
            }
            Err(_) => {
                log::debug!("Event body stalled after {} bytes", received.len());
                break;
            }
        }
    }

    received
}

/// Decide how to answer a request and whom to hand the event to.
pub(crate) fn route(headers: NotifyHeaders, body: &[u8], subscriptions: &SubscriptionTable) -> Routed {
    let notify = match NotifyRequest::new(headers, body) {
        Ok(notify) => notify,
        Err(e) => {
            log::warn!("Dropped event: {}", e);
            return Routed::Reject(CallbackStatus::BadRequest);
        }
    };

    let Some(sid) = notify.sid() else {
        log::warn!("Dropped event without SID");
        return Routed::Reject(CallbackStatus::BadRequest);
    };

    let Some(subscription) = subscriptions.get(sid).map(|entry| Arc::clone(entry.value())) else {
        log::debug!("Dropped event for unknown subscription {}", sid);
        return Routed::Reject(CallbackStatus::PreconditionFailed);
    };

    let seq = match notify.seq() {
        Ok(seq) => seq,
        Err(e) => {
            log::warn!("Dropped event for {}: {}", sid, e);
            return Routed::Reject(CallbackStatus::BadRequest);
        }
    };

    let last = subscription.last_sequence();
    if !subscription.advance_sequence(seq) {
        log::warn!(
            "Event {} for {} arrived out of order (last seen {})",
            seq,
            subscription.sid(),
            last
        );
    }

    match notify.into_event() {
        Ok(event) => Routed::Deliver {
            listener: subscription.listener(),
            event,
        },
        Err(e) => {
            log::warn!("Malformed event for {}: {}", subscription.sid(), e);
            Routed::Reject(CallbackStatus::BadRequest)
        }
    }
}

fn reply(status: CallbackStatus, server_header: &str) -> warp::reply::Response {
    let reply = warp::reply::with_status(warp::reply(), status.status_code());
    let reply = warp::reply::with_header(reply, "server", server_header);
    warp::reply::with_header(reply, "connection", "close").into_response()
}

async fn handle_rejection(rejection: Rejection) -> Result<warp::reply::Response, Infallible> {
    let status = if rejection.find::<NotNotify>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        log::debug!("Rejected callback request: {:?}", rejection);
        StatusCode::BAD_REQUEST
    };

    let reply = warp::reply::with_status(warp::reply(), status);
    Ok(warp::reply::with_header(reply, "connection", "close").into_response())
}
