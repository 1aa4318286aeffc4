use super::DispatchTarget;
use crate::model::QueueEvent;
use crate::streaming::event::{child_elements, val};
use crate::streaming::{InboundEvent, UpnpEventListener};

/// Reports which queues a device changed.
#[derive(Debug)]
pub struct QueueDispatcher {
    target: DispatchTarget,
}

impl QueueDispatcher {
    pub fn new(target: DispatchTarget) -> Self {
        Self { target }
    }
}

impl UpnpEventListener for QueueDispatcher {
    fn on_event(&self, event: &InboundEvent) {
        for queues in decode(event) {
            self.target.emit(|listener| listener.queue_changed(&queues));
        }
    }
}

/// One list of touched queues per `LastChange` property.
pub fn decode(event: &InboundEvent) -> Vec<Vec<QueueEvent>> {
    event
        .properties()
        .filter(|property| property.name == "LastChange")
        .filter_map(|property| property.get_child("Event"))
        .map(|change| {
            child_elements(change)
                .filter(|element| element.name == "QueueID")
                .filter_map(queue_event)
                .collect()
        })
        .collect()
}

fn queue_event(element: &xmltree::Element) -> Option<QueueEvent> {
    let queue_id = match val(element).map(str::trim).map(str::parse::<i32>) {
        Some(Ok(id)) => id,
        _ => {
            log::warn!("Ignoring queue change without a valid QueueID");
            return None;
        }
    };

    let update_id = element
        .get_child("UpdateID")
        .and_then(val)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(-1);

    let mut queue = QueueEvent::new(queue_id, update_id);
    queue.curated = element
        .get_child("Curated")
        .and_then(val)
        .and_then(|v| v.trim().parse::<i32>().ok())
        .map(|v| v != 0);
    Some(queue)
}
