use super::DispatchTarget;
use crate::streaming::event::{child_elements, last_change_instance, val};
use crate::streaming::{InboundEvent, UpnpEventListener};

/// A decoded RenderingControl state variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingChange {
    Volume(u8),
    Treble(i8),
    Bass(i8),
    Loudness(bool),
}

/// Forwards volume, treble, bass and loudness changes.
///
/// The initial event is ignored: it carries the full current state, not a
/// change.
#[derive(Debug)]
pub struct RenderingControlDispatcher {
    target: DispatchTarget,
}

impl RenderingControlDispatcher {
    pub fn new(target: DispatchTarget) -> Self {
        Self { target }
    }
}

impl UpnpEventListener for RenderingControlDispatcher {
    fn on_event(&self, event: &InboundEvent) {
        for change in decode(event) {
            match change {
                RenderingChange::Volume(volume) => self.target.emit(|l| l.volume_changed(volume)),
                RenderingChange::Treble(treble) => self.target.emit(|l| l.treble_changed(treble)),
                RenderingChange::Bass(bass) => self.target.emit(|l| l.bass_changed(bass)),
                RenderingChange::Loudness(on) => self.target.emit(|l| l.loudness_changed(on)),
            }
        }
    }
}

/// Every change carried by the `LastChange` properties of `event`, in
/// document order. Only the master channel volume is reported.
pub fn decode(event: &InboundEvent) -> Vec<RenderingChange> {
    let mut changes = Vec::new();

    for property in event.properties().filter(|p| p.name == "LastChange") {
        let Some(instance) = last_change_instance(property) else {
            continue;
        };

        for element in child_elements(instance) {
            let Some(raw) = val(element) else {
                continue;
            };
            let raw = raw.trim();

            let change = match element.name.as_str() {
                "Volume" => {
                    if element.attributes.get("channel").map(String::as_str) != Some("Master") {
                        continue;
                    }
                    raw.parse().ok().map(RenderingChange::Volume)
                }
                "Treble" => raw.parse().ok().map(RenderingChange::Treble),
                "Bass" => raw.parse().ok().map(RenderingChange::Bass),
                "Loudness" => raw.parse::<i32>().ok().map(|v| RenderingChange::Loudness(v != 0)),
                _ => continue,
            };

            match change {
                Some(change) => changes.push(change),
                None => log::warn!("Ignoring invalid {} value {:?}", element.name, raw),
            }
        }
    }

    changes
}
