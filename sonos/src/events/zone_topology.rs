use std::collections::BTreeSet;

use parking_lot::Mutex;
use xmltree::Element;

use super::DispatchTarget;
use crate::streaming::event::child_elements;
use crate::streaming::{InboundEvent, UpnpEventListener};

/// Zone names grouped the way the household reports them.
pub type ZoneGroups = Vec<Vec<String>>;

#[derive(Debug, Default)]
struct TopologyState {
    present: BTreeSet<String>,
    group: Vec<String>,
}

/// Tracks which devices are visible in the household and which of them
/// share a group with this device.
#[derive(Debug)]
pub struct ZoneTopologyDispatcher {
    target: DispatchTarget,
    state: Mutex<TopologyState>,
}

impl ZoneTopologyDispatcher {
    pub fn new(target: DispatchTarget) -> Self {
        Self {
            target,
            state: Mutex::new(TopologyState::default()),
        }
    }

    fn own_group(&self, groups: &ZoneGroups) -> Vec<String> {
        let Some(own_name) = self.target.device_name() else {
            return Vec::new();
        };
        groups
            .iter()
            .find(|members| members.iter().any(|name| *name == own_name))
            .cloned()
            .unwrap_or_default()
    }
}

impl UpnpEventListener for ZoneTopologyDispatcher {
    fn on_initial_event(&self, event: &InboundEvent) {
        let Some(groups) = decode(event) else {
            return;
        };
        let group = self.own_group(&groups);

        let mut state = self.state.lock();
        state.present = groups.into_iter().flatten().collect();
        if !group.is_empty() {
            state.group = group;
        }
    }

    fn on_event(&self, event: &InboundEvent) {
        let Some(groups) = decode(event) else {
            return;
        };
        let group = self.own_group(&groups);
        let visible: BTreeSet<String> = groups.into_iter().flatten().collect();

        let (connected, disconnected, group_changed) = {
            let mut state = self.state.lock();

            let connected: Vec<String> = visible.difference(&state.present).cloned().collect();
            let disconnected: Vec<String> = state.present.difference(&visible).cloned().collect();
            state.present = visible;

            // A partial topology that leaves this device out says nothing
            // about its group.
            let group_changed = !group.is_empty() && !state.group.is_empty() && !same_members(&state.group, &group);
            if !group.is_empty() {
                state.group = group.clone();
            }

            (connected, disconnected, group_changed)
        };

        for name in &connected {
            self.target.emit(|listener| listener.device_connected(name));
        }
        for name in &disconnected {
            self.target.emit(|listener| listener.device_disconnected(name));
        }
        if group_changed {
            log::debug!("Group of {} changed to {:?}", self.target.device_key(), group);
            self.target.emit(|listener| listener.group_changed(&group));
        }
    }
}

fn same_members(previous: &[String], current: &[String]) -> bool {
    previous.len() == current.len()
        && previous.iter().collect::<BTreeSet<_>>() == current.iter().collect::<BTreeSet<_>>()
}

/// Zone names per group from the `ZoneGroupState` property, or `None` if
/// the event does not carry one.
pub fn decode(event: &InboundEvent) -> Option<ZoneGroups> {
    let state = event.property("ZoneGroupState")?;
    let Some(zone_groups) = find_zone_groups(state) else {
        log::warn!("ZoneGroupState without ZoneGroups");
        return None;
    };

    Some(
        child_elements(zone_groups)
            .filter(|group| group.name == "ZoneGroup")
            .map(|group| {
                child_elements(group)
                    .filter(|member| member.name == "ZoneGroupMember")
                    .filter_map(|member| member.attributes.get("ZoneName").cloned())
                    .collect()
            })
            .collect(),
    )
}

// Newer firmware wraps the groups in a second ZoneGroupState element.
fn find_zone_groups(state: &Element) -> Option<&Element> {
    state
        .get_child("ZoneGroups")
        .or_else(|| state.get_child("ZoneGroupState")?.get_child("ZoneGroups"))
}
