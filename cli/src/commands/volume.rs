use sonos_upnp::SonosDevice;
use crate::commands::{label, Command, CommandResult};

/// Read the volume, or set it when a level is given. Levels outside
/// 0..=100 are clamped by the device facade.
pub struct Volume {
    pub level: Option<i32>,
}

impl Command for Volume {
    fn name(&self) -> &'static str {
        "Volume"
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        if let Some(level) = self.level {
            device.set_volume(level)?;
        }
        Ok(format!("{} volume: {}", label(device), device.volume()?))
    }
}

/// Set mute, or toggle it when no state is given
pub struct Mute {
    pub state: Option<bool>,
}

impl Command for Mute {
    fn name(&self) -> &'static str {
        "Mute"
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        match self.state {
            Some(state) => device.set_mute(state)?,
            None => device.switch_mute()?,
        }
        let muted = device.is_muted()?;
        Ok(format!("{} {}", label(device), if muted { "muted" } else { "unmuted" }))
    }
}
