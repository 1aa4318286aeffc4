use sonos_upnp::SonosDevice;
use crate::commands::error::CommandResult;

/// A single action run against one resolved device.
pub trait Command {
    /// Returns the human-readable name of this command
    fn name(&self) -> &'static str;

    /// Executes the command, returning the line to print on success
    fn execute(&self, device: &SonosDevice) -> CommandResult;
}

/// How a device is shown to the user: its zone name when it answers,
/// its address otherwise.
pub fn label(device: &SonosDevice) -> String {
    device
        .device_name_cached()
        .unwrap_or_else(|| device.ip().to_string())
}
