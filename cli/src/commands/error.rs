use std::fmt;
use sonos_upnp::SonosError;

/// Errors that can occur during command execution
#[derive(Debug)]
pub enum CommandError {
    /// No device answered discovery
    NoDevicesFound,
    /// No device carries the requested room name
    DeviceNotFound(String),
    /// Error from the underlying Sonos library
    SonosError(SonosError),
    /// Reading from the terminal failed
    Io(std::io::Error),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CommandError::NoDevicesFound => {
                write!(f, "No Sonos devices found on the network")
            }
            CommandError::DeviceNotFound(name) => {
                write!(f, "Device not found: {}", name)
            }
            CommandError::SonosError(err) => {
                write!(f, "Sonos error: {}", err)
            }
            CommandError::Io(err) => {
                write!(f, "Terminal error: {}", err)
            }
        }
    }
}

impl std::error::Error for CommandError {}

impl From<SonosError> for CommandError {
    fn from(err: SonosError) -> Self {
        CommandError::SonosError(err)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Io(err)
    }
}

/// Result type for command execution
pub type CommandResult = Result<String, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_display() {
        assert_eq!(CommandError::NoDevicesFound.to_string(), "No Sonos devices found on the network");
        assert_eq!(
            CommandError::DeviceNotFound("Living Room".to_string()).to_string(),
            "Device not found: Living Room"
        );

        let error = CommandError::from(SonosError::protocol(701, "192.168.1.20", "<errorCode>701</errorCode>"));
        assert_eq!(
            error.to_string(),
            "Sonos error: UPnP Error 701 (Invalid transition) received from 192.168.1.20"
        );
    }
}
