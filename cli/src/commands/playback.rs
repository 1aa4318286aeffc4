use sonos_upnp::SonosDevice;
use crate::commands::{label, Command, CommandResult};

/// Transport actions that take no argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Play,
    Pause,
    Stop,
    Next,
    Previous,
}

impl Command for Transport {
    fn name(&self) -> &'static str {
        match self {
            Transport::Play => "Play",
            Transport::Pause => "Pause",
            Transport::Stop => "Stop",
            Transport::Next => "Next",
            Transport::Previous => "Previous",
        }
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        match self {
            Transport::Play => device.play()?,
            Transport::Pause => device.pause()?,
            Transport::Stop => device.stop()?,
            Transport::Next => device.next()?,
            Transport::Previous => device.previous()?,
        }
        Ok(format!("{}: {}", self.name(), label(device)))
    }
}

/// Switch to a URI and start playing it
pub struct PlayUri {
    pub uri: String,
}

impl Command for PlayUri {
    fn name(&self) -> &'static str {
        "Play URI"
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        device.play_uri(&self.uri, None)?;
        Ok(format!("Playing {} on {}", self.uri, label(device)))
    }
}

/// Current play state and track
pub struct Status;

impl Command for Status {
    fn name(&self) -> &'static str {
        "Status"
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        let state = device.play_state()?;
        let track = device.current_track_info()?;
        let volume = device.volume()?;

        let mut lines = vec![format!("{} [{}] volume {}", label(device), state, volume)];
        if track.is_empty() {
            lines.push("  (queue is empty)".to_string());
        } else {
            lines.push(format!(
                "  #{} {} - {} ({} / {})",
                track.queue_index,
                track.metadata.creator,
                track.metadata.title,
                track.position_as_string(),
                track.duration_as_string()
            ));
        }
        Ok(lines.join("\n"))
    }
}
