use std::fmt;
use std::str::FromStr;

/// Transport state reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayState {
    Error,
    Stopped,
    Playing,
    Paused,
    Transitioning,
}

impl PlayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayState::Error => "ERROR",
            PlayState::Stopped => "STOPPED",
            PlayState::Playing => "PLAYING",
            PlayState::Paused => "PAUSED_PLAYBACK",
            PlayState::Transitioning => "TRANSITIONING",
        }
    }
}

impl FromStr for PlayState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ERROR" => Ok(PlayState::Error),
            "STOPPED" => Ok(PlayState::Stopped),
            "PLAYING" => Ok(PlayState::Playing),
            "PAUSED_PLAYBACK" => Ok(PlayState::Paused),
            "TRANSITIONING" => Ok(PlayState::Transitioning),
            other => Err(format!("Unknown transport state: {:?}", other)),
        }
    }
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
