use std::io::BufRead;
use std::sync::Arc;

use sonos_upnp::{AvTransportEvent, PlayMode, PlayState, QueueEvent, SonosDevice, SonosEventListener, TrackInfo};
use crate::commands::{label, Command, CommandResult};

type Sink = Box<dyn Fn(String) + Send + Sync>;

/// Writes one line per device event.
pub struct PrintingListener {
    device: String,
    sink: Sink,
}

impl PrintingListener {
    pub fn new(device: impl Into<String>) -> Self {
        Self::with_sink(device, Box::new(|line| println!("{}", line)))
    }

    pub fn with_sink(device: impl Into<String>, sink: Sink) -> Self {
        Self {
            device: device.into(),
            sink,
        }
    }

    fn emit(&self, what: String) {
        (self.sink)(format!("[{}] {}", self.device, what));
    }
}

impl SonosEventListener for PrintingListener {
    fn volume_changed(&self, volume: u8) {
        self.emit(format!("volume {}", volume));
    }

    fn play_state_changed(&self, state: PlayState) {
        self.emit(format!("state {}", state));
    }

    fn play_mode_changed(&self, mode: PlayMode) {
        self.emit(format!("play mode {}", mode));
    }

    fn queue_changed(&self, queues: &[QueueEvent]) {
        let ids: Vec<String> = queues.iter().map(|queue| queue.queue_id.to_string()).collect();
        self.emit(format!("queue changed ({})", ids.join(", ")));
    }

    fn track_changed(&self, track: &TrackInfo) {
        if track.metadata.is_empty() {
            self.emit(format!("track {}", track.uri));
        } else {
            self.emit(format!("track {} - {}", track.metadata.creator, track.metadata.title));
        }
    }

    fn treble_changed(&self, treble: i8) {
        self.emit(format!("treble {}", treble));
    }

    fn bass_changed(&self, bass: i8) {
        self.emit(format!("bass {}", bass));
    }

    fn loudness_changed(&self, loudness: bool) {
        self.emit(format!("loudness {}", if loudness { "on" } else { "off" }));
    }

    fn av_transport_event(&self, event: &AvTransportEvent) {
        log::debug!("[{}] transport event {:?}", self.device, event);
    }

    fn device_connected(&self, device_name: &str) {
        self.emit(format!("{} joined the household", device_name));
    }

    fn device_disconnected(&self, device_name: &str) {
        self.emit(format!("{} left the household", device_name));
    }

    fn group_changed(&self, members: &[String]) {
        self.emit(format!("group is now {}", members.join(", ")));
    }
}

/// Print events until Enter is pressed
pub struct Watch;

impl Command for Watch {
    fn name(&self) -> &'static str {
        "Watch"
    }

    fn execute(&self, device: &SonosDevice) -> CommandResult {
        let name = label(device);
        let listener: Arc<dyn SonosEventListener> = Arc::new(PrintingListener::new(name.clone()));
        let id = device.register_listener(listener)?;

        println!("Watching {} (press Enter to stop)", name);
        let mut line = String::new();
        let read = std::io::stdin().lock().read_line(&mut line);

        if let Some(id) = id {
            device.unregister_listener(id);
        }
        device.control_point().shutdown();
        read?;

        Ok(format!("Stopped watching {}", name))
    }
}
