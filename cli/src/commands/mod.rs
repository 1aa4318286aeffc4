pub mod types;
pub mod error;
pub mod playback;
pub mod volume;
pub mod watch;
pub mod target;

pub use types::*;
pub use error::*;
pub use playback::*;
pub use volume::*;
pub use watch::*;
pub use target::*;
