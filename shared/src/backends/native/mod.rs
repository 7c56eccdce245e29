mod instant;
mod timer;
mod wall_clock;

pub use instant::Instant;
pub use timer::Timer;
pub use wall_clock::{TimeError, WallClock};
