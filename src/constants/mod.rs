//! Pet tuning values: timing, motion, bubble layout and tip pipeline.

mod animation;
mod physics;
mod time;
mod tips;
mod ui;

pub use animation::*;
pub use physics::*;
pub use time::*;
pub use tips::*;
pub use ui::*;
