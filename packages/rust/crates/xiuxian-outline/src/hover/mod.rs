//! Hover preview: delayed popover display over resolve + parse.
//!
//! [`HoverMachine`] is the timer-free state machine, [`PreviewCache`] the
//! bounded fetch cache, and [`HoverPreview`] drives both with tokio timers.

mod cache;
mod controller;
mod machine;

pub use cache::PreviewCache;
pub use controller::{HoverPreview, PreviewLoader};
pub use machine::{HoverAnchor, HoverMachine, HoverPhase, HoverTiming};
