//! Date handling for listing and detail pages
//!
//! - `DateParser`: turns heterogeneous date strings into timestamps, or an
//!   explicit `None` when nothing matches
//! - `RecencyWindow`: decides whether a date falls inside the trailing
//!   N-day window, comparing calendar dates in the source's offset

mod parser;
mod window;

pub use parser::{DateParser, PATTERN_NAMES};
pub use window::RecencyWindow;
