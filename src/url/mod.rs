//! URL handling for Tidings
//!
//! Article identity is the normalized URL: the same story reached through a
//! tracking link, with a fragment or with reordered query parameters must
//! map to one history entry.

mod normalize;

pub use normalize::{normalize_url, resolve_link};
