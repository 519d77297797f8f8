//! Counting multiset and layered (scope-style) map.
//!
//! [`Counter`] counts hashable keys and supports multiset arithmetic.
//! [`LayeredMap`] presents an ordered stack of shared mappings as one map,
//! with writes confined to the innermost layer.

mod counter;
mod error;
mod layered_map;

pub use counter::{Count, Counter};
pub use error::{LayeredMapError, Result};
pub use layered_map::{Layer, LayeredMap};
