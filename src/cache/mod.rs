//! Content-addressed result cache
//!
//! Results are keyed by a fingerprint of everything that influences a
//! provider call, so repeated runs skip work they have already done.

mod key;
mod store;

pub use key::CacheKey;
pub use store::{CacheStore, FileCacheStore};
