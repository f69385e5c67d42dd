//! URL handling module for Parcrawl
//!
//! Host extraction keys the per-host admission gates; normalization makes links
//! discovered on different pages compare equal in the visited set.

mod domain;
mod normalize;

pub use domain::{extract_host, host_of};
pub use normalize::{normalize_parsed, normalize_url};
