//! Concrete device adapters.

pub mod aqara;

pub use aqara::{AqaraClient, AqaraClientConfig};
