mod client;
mod config;
mod constants;
mod errors;
mod event;
mod fields;
mod identity;
mod metrics;
mod namespace;
mod schema;
mod store;
mod transport;
mod watcher;

pub use client::*;
pub use config::*;
pub use errors::*;
pub use event::*;
pub use fields::*;
pub use identity::*;
pub use metrics::*;
pub use namespace::*;
pub use schema::*;
pub use store::*;
pub use transport::*;
pub use watcher::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
