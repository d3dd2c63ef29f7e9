//! Core data types shared across the pipelines.

pub mod chat;
pub mod provider_options;
pub mod schema;
pub mod streaming;
pub mod tools;

pub use chat::*;
pub use provider_options::*;
pub use schema::*;
pub use streaming::*;
pub use tools::*;
