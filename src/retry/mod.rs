//! Retry module
//! - policy.rs: bounded exponential-backoff retries around provider round-trips

pub mod policy;

pub use policy::*;
