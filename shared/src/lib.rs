//! Shared types for the Perch waitlist framework
//!
//! Common types used by the waitlist edge server and its clients:
//! domain models, waitlist event payloads and utility helpers.

pub mod message;
pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

// Event re-exports (for convenient access)
pub use message::{WaitlistEvent, WaitlistEventKind};
