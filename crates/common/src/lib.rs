//! Common types shared by the notes client crates

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
