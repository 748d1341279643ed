//! Credential storage and token endpoint calls for the notes API
//!
//! This crate knows the wire contracts of the auth routes and how a
//! credential pair is kept; it does not know when to refresh. That policy
//! lives in `notes-session`.
//!
//! Credential flow:
//! 1. `token::login()` posts the user's password form and returns a token pair
//! 2. The pair is stored through a `CredentialStore` (`MemoryStore` or `FileStore`)
//! 3. On an expired access token the session layer calls `token::refresh_token()`
//! 4. The rotated pair replaces the old one in a single `set`
//! 5. Logout or a terminal failure calls `clear`

pub mod account;
pub mod claims;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod token;

pub use account::{NewAccount, register};
pub use claims::{Claims, decode_claims};
pub use constants::*;
pub use credentials::{CredentialPair, CredentialStore, FileStore, MemoryStore, StoreFuture};
pub use error::{Error, Result};
pub use token::{TokenResponse, login, refresh_token};
