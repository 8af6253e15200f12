//! Users domain: remote gateway, shared state, filtering and form validation.

pub mod client;
pub mod error;
pub mod filter;
pub mod keys;
pub mod store;
pub mod types;
pub mod validate;

pub use client::{UserClient, UserSource};
pub use error::TransportError;
pub use store::UserStore;
pub use types::{NewUser, User};
