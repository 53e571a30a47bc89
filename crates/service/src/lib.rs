//! Service layer for the user database.
//! - `storage` holds the generic whole-file JSON document with its lock.
//! - `users` builds the user record store and its repository trait on top.
//! - `runtime` wires a store from configuration.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod users;

pub use errors::StoreError;
pub use users::{StoreOptions, User, UserRepository, UserStore};
