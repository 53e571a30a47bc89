//! User records: domain types, the file-backed store and the repository seam.

pub mod domain;
pub mod repository;
pub mod store;

pub use domain::{User, UserDocument};
pub use repository::UserRepository;
pub use store::{StoreOptions, UserStore};
