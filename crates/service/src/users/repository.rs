use async_trait::async_trait;

use super::domain::User;
use crate::errors::StoreError;

/// Repository abstraction over user persistence.
/// HTTP handlers hold `Arc<dyn UserRepository>`; `UserStore` is the file-backed implementation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, email: &str, password_hash: &[u8]) -> Result<User, StoreError>;
    async fn list_all(&self) -> Result<Vec<User>, StoreError>;
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError>;
    async fn find(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_refresh_token(&self, token: &str) -> Result<Option<User>, StoreError>;
    async fn update(&self, id: i64, email: &str, password_hash: &[u8]) -> Result<User, StoreError>;
    async fn upgrade(&self, id: i64) -> Result<(), StoreError>;
    async fn store_refresh_token(&self, id: i64, token: &str) -> Result<(), StoreError>;
    async fn revoke_refresh_token(&self, id: i64) -> Result<(), StoreError>;
}
