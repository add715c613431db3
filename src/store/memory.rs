/// In-process stores for tests and local development.
///
/// They enforce the same uniqueness rules as the Postgres schema so the engine
/// behaves identically against either backend.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{RefreshToken, User};
use crate::error::AppError;
use crate::store::{RefreshTokenStore, UserStore};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        read(&self.users).values().find(|u| predicate(u)).cloned()
    }

    fn conflict(users: &HashMap<Uuid, User>, candidate: &User) -> Option<&'static str> {
        for other in users.values().filter(|u| u.id != candidate.id) {
            if other.email == candidate.email {
                return Some("user with this email already exists");
            }
            if candidate.is_oauth_user()
                && other.oauth_provider == candidate.oauth_provider
                && other.oauth_id == candidate.oauth_id
            {
                return Some("account already linked to another user");
            }
        }
        None
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: &User) -> Result<(), AppError> {
        let mut users = write(&self.users);
        if users.contains_key(&user.id) {
            return Err(AppError::AlreadyExists("user already exists"));
        }
        if let Some(reason) = Self::conflict(&users, user) {
            return Err(AppError::AlreadyExists(reason));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(read(&self.users).get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.email == email))
    }

    async fn get_by_oauth_id(
        &self,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| {
            u.oauth_provider.as_deref() == Some(provider) && u.oauth_id.as_deref() == Some(external_id)
        }))
    }

    async fn get_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.verification_token.as_deref() == Some(token)))
    }

    async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        Ok(self.find(|u| u.reset_token.as_deref() == Some(token)))
    }

    async fn consume_reset_token(&self, token: &str, password_hash: &str) -> Result<bool, AppError> {
        let mut users = write(&self.users);
        match users
            .values_mut()
            .find(|u| u.reset_token.as_deref() == Some(token))
        {
            Some(user) => {
                user.replace_password(password_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update(&self, user: &User) -> Result<(), AppError> {
        let mut users = write(&self.users);
        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound("user"));
        }
        if let Some(reason) = Self::conflict(&users, user) {
            return Err(AppError::AlreadyExists(reason));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        write(&self.users)
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound("user"))
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = read(&self.users).values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(users.into_iter().skip(offset).take(limit).collect())
    }
}

#[derive(Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn create(&self, token: &RefreshToken) -> Result<(), AppError> {
        let mut tokens = write(&self.tokens);
        if tokens.contains_key(&token.token_hash) {
            return Err(AppError::AlreadyExists("refresh token already exists"));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn get_by_token(&self, token_hash: &str) -> Result<Option<RefreshToken>, AppError> {
        Ok(read(&self.tokens).get(token_hash).cloned())
    }

    async fn list_valid_for_user(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, AppError> {
        let mut valid: Vec<RefreshToken> = read(&self.tokens)
            .values()
            .filter(|t| t.user_id == user_id && t.is_valid())
            .cloned()
            .collect();
        valid.sort_by_key(|t| t.created_at);
        Ok(valid)
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool, AppError> {
        match write(&self.tokens).get_mut(token_hash) {
            Some(token) if !token.is_revoked() => {
                token.revoke();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut revoked = 0;
        for token in write(&self.tokens)
            .values_mut()
            .filter(|t| t.user_id == user_id && !t.is_revoked())
        {
            token.revoke();
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn delete_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut tokens = write(&self.tokens);
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= now);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: &str) -> User {
        User::with_password(email.to_string(), "hash".to_string(), "Name".to_string(), None)
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryUserStore::new();
        store.create(&user("a@x.com")).await.unwrap();

        let result = store.create(&user("a@x.com")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_duplicate_oauth_link_rejected() {
        let store = InMemoryUserStore::new();
        let first = User::with_oauth("a@x.com".into(), "A".into(), None, "google", "g-1".into());
        store.create(&first).await.unwrap();

        let mut second = user("b@x.com");
        store.create(&second).await.unwrap();
        second.link_oauth("google", "g-1".to_string(), None);

        let result = store.update(&second).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_lookups_miss_with_none() {
        let store = InMemoryUserStore::new();
        assert!(store.get_by_email("nobody@x.com").await.unwrap().is_none());
        assert!(store.get_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.get_by_reset_token("nope").await.unwrap().is_none());
        assert!(matches!(
            store.update(&user("ghost@x.com")).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(
            store.delete(Uuid::new_v4()).await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn test_reset_token_is_consumed_once() {
        let store = InMemoryUserStore::new();
        let mut stored = user("a@x.com");
        stored.reset_token = Some("reset-1".to_string());
        stored.reset_token_expires_at = Some(Utc::now() + Duration::hours(1));
        store.create(&stored).await.unwrap();

        assert!(store.consume_reset_token("reset-1", "$2b$04$new").await.unwrap());
        assert!(!store.consume_reset_token("reset-1", "$2b$04$other").await.unwrap());

        let updated = store.get_by_id(stored.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash.as_deref(), Some("$2b$04$new"));
        assert!(updated.reset_token.is_none());
        assert!(updated.reset_token_expires_at.is_none());
    }

    #[tokio::test]
    async fn test_list_paginates_in_creation_order() {
        let store = InMemoryUserStore::new();
        for i in 0..5 {
            let mut u = user(&format!("user{}@x.com", i));
            u.created_at = Utc::now() + Duration::seconds(i);
            store.create(&u).await.unwrap();
        }

        let page = store.list(2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].email, "user1@x.com");
        assert_eq!(page[1].email, "user2@x.com");
        assert!(store.list(10, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_token_revocation_and_sweep() {
        let store = InMemoryRefreshTokenStore::new();
        let user_id = Uuid::new_v4();
        let live = RefreshToken::new(user_id, "live".to_string(), Utc::now() + Duration::days(1));
        let other = RefreshToken::new(user_id, "other".to_string(), Utc::now() + Duration::days(1));
        let stale = RefreshToken::new(user_id, "stale".to_string(), Utc::now() - Duration::days(1));
        for t in [&live, &other, &stale] {
            store.create(t).await.unwrap();
        }

        assert_eq!(store.list_valid_for_user(user_id).await.unwrap().len(), 2);

        assert!(store.revoke("live").await.unwrap());
        assert!(!store.revoke("live").await.unwrap());
        assert!(!store.revoke("never-issued").await.unwrap());
        assert!(store.get_by_token("live").await.unwrap().unwrap().is_revoked());
        assert_eq!(store.list_valid_for_user(user_id).await.unwrap().len(), 1);

        // "other" and "stale" were still unrevoked
        assert_eq!(store.revoke_all_for_user(user_id).await.unwrap(), 2);
        assert_eq!(store.revoke_all_for_user(user_id).await.unwrap(), 0);

        assert_eq!(store.delete_expired().await.unwrap(), 1);
        assert!(store.get_by_token("stale").await.unwrap().is_none());
        assert!(store.get_by_token("live").await.unwrap().is_some());
    }
}
