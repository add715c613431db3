use uuid::Uuid;

use crate::accounts::AccountService;
use crate::domain::User;
use crate::error::AppError;

const MIN_PAGE_SIZE: i64 = 1;
const MAX_PAGE_SIZE: i64 = 100;

impl AccountService {
    pub async fn get_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.require_user(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: String,
        phone: Option<String>,
    ) -> Result<User, AppError> {
        let mut user = self.require_user(user_id).await?;
        user.update_profile(name, phone);
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    /// Store the URL of an already hosted avatar image
    pub async fn update_avatar(&self, user_id: Uuid, avatar_url: String) -> Result<User, AppError> {
        let mut user = self.require_user(user_id).await?;
        user.set_avatar_url(avatar_url);
        self.users.update(&user).await?;

        tracing::info!(user_id = %user.id, "Avatar updated");
        Ok(user)
    }

    /// Oldest accounts first. `limit` is clamped to 1..=100, negative offsets count as 0.
    pub async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>, AppError> {
        let limit = limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        self.users.list(limit, offset.max(0)).await
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users.delete(user_id).await?;
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::fakes::harness;

    #[tokio::test]
    async fn test_update_profile_and_avatar() {
        let h = harness();
        let user = h
            .accounts
            .register("a@x.com".into(), "pw12345678", "A".into(), Some("000".into()))
            .await
            .unwrap();

        let updated = h
            .accounts
            .update_profile(user.id, "Alice".into(), None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Alice");
        assert_eq!(updated.phone, None);
        assert!(updated.updated_at >= user.updated_at);

        h.accounts
            .update_avatar(user.id, "https://cdn.test/a.png".into())
            .await
            .unwrap();
        let stored = h.accounts.get_user(user.id).await.unwrap();
        assert_eq!(stored.name, "Alice");
        assert_eq!(stored.avatar_url.as_deref(), Some("https://cdn.test/a.png"));
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let h = harness();
        let ghost = Uuid::new_v4();

        assert!(matches!(h.accounts.get_user(ghost).await, Err(AppError::NotFound("user"))));
        assert!(matches!(
            h.accounts.update_profile(ghost, "X".into(), None).await,
            Err(AppError::NotFound("user"))
        ));
        assert!(matches!(h.accounts.delete_user(ghost).await, Err(AppError::NotFound("user"))));
    }

    #[tokio::test]
    async fn test_list_users_clamps_limit() {
        let h = harness();
        for i in 0..3 {
            h.accounts
                .register(format!("user{}@x.com", i), "pw12345678", "U".into(), None)
                .await
                .unwrap();
        }

        assert_eq!(h.accounts.list_users(0, 0).await.unwrap().len(), 1);
        assert_eq!(h.accounts.list_users(1_000, -5).await.unwrap().len(), 3);
        assert_eq!(h.accounts.list_users(10, 2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let h = harness();
        let user = h
            .accounts
            .register("a@x.com".into(), "pw12345678", "A".into(), None)
            .await
            .unwrap();

        h.accounts.delete_user(user.id).await.unwrap();
        assert!(matches!(h.accounts.get_user(user.id).await, Err(AppError::NotFound("user"))));
        // The email is free again
        assert!(h
            .accounts
            .register("a@x.com".into(), "pw12345678", "A".into(), None)
            .await
            .is_ok());
    }
}
