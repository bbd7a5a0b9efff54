use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::repo::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User, UserUpdate};

/// In-process store for tests and local runs without Postgres.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.lock().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_verification_code(&self, code: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .filter(|u| u.verification_token.as_deref() == Some(code))
            .max_by_key(|u| u.verification_token_expire_at)
            .cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users
            .values()
            .find(|u| u.holds_reset_token(token, now))
            .cloned())
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.values().any(|u| u.email == new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User::from_new(Uuid::new_v4(), new);
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        id: Uuid,
        update: UserUpdate,
        at: OffsetDateTime,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().await;
        let Some(current) = users.get(&id) else {
            return Ok(None);
        };
        let Some(next) = current.apply(&update, at) else {
            return Ok(None);
        };
        users.insert(id, next.clone());
        Ok(Some(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    fn new_user(email: &str, code: &str, now: OffsetDateTime) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            name: "Someone".into(),
            verification_token: code.into(),
            verification_token_expire_at: now + Duration::hours(20),
            created_at: now,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        let now = datetime!(2024-05-01 00:00 UTC);
        store.create(new_user("a@x.com", "111111", now)).await.unwrap();
        let err = store
            .create(new_user("a@x.com", "222222", now))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn lookups_find_created_record() {
        let store = MemoryUserStore::new();
        let now = datetime!(2024-05-01 00:00 UTC);
        let user = store.create(new_user("a@x.com", "111111", now)).await.unwrap();

        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");
        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        let by_code = store.find_by_verification_code("111111").await.unwrap().unwrap();
        assert_eq!(by_code.id, user.id);
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reset_token_lookup_honours_expiry() {
        let store = MemoryUserStore::new();
        let now = datetime!(2024-05-01 00:00 UTC);
        let user = store.create(new_user("a@x.com", "111111", now)).await.unwrap();
        store
            .update(
                user.id,
                UserUpdate::BeginPasswordReset {
                    token: "tok".into(),
                    expires_at: now + Duration::hours(1),
                },
                now,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(store.find_by_reset_token("tok", now).await.unwrap().is_some());
        assert!(store
            .find_by_reset_token("tok", now + Duration::hours(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_none() {
        let store = MemoryUserStore::new();
        let res = store
            .update(
                Uuid::new_v4(),
                UserUpdate::RecordLogin {
                    at: OffsetDateTime::now_utc(),
                },
                OffsetDateTime::now_utc(),
            )
            .await
            .unwrap();
        assert!(res.is_none());
    }
}
