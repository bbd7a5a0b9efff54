use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, not exposed in JSON
    pub name: String,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub verification_token_expire_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_password_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_password_token_expire_at: Option<OffsetDateTime>,
    pub last_login_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Fields supplied at registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub verification_token: String,
    pub verification_token_expire_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

/// A change to a stored user. The store applies it and hands back the new record.
#[derive(Debug, Clone)]
pub enum UserUpdate {
    RecordLogin {
        at: OffsetDateTime,
    },
    /// Only applies while the record still holds `code`.
    MarkVerified {
        code: String,
    },
    BeginPasswordReset {
        token: String,
        expires_at: OffsetDateTime,
    },
    /// Only applies while `token` is held and not yet expired at `now`.
    CompletePasswordReset {
        token: String,
        password_hash: String,
        now: OffsetDateTime,
    },
}

impl User {
    pub fn from_new(id: Uuid, new: NewUser) -> Self {
        Self {
            id,
            email: new.email,
            password_hash: new.password_hash,
            name: new.name,
            is_verified: false,
            verification_token: Some(new.verification_token),
            verification_token_expire_at: Some(new.verification_token_expire_at),
            reset_password_token: None,
            reset_password_token_expire_at: None,
            last_login_date: new.created_at,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }

    /// Whether `code` is this user's verification code and still valid at `now`.
    pub fn holds_verification_code(&self, code: &str, now: OffsetDateTime) -> bool {
        self.verification_token.as_deref() == Some(code)
            && self
                .verification_token_expire_at
                .is_some_and(|exp| now <= exp)
    }

    /// Whether `token` is this user's reset token and still valid at `now`.
    pub fn holds_reset_token(&self, token: &str, now: OffsetDateTime) -> bool {
        self.reset_password_token.as_deref() == Some(token)
            && self
                .reset_password_token_expire_at
                .is_some_and(|exp| exp > now)
    }

    /// Compute the record that results from `update`, or `None` when its
    /// precondition does not hold.
    pub fn apply(&self, update: &UserUpdate, at: OffsetDateTime) -> Option<User> {
        let mut next = self.clone();
        match update {
            UserUpdate::RecordLogin { at } => {
                next.last_login_date = *at;
            }
            UserUpdate::MarkVerified { code } => {
                if self.verification_token.as_deref() != Some(code.as_str()) {
                    return None;
                }
                next.is_verified = true;
                next.verification_token = None;
                next.verification_token_expire_at = None;
            }
            UserUpdate::BeginPasswordReset { token, expires_at } => {
                next.reset_password_token = Some(token.clone());
                next.reset_password_token_expire_at = Some(*expires_at);
            }
            UserUpdate::CompletePasswordReset {
                token,
                password_hash,
                now,
            } => {
                if !self.holds_reset_token(token, *now) {
                    return None;
                }
                next.password_hash = password_hash.clone();
                next.reset_password_token = None;
                next.reset_password_token_expire_at = None;
            }
        }
        next.updated_at = at;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::datetime, Duration};

    fn sample() -> User {
        let now = datetime!(2024-05-01 12:00 UTC);
        User::from_new(
            Uuid::new_v4(),
            NewUser {
                email: "a@x.com".into(),
                password_hash: "$argon2id$stub".into(),
                name: "A".into(),
                verification_token: "123456".into(),
                verification_token_expire_at: now + Duration::hours(20),
                created_at: now,
            },
        )
    }

    #[test]
    fn new_user_starts_unverified_with_login_at_creation() {
        let u = sample();
        assert!(!u.is_verified);
        assert_eq!(u.last_login_date, u.created_at);
        assert!(u.reset_password_token.is_none());
    }

    #[test]
    fn mark_verified_clears_code_and_refuses_second_use() {
        let u = sample();
        let at = u.created_at + Duration::minutes(5);
        let update = UserUpdate::MarkVerified {
            code: "123456".into(),
        };
        let verified = u.apply(&update, at).expect("first use applies");
        assert!(verified.is_verified);
        assert!(verified.verification_token.is_none());
        assert!(verified.verification_token_expire_at.is_none());
        assert_eq!(verified.updated_at, at);
        assert!(verified.apply(&update, at).is_none());
    }

    #[test]
    fn verification_code_is_valid_until_expiry_inclusive() {
        let u = sample();
        let exp = u.verification_token_expire_at.unwrap();
        assert!(u.holds_verification_code("123456", exp));
        assert!(!u.holds_verification_code("123456", exp + Duration::seconds(1)));
        assert!(!u.holds_verification_code("654321", u.created_at));
    }

    #[test]
    fn complete_reset_requires_matching_unexpired_token() {
        let u = sample();
        let now = u.created_at;
        let started = u
            .apply(
                &UserUpdate::BeginPasswordReset {
                    token: "tok".into(),
                    expires_at: now + Duration::hours(1),
                },
                now,
            )
            .unwrap();

        let wrong = UserUpdate::CompletePasswordReset {
            token: "other".into(),
            password_hash: "new".into(),
            now,
        };
        assert!(started.apply(&wrong, now).is_none());

        let late = UserUpdate::CompletePasswordReset {
            token: "tok".into(),
            password_hash: "new".into(),
            now: now + Duration::hours(1),
        };
        assert!(started.apply(&late, now).is_none());

        let ok = UserUpdate::CompletePasswordReset {
            token: "tok".into(),
            password_hash: "new".into(),
            now: now + Duration::minutes(30),
        };
        let done = started.apply(&ok, now).unwrap();
        assert_eq!(done.password_hash, "new");
        assert!(done.reset_password_token.is_none());
        assert!(done.reset_password_token_expire_at.is_none());
    }

    #[test]
    fn serialized_record_omits_secrets() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("123456"));
        assert!(json.contains("a@x.com"));
    }
}
