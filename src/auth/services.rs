//! Credential lifecycle: registration, login, email verification and
//! password reset. Handlers call these and turn the results into HTTP.

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::RegisterRequest,
        password::{hash_password, verify_dummy, verify_password},
        repo::StoreError,
        repo_types::{NewUser, User, UserUpdate},
        tokens::{
            generate_reset_token, generate_verification_code, RESET_TOKEN_TTL,
            VERIFICATION_CODE_TTL,
        },
    },
    error::AuthError,
    mail::{EmailKind, TemplateParams},
    state::AppState,
};

const MAX_CODE_ATTEMPTS: usize = 5;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn params<const N: usize>(pairs: [(&'static str, String); N]) -> TemplateParams {
    pairs.into_iter().collect()
}

/// A fresh code that no other pending registration currently holds.
///
/// Draws at most `MAX_CODE_ATTEMPTS` candidates from `generate`.
async fn issue_verification_code(
    state: &AppState,
    now: OffsetDateTime,
    mut generate: impl FnMut() -> String,
) -> Result<String, AuthError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate();
        match state.users.find_by_verification_code(&code).await? {
            Some(holder) if holder.holds_verification_code(&code, now) => {
                warn!("verification code collision; regenerating");
            }
            _ => return Ok(code),
        }
    }
    Err(anyhow::anyhow!("no free verification code after {MAX_CODE_ATTEMPTS} attempts").into())
}

pub async fn register(state: &AppState, input: RegisterRequest) -> Result<User, AuthError> {
    let email = normalize_email(&input.email);
    let name = input.name.trim().to_string();
    if email.is_empty() || input.password.is_empty() || name.is_empty() {
        return Err(AuthError::Validation("Please fill in all fields".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AuthError::Validation("Invalid email".into()));
    }

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AuthError::DuplicateUser);
    }

    let password_hash = hash_password(&input.password)?;
    let now = state.clock.now();
    let code = issue_verification_code(state, now, generate_verification_code).await?;

    let user = state
        .users
        .create(NewUser {
            email,
            password_hash,
            name,
            verification_token: code.clone(),
            verification_token_expire_at: now + VERIFICATION_CODE_TTL,
            created_at: now,
        })
        .await
        .map_err(|e| match e {
            StoreError::DuplicateEmail => AuthError::DuplicateUser,
            other => other.into(),
        })?;
    info!(user_id = %user.id, email = %user.email, "user registered");

    state
        .mailer
        .send(
            EmailKind::Verification,
            &user.email,
            &params([("verificationCode", code)]),
        )
        .await?;

    Ok(user)
}

pub async fn login(state: &AppState, email: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(AuthError::Validation("Please fill in all fields".into()));
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        verify_dummy(password);
        warn!(email = %email, "login unknown email");
        return Err(AuthError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let now = state.clock.now();
    let user = state
        .users
        .update(user.id, UserUpdate::RecordLogin { at: now }, now)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}

pub async fn verify_email(state: &AppState, code: &str) -> Result<User, AuthError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AuthError::Validation("Verification code is required".into()));
    }

    let now = state.clock.now();
    let user = state
        .users
        .find_by_verification_code(code)
        .await?
        .ok_or(AuthError::InvalidOrExpiredCode)?;
    if !user.holds_verification_code(code, now) {
        warn!(user_id = %user.id, "verification code expired");
        return Err(AuthError::InvalidOrExpiredCode);
    }

    // None here means a concurrent request consumed the code first.
    let user = state
        .users
        .update(user.id, UserUpdate::MarkVerified { code: code.into() }, now)
        .await?
        .ok_or(AuthError::InvalidOrExpiredCode)?;
    info!(user_id = %user.id, "email verified");

    state
        .mailer
        .send(
            EmailKind::Welcome,
            &user.email,
            &params([("name", user.name.clone())]),
        )
        .await?;

    Ok(user)
}

pub async fn forgot_password(state: &AppState, email: &str) -> Result<(), AuthError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(AuthError::Validation("Email is required".into()));
    }

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    let token = generate_reset_token();
    let now = state.clock.now();
    let user = state
        .users
        .update(
            user.id,
            UserUpdate::BeginPasswordReset {
                token: token.clone(),
                expires_at: now + RESET_TOKEN_TTL,
            },
            now,
        )
        .await?
        .ok_or(AuthError::UserNotFound)?;
    info!(user_id = %user.id, "password reset requested");

    state
        .mailer
        .send(
            EmailKind::ForgotPassword,
            &user.email,
            &params([("resetURL", state.config.reset_url(&token))]),
        )
        .await?;

    Ok(())
}

pub async fn reset_password(state: &AppState, token: &str, password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("Password is required".into()));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidOrExpiredToken);
    }

    let now = state.clock.now();
    let user = state
        .users
        .find_by_reset_token(token, now)
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;

    let password_hash = hash_password(password)?;
    let user = state
        .users
        .update(
            user.id,
            UserUpdate::CompletePasswordReset {
                token: token.into(),
                password_hash,
                now,
            },
            now,
        )
        .await?
        .ok_or(AuthError::InvalidOrExpiredToken)?;
    info!(user_id = %user.id, "password reset completed");

    state
        .mailer
        .send(EmailKind::ResetSuccess, &user.email, &TemplateParams::new())
        .await?;

    Ok(())
}

pub async fn check_auth(state: &AppState, user_id: Uuid) -> Result<User, AuthError> {
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthError::UserNotFound)
}
