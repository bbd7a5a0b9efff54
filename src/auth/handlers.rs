use axum::{
    extract::{rejection::JsonRejection, FromRef, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{
        cookie::{clear_session_cookie, session_cookie},
        dto::{
            ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
            UserResponse, VerifyEmailRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::{AuthError, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/check-auth", get(check_auth))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", post(verify_email))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

/// Sign a session token for `user_id` and add it to the jar.
fn start_session(state: &AppState, jar: CookieJar, user_id: Uuid) -> Result<CookieJar, AuthError> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign(user_id)?;
    Ok(jar.add(session_cookie(token, keys.ttl, state.config.secure_cookies)))
}

#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    let user = services::register(&state, payload).await?;
    let jar = start_session(&state, jar, user.id)?;
    Ok((
        StatusCode::CREATED,
        jar,
        Json(UserResponse::new(Some("User created successfully"), user)),
    ))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    let user = services::login(&state, &payload.email, &payload.password).await?;
    let jar = start_session(&state, jar, user.id)?;
    Ok((
        jar,
        Json(UserResponse::new(Some("Logged in successfully"), user)),
    ))
}

#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        jar.add(clear_session_cookie(state.config.secure_cookies)),
        Json(MessageBody::ok("Logged out successfully")),
    )
}

#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    payload: Result<Json<VerifyEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    let user = services::verify_email(&state, &payload.code).await?;
    Ok(Json(UserResponse::new(
        Some("Email verified successfully"),
        user,
    )))
}

#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    services::forgot_password(&state, &payload.email).await?;
    Ok(Json(MessageBody::ok("Password reset link sent to your email")))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AuthError> {
    let Json(payload) = payload?;
    services::reset_password(&state, &token, &payload.password).await?;
    Ok(Json(MessageBody::ok("Password reset successful")))
}

#[instrument(skip(state))]
pub async fn check_auth(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, AuthError> {
    let user = services::check_auth(&state, user_id).await?;
    Ok(Json(UserResponse::new(None, user)))
}
