use axum_extra::extract::cookie::{Cookie, SameSite};

/// Cookie carrying the session JWT.
pub const SESSION_COOKIE_NAME: &str = "token";

pub fn session_cookie(token: String, max_age: std::time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, token))
        .path("/")
        .max_age(time::Duration::seconds(max_age.as_secs() as i64))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}

/// Expired, empty cookie that makes the browser drop the session.
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(secure)
        .build()
}
