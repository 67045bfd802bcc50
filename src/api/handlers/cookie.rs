use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};

use crate::api::AccessConfig;

pub const AUTHENTICATION_COOKIE_NAME: &str = "authentication";

/// Build the `HttpOnly` cookie that carries the access token.
pub(crate) fn authentication_cookie(
    config: &AccessConfig,
    token: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let max_age = config.cookie_max_age_seconds();
    let mut cookie = format!(
        "{AUTHENTICATION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// The access token presented by the client, `""` when there is none.
pub(crate) fn extract_token(headers: &HeaderMap) -> String {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == AUTHENTICATION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .unwrap_or_default()
}
