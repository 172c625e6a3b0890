//! Session extraction from the `embersession` cookie. Only the session
//! contract lives here; cookie issuance and OAuth linking happen in the
//! surrounding auth surface.

use axum::http::{header, HeaderMap};
use domains::{DomainError, SessionRecord, SessionUser};

use crate::error::ApiResult;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "embersession";

pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .find_map(|part| {
            part.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .map(str::to_string)
}

pub async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> ApiResult<(String, SessionRecord)> {
    let sid = session_id_from_headers(headers)
        .ok_or_else(|| DomainError::Forbidden("not logged in".to_string()))?;
    let Some(session) = state.sessions.get(&sid).await? else {
        return Err(DomainError::Forbidden("not logged in".to_string()).into());
    };
    Ok((sid, session))
}

pub async fn require_user(
    state: &AppState,
    headers: &HeaderMap,
) -> ApiResult<(String, SessionRecord, SessionUser)> {
    let (sid, session) = require_session(state, headers).await?;
    let Some(user) = session.user.clone() else {
        return Err(DomainError::Forbidden("not logged in".to_string()).into());
    };
    Ok((sid, session, user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; embersession=abc123; lang=en"),
        );
        assert_eq!(session_id_from_headers(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert!(session_id_from_headers(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_id_from_headers(&headers).is_none());
    }
}
