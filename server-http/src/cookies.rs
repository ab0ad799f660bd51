use axum::http::{header, HeaderMap, HeaderValue};
use libris::auth::CookieDirective;

/// Cookie carrying the session identifier.
pub const SESSION_COOKIE: &str = "libris_session";

/// Read a cookie value out of the Cookie request header.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((key, value)) = pair.trim().split_once('=') {
            if key == name {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Render the session cookie header value. Session-scoped (no Max-Age), so
/// closing the browser drops it.
pub fn session_cookie(session_id: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, session_id
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Render a core-issued directive (remember-me set or clear) as a
/// Set-Cookie header value.
pub fn render_directive(directive: &CookieDirective) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; SameSite=Lax",
        directive.name, directive.value, directive.path, directive.max_age_secs
    );
    if directive.http_only {
        cookie.push_str("; HttpOnly");
    }
    if directive.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Append a Set-Cookie header, ignoring values that fail header encoding.
pub fn append_set_cookie(headers: &mut HeaderMap, value: &str) {
    if let Ok(header_value) = HeaderValue::from_str(value) {
        headers.append(header::SET_COOKIE, header_value);
    }
}

/// Whether the response already carries a Set-Cookie for the given name.
pub fn has_set_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(name) && v[name.len()..].starts_with('='))
}
