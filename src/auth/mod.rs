pub mod magic;
pub mod sessions;
pub mod token;

use crate::db::Database;
use crate::domain::user::Actor;
use crate::errors::ServerError;
use astra::Request;

/// The session token from `Authorization: Bearer <t>`, else the `token` cookie.
pub fn session_token(req: &Request) -> Option<String> {
    let headers = req.headers();

    if let Some(auth) = headers.get("Authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    headers
        .get_all("Cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == "token" && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolves the caller or fails with 401.
pub fn require_actor(req: &Request, db: &Database, now: i64) -> Result<Actor, ServerError> {
    let token = session_token(req)
        .ok_or_else(|| ServerError::Unauthorized("Not authorized, no token".into()))?;

    db.with_conn(|conn| sessions::actor_for_token(conn, &token, now))?
        .ok_or_else(|| ServerError::Unauthorized("Not authorized, token failed".into()))
}
