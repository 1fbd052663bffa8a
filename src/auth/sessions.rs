// src/auth/sessions.rs
use crate::auth::token::{digest, SecretToken};
use crate::domain::user::Actor;
use crate::errors::ServerError;
use rusqlite::{params, Connection, OptionalExtension};

/// Stores a new session for `user_id` and returns the raw bearer token.
pub fn create_session(
    conn: &Connection,
    user_id: &str,
    now: i64,
    ttl_secs: i64,
) -> Result<String, ServerError> {
    let token = SecretToken::generate();

    conn.execute(
        r#"
        insert into sessions (user_id, token_hash, created_at, expires_at)
        values (?, ?, ?, ?)
        "#,
        params![user_id, token.digest().as_slice(), now, now + ttl_secs],
    )
    .map_err(|e| ServerError::DbError(format!("create session failed: {e}")))?;

    Ok(token.as_str().to_string())
}

/// Resolves a live session token to the acting user.
pub fn actor_for_token(
    conn: &Connection,
    raw_token: &str,
    now: i64,
) -> Result<Option<Actor>, ServerError> {
    let hash = digest(raw_token);

    conn.query_row(
        r#"
        select u.id, u.role
        from sessions s
        join users u on u.id = s.user_id
        where s.token_hash = ?
          and s.expires_at > ?
          and s.revoked_at is null
        "#,
        params![hash.as_slice(), now],
        |row| Ok(Actor::new(row.get::<_, String>(0)?, row.get(1)?)),
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("session lookup failed: {e}")))
}

/// Returns true if a live session was revoked.
pub fn revoke_session(conn: &Connection, raw_token: &str, now: i64) -> Result<bool, ServerError> {
    let hash = digest(raw_token);
    let updated = conn
        .execute(
            "update sessions set revoked_at = ? where token_hash = ? and revoked_at is null",
            params![now, hash.as_slice()],
        )
        .map_err(|e| ServerError::DbError(format!("revoke session failed: {e}")))?;
    Ok(updated == 1)
}
