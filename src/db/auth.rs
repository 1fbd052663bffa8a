// src/db/auth.rs
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::domain::user::User;
use crate::errors::ServerError;

fn user_from_row(r: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: r.get(0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        role: r.get(3)?,
        created_at: r.get(4)?,
    })
}

/// Insert a user if the email is new, then return the stored row.
/// Email should already be normalized by caller (trim/lowercase).
/// An existing user's name is left alone.
pub fn get_or_create_user(
    conn: &Connection,
    email: &str,
    name: &str,
    now: i64,
) -> Result<User, ServerError> {
    conn.execute(
        "insert or ignore into users (id, name, email, created_at) values (?, ?, ?, ?)",
        params![Uuid::new_v4().to_string(), name, email, now],
    )
    .map_err(|e| ServerError::DbError(format!("insert user failed: {e}")))?;

    conn.query_row(
        "select id, name, email, role, created_at from users where email = ?",
        params![email],
        user_from_row,
    )
    .map_err(|e| ServerError::DbError(format!("select user failed: {e}")))
}

pub fn find_user(conn: &Connection, user_id: &str) -> Result<Option<User>, ServerError> {
    conn.query_row(
        "select id, name, email, role, created_at from users where id = ?",
        params![user_id],
        user_from_row,
    )
    .optional()
    .map_err(|e| ServerError::DbError(format!("select user failed: {e}")))
}

pub fn touch_last_login(conn: &Connection, user_id: &str, now: i64) -> Result<(), ServerError> {
    conn.execute(
        "update users set last_login_at = ? where id = ?",
        params![now, user_id],
    )
    .map_err(|e| ServerError::DbError(format!("update last login failed: {e}")))?;
    Ok(())
}

/// Insert a magic link row (token_hash should be SHA-256 bytes).
pub fn insert_magic_link(
    conn: &Connection,
    user_id: &str,
    token_hash: &[u8],
    created_at: i64,
    expires_at: i64,
) -> Result<(), ServerError> {
    conn.execute(
        "insert into magic_links (user_id, token_hash, created_at, expires_at) values (?, ?, ?, ?)",
        params![user_id, token_hash, created_at, expires_at],
    )
    .map_err(|e| ServerError::DbError(format!("insert magic link failed: {e}")))?;
    Ok(())
}

/// Marks an unexpired, unused link as used and returns its user id.
/// Returns Ok(None) for unknown, expired or already-used links.
pub fn consume_magic_link(
    conn: &mut Connection,
    token_hash: &[u8],
    now: i64,
) -> Result<Option<String>, ServerError> {
    let tx = conn.transaction()?;

    let row: Option<(i64, String)> = tx
        .query_row(
            "select id, user_id from magic_links
             where token_hash = ? and used_at is null and expires_at > ?",
            params![token_hash, now],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;

    let Some((link_id, user_id)) = row else {
        return Ok(None);
    };

    // The used_at guard means only one concurrent redeemer wins.
    let updated = tx.execute(
        "update magic_links set used_at = ? where id = ? and used_at is null",
        params![now, link_id],
    )?;
    if updated != 1 {
        return Ok(None);
    }

    tx.commit()?;
    Ok(Some(user_id))
}
