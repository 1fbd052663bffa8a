// src/auth/magic.rs
use crate::auth::sessions::create_session;
use crate::auth::token::{digest, SecretToken};
use crate::db::auth as db_auth;
use crate::domain::user::User;
use crate::errors::ServerError;
use rusqlite::Connection;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MagicLinkConfig {
    pub ttl_secs: i64,
    /// Relative path the link points at, e.g. "/auth/magic".
    pub magic_path: String,
    pub session_ttl_secs: i64,
}

impl Default for MagicLinkConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 15 * 60,
            magic_path: "/auth/magic".to_string(),
            session_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedMagicLink {
    pub user: User,
    /// Raw token; only its hash is stored.
    pub token: String,
    pub expires_at: i64,
    pub link: String,
}

#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub session_token: String,
}

pub struct MagicLinkService {
    cfg: MagicLinkConfig,
}

impl MagicLinkService {
    pub fn new(cfg: MagicLinkConfig) -> Self {
        Self { cfg }
    }

    /// Trim + lowercase, minimal sanity check.
    pub fn normalize_email(email: &str) -> Result<String, ServerError> {
        let e = email.trim().to_lowercase();
        if e.is_empty() || !e.contains('@') || e.starts_with('@') || e.ends_with('@') {
            return Err(ServerError::BadRequest("invalid email".into()));
        }
        Ok(e)
    }

    /// Sign-up and sign-in are the same step: the user row is created on
    /// first request. No mail is sent; the link is logged and returned.
    pub fn request_link(
        &self,
        conn: &Connection,
        email: &str,
        name: Option<&str>,
        now: i64,
    ) -> Result<IssuedMagicLink, ServerError> {
        let email = Self::normalize_email(email)?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email));

        let user = db_auth::get_or_create_user(conn, &email, name, now)?;

        let token = SecretToken::generate();
        let expires_at = now + self.cfg.ttl_secs;
        db_auth::insert_magic_link(conn, &user.id, &token.digest(), now, expires_at)?;

        let link = format!("{}?token={}", self.cfg.magic_path, token.as_str());
        info!(user_id = %user.id, %link, "magic link issued");

        Ok(IssuedMagicLink {
            user,
            token: token.as_str().to_string(),
            expires_at,
            link,
        })
    }

    /// Consumes the link and opens a session.
    pub fn redeem(
        &self,
        conn: &mut Connection,
        token: &str,
        now: i64,
    ) -> Result<SignedIn, ServerError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ServerError::BadRequest("missing token".into()));
        }

        let Some(user_id) = db_auth::consume_magic_link(conn, &digest(token), now)? else {
            return Err(ServerError::Unauthorized("invalid or expired link".into()));
        };

        let user = db_auth::find_user(conn, &user_id)?
            .ok_or_else(|| ServerError::Unauthorized("invalid or expired link".into()))?;
        db_auth::touch_last_login(conn, &user.id, now)?;
        let session_token = create_session(conn, &user.id, now, self.cfg.session_ttl_secs)?;

        info!(user_id = %user.id, "signed in");
        Ok(SignedIn {
            user,
            session_token,
        })
    }
}
