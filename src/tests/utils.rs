use crate::app::App;
use crate::config::Config;
use crate::db::connection::{init_db, Database};
use crate::router::dispatch;
use astra::{Body, Response};
use rusqlite::params;
use serde_json::Value;
use std::io::Read;
use std::net::SocketAddr;
use tempfile::TempDir;

/// A fresh database file using the production schema.
/// Keep the `TempDir` alive for as long as the database is used.
pub fn init_test_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.sqlite3");
    let db = Database::new(path.to_string_lossy().to_string());

    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    (db, dir)
}

pub struct TestApp {
    pub app: App,
    _dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(tweak: impl FnOnce(&mut Config)) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let mut config = Config::default();
        config.database_path = dir.path().join("app.sqlite3").to_string_lossy().to_string();
        config.auth.expose_links = true;
        tweak(&mut config);

        let app = App::new(config);
        init_db(&app.db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
        Self { app, _dir: dir }
    }

    /// Sends a request through the full pipeline, rate limiter included.
    pub fn send(&self, req: http::Request<Body>) -> Response {
        let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        dispatch(req, Some(peer), &self.app)
    }

    /// Runs the magic-link flow and returns a session token.
    pub fn sign_in(&self, email: &str) -> String {
        let resp = self.send(json_request(
            "POST",
            "/api/auth/request-link",
            None,
            &serde_json::json!({ "email": email }),
        ));
        assert_eq!(resp.status(), 200);
        let link = read_json(resp)["link"].as_str().unwrap().to_string();

        let resp = self.send(request("GET", &link, None, Body::empty()));
        assert_eq!(resp.status(), 200);
        read_json(resp)["token"].as_str().unwrap().to_string()
    }

    pub fn sign_in_admin(&self, email: &str) -> String {
        let token = self.sign_in(email);
        self.app
            .db
            .with_conn(|conn| {
                conn.execute("update users set role = 'admin' where email = ?", params![email])?;
                Ok(())
            })
            .unwrap();
        token
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Body) -> http::Request<Body> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(body).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> http::Request<Body> {
    let mut req = request(method, uri, token, Body::from(body.to_string()));
    req.headers_mut()
        .insert("Content-Type", "application/json".parse().unwrap());
    req
}

pub fn read_text(resp: Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}

pub fn read_json(resp: Response) -> Value {
    serde_json::from_str(&read_text(resp)).unwrap()
}
