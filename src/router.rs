use crate::app::App;
use crate::auth::{require_actor, session_token, sessions};
use crate::db::auth as db_auth;
use crate::domain::query::LeadQuery;
use crate::errors::ServerError;
use crate::leads::{self, UpdateOutcome};
use crate::ratelimit::Decision;
use crate::responses::{csv_response, error_to_response, json_message, json_response, ResultResp};
use crate::spreadsheets::{export_filename, write_leads_csv};
use astra::{Request, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::io::Read;
use std::net::SocketAddr;
use tracing::{debug, warn};

/// Entry point for every request: rate limit, route, render errors.
pub fn dispatch(req: Request, peer: Option<SocketAddr>, app: &App) -> Response {
    let key = client_key(&req, peer);

    let remaining = match app.limiter.check(&key, Utc::now().timestamp()) {
        Ok(Decision::Allowed { remaining }) => Some(remaining),
        Ok(Decision::Limited { retry_after }) => {
            warn!(client = %key, retry_after, "rate limited");
            let mut resp = error_to_response(ServerError::TooManyRequests { retry_after });
            set_rate_limit_headers(&mut resp, app.limiter.max_requests(), 0);
            return resp;
        }
        // Fail open when the counter store errors.
        Err(e) => {
            warn!(client = %key, "rate limiter unavailable: {e}");
            None
        }
    };

    let mut resp = match handle(req, app) {
        Ok(resp) => resp,
        Err(err) => error_to_response(err),
    };
    if let Some(remaining) = remaining {
        set_rate_limit_headers(&mut resp, app.limiter.max_requests(), remaining);
    }
    resp
}

fn set_rate_limit_headers(resp: &mut Response, limit: u32, remaining: u32) {
    let headers = resp.headers_mut();
    headers.insert("X-RateLimit-Limit", limit.into());
    headers.insert("X-RateLimit-Remaining", remaining.into());
}

/// First `X-Forwarded-For` hop when behind a proxy, else the socket peer.
fn client_key(req: &Request, peer: Option<SocketAddr>) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn handle(mut req: Request, app: &App) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    debug!("{method} {path}");

    match (method.as_str(), segments.as_slice()) {
        ("GET", [""]) => json_message(200, "Buyer Lead Intake API running"),

        // Auth
        ("POST", ["api", "auth", "request-link"]) => request_link(&mut req, app),
        ("GET", ["api", "auth", "magic"]) => redeem_link(query.as_deref(), app),
        ("GET", ["api", "auth", "logout"]) => logout(&req, app),
        ("GET", ["api", "auth", "me"]) => {
            let actor = require_actor(&req, &app.db, now())?;
            let user = app
                .db
                .with_conn(|conn| db_auth::find_user(conn, &actor.id))?
                .ok_or_else(|| ServerError::Unauthorized("Not authorized, token failed".into()))?;
            json_response(200, &json!({ "data": user }))
        }

        // Buyers
        ("GET", ["api", "buyers"]) => {
            require_actor(&req, &app.db, now())?;
            let query = LeadQuery::from_query_string(query.as_deref())?;
            json_response(200, &leads::list_leads(&app.db, &query)?)
        }
        ("POST", ["api", "buyers"]) => {
            let actor = require_actor(&req, &app.db, now())?;
            let payload = read_json_object(&mut req, app.config.max_upload_bytes)?;
            let lead = leads::create_lead(&app.db, &payload, &actor)?;
            json_response(201, &json!({ "data": lead }))
        }
        ("GET", ["api", "buyers", "export"]) => {
            require_actor(&req, &app.db, now())?;
            let query = LeadQuery::from_query_string(query.as_deref())?;
            let rows = leads::export_leads(&app.db, &query)?;

            let mut buffer = Vec::new();
            write_leads_csv(&rows, &mut buffer)?;
            csv_response(buffer, &export_filename(Utc::now()))
        }
        ("POST", ["api", "buyers", "import"]) => {
            let actor = require_actor(&req, &app.db, now())?;
            let body = read_body(&mut req, app.config.max_upload_bytes)?;
            let summary = leads::import_leads(&app.db, body.as_slice(), &actor)?;
            json_response(201, &summary)
        }
        ("GET", ["api", "buyers", id]) => {
            require_actor(&req, &app.db, now())?;
            let (lead, history) = leads::get_lead(&app.db, id)?;
            json_response(200, &json!({ "data": lead, "history": history }))
        }
        ("GET", ["api", "buyers", id, "history"]) => {
            require_actor(&req, &app.db, now())?;
            let history = leads::lead_history(&app.db, id)?;
            json_response(200, &json!({ "data": history }))
        }
        ("PUT", ["api", "buyers", id]) => {
            let actor = require_actor(&req, &app.db, now())?;
            let payload = read_json_object(&mut req, app.config.max_upload_bytes)?;
            match leads::update_lead(&app.db, id, &payload, &actor)? {
                UpdateOutcome::Unchanged(lead) => json_response(
                    200,
                    &json!({ "message": "No changes made", "data": lead }),
                ),
                UpdateOutcome::Updated { lead, changes } => {
                    json_response(200, &json!({ "data": lead, "changes": changes }))
                }
            }
        }
        ("DELETE", ["api", "buyers", id]) => {
            let actor = require_actor(&req, &app.db, now())?;
            leads::delete_lead(&app.db, id, &actor)?;
            json_message(200, "Buyer deleted")
        }

        _ => Err(ServerError::NotFound),
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Deserialize)]
struct LinkRequest {
    email: String,
    name: Option<String>,
}

fn request_link(req: &mut Request, app: &App) -> ResultResp {
    let payload = read_json_object(req, app.config.max_upload_bytes)?;
    let body: LinkRequest = serde_json::from_value(Value::Object(payload))
        .map_err(|_| ServerError::BadRequest("email is required".into()))?;

    let issued = app.db.with_conn(|conn| {
        app.magic_links
            .request_link(conn, &body.email, body.name.as_deref(), now())
    })?;

    let mut response = json!({ "message": format!("Sign-in link issued for {}", issued.user.email) });
    if app.config.auth.expose_links {
        response["link"] = json!(issued.link);
    }
    json_response(200, &response)
}

fn redeem_link(query: Option<&str>, app: &App) -> ResultResp {
    let token = query
        .into_iter()
        .flat_map(|q| url::form_urlencoded::parse(q.as_bytes()))
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default();

    let signed_in = app
        .db
        .with_conn(|conn| app.magic_links.redeem(conn, &token, now()))?;

    let mut resp = json_response(
        200,
        &json!({ "token": signed_in.session_token, "data": signed_in.user }),
    )?;
    let cookie = format!(
        "token={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        signed_in.session_token, app.config.auth.session_ttl_secs
    );
    if let Ok(value) = cookie.parse() {
        resp.headers_mut().insert("Set-Cookie", value);
    }
    Ok(resp)
}

fn logout(req: &Request, app: &App) -> ResultResp {
    if let Some(token) = session_token(req) {
        app.db
            .with_conn(|conn| sessions::revoke_session(conn, &token, now()))?;
    }
    let mut resp = json_message(200, "Logged out")?;
    if let Ok(value) = "token=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0".parse() {
        resp.headers_mut().insert("Set-Cookie", value);
    }
    Ok(resp)
}

/// Reads at most `limit` bytes of body; anything longer is rejected, not truncated.
fn read_body(req: &mut Request, limit: u64) -> Result<Vec<u8>, ServerError> {
    let mut buffer = Vec::new();
    req.body_mut()
        .reader()
        .take(limit.saturating_add(1))
        .read_to_end(&mut buffer)
        .map_err(|e| ServerError::BadRequest(format!("could not read body: {e}")))?;

    if buffer.len() as u64 > limit {
        return Err(ServerError::PayloadTooLarge(limit));
    }
    Ok(buffer)
}

fn read_json_object(req: &mut Request, limit: u64) -> Result<Map<String, Value>, ServerError> {
    let body = read_body(req, limit)?;
    match serde_json::from_slice(&body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ServerError::BadRequest("body must be a JSON object".into())),
        Err(e) => Err(ServerError::BadRequest(format!("invalid JSON: {e}"))),
    }
}
