use crate::tests::utils::{json_request, read_json, request, TestApp};
use astra::Body;
use serde_json::json;

#[test]
fn root_reports_running() {
    let t = TestApp::new();
    let resp = t.send(request("GET", "/", None, Body::empty()));
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp)["message"], "Buyer Lead Intake API running");
}

#[test]
fn unknown_route_is_404_json() {
    let t = TestApp::new();
    let resp = t.send(request("GET", "/nope", None, Body::empty()));
    assert_eq!(resp.status(), 404);
    assert_eq!(read_json(resp)["success"], false);
}

#[test]
fn buyers_require_a_session() {
    let t = TestApp::new();

    let resp = t.send(request("GET", "/api/buyers", None, Body::empty()));
    assert_eq!(resp.status(), 401);

    let resp = t.send(request("GET", "/api/buyers", Some("made-up"), Body::empty()));
    assert_eq!(resp.status(), 401);
}

#[test]
fn magic_link_signs_in_once_and_sets_cookie() {
    let t = TestApp::new();

    let resp = t.send(json_request(
        "POST",
        "/api/auth/request-link",
        None,
        &json!({ "email": "Agent@Example.com", "name": "Agent Smith" }),
    ));
    assert_eq!(resp.status(), 200);
    let link = read_json(resp)["link"].as_str().unwrap().to_string();
    assert!(link.starts_with("/api/auth/magic?token="));

    let resp = t.send(request("GET", &link, None, Body::empty()));
    assert_eq!(resp.status(), 200);
    let cookie = resp.headers()["Set-Cookie"].to_str().unwrap().to_string();
    let body = read_json(resp);
    let token = body["token"].as_str().unwrap();
    assert!(cookie.starts_with(&format!("token={token};")));
    assert_eq!(body["data"]["email"], "agent@example.com");
    assert_eq!(body["data"]["role"], "user");

    let resp = t.send(request("GET", &link, None, Body::empty()));
    assert_eq!(resp.status(), 401);

    // The cookie works as well as the bearer header.
    let me = http::Request::builder()
        .uri("/api/auth/me")
        .header("Cookie", format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let resp = t.send(me);
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp)["data"]["name"], "Agent Smith");
}

#[test]
fn links_stay_out_of_responses_by_default() {
    let t = TestApp::with_config(|c| c.auth.expose_links = false);
    let resp = t.send(json_request(
        "POST",
        "/api/auth/request-link",
        None,
        &json!({ "email": "quiet@example.com" }),
    ));
    assert_eq!(resp.status(), 200);
    assert!(read_json(resp).get("link").is_none());
}

#[test]
fn request_link_rejects_bad_input() {
    let t = TestApp::new();

    let resp = t.send(json_request("POST", "/api/auth/request-link", None, &json!({})));
    assert_eq!(resp.status(), 400);

    let resp = t.send(json_request(
        "POST",
        "/api/auth/request-link",
        None,
        &json!({ "email": "not-an-email" }),
    ));
    assert_eq!(resp.status(), 400);

    let resp = t.send(request("POST", "/api/auth/request-link", None, Body::from("{oops")));
    assert_eq!(resp.status(), 400);
}

#[test]
fn logout_revokes_the_session() {
    let t = TestApp::new();
    let token = t.sign_in("leaving@example.com");

    let resp = t.send(request("GET", "/api/auth/me", Some(&token), Body::empty()));
    assert_eq!(resp.status(), 200);

    let resp = t.send(request("GET", "/api/auth/logout", Some(&token), Body::empty()));
    assert_eq!(resp.status(), 200);

    let resp = t.send(request("GET", "/api/auth/me", Some(&token), Body::empty()));
    assert_eq!(resp.status(), 401);
}
