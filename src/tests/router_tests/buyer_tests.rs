use crate::tests::utils::{json_request, read_json, request, TestApp};
use astra::Body;
use serde_json::{json, Value};

fn minimal_lead() -> Value {
    json!({
        "fullName": "Jo",
        "phone": "9876543210",
        "city": "Mohali",
        "propertyType": "Plot",
        "purpose": "Buy",
        "timeline": "0-3m",
        "source": "Website"
    })
}

fn create(t: &TestApp, token: &str, body: &Value) -> Value {
    let resp = t.send(json_request("POST", "/api/buyers", Some(token), body));
    assert_eq!(resp.status(), 201);
    read_json(resp)["data"].clone()
}

#[test]
fn create_then_fetch_with_history() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");

    let lead = create(&t, &token, &minimal_lead());
    assert_eq!(lead["status"], "New");
    assert_eq!(lead["tags"], json!([]));
    assert!(lead["bhk"].is_null());
    let id = lead["id"].as_str().unwrap();

    let resp = t.send(request("GET", &format!("/api/buyers/{id}"), Some(&token), Body::empty()));
    assert_eq!(resp.status(), 200);
    let body = read_json(resp);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["fullName"], "Jo");
    assert_eq!(body["history"][0]["diff"]["action"], "created");
    assert_eq!(body["history"][0]["diff"]["city"], "Mohali");
}

#[test]
fn invalid_create_lists_field_errors() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");

    let mut body = minimal_lead();
    body["propertyType"] = json!("Office");
    body["bhk"] = json!("2");
    body["budgetMin"] = json!(5_000_000);
    body["budgetMax"] = json!(3_000_000);

    let resp = t.send(json_request("POST", "/api/buyers", Some(&token), &body));
    assert_eq!(resp.status(), 400);
    let body = read_json(resp);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid buyer data");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["bhk", "budgetMax"]);

    let resp = t.send(request("GET", "/api/buyers", Some(&token), Body::empty()));
    assert_eq!(read_json(resp)["total"], 0);
}

#[test]
fn non_object_body_is_rejected() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");
    let resp = t.send(json_request("POST", "/api/buyers", Some(&token), &json!([1, 2])));
    assert_eq!(resp.status(), 400);
}

#[test]
fn update_reports_changes_or_no_changes() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");
    let lead = create(&t, &token, &minimal_lead());
    let uri = format!("/api/buyers/{}", lead["id"].as_str().unwrap());

    let resp = t.send(json_request("PUT", &uri, Some(&token), &minimal_lead()));
    assert_eq!(resp.status(), 200);
    let body = read_json(resp);
    assert_eq!(body["message"], "No changes made");
    assert!(body.get("changes").is_none());

    let resp = t.send(json_request(
        "PUT",
        &uri,
        Some(&token),
        &json!({ "status": "Qualified", "updatedAt": lead["updatedAt"] }),
    ));
    assert_eq!(resp.status(), 200);
    let body = read_json(resp);
    assert_eq!(body["data"]["status"], "Qualified");
    assert_eq!(body["changes"]["status"], json!({ "from": "New", "to": "Qualified" }));

    // Same token again: someone (us) already moved the record on.
    let resp = t.send(json_request(
        "PUT",
        &uri,
        Some(&token),
        &json!({ "status": "Visited", "updatedAt": lead["updatedAt"] }),
    ));
    assert_eq!(resp.status(), 409);

    let resp = t.send(request("GET", &format!("{uri}/history"), Some(&token), Body::empty()));
    let history = read_json(resp)["data"].as_array().unwrap().len();
    assert_eq!(history, 2);
}

#[test]
fn other_agents_are_forbidden_but_admins_are_not() {
    let t = TestApp::new();
    let owner = t.sign_in("owner@example.com");
    let other = t.sign_in("other@example.com");
    let admin = t.sign_in_admin("boss@example.com");

    let lead = create(&t, &owner, &minimal_lead());
    let uri = format!("/api/buyers/{}", lead["id"].as_str().unwrap());

    let resp = t.send(json_request("PUT", &uri, Some(&other), &json!({ "status": "Dropped" })));
    assert_eq!(resp.status(), 403);
    let resp = t.send(request("DELETE", &uri, Some(&other), Body::empty()));
    assert_eq!(resp.status(), 403);

    // Everyone can read.
    let resp = t.send(request("GET", &uri, Some(&other), Body::empty()));
    assert_eq!(resp.status(), 200);
    assert_eq!(read_json(resp)["history"].as_array().unwrap().len(), 1);

    let resp = t.send(json_request("PUT", &uri, Some(&admin), &json!({ "status": "Dropped" })));
    assert_eq!(resp.status(), 200);
    let resp = t.send(request("DELETE", &uri, Some(&admin), Body::empty()));
    assert_eq!(resp.status(), 200);

    let resp = t.send(request("GET", &uri, Some(&owner), Body::empty()));
    assert_eq!(resp.status(), 404);

    let resp = t.send(request("GET", &format!("{uri}/history"), Some(&owner), Body::empty()));
    assert_eq!(resp.status(), 200);
    let history = read_json(resp)["data"].clone();
    assert_eq!(history.as_array().unwrap().len(), 3);
    assert_eq!(history[0]["diff"], json!({ "action": "deleted" }));
}

#[test]
fn list_filters_sorts_and_pages() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");

    for (name, city) in [
        ("Aman Gill", "Mohali"),
        ("Bhavna Joshi", "Mohali"),
        ("Chetan Rao", "Zirakpur"),
        ("Divya Nair", "Mohali"),
    ] {
        let mut body = minimal_lead();
        body["fullName"] = json!(name);
        body["city"] = json!(city);
        create(&t, &token, &body);
    }

    let resp = t.send(request(
        "GET",
        "/api/buyers?city=Mohali&sortBy=fullName&sortOrder=desc&limit=2&page=1",
        Some(&token),
        Body::empty(),
    ));
    assert_eq!(resp.status(), 200);
    let body = read_json(resp);
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["fullName"], "Divya Nair");
    assert_eq!(body["data"][1]["fullName"], "Bhavna Joshi");

    let resp = t.send(request("GET", "/api/buyers?search=RAO", Some(&token), Body::empty()));
    assert_eq!(read_json(resp)["total"], 1);

    let resp = t.send(request("GET", "/api/buyers?city=Delhi", Some(&token), Body::empty()));
    assert_eq!(resp.status(), 400);
}

#[test]
fn missing_lead_is_404() {
    let t = TestApp::new();
    let token = t.sign_in("owner@example.com");
    for (method, uri) in [
        ("GET", "/api/buyers/does-not-exist"),
        ("DELETE", "/api/buyers/does-not-exist"),
        ("GET", "/api/buyers/does-not-exist/history"),
    ] {
        let resp = t.send(request(method, uri, Some(&token), Body::empty()));
        assert_eq!(resp.status(), 404, "{method} {uri}");
    }
}
