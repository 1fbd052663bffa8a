use crate::tests::utils::{read_json, read_text, request, TestApp};
use astra::Body;

const HEADER: &str =
    "fullName,email,phone,city,propertyType,bhk,purpose,budgetMin,budgetMax,timeline,source,notes,tags,status";

fn csv_request(uri: &str, token: &str, csv: String) -> http::Request<Body> {
    let mut req = request("POST", uri, Some(token), Body::from(csv));
    req.headers_mut()
        .insert("Content-Type", "text/csv".parse().unwrap());
    req
}

#[test]
fn import_reports_row_errors_and_exports_back() {
    let t = TestApp::new();
    let token = t.sign_in("importer@example.com");

    let csv = format!(
        "{HEADER}\n\
         Neha Arora,neha@example.com,9876500011,Chandigarh,Apartment,2,Buy,4000000,5000000,0-3m,Website,\"corner unit, high floor\",\"hot,nri\",Qualified\n\
         Bad Row,,123,Chandigarh,Plot,3,Buy,,,0-3m,Website,,,\n\
         Om Prakash,,9876500012,Other,Retail,,Rent,,,Exploring,Walk-in,,,\n"
    );
    let resp = t.send(csv_request("/api/buyers/import", &token, csv));
    assert_eq!(resp.status(), 201);
    let summary = read_json(resp);
    assert_eq!(summary["totalRows"], 3);
    assert_eq!(summary["successCount"], 2);
    assert_eq!(summary["errorCount"], 1);
    assert_eq!(summary["errors"][0]["row"], 2);
    let message = summary["errors"][0]["message"].as_str().unwrap();
    assert!(message.starts_with("row 2: "), "{message}");
    assert!(message.contains("phone") && message.contains("bhk"), "{message}");

    let resp = t.send(request(
        "GET",
        "/api/buyers/export?sortBy=fullName&sortOrder=asc",
        Some(&token),
        Body::empty(),
    ));
    assert_eq!(resp.status(), 200);
    assert!(resp.headers()["Content-Type"].to_str().unwrap().starts_with("text/csv"));
    let disposition = resp.headers()["Content-Disposition"].to_str().unwrap().to_string();
    assert!(disposition.contains("buyers-export-"));
    assert!(!disposition.contains(':'));

    let exported = read_text(resp);
    let mut lines = exported.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert!(exported.contains("\"corner unit, high floor\""));
    assert!(exported.contains("\"hot,nri\""));
    assert!(exported.contains("Om Prakash,,9876500012,Other,Retail,,Rent,,,Exploring,Walk-in,,,New"));

    // The export is itself a valid import.
    let resp = t.send(csv_request("/api/buyers/import", &token, exported));
    assert_eq!(resp.status(), 201);
    assert_eq!(read_json(resp)["successCount"], 2);

    let resp = t.send(request("GET", "/api/buyers", Some(&token), Body::empty()));
    assert_eq!(read_json(resp)["total"], 4);
}

#[test]
fn missing_headers_abort_the_import() {
    let t = TestApp::new();
    let token = t.sign_in("importer@example.com");

    let resp = t.send(csv_request(
        "/api/buyers/import",
        &token,
        "fullName,phone\nNeha Arora,9876500011\n".to_string(),
    ));
    assert_eq!(resp.status(), 400);
    let body = read_json(resp);
    assert!(body["message"].as_str().unwrap().starts_with("Missing required headers"));
    assert_eq!(body["errors"].as_array().unwrap().len(), 12);
}

#[test]
fn import_with_no_valid_rows_fails() {
    let t = TestApp::new();
    let token = t.sign_in("importer@example.com");

    let resp = t.send(csv_request(
        "/api/buyers/import",
        &token,
        format!("{HEADER}\nX,,1,Mars,Plot,,Buy,,,0-3m,Website,,,\n"),
    ));
    assert_eq!(resp.status(), 400);
    let body = read_json(resp);
    assert_eq!(body["message"], "No valid rows found in CSV");
    assert_eq!(body["errors"][0]["row"], 1);
}

#[test]
fn oversized_upload_is_rejected() {
    let t = TestApp::with_config(|c| c.max_upload_bytes = 64);
    let token = t.sign_in("importer@example.com");

    let resp = t.send(csv_request("/api/buyers/import", &token, format!("{HEADER}\n")));
    assert_eq!(resp.status(), 413);
}

#[test]
fn unbounded_upload_cap_still_reads_the_body() {
    let t = TestApp::with_config(|c| c.max_upload_bytes = u64::MAX);
    let token = t.sign_in("importer@example.com");

    let resp = t.send(csv_request(
        "/api/buyers/import",
        &token,
        format!("{HEADER}\nOm Prakash,,9876500012,Other,Retail,,Rent,,,Exploring,Walk-in,,,\n"),
    ));
    assert_eq!(resp.status(), 201);
    assert_eq!(read_json(resp)["successCount"], 1);
}
