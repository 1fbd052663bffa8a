use crate::config::RateLimitStoreKind;
use crate::tests::utils::{read_json, request, TestApp};
use astra::Body;

fn from(ip: &str) -> http::Request<Body> {
    let mut req = request("GET", "/", None, Body::empty());
    req.headers_mut()
        .insert("X-Forwarded-For", format!("{ip}, 10.0.0.1").parse().unwrap());
    req
}

fn blocks_after_limit(store: RateLimitStoreKind) {
    let t = TestApp::with_config(|c| {
        c.rate_limit.max_requests = 3;
        c.rate_limit.store = store;
    });

    for expected_remaining in ["2", "1", "0"] {
        let resp = t.send(from("203.0.113.7"));
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["X-RateLimit-Limit"], "3");
        assert_eq!(resp.headers()["X-RateLimit-Remaining"], expected_remaining);
    }

    let resp = t.send(from("203.0.113.7"));
    assert_eq!(resp.status(), 429);
    assert_eq!(resp.headers()["X-RateLimit-Remaining"], "0");
    let retry_after: i64 = resp.headers()["Retry-After"].to_str().unwrap().parse().unwrap();
    assert!(retry_after > 0 && retry_after <= 900);
    assert_eq!(
        read_json(resp)["message"],
        "Too many requests. Please try again later."
    );

    // A different client is counted separately.
    assert_eq!(t.send(from("198.51.100.2")).status(), 200);
}

#[test]
fn memory_store_limits_per_client() {
    blocks_after_limit(RateLimitStoreKind::Memory);
}

#[test]
fn sqlite_store_limits_per_client() {
    blocks_after_limit(RateLimitStoreKind::Sqlite);
}
