//! API integration tests against the in-memory store

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::Fixture;

async fn app(quantity: i32) -> (Fixture, Router) {
    let fixture = Fixture::with_quantity(quantity).await;
    let router = library_ledger::api::create_router(fixture.state.clone());
    (fixture, router)
}

/// Send one request and decode the JSON response
async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn issue_body(fixture: &Fixture) -> Value {
    json!({
        "library_id": fixture.library_id,
        "book_id": fixture.book_id,
        "reader_id": fixture.reader_id,
        "deposit": "5.00"
    })
}

async fn book_quantity(router: &Router, book_id: i32) -> i64 {
    let (status, body) = send(router, Method::GET, &format!("/api/v1/books/{}/quantity", book_id), None).await;
    assert_eq!(status, StatusCode::OK);
    body["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (_fixture, router) = app(1).await;

    let (status, body) = send(&router, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&router, Method::GET, "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_issue_book() {
    let (fixture, router) = app(2).await;

    let (status, body) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["subscription_id"].is_i64());
    assert_eq!(body["book_id"], fixture.book_id);
    assert!(body["return_date"].is_null());
    assert_eq!(book_quantity(&router, fixture.book_id).await, 1);
}

#[tokio::test]
async fn test_issue_out_of_stock() {
    let (fixture, router) = app(0).await;

    let (status, body) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book not available");
    assert_eq!(body["error"], "BookNotAvailable");
    assert_eq!(book_quantity(&router, fixture.book_id).await, 0);
}

#[tokio::test]
async fn test_issue_unknown_book() {
    let (fixture, router) = app(1).await;
    let mut body = issue_body(&fixture);
    body["book_id"] = json!(999);

    let (status, response) = send(&router, Method::POST, "/api/v1/subscriptions", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Book not available");
    assert_eq!(response["error"], "BookNotAvailable");
    assert_eq!(book_quantity(&router, fixture.book_id).await, 1);
}

#[tokio::test]
async fn test_issue_rejects_negative_deposit() {
    let (fixture, router) = app(1).await;
    let mut body = issue_body(&fixture);
    body["deposit"] = json!("-1.00");

    let (status, response) = send(&router, Method::POST, "/api/v1/subscriptions", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "BadValue");
    assert_eq!(book_quantity(&router, fixture.book_id).await, 1);
}

#[tokio::test]
async fn test_return_book_twice() {
    let (fixture, router) = app(1).await;
    let (_, created) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let id = created["subscription_id"].as_i64().unwrap();
    let uri = format!("/api/v1/subscriptions/{}/return", id);

    let (status, body) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Book returned successfully");
    assert_eq!(body["book_quantity"], 1);
    assert!(body["subscription"]["return_date"].is_string());

    let (status, body) = send(&router, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book already returned");
    assert_eq!(book_quantity(&router, fixture.book_id).await, 1);
}

#[tokio::test]
async fn test_delete_active_subscription() {
    let (fixture, router) = app(1).await;
    let (_, created) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let id = created["subscription_id"].as_i64().unwrap();
    let uri = format!("/api/v1/subscriptions/{}", id);

    let (status, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription_id"], id);
    assert_eq!(body["inventory_restored"], true);
    assert_eq!(body["book_quantity"], 1);

    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NoSuchData");
}

#[tokio::test]
async fn test_delete_returned_subscription() {
    let (fixture, router) = app(1).await;
    let (_, created) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let id = created["subscription_id"].as_i64().unwrap();
    send(&router, Method::POST, &format!("/api/v1/subscriptions/{}/return", id), None).await;

    let (status, body) = send(&router, Method::DELETE, &format!("/api/v1/subscriptions/{}", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory_restored"], false);
    assert!(body["book_quantity"].is_null());
    assert_eq!(book_quantity(&router, fixture.book_id).await, 1);
}

#[tokio::test]
async fn test_unknown_subscription() {
    let (_fixture, router) = app(1).await;

    let (status, _) = send(&router, Method::GET, "/api/v1/subscriptions/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, Method::POST, "/api/v1/subscriptions/404/return", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, Method::DELETE, "/api/v1/subscriptions/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&router, Method::GET, "/api/v1/subscriptions/404/status", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_subscription_status() {
    let (fixture, router) = app(1).await;
    let (_, created) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let id = created["subscription_id"].as_i64().unwrap();

    let (status, body) = send(&router, Method::GET, &format!("/api/v1/subscriptions/{}/status", id), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscription_id"], id);
    assert_eq!(body["is_active"], true);
    assert_eq!(body["is_overdue"], false);
    assert_eq!(body["days_overdue"], 0);
}

#[tokio::test]
async fn test_active_subscriptions_report() {
    let (fixture, router) = app(3).await;
    let (_, first) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let (_, second) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let second_id = second["subscription_id"].as_i64().unwrap();
    send(&router, Method::POST, &format!("/api/v1/subscriptions/{}/return", second_id), None).await;

    for uri in ["/api/v1/subscriptions/active", "/api/v1/subscriptions/active/"] {
        let (status, body) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["subscription_id"], first["subscription_id"]);
        assert_eq!(rows[0]["reader_name"], "Anna Karenina");
        assert_eq!(rows[0]["book_title"], "War and Peace");
        assert_eq!(rows[0]["library_name"], "Central Library");
    }

    let uri = format!("/api/v1/subscriptions/active?library_id={}", fixture.library_id + 100);
    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let uri = format!("/api/v1/readers/{}/subscriptions/active", fixture.reader_id);
    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_subscriptions_with_filters() {
    let (fixture, router) = app(5).await;
    for _ in 0..3 {
        send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    }

    let (status, body) = send(&router, Method::GET, "/api/v1/subscriptions?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0]["subscription_id"].as_i64() > rows[1]["subscription_id"].as_i64());

    let uri = format!("/api/v1/subscriptions?reader_id={}&order=asc", fixture.reader_id + 1);
    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_books_and_stats() {
    let (fixture, router) = app(4).await;

    let (status, book) = send(&router, Method::GET, &format!("/api/v1/books/{}", fixture.book_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(book["title"], "War and Peace");

    let (status, _) = send(&router, Method::GET, "/api/v1/books/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let bad_book = json!({
        "library_id": fixture.library_id,
        "topic_id": fixture.topic_id,
        "author_id": fixture.author_id,
        "title": "Anna Karenina",
        "publish_year": 1200,
        "quantity": 1,
        "price": "10.00"
    });
    let (status, _) = send(&router, Method::POST, "/api/v1/books", Some(bad_book)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&router, Method::GET, "/api/v1/stats/libraries", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["library_name"], "Central Library");
    assert_eq!(body[0]["total_books"], 1);
    assert_eq!(body[0]["total_copies"], 4);

    let (status, body) = send(&router, Method::GET, "/api/v1/stats/authors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["author_name"], "Leo Tolstoy");
    assert_eq!(body[0]["total_copies"], 4);
}

#[tokio::test]
async fn test_detailed_views() {
    let (fixture, router) = app(2).await;
    let (_, first) = send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;
    let first_id = first["subscription_id"].as_i64().unwrap();
    send(&router, Method::POST, &format!("/api/v1/subscriptions/{}/return", first_id), None).await;
    send(&router, Method::POST, "/api/v1/subscriptions", Some(issue_body(&fixture))).await;

    for uri in ["/api/v1/subscriptions/detailed", "/api/v1/subscriptions/detailed/"] {
        let (status, body) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0]["return_date"].is_null());
        assert_eq!(rows[1]["subscription_id"], first_id);
        assert!(rows[1]["return_date"].is_string());
        assert_eq!(rows[1]["reader_name"], "Anna Karenina");
        assert_eq!(rows[1]["library_name"], "Central Library");
    }

    for uri in ["/api/v1/books/detailed", "/api/v1/books/detailed/"] {
        let (status, body) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "War and Peace");
        assert_eq!(rows[0]["author_name"], "Leo Tolstoy");
        assert_eq!(rows[0]["topic_name"], "Novels");
        assert_eq!(rows[0]["quantity"], 1);
    }
}
