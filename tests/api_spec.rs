use std::sync::Arc;

use axum_test::TestServer;
use serde_json::{json, Value};

use circulate::api::{create_router, AppState};
use circulate_core::models::{Book, Member};
use circulate_core::store::{BookStore, InMemoryBooks, InMemoryMembers, MemberStore};
use circulate_core::{Catalog, Circulation, LendingPolicy};

fn test_server() -> TestServer {
    let books = Arc::new(InMemoryBooks::new());
    let members = Arc::new(InMemoryMembers::new());

    for (id, name) in [("m1", "Kertu"), ("m2", "Rasmus"), ("m3", "Liis")] {
        members.save(&Member::new(id, name)).unwrap();
    }
    for (id, title) in [
        ("b1", "Clean Code"),
        ("b2", "The Pragmatic Programmer"),
        ("b3", "Refactoring"),
        ("b4", "Domain-Driven Design"),
        ("b5", "Working Effectively with Legacy Code"),
        ("b6", "A Philosophy of Software Design"),
    ] {
        books.save(&Book::new(id, title)).unwrap();
    }

    let state = AppState {
        circulation: Circulation::new(books.clone(), members.clone(), LendingPolicy::default()),
        catalog: Catalog::new(books, members),
    };
    TestServer::new(create_router(state)).unwrap()
}

async fn post(server: &TestServer, path: &str, book_id: &str, member_id: &str) -> Value {
    server
        .post(path)
        .json(&json!({ "book_id": book_id, "member_id": member_id }))
        .await
        .json()
}

async fn fetch_book(server: &TestServer, id: &str) -> Value {
    let body: Value = server.get("/api/books").await.json();
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == id)
        .cloned()
        .expect("book should be listed")
}

#[tokio::test]
async fn cannot_borrow_already_loaned_book() {
    let server = test_server();

    let first = post(&server, "/api/borrow", "b1", "m1").await;
    assert_eq!(first["ok"], json!(true));

    let second = post(&server, "/api/borrow", "b1", "m2").await;
    assert_eq!(second["ok"], json!(false));
    assert_eq!(second["reason"], json!("ALREADY_LOANED"));
}

#[tokio::test]
async fn return_rejected_when_not_current_borrower() {
    let server = test_server();
    post(&server, "/api/borrow", "b2", "m1").await;

    let wrong_return = post(&server, "/api/return", "b2", "m2").await;
    assert_eq!(wrong_return["ok"], json!(false));

    let book = fetch_book(&server, "b2").await;
    assert_eq!(book["loaned_to"], json!("m1"));
}

#[tokio::test]
async fn reserve_available_book_loans_immediately() {
    let server = test_server();

    let reserved = post(&server, "/api/reserve", "b3", "m2").await;
    assert_eq!(reserved["ok"], json!(true));

    let book = fetch_book(&server, "b3").await;
    assert_eq!(book["loaned_to"], json!("m2"));
    assert_eq!(book["reservation_queue"], json!([]));
}

#[tokio::test]
async fn duplicate_reservation_is_rejected() {
    let server = test_server();
    post(&server, "/api/borrow", "b4", "m1").await;

    let first = post(&server, "/api/reserve", "b4", "m2").await;
    assert_eq!(first["ok"], json!(true));

    let second = post(&server, "/api/reserve", "b4", "m2").await;
    assert_eq!(second["ok"], json!(false));
    assert_eq!(second["reason"], json!("ALREADY_RESERVED"));
}

#[tokio::test]
async fn return_hands_off_to_next_eligible_reserver_and_maintains_queue() {
    let server = test_server();
    post(&server, "/api/borrow", "b5", "m1").await;
    post(&server, "/api/reserve", "b5", "m2").await;
    post(&server, "/api/reserve", "b5", "m3").await;

    let returned = post(&server, "/api/return", "b5", "m1").await;
    assert_eq!(returned["ok"], json!(true));
    assert_eq!(returned["next_member_id"], json!("m2"));

    let book = fetch_book(&server, "b5").await;
    assert_eq!(book["loaned_to"], json!("m2"));
    assert_eq!(book["reservation_queue"], json!(["m3"]));
}

#[tokio::test]
async fn return_skips_missing_reserver_and_hands_off_to_next() {
    let server = test_server();
    post(&server, "/api/borrow", "b6", "m1").await;
    post(&server, "/api/reserve", "b6", "m2").await;
    post(&server, "/api/reserve", "b6", "m3").await;

    let deleted: Value = server.delete("/api/members/m2").await.json();
    assert_eq!(deleted["ok"], json!(true));

    let returned = post(&server, "/api/return", "b6", "m1").await;
    assert_eq!(returned["ok"], json!(true));
    assert_eq!(returned["next_member_id"], json!("m3"));

    let book = fetch_book(&server, "b6").await;
    assert_eq!(book["loaned_to"], json!("m3"));
    assert_eq!(book["reservation_queue"], json!([]));
}

#[tokio::test]
async fn return_skips_reserver_at_borrow_limit_and_hands_off_to_next() {
    let server = test_server();
    for book_id in ["b1", "b2", "b3", "b4", "b5"] {
        let loaned = post(&server, "/api/borrow", book_id, "m2").await;
        assert_eq!(loaned["ok"], json!(true));
    }

    post(&server, "/api/borrow", "b6", "m1").await;
    post(&server, "/api/reserve", "b6", "m2").await;
    post(&server, "/api/reserve", "b6", "m3").await;

    let returned = post(&server, "/api/return", "b6", "m1").await;
    assert_eq!(returned["ok"], json!(true));
    assert_eq!(returned["next_member_id"], json!("m3"));

    let book = fetch_book(&server, "b6").await;
    assert_eq!(book["loaned_to"], json!("m3"));
    assert_eq!(book["reservation_queue"], json!([]));
}

#[tokio::test]
async fn cancel_reservation_removes_the_queue_position() {
    let server = test_server();
    post(&server, "/api/borrow", "b4", "m1").await;
    post(&server, "/api/reserve", "b4", "m2").await;

    let cancelled = post(&server, "/api/cancel-reservation", "b4", "m2").await;
    assert_eq!(cancelled["ok"], json!(true));

    let again = post(&server, "/api/cancel-reservation", "b4", "m2").await;
    assert_eq!(again["ok"], json!(false));
    assert_eq!(again["reason"], json!("NOT_RESERVED"));

    let book = fetch_book(&server, "b4").await;
    assert_eq!(book["loaned_to"], json!("m1"));
    assert_eq!(book["reservation_queue"], json!([]));
}

#[tokio::test]
async fn member_summary_reports_loans_and_positions() {
    let server = test_server();
    post(&server, "/api/borrow", "b1", "m2").await;
    post(&server, "/api/borrow", "b2", "m1").await;
    post(&server, "/api/reserve", "b2", "m3").await;
    post(&server, "/api/reserve", "b2", "m2").await;

    let summary: Value = server.get("/api/members/m2/summary").await.json();
    assert_eq!(summary["ok"], json!(true));
    assert_eq!(summary["loans"][0]["id"], json!("b1"));
    assert_eq!(summary["reservations"][0]["book_id"], json!("b2"));
    assert_eq!(summary["reservations"][0]["position"], json!(1));

    let missing: Value = server.get("/api/members/nobody/summary").await.json();
    assert_eq!(missing["ok"], json!(false));
    assert_eq!(missing["reason"], json!("MEMBER_NOT_FOUND"));
}

#[tokio::test]
async fn extend_rejects_zero_days() {
    let server = test_server();
    post(&server, "/api/borrow", "b1", "m1").await;

    let extended: Value = server
        .post("/api/extend")
        .json(&json!({ "book_id": "b1", "days": 0 }))
        .await
        .json();
    assert_eq!(extended["ok"], json!(false));
    assert_eq!(extended["reason"], json!("INVALID_EXTENSION"));

    let accepted: Value = server
        .post("/api/extend")
        .json(&json!({ "book_id": "b1", "days": 7 }))
        .await
        .json();
    assert_eq!(accepted["ok"], json!(true));
}

#[tokio::test]
async fn search_filters_by_availability_and_holder() {
    let server = test_server();
    post(&server, "/api/borrow", "b1", "m1").await;

    let loaned: Value = server
        .get("/api/books")
        .add_query_param("available", "false")
        .await
        .json();
    let ids: Vec<&str> = loaned["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b1"]);

    let by_holder: Value = server
        .get("/api/books")
        .add_query_param("loaned_to", "m1")
        .await
        .json();
    assert_eq!(by_holder["items"][0]["id"], json!("b1"));

    let by_title: Value = server
        .get("/api/books")
        .add_query_param("title", "pragmatic")
        .await
        .json();
    assert_eq!(by_title["items"][0]["id"], json!("b2"));
}

#[tokio::test]
async fn eligibility_is_exposed_per_member() {
    let server = test_server();
    for book_id in ["b1", "b2", "b3", "b4", "b5"] {
        post(&server, "/api/borrow", book_id, "m2").await;
    }

    let at_limit: Value = server.get("/api/members/m2/can-borrow").await.json();
    assert_eq!(at_limit["eligible"], json!(false));

    let clear: Value = server.get("/api/members/m1/can-borrow").await.json();
    assert_eq!(clear["eligible"], json!(true));
}
