//! Rider CRUD integration tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
async fn create_and_fetch_rider() {
    let app = TestApp::spawn().await;

    let body = app
        .create(
            "/riders",
            json!({
                "name": "Ravi Kumar",
                "phone": "9876543210",
                "email": "ravi@example.com",
                "emergencyContact": { "name": "Meena", "phone": "9123456780" }
            }),
        )
        .await;
    assert_eq!(body["message"], "Rider created successfully");
    let id = body["rider"]["id"].as_str().unwrap();
    assert_eq!(body["rider"]["status"], "active");

    let fetched = app.json(&format!("/riders/{}", id)).await;
    assert_eq!(fetched["rider"]["name"], "Ravi Kumar");
    assert_eq!(fetched["rider"]["emergencyContact"]["name"], "Meena");

    app.cleanup().await;
}

#[tokio::test]
async fn duplicate_phone_is_a_conflict() {
    let app = TestApp::spawn().await;

    let rider = json!({ "name": "Ravi", "phone": "9876543210" });
    app.create("/riders", rider.clone()).await;

    let response = app.post("/riders", rider).await;
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_payload_returns_field_details() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/riders", json!({ "name": "", "phone": "123" }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Validation error");
    assert_eq!(body["details"].as_array().unwrap().len(), 2);

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_status_is_rejected() {
    let app = TestApp::spawn().await;
    let id = app.create_rider().await;

    let response = app
        .put(&format!("/riders/{}", id), json!({ "status": "suspended" }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn list_paginates_and_searches() {
    let app = TestApp::spawn().await;
    for (name, phone) in [
        ("Asha Rao", "9000000001"),
        ("Bala Iyer", "9000000002"),
        ("Chitra Rao", "9000000003"),
    ] {
        app.create("/riders", json!({ "name": name, "phone": phone }))
            .await;
    }

    let page = app.json("/riders?page=1&limit=2&sortBy=name&sortOrder=asc").await;
    assert_eq!(page["riders"].as_array().unwrap().len(), 2);
    assert_eq!(page["riders"][0]["name"], "Asha Rao");
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["pages"], 2);

    let found = app.json("/riders?search=rao").await;
    assert_eq!(found["pagination"]["total"], 2);

    let response = app.get("/riders?sortBy=password").await;
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn out_of_range_page_is_a_bad_request() {
    let app = TestApp::spawn().await;

    for page in ["18446744073709551615", "100000000000000000"] {
        let response = app
            .get(&format!("/riders?page={}&limit=100", page))
            .await;
        assert_eq!(response.status().as_u16(), 400, "page={}", page);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("out of range"));
    }

    app.cleanup().await;
}

#[tokio::test]
async fn soft_deleted_rider_is_hidden_and_frozen() {
    let app = TestApp::spawn().await;
    let id = app.create_rider().await;

    let response = app.delete(&format!("/riders/{}", id)).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["rider"]["status"], "inactive");
    assert_eq!(body["rider"]["isActive"], false);

    let listed = app.json("/riders").await;
    assert_eq!(listed["pagination"]["total"], 0);
    let listed = app.json("/riders?includeInactive=true").await;
    assert_eq!(listed["pagination"]["total"], 1);

    let response = app
        .put(&format!("/riders/{}", id), json!({ "name": "Back again" }))
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app.delete(&format!("/riders/{}", id)).await;
    assert_eq!(response.status().as_u16(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn rider_with_open_assignment_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let rider_id = app.create_rider().await;
    let bike_id = app.create_bike().await;
    app.create_assignment(&rider_id, &bike_id).await;

    let response = app.delete(&format!("/riders/{}", rider_id)).await;
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}
