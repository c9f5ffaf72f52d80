//! Assignment lifecycle and bike hand-off integration tests.

mod common;

use common::TestApp;
use serde_json::{json, Value};

#[tokio::test]
async fn create_assignment_claims_bike_and_populates() {
    let app = TestApp::spawn().await;
    let rider_id = app.create_rider().await;
    let bike_id = app.create_bike().await;
    let id = app.create_assignment(&rider_id, &bike_id).await;

    let body = app.json(&format!("/assignments/{}", id)).await;
    let assignment = &body["assignment"];
    assert_eq!(assignment["status"], "active");
    assert_eq!(assignment["paymentStatus"], "pending");
    assert_eq!(assignment["paidAmount"], 0.0);
    assert_eq!(assignment["rider"]["id"], rider_id.as_str());
    assert_eq!(assignment["bike"]["id"], bike_id.as_str());
    assert!(assignment["endDate"].as_str().unwrap().starts_with("2026-04-01"));

    let bike = app.json(&format!("/bikes/{}", bike_id)).await;
    assert_eq!(bike["bike"]["status"], "assigned");

    app.cleanup().await;
}

#[tokio::test]
async fn bike_cannot_be_assigned_twice() {
    let app = TestApp::spawn().await;
    let bike_id = app.create_bike().await;
    let first = app.create_rider().await;
    let second = app.create_rider().await;
    app.create_assignment(&first, &bike_id).await;

    let response = app
        .post(
            "/assignments",
            json!({
                "riderId": second,
                "bikeId": bike_id,
                "startDate": "2026-01-01",
                "tenureMonths": 1,
                "monthlyCharge": 500.0
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn rider_cannot_hold_two_open_assignments() {
    let app = TestApp::spawn().await;
    let rider_id = app.create_rider().await;
    let first_bike = app.create_bike().await;
    let second_bike = app.create_bike().await;
    app.create_assignment(&rider_id, &first_bike).await;

    let response = app
        .post(
            "/assignments",
            json!({
                "riderId": rider_id,
                "bikeId": second_bike,
                "startDate": "2026-01-01",
                "tenureMonths": 1,
                "monthlyCharge": 500.0
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 409);

    // The refused request must not have claimed the second bike
    let bike = app.json(&format!("/bikes/{}", second_bike)).await;
    assert_eq!(bike["bike"]["status"], "available");

    app.cleanup().await;
}

#[tokio::test]
async fn missing_rider_is_a_bad_request() {
    let app = TestApp::spawn().await;
    let bike_id = app.create_bike().await;

    let response = app
        .post(
            "/assignments",
            json!({
                "riderId": "no-such-rider",
                "bikeId": bike_id,
                "startDate": "2026-01-01",
                "tenureMonths": 1,
                "monthlyCharge": 500.0
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn completing_assignment_releases_bike() {
    let app = TestApp::spawn().await;
    let rider_id = app.create_rider().await;
    let bike_id = app.create_bike().await;
    let id = app.create_assignment(&rider_id, &bike_id).await;

    let response = app
        .put(
            &format!("/assignments/{}", id),
            json!({ "status": "completed" }),
        )
        .await;
    assert!(response.status().is_success());

    let bike = app.json(&format!("/bikes/{}", bike_id)).await;
    assert_eq!(bike["bike"]["status"], "available");
    assert!(bike["bike"]["currentAssignmentId"].is_null());

    // Rider and bike are free for a new assignment
    app.create_assignment(&rider_id, &bike_id).await;

    app.cleanup().await;
}

#[tokio::test]
async fn tenure_change_moves_end_date() {
    let app = TestApp::spawn().await;
    let id = app.seed_assignment().await;

    let response = app
        .put(&format!("/assignments/{}", id), json!({ "tenureMonths": 6 }))
        .await;
    let body: Value = response.json().await.unwrap();
    assert!(body["assignment"]["endDate"]
        .as_str()
        .unwrap()
        .starts_with("2026-07-01"));

    app.cleanup().await;
}

#[tokio::test]
async fn delete_cancels_and_frees_bike() {
    let app = TestApp::spawn().await;
    let rider_id = app.create_rider().await;
    let bike_id = app.create_bike().await;
    let id = app.create_assignment(&rider_id, &bike_id).await;

    let response = app.delete(&format!("/assignments/{}", id)).await;
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["assignment"]["status"], "cancelled");
    assert_eq!(body["assignment"]["isActive"], false);

    let bike = app.json(&format!("/bikes/{}", bike_id)).await;
    assert_eq!(bike["bike"]["status"], "available");

    let listed = app.json("/assignments").await;
    assert_eq!(listed["pagination"]["total"], 0);

    app.cleanup().await;
}
