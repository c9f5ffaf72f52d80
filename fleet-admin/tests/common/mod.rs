#![allow(dead_code)]

use fleet_admin::config::AdminConfig;
use fleet_admin::services::MongoDb;
use fleet_admin::startup::Application;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use uuid::Uuid;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: MongoDb,
    pub db_name: String,
    pub client: Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let uri = std::env::var("TEST_MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        std::env::set_var("FLEET__MONGODB__URI", uri);

        let db_name = format!("fleet_test_{}", Uuid::new_v4().simple());

        let mut config = AdminConfig::load().expect("Failed to load configuration");
        config.server.port = 0; // Random port for testing
        config.mongodb.database = db_name.clone();

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            db_name,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// POST and return the JSON body, asserting 201.
    pub async fn create(&self, path: &str, body: Value) -> Value {
        let response = self.post(path, body).await;
        let status = response.status();
        let body: Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(status.as_u16(), 201, "create {} failed: {}", path, body);
        body
    }

    pub async fn create_rider(&self) -> String {
        let phone = format!("+91{}", &Uuid::new_v4().simple().to_string()[..10]);
        let body = self
            .create("/riders", json!({ "name": "Asha Rao", "phone": phone }))
            .await;
        body["rider"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_bike(&self) -> String {
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        let body = self
            .create(
                "/bikes",
                json!({
                    "bikeNumber": format!("BK-{}", suffix),
                    "registrationNumber": format!("KA01-{}", suffix),
                    "model": "Hero Electric",
                    "zone": "north",
                }),
            )
            .await;
        body["bike"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_assignment(&self, rider_id: &str, bike_id: &str) -> String {
        let body = self
            .create(
                "/assignments",
                json!({
                    "riderId": rider_id,
                    "bikeId": bike_id,
                    "startDate": "2026-01-01",
                    "tenureMonths": 3,
                    "monthlyCharge": 800.0,
                }),
            )
            .await;
        body["assignment"]["id"].as_str().unwrap().to_string()
    }

    /// Rider + bike + assignment in one go; returns the assignment id.
    pub async fn seed_assignment(&self) -> String {
        let rider_id = self.create_rider().await;
        let bike_id = self.create_bike().await;
        self.create_assignment(&rider_id, &bike_id).await
    }

    pub async fn create_payment(&self, assignment_id: &str, amount: f64, status: &str) -> String {
        let body = self
            .create(
                "/payments",
                json!({
                    "assignmentId": assignment_id,
                    "amount": amount,
                    "status": status,
                    "dueDate": "2026-02-01",
                }),
            )
            .await;
        body["payment"]["id"].as_str().unwrap().to_string()
    }

    pub async fn json(&self, path: &str) -> Value {
        let response = self.get(path).await;
        assert!(response.status().is_success(), "GET {} failed", path);
        response.json().await.expect("Failed to parse JSON")
    }

    /// Drop the per-test database.
    pub async fn cleanup(&self) {
        let _ = self.db.client().database(&self.db_name).drop(None).await;
    }
}
