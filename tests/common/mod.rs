use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use restaurant_rs::{
    create_app, models::CreateUserRequest, repositories::Database, AppContext, Config, Metrics,
};

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "testpass";

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub context: AppContext,
}

/// Configuration for a server backed by a private in-memory database
pub fn test_config() -> Config {
    let variables: HashMap<String, String> = [
        ("RESTAURANT_DATABASE_URL", "sqlite::memory:"),
        ("RESTAURANT_SERVICE_NAME", "restaurant-test"),
        ("RESTAURANT_SERVICE_VERSION", "9.9.9-test"),
        ("RESTAURANT_REQUEST_TIMEOUT_SECONDS", "10"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect();

    Config::from_source(config::Environment::with_prefix("RESTAURANT").source(Some(variables)))
        .expect("Failed to build test configuration")
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let config = test_config();
        let database = Database::connect(&config.database)
            .await
            .expect("Failed to open test database");
        database.migrate().await.expect("Failed to migrate test database");

        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let context = AppContext::new(database, metrics);
        let app = create_app(&context, &config);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Failed to serve app");
        });

        // Wait for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            client: Client::new(),
            base_url,
            context,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register the standard test user and return a token for it
    pub async fn create_user_and_token(&self) -> String {
        self.context
            .auth_service
            .register_user(CreateUserRequest {
                username: TEST_USERNAME.to_string(),
                password: TEST_PASSWORD.to_string(),
                is_staff: false,
            })
            .await
            .expect("Failed to register test user");

        let response = self
            .client
            .post(self.url("/api-token-auth/"))
            .json(&json!({"username": TEST_USERNAME, "password": TEST_PASSWORD}))
            .send()
            .await
            .expect("Failed to request token");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.expect("Failed to parse token response");
        body["token"]
            .as_str()
            .expect("Token missing from response")
            .to_string()
    }

    pub async fn create_menu_item(&self, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/menu/items/"))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.expect("Failed to parse response")
    }
}
