/// Common test utilities for integration tests
///
/// Provides shared infrastructure:
/// - Test database setup (live Postgres via DATABASE_URL) and migrations
/// - App construction with test secrets
/// - Request helpers returning (status, parsed JSON body)
/// - Registration helper and cleanup

use axum::body::Body;
use axum::http::{Request, StatusCode};
use ledgerbook_api::app::{build_router, AppState};
use ledgerbook_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::Service as _;
use uuid::Uuid;

/// Test context carrying the database pool and the built router
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

impl TestContext {
    /// Creates a new test context against the DATABASE_URL database
    pub async fn new() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests");

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: database_url.clone(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                access_secret: "integration-access-secret-32-bytes!!!!".to_string(),
                refresh_secret: "integration-refresh-secret-32-bytes!!!".to_string(),
                access_ttl_minutes: 15,
                refresh_ttl_days: 7,
            },
        };

        let db = PgPool::connect(&database_url).await?;

        // Path relative to the crate's Cargo.toml
        sqlx::migrate!("../migrations").run(&db).await?;

        let state = AppState::new(db.clone(), config);
        let app = build_router(state);

        Ok(TestContext { db, app })
    }

    /// Generates an email no other test run will collide with
    pub fn unique_email(prefix: &str) -> String {
        format!("{}-{}@ledgerbook.test", prefix, Uuid::new_v4())
    }

    /// Sends a request and returns the status plus the parsed JSON body
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Registers a user and returns the session response body
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/v1/auth/register",
                None,
                Some(json!({ "email": email, "password": password, "name": name })),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "register failed: {}", body);
        body
    }

    /// Returns the ID of the caller's first (usually only) organization
    pub async fn first_org_id(&self, access_token: &str) -> String {
        let (status, body) = self
            .request("GET", "/v1/organizations", Some(access_token), None)
            .await;

        assert_eq!(status, StatusCode::OK, "listing organizations failed: {}", body);
        body[0]["id"].as_str().expect("org id").to_string()
    }

    /// Finds a membership ID in a member listing by the member's email
    pub async fn member_id_by_email(
        &self,
        access_token: &str,
        org_id: &str,
        email: &str,
    ) -> String {
        let (status, body) = self
            .request(
                "GET",
                &format!("/v1/organizations/{}/members", org_id),
                Some(access_token),
                None,
            )
            .await;

        assert_eq!(status, StatusCode::OK, "listing members failed: {}", body);

        body.as_array()
            .expect("member list")
            .iter()
            .find(|m| m["user"]["email"] == email)
            .and_then(|m| m["id"].as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| panic!("no member with email {} in {}", email, body))
    }

    /// Removes test users and the organizations they solely own
    pub async fn cleanup_users(&self, emails: &[&str]) -> anyhow::Result<()> {
        for email in emails {
            sqlx::query(
                r#"
                DELETE FROM organizations o
                USING organization_members m, users u
                WHERE m.organization_id = o.id
                  AND m.user_id = u.id
                  AND m.role = 'OWNER'
                  AND u.email = $1
                "#,
            )
            .bind(email)
            .execute(&self.db)
            .await?;

            sqlx::query("DELETE FROM users WHERE email = $1")
                .bind(email)
                .execute(&self.db)
                .await?;
        }
        Ok(())
    }
}
