use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use estop_records::config::{Config, DatabaseConfig};
use estop_records::credentials::CredentialStore;
use estop_records::db;
use estop_records::state::SharedState;

pub const ADMIN: (&str, &str) = ("ckull", "mera7");
pub const SUPERVISOR: (&str, &str) = ("mhiggins", "supervisor-pass");
pub const TESTER: (&str, &str) = ("jpetereit", "tester-pass");

/// A running test server backed by an in-memory database and a throwaway
/// users file.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: SqlitePool,
    pub client: Client,
    pub users_file: PathBuf,
    #[allow(dead_code)]
    pub state: SharedState,
}

/// Name/value of the cookie set by `resp`, if any.
pub fn set_cookie(resp: &Response, name: &str) -> Option<String> {
    resp.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .find(|pair| pair.starts_with(&format!("{name}=")))
        .map(str::to_string)
}

pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Submit the login form and return the raw response.
    pub async fn login_raw(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("login request failed")
    }

    /// Log in and return the session cookie as a `name=value` pair.
    pub async fn login(&self, (username, password): (&str, &str)) -> String {
        let resp = self.login_raw(username, password).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login failed for {username}");
        set_cookie(&resp, "estop_session").expect("no session cookie issued")
    }

    pub async fn get(&self, path: &str, cookie: &str) -> Response {
        self.client
            .get(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await
            .expect("get request failed")
    }

    pub async fn get_json(&self, path: &str, cookie: &str) -> (Value, StatusCode) {
        let resp = self.get(path, cookie).await;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_json(&self, path: &str, cookie: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_form(&self, path: &str, cookie: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .form(form)
            .send()
            .await
            .expect("form request failed")
    }

    pub async fn delete(&self, path: &str, cookie: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await
            .expect("delete request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Record a test and return the new record id.
    pub async fn record_test(&self, cookie: &str, machine_id: i64, device_id: i64, result: &str) -> i64 {
        let (body, status) = self
            .post_json(
                "/test",
                cookie,
                &json!({
                    "machine_id": machine_id,
                    "device_id": device_id,
                    "test_result": result,
                    "notes": "",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "record test failed: {body}");
        body["record_id"].as_i64().unwrap()
    }
}

/// Id of the seeded device `name` on machine `machine`.
#[allow(dead_code)]
pub async fn device_id(pool: &SqlitePool, machine: &str, name: &str) -> (i64, i64) {
    sqlx::query_as(
        "SELECT m.id, sd.id FROM safety_devices sd
         JOIN machines m ON sd.machine_id = m.id
         WHERE m.name = ?1 AND sd.name = ?2",
    )
    .bind(machine)
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("seeded device missing")
}

/// A users file path unique to one test.
pub fn temp_users_file() -> PathBuf {
    std::env::temp_dir().join(format!("estop_users_{}.json", Uuid::now_v7()))
}

/// The three seed accounts. The admin still carries a legacy plaintext
/// password, the others are hashed on load the same way.
pub fn seed_users_document() -> Value {
    json!({
        "ckull": {
            "first_name": "Chris",
            "last_name": "Kull",
            "email": "ckull@example.com",
            "password": ADMIN.1,
            "role": "admin",
            "privileges": ["admin"],
            "created_at": "2024-01-15 08:30:00"
        },
        "mhiggins": {
            "first_name": "Morgan",
            "last_name": "Higgins",
            "email": "mhiggins@example.com",
            "password": SUPERVISOR.1,
            "role": "supervisor",
            "privileges": ["supervisor"],
            "created_at": "2024-02-01 09:00:00"
        },
        "jpetereit": {
            "first_name": "Jamie",
            "last_name": "Petereit",
            "email": "jpetereit@example.com",
            "password": TESTER.1,
            "role": "user",
            "created_at": "2024-03-10 14:45:00"
        }
    })
}

pub fn test_config(users_file: PathBuf) -> Config {
    Config {
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
        },
        session_secret: "test-session-secret-that-is-long-enough".to_string(),
        session_ttl: Duration::from_secs(60 * 60),
        secure_cookies: false,
        users_file,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        seed_sample_data: true,
        log_level: "warn".to_string(),
    }
}

/// Spawn a test app with a fresh in-memory database, sample machines and
/// the seed accounts.
pub async fn spawn_app() -> TestApp {
    let users_file = temp_users_file();
    std::fs::write(
        &users_file,
        serde_json::to_string_pretty(&seed_users_document()).unwrap(),
    )
    .expect("Failed to write users file");

    let config = test_config(users_file.clone());

    let pool = db::connect(&config.database)
        .await
        .expect("Failed to open test database");
    db::migrate(&pool)
        .await
        .expect("Failed to run migrations on test database");
    db::seed::insert_sample_data(&pool)
        .await
        .expect("Failed to insert sample data");

    let users = CredentialStore::load(users_file.clone()).await;
    let (app, state) = estop_records::build_app(pool.clone(), config, users);

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        pool,
        client,
        users_file,
        state,
    }
}

/// Close the database and remove the users file.
pub async fn cleanup(app: TestApp) {
    app.pool.close().await;
    let _ = std::fs::remove_file(&app.users_file);
}
