use std::path::PathBuf;
use std::time::Duration;

use chrono::{Duration as Days, NaiveDateTime, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use estop_records::config::DatabaseConfig;
use estop_records::credentials::{capitalize, CredentialError, CredentialStore, Persistence};
use estop_records::db;
use estop_records::models::{HistorySort, NewUser, ReportDraft, ReportFilter, TestFilter};
use estop_records::rate_limit::LoginRateLimiter;
use estop_records::registry::{NewTest, RegistryError, TestRegistry};
use estop_records::reports::ReportStore;

async fn seeded_pool() -> SqlitePool {
    let pool = db::connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        acquire_timeout: Duration::from_secs(5),
    })
    .await
    .expect("Failed to open test database");
    db::migrate(&pool).await.expect("Failed to run migrations");
    db::seed::insert_sample_data(&pool)
        .await
        .expect("Failed to insert sample data");
    pool
}

/// (machine id, device id) of a seeded device.
async fn ids(pool: &SqlitePool, machine: &str, device: &str) -> (i64, i64) {
    let (machine_id,): (i64,) = sqlx::query_as("SELECT id FROM machines WHERE name = ?1")
        .bind(machine)
        .fetch_one(pool)
        .await
        .expect("seeded machine missing");
    let device = db::safety_devices::list_by_machine(pool, machine_id)
        .await
        .unwrap()
        .into_iter()
        .find(|d| d.name == device)
        .expect("seeded device missing");
    (machine_id, device.id)
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("estop_store_{}.json", Uuid::now_v7()))
}

fn new_user(username: &str, password: &str, role: &str) -> NewUser {
    NewUser {
        first_name: "test".to_string(),
        last_name: "user".to_string(),
        email: format!("{username}@example.com"),
        username: username.to_string(),
        password: password.to_string(),
        role: role.to_string(),
    }
}

// ── Sample data ────────────────────────────────────────────────

#[tokio::test]
async fn sample_data_is_idempotent() {
    let pool = seeded_pool().await;

    let again = db::seed::insert_sample_data(&pool).await.unwrap();
    assert_eq!(again, 0);

    let registry = TestRegistry::new(pool);
    let machines = registry.list_machines().await.unwrap();
    assert_eq!(machines.len(), 5);

    let mut total = 0;
    for machine in &machines {
        total += registry.list_devices(machine.id).await.unwrap().len();
    }
    assert_eq!(total, 11);
}

// ── Test registry ──────────────────────────────────────────────

#[tokio::test]
async fn search_matches_device_or_machine_names() {
    let pool = seeded_pool().await;
    let registry = TestRegistry::new(pool.clone());
    let (m_b, mat) = ids(&pool, "Machine B", "Safety Mat").await;
    let (_, estop) = ids(&pool, "Machine B", "Emergency Stop Button").await;
    let (cnc, door) = ids(&pool, "CNC Mill", "Door Interlock").await;

    for (machine_id, device_id) in [(m_b, mat), (m_b, estop), (cnc, door)] {
        registry
            .record_test(NewTest {
                machine_id,
                device_id,
                username: "jpetereit",
                test_result: "PASS",
                notes: "",
            })
            .await
            .unwrap();
    }

    let filter = TestFilter {
        search: "Emergency".to_string(),
        ..TestFilter::default()
    };
    let rows = registry.query_tests(&filter, HistorySort::Newest).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device_name, "Emergency Stop Button");

    // Machine names match too.
    let filter = TestFilter {
        search: "cnc".to_string(),
        ..TestFilter::default()
    };
    let rows = registry.query_tests(&filter, HistorySort::Newest).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].device_name, "Door Interlock");

    // LIKE wildcards in the search term are literal.
    let filter = TestFilter {
        search: "%".to_string(),
        ..TestFilter::default()
    };
    let rows = registry.query_tests(&filter, HistorySort::Newest).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn filters_by_machine_and_user() {
    let pool = seeded_pool().await;
    let registry = TestRegistry::new(pool.clone());
    let (m_a, light) = ids(&pool, "Machine A", "Safety Light Curtain").await;
    let (press, two_hand) = ids(&pool, "Press 1", "Two-Hand Control").await;

    for (machine_id, device_id, username) in [
        (m_a, light, "jpetereit"),
        (press, two_hand, "jpetereit"),
        (press, two_hand, "mhiggins"),
    ] {
        registry
            .record_test(NewTest {
                machine_id,
                device_id,
                username,
                test_result: "PASS",
                notes: "",
            })
            .await
            .unwrap();
    }

    let filter = TestFilter {
        machine: "Press 1".to_string(),
        user: "jpetereit".to_string(),
        ..TestFilter::default()
    };
    let rows = registry.query_tests(&filter, HistorySort::Newest).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].machine_name, "Press 1");
    assert_eq!(rows[0].username, "jpetereit");
}

#[tokio::test]
async fn sorts_by_age_and_machine() {
    let pool = seeded_pool().await;
    let registry = TestRegistry::new(pool.clone());
    let (m_a, light) = ids(&pool, "Machine A", "Safety Light Curtain").await;
    let (press, two_hand) = ids(&pool, "Press 1", "Two-Hand Control").await;
    let (cnc, door) = ids(&pool, "CNC Mill", "Door Interlock").await;

    let now = Utc::now();
    for (machine_id, device_id, age) in [(press, two_hand, 3), (m_a, light, 30), (cnc, door, 7)] {
        db::test_records::create(
            &pool,
            machine_id,
            device_id,
            "jpetereit",
            "PASS",
            "",
            now - Days::days(age),
        )
        .await
        .unwrap();
    }

    let rows = registry
        .query_tests(&TestFilter::default(), HistorySort::Newest)
        .await
        .unwrap();
    let ages: Vec<i64> = rows.iter().map(|r| r.days_since_test).collect();
    assert_eq!(ages, [3, 7, 30]);

    let rows = registry
        .query_tests(&TestFilter::default(), HistorySort::Age)
        .await
        .unwrap();
    assert!(rows.windows(2).all(|w| w[0].days_since_test >= w[1].days_since_test));
    assert_eq!(rows[0].machine_name, "Machine A");

    let rows = registry
        .query_tests(&TestFilter::default(), HistorySort::Machine)
        .await
        .unwrap();
    let machines: Vec<&str> = rows.iter().map(|r| r.machine_name.as_str()).collect();
    assert_eq!(machines, ["CNC Mill", "Machine A", "Press 1"]);
}

#[tokio::test]
async fn sorts_by_device() {
    let pool = seeded_pool().await;
    let registry = TestRegistry::new(pool.clone());
    let (press, two_hand) = ids(&pool, "Press 1", "Two-Hand Control").await;
    let (cnc, door) = ids(&pool, "CNC Mill", "Door Interlock").await;
    let (m_b, mat) = ids(&pool, "Machine B", "Safety Mat").await;

    for (machine_id, device_id) in [(cnc, door), (press, two_hand), (m_b, mat), (cnc, door)] {
        registry
            .record_test(NewTest {
                machine_id,
                device_id,
                username: "jpetereit",
                test_result: "PASS",
                notes: "",
            })
            .await
            .unwrap();
    }

    let rows = registry
        .query_tests(&TestFilter::default(), HistorySort::Device)
        .await
        .unwrap();
    let devices: Vec<&str> = rows.iter().map(|r| r.device_name.as_str()).collect();
    assert_eq!(
        devices,
        ["Door Interlock", "Door Interlock", "Safety Mat", "Two-Hand Control"]
    );
    // Equal device names keep newest-first order.
    assert!(rows[0].id > rows[1].id);
}

#[tokio::test]
async fn record_test_validates_device_and_fields() {
    let pool = seeded_pool().await;
    let registry = TestRegistry::new(pool.clone());
    let (m_a, _) = ids(&pool, "Machine A", "Safety Light Curtain").await;
    let (_, mat) = ids(&pool, "Machine B", "Safety Mat").await;

    let err = registry
        .record_test(NewTest {
            machine_id: m_a,
            device_id: mat,
            username: "jpetereit",
            test_result: "PASS",
            notes: "",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::DeviceMismatch { .. }));

    let err = registry
        .record_test(NewTest {
            machine_id: m_a,
            device_id: 9999,
            username: "jpetereit",
            test_result: "PASS",
            notes: "",
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::UnknownDevice(9999)));

    let long_notes = "x".repeat(501);
    let err = registry
        .record_test(NewTest {
            machine_id: m_a,
            device_id: mat,
            username: "jpetereit",
            test_result: "PASS",
            notes: &long_notes,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidField(_)));

    assert_eq!(db::test_records::count(&pool).await.unwrap(), 0);
}

// ── Credential store ───────────────────────────────────────────

#[tokio::test]
async fn missing_users_file_yields_empty_store() {
    let store = CredentialStore::load(temp_path()).await;
    assert!(store.list_users().await.is_empty());
    assert!(!store.authenticate("anyone", "anything").await);
}

#[tokio::test]
async fn corrupt_users_file_yields_empty_store() {
    let path = temp_path();
    std::fs::write(&path, "{ not json").unwrap();

    let store = CredentialStore::load(path.clone()).await;
    assert!(store.usernames().await.is_empty());

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn plaintext_passwords_are_upgraded_on_load() {
    let path = temp_path();
    let doc = json!({
        "ckull": {
            "first_name": "Chris",
            "last_name": "Kull",
            "email": "ckull@example.com",
            "password": "mera7",
            "role": "admin",
            "created_at": "2024-01-15 08:30:00"
        }
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let store = CredentialStore::load(path.clone()).await;
    assert!(store.authenticate("ckull", "mera7").await);
    assert!(!store.authenticate("ckull", "MERA7").await);
    assert!(store.privileges("ckull").await.is_some_and(|p| p.is_admin()));
    assert_eq!(store.privileges("nobody").await, None);

    let rewritten: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(rewritten["ckull"].get("password").is_none());
    assert_eq!(rewritten["ckull"]["created_at"], "2024-01-15 08:30:00");
    assert_eq!(rewritten["ckull"]["privileges"], json!(["admin"]));

    // A second load reads the hash back unchanged.
    let reloaded = CredentialStore::load(path.clone()).await;
    assert!(reloaded.authenticate("ckull", "mera7").await);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn unusable_records_survive_rewrites() {
    let path = temp_path();
    let doc = json!({
        "ckull": {
            "first_name": "Chris",
            "last_name": "Kull",
            "email": "ckull@example.com",
            "password": "mera7",
            "role": "admin",
            "created_at": "2024-01-15 08:30:00"
        },
        "jdoe": {
            "first_name": "Jane",
            "last_name": "Doe",
            "email": "jdoe@example.com",
            "password": "doe-password",
            "role": "user",
            "created_at": "2023-10-01T12:00:00"
        },
        "broken": {
            "first_name": "No",
            "last_name": "Password",
            "role": "user",
            "notes": "kept as written"
        }
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let store = CredentialStore::load(path.clone()).await;
    // An ISO creation time is still a usable record.
    let jdoe = store.get("jdoe").await.expect("jdoe loaded");
    assert_eq!(jdoe.created_at.format("%Y-%m-%d %H:%M:%S").to_string(), "2023-10-01 12:00:00");
    assert!(store.authenticate("jdoe", "doe-password").await);
    assert!(!store.contains("broken").await);
    assert_eq!(store.held_usernames().await, ["broken"]);

    store
        .add_user(new_user("newbie", "long-enough", "user"))
        .await
        .unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    for name in ["ckull", "jdoe", "newbie"] {
        assert!(written.get(name).is_some(), "{name} missing from document");
    }
    assert_eq!(written["broken"], doc["broken"]);

    // A held name cannot be taken over by a new account.
    let err = store
        .add_user(new_user("broken", "long-enough", "admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DuplicateUsername(_)));

    // Deleting it is the one way to drop it from the file.
    let (removed, _) = store.delete_user("ckull", "broken").await.unwrap();
    assert!(removed.is_none());
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(written.get("broken").is_none());
    assert!(written.get("jdoe").is_some());

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn add_user_validates_and_persists() {
    let path = temp_path();
    let store = CredentialStore::empty(path.clone());

    let err = store
        .add_user(new_user("bad name!", "long-enough", "user"))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::InvalidField(_)));

    let err = store
        .add_user(new_user("shorty", "short", "user"))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::InvalidField(_)));

    let (user, persistence) = store
        .add_user(new_user("tuser", "long-enough", "superuser"))
        .await
        .unwrap();
    assert_eq!(persistence, Persistence::Saved);
    assert_eq!(user.full_name(), "Test User");
    // Unknown roles get the plain user privilege.
    assert!(user.privileges.contains("user"));
    assert!(!user.privileges.can_edit_reports());

    let err = store
        .add_user(new_user("tuser", "different-pass", "admin"))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DuplicateUsername(_)));
    assert!(store.authenticate("tuser", "long-enough").await);

    let reloaded = CredentialStore::load(path.clone()).await;
    assert_eq!(reloaded.usernames().await, ["tuser"]);

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn unwritable_file_keeps_change_in_memory() {
    let path = std::env::temp_dir()
        .join(format!("estop_missing_dir_{}", Uuid::now_v7()))
        .join("users.json");
    let store = CredentialStore::empty(path);

    let (_, persistence) = store
        .add_user(new_user("tuser", "long-enough", "user"))
        .await
        .unwrap();
    assert!(matches!(persistence, Persistence::Unsaved(_)));
    assert!(store.contains("tuser").await);
}

#[tokio::test]
async fn delete_user_refuses_self_and_unknown() {
    let path = temp_path();
    let store = CredentialStore::empty(path.clone());
    store
        .add_user(new_user("admin1", "long-enough", "admin"))
        .await
        .unwrap();
    store
        .add_user(new_user("tuser", "long-enough", "user"))
        .await
        .unwrap();

    assert!(matches!(
        store.delete_user("admin1", "admin1").await,
        Err(CredentialError::SelfDeletion)
    ));
    assert!(matches!(
        store.delete_user("admin1", "ghost").await,
        Err(CredentialError::UnknownUser(_))
    ));

    let (removed, persistence) = store.delete_user("admin1", "tuser").await.unwrap();
    assert_eq!(removed.map(|u| u.username).as_deref(), Some("tuser"));
    assert_eq!(persistence, Persistence::Saved);
    assert!(!store.authenticate("tuser", "long-enough").await);

    let _ = std::fs::remove_file(path);
}

#[test]
fn capitalize_normalises_case() {
    assert_eq!(capitalize("aLEX"), "Alex");
    assert_eq!(capitalize("é"), "É");
    assert_eq!(capitalize(""), "");
}

// ── Reports & rate limiting ────────────────────────────────────

fn draft(title: &str, severity: &str, status: &str) -> ReportDraft {
    ReportDraft {
        title: title.to_string(),
        severity: severity.to_string(),
        status: status.to_string(),
        reported_by: "mhiggins".to_string(),
        ..ReportDraft::default()
    }
}

#[test]
fn reports_list_newest_first_and_filter() {
    let store = ReportStore::new();
    store.create(draft("First", "low", "open"), "mhiggins").unwrap();
    store.create(draft("Second", "critical", "open"), "mhiggins").unwrap();
    store.create(draft("Third", "high", "closed"), "ckull").unwrap();

    let titles: Vec<String> = store
        .list(&ReportFilter::default())
        .into_iter()
        .map(|r| r.title)
        .collect();
    assert_eq!(titles, ["Third", "Second", "First"]);

    let open = store.list(&ReportFilter {
        status: Some("open".to_string()),
        ..ReportFilter::default()
    });
    assert_eq!(open.len(), 2);

    assert!(store.create(draft("", "low", "open"), "ckull").is_err());
    assert!(store.create(draft("Bad", "low", "pending"), "ckull").is_err());
    assert!(matches!(store.update(42, draft("Nope", "low", "open"), "ckull"), Ok(None)));
}

#[test]
fn report_filter_by_incident_date_range() {
    let store = ReportStore::new();
    let at = |raw: &str| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").unwrap();

    for (title, date) in [
        ("April", Some(at("2024-04-30 23:59"))),
        ("May morning", Some(at("2024-05-01 08:00"))),
        ("May evening", Some(at("2024-05-01 23:30"))),
        ("Undated", None),
    ] {
        let mut d = draft(title, "low", "open");
        d.incident_date = date;
        store.create(d, "mhiggins").unwrap();
    }

    let titles = |filter: ReportFilter| -> Vec<String> {
        store.list(&filter).into_iter().map(|r| r.title).collect()
    };

    let may_first = ReportFilter {
        date_from: Some(at("2024-05-01 00:00")),
        date_to: Some(NaiveDateTime::parse_from_str("2024-05-01 23:59:59", "%Y-%m-%d %H:%M:%S").unwrap()),
        ..ReportFilter::default()
    };
    assert_eq!(titles(may_first), ["May evening", "May morning"]);

    // A bound alone excludes undated reports.
    let until_april = ReportFilter {
        date_to: Some(at("2024-04-30 23:59")),
        ..ReportFilter::default()
    };
    assert_eq!(titles(until_april), ["April"]);

    let combined = ReportFilter {
        severity: Some("high".to_string()),
        date_from: Some(at("2024-01-01 00:00")),
        ..ReportFilter::default()
    };
    assert!(titles(combined).is_empty());
}

#[test]
fn login_limiter_locks_after_five_failures() {
    let limiter = LoginRateLimiter::new(5, Duration::from_secs(900));

    for _ in 0..4 {
        limiter.record_failure("Tester");
    }
    assert!(limiter.check("tester").is_ok());

    limiter.record_failure("tester");
    let retry = limiter.check("TESTER").unwrap_err();
    assert!(retry > 0 && retry <= 900);

    limiter.reset("tester");
    assert!(limiter.check("tester").is_ok());
}

#[test]
fn login_limiter_drops_expired_entries() {
    let limiter = LoginRateLimiter::new(5, Duration::from_millis(50));

    for name in ["ghost-1", "ghost-2", "ghost-3"] {
        limiter.record_failure(name);
    }
    assert_eq!(limiter.len(), 3);

    std::thread::sleep(Duration::from_millis(80));
    limiter.record_failure("recent");
    limiter.cleanup();

    assert_eq!(limiter.len(), 1);
    assert!(limiter.check("recent").is_ok());
}

#[test]
fn login_limiter_prunes_on_failure_when_full() {
    let limiter = LoginRateLimiter::new(5, Duration::from_millis(50)).with_capacity(4);

    for i in 0..4 {
        limiter.record_failure(&format!("ghost-{i}"));
    }
    std::thread::sleep(Duration::from_millis(80));

    // Reaching the cap sweeps the expired windows before inserting.
    limiter.record_failure("fresh");
    assert_eq!(limiter.len(), 1);
}
