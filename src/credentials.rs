//! The user registry: a JSON document mapping usernames to user records,
//! loaded once at start and rewritten whole after every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, OnceLock};

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::auth::password;
use crate::models::user::created_at_format;
use crate::models::{NewUser, PrivilegeSet, User};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]{1,50}$").expect("valid username regex"));

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Username {0} already exists.")]
    DuplicateUsername(String),
    #[error("User {0} not found.")]
    UnknownUser(String),
    #[error("Cannot delete your own account.")]
    SelfDeletion,
    #[error("{0}")]
    InvalidField(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Whether a change made it to the backing document. An `Unsaved` change is
/// still live in memory until the next successful write or a restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Saved,
    Unsaved(String),
}

/// On-disk shape of a record. Older documents carry a plaintext `password`
/// and may omit privileges or the creation time.
#[derive(Deserialize)]
struct StoredUser {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password_hash: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    role: String,
    #[serde(default)]
    privileges: PrivilegeSet,
    #[serde(default)]
    created_at: Option<String>,
}

pub struct CredentialStore {
    path: PathBuf,
    registry: RwLock<Registry>,
}

/// In-memory copy of the document. Records that could not be turned into a
/// `User` are held verbatim in `held` and written back unchanged, so a bad
/// entry is never dropped from the file.
#[derive(Default)]
struct Registry {
    users: BTreeMap<String, User>,
    held: BTreeMap<String, Value>,
}

impl Registry {
    fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username) || self.held.contains_key(username)
    }
}

impl CredentialStore {
    /// A store with no users, backed by `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Read the registry document. Any read or parse failure leaves the store
    /// empty; the process keeps running. Plaintext passwords are hashed and
    /// the document rewritten without them.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let store = Self::empty(path);

        let raw = match tokio::fs::read_to_string(&store.path).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error loading users from {}: {e}", store.path.display());
                return store;
            }
        };

        let stored: BTreeMap<String, Value> = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!("Error parsing users from {}: {e}", store.path.display());
                return store;
            }
        };

        let mut upgraded = 0usize;
        let mut registry = Registry::default();
        for (username, raw_record) in stored {
            let parsed = serde_json::from_value::<StoredUser>(raw_record.clone())
                .map_err(|e| e.to_string())
                .and_then(|record| into_user(&username, record));
            match parsed {
                Ok((user, was_plaintext)) => {
                    if was_plaintext {
                        upgraded += 1;
                    }
                    registry.users.insert(username, user);
                }
                Err(e) => {
                    tracing::error!("Cannot use user {username}, keeping record as is: {e}");
                    registry.held.insert(username, raw_record);
                }
            }
        }

        tracing::info!(
            "Loaded {} users from {} ({} unusable)",
            registry.users.len(),
            store.path.display(),
            registry.held.len()
        );

        let mut guard = store.registry.write().await;
        *guard = registry;
        if upgraded > 0 {
            match write_document(&store.path, &guard).await {
                Ok(()) => tracing::info!("Replaced {upgraded} plaintext passwords with hashes"),
                Err(e) => tracing::warn!(
                    "Hashed {upgraded} plaintext passwords but could not rewrite {}: {e}",
                    store.path.display()
                ),
            }
        }
        drop(guard);

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True iff the user exists and the password matches its stored hash.
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        let stored_hash = self
            .registry
            .read()
            .await
            .users
            .get(username)
            .map(|u| u.password_hash.clone());

        let Some(stored_hash) = stored_hash else {
            // Burn the same work as a real check so unknown names are not
            // distinguishable by response time.
            if let Some(dummy) = dummy_hash() {
                let _ = password::verify(password, dummy);
            }
            tracing::warn!("Failed authentication for unknown user: {username}");
            return false;
        };

        match password::verify(password, &stored_hash) {
            Ok(true) => {
                tracing::info!("Successful authentication for user: {username}");
                true
            }
            Ok(false) => {
                tracing::warn!("Failed authentication for user: {username} (wrong password)");
                false
            }
            Err(e) => {
                tracing::error!("Unusable password hash for user {username}: {e}");
                false
            }
        }
    }

    /// Current privileges, or `None` when the user no longer exists.
    pub async fn privileges(&self, username: &str) -> Option<PrivilegeSet> {
        self.registry
            .read()
            .await
            .users
            .get(username)
            .map(|u| u.privileges.clone())
    }

    /// True for usable users only; held records cannot log in.
    pub async fn contains(&self, username: &str) -> bool {
        self.registry.read().await.users.contains_key(username)
    }

    pub async fn get(&self, username: &str) -> Option<User> {
        self.registry.read().await.users.get(username).cloned()
    }

    /// All usable users ordered by username.
    pub async fn list_users(&self) -> Vec<User> {
        self.registry.read().await.users.values().cloned().collect()
    }

    pub async fn usernames(&self) -> Vec<String> {
        self.registry.read().await.users.keys().cloned().collect()
    }

    /// Usernames whose records were kept verbatim because they could not be
    /// loaded.
    pub async fn held_usernames(&self) -> Vec<String> {
        self.registry.read().await.held.keys().cloned().collect()
    }

    /// Register a new user and rewrite the document. An existing username is
    /// never overwritten.
    pub async fn add_user(&self, new: NewUser) -> Result<(User, Persistence), CredentialError> {
        let username = new.username.trim().to_string();
        if username.is_empty() {
            return Err(CredentialError::InvalidField("Username is required.".to_string()));
        }
        if !USERNAME_RE.is_match(&username) {
            return Err(CredentialError::InvalidField(
                "Username may only contain letters, digits, '.', '_' and '-' (max 50).".to_string(),
            ));
        }
        if new.password.chars().count() < password::MIN_LENGTH {
            return Err(CredentialError::InvalidField(format!(
                "Password must be at least {} characters.",
                password::MIN_LENGTH
            )));
        }
        let email = new.email.trim().to_string();
        if !email.is_empty() && !email.contains('@') {
            return Err(CredentialError::InvalidField("Email address is invalid.".to_string()));
        }

        if self.registry.read().await.contains(&username) {
            return Err(CredentialError::DuplicateUsername(username));
        }

        let password_hash = password::hash(&new.password).map_err(CredentialError::Hashing)?;
        let role = new.role.trim().to_string();
        let user = User {
            username: username.clone(),
            first_name: capitalize(new.first_name.trim()),
            last_name: capitalize(new.last_name.trim()),
            email,
            password_hash,
            privileges: PrivilegeSet::from_role(&role),
            role,
            created_at: now_to_seconds(),
        };

        let mut registry = self.registry.write().await;
        // Re-checked under the write lock: another add may have won the race.
        if registry.contains(&username) {
            return Err(CredentialError::DuplicateUsername(username));
        }
        registry.users.insert(username, user.clone());
        let persistence = self.persist(&registry).await;

        Ok((user, persistence))
    }

    /// Remove `username` on behalf of `actor` and rewrite the document.
    /// Returns the removed user, or `None` when a held record was dropped.
    pub async fn delete_user(
        &self,
        actor: &str,
        username: &str,
    ) -> Result<(Option<User>, Persistence), CredentialError> {
        if actor == username {
            return Err(CredentialError::SelfDeletion);
        }

        let mut registry = self.registry.write().await;
        let removed = match registry.users.remove(username) {
            Some(user) => Some(user),
            None => {
                registry
                    .held
                    .remove(username)
                    .ok_or_else(|| CredentialError::UnknownUser(username.to_string()))?;
                None
            }
        };
        let persistence = self.persist(&registry).await;

        Ok((removed, persistence))
    }

    async fn persist(&self, registry: &Registry) -> Persistence {
        match write_document(&self.path, registry).await {
            Ok(()) => Persistence::Saved,
            Err(e) => {
                tracing::error!("Error saving users file {}: {e}", self.path.display());
                Persistence::Unsaved(e.to_string())
            }
        }
    }
}

/// Write the whole registry to a sibling temp file, then rename it over the
/// document so readers never observe a half-written file.
async fn write_document(path: &Path, registry: &Registry) -> std::io::Result<()> {
    let mut document = registry.held.clone();
    for (username, user) in &registry.users {
        document.insert(username.clone(), serde_json::to_value(user)?);
    }
    let body = serde_json::to_string_pretty(&document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await
}

fn into_user(username: &str, record: StoredUser) -> Result<(User, bool), String> {
    let (password_hash, was_plaintext) = match (record.password_hash, record.password) {
        (Some(hash), _) if !hash.is_empty() => (hash, false),
        (_, Some(plain)) => (password::hash(&plain)?, true),
        _ => return Err("no password or password hash".to_string()),
    };

    let privileges = if record.privileges.is_empty() {
        PrivilegeSet::from_role(&record.role)
    } else {
        record.privileges
    };

    let created_at = match record.created_at.as_deref().map(parse_created_at) {
        Some(Some(at)) => at,
        Some(None) => {
            tracing::warn!("Unreadable created_at for user {username}, using the current time");
            now_to_seconds()
        }
        None => now_to_seconds(),
    };

    Ok((
        User {
            username: username.to_string(),
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            password_hash,
            role: record.role,
            privileges,
            created_at,
        },
        was_plaintext,
    ))
}

/// The document format first, then ISO 8601 with or without an offset.
fn parse_created_at(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    let parsed = NaiveDateTime::parse_from_str(raw, created_at_format::FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|at| at.with_timezone(&Local).naive_local())
        })?;
    Some(parsed.with_nanosecond(0).unwrap_or(parsed))
}

fn now_to_seconds() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| password::hash("estop-timing-equaliser").ok())
        .as_deref()
}

/// Upper-case the first character and lower-case the rest.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
