use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const ADMIN: &str = "admin";
pub const SUPERVISOR: &str = "supervisor";
pub const USER: &str = "user";

/// A registered user as held by the credential store and written to the
/// registry document (keyed by username, so the username is not repeated
/// inside the record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(skip)]
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub privileges: PrivilegeSet,
    #[serde(with = "created_at_format")]
    pub created_at: NaiveDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input for creating a user. The password is plaintext here and hashed by
/// the store before anything is retained.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
}

/// Role tags gating operations. Free-form strings are kept so a document
/// edited by hand never loses a tag, but only `admin` and `supervisor` carry
/// meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeSet(BTreeSet<String>);

impl PrivilegeSet {
    /// `admin` and `supervisor` roles map to themselves, anything else to `user`.
    pub fn from_role(role: &str) -> Self {
        let tag = match role {
            ADMIN => ADMIN,
            SUPERVISOR => SUPERVISOR,
            _ => USER,
        };
        Self(BTreeSet::from([tag.to_string()]))
    }

    pub fn contains(&self, privilege: &str) -> bool {
        self.0.contains(privilege)
    }

    pub fn is_admin(&self) -> bool {
        self.contains(ADMIN)
    }

    pub fn can_edit_reports(&self) -> bool {
        self.contains(ADMIN) || self.contains(SUPERVISOR)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// The registry document stores timestamps as `YYYY-MM-DD HH:MM:SS`.
pub mod created_at_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
