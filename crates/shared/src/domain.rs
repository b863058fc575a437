use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);
    };
}

id_newtype!(AttemptId);

pub const INTEREST_OPTIONS: [&str; 14] = [
    "Art",
    "Gaming",
    "Hiking",
    "Cooking",
    "Music",
    "Travel",
    "Yoga",
    "Reading",
    "Coding",
    "Fitness",
    "Photography",
    "Cinema",
    "Design",
    "Philosophy",
];

pub const DEFAULT_DISPLAY_NAME: &str = "New Vibe User";
pub const DEFAULT_BIO: &str = "Looking for someone who values deep conversations over small talk.";
pub const DEFAULT_RADIUS: u32 = 25;
pub const DEFAULT_DATABASE_NAME: &str = "vibe_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    #[default]
    Local,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngineKind {
    #[default]
    #[serde(rename = "mariadb")]
    MariaDb,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "mongodb")]
    MongoDb,
    #[serde(rename = "redis")]
    Redis,
}

impl EngineKind {
    pub const ALL: [EngineKind; 4] = [
        EngineKind::MariaDb,
        EngineKind::Postgres,
        EngineKind::MongoDb,
        EngineKind::Redis,
    ];

    pub fn id(self) -> &'static str {
        match self {
            EngineKind::MariaDb => "mariadb",
            EngineKind::Postgres => "postgres",
            EngineKind::MongoDb => "mongodb",
            EngineKind::Redis => "redis",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EngineKind::MariaDb => "MariaDB (Standard QNAP)",
            EngineKind::Postgres => "PostgreSQL (Container Station)",
            EngineKind::MongoDb => "MongoDB (NoSQL)",
            EngineKind::Redis => "Redis (Cache Sync)",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id.trim()))
    }
}

/// API token for the external store. Redacted in `Debug` and wiped on drop.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("SecretToken(<empty>)")
        } else {
            f.write_str("SecretToken(<redacted>)")
        }
    }
}

impl Drop for SecretToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Mocked NAS database connection attached to a profile.
///
/// Setters report whether the value actually changed; any change drops the
/// `verified` flag so a stale handshake never survives an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalStore {
    pub address: String,
    pub token: SecretToken,
    pub engine: EngineKind,
    pub database_name: String,
    pub verified: bool,
}

impl ExternalStore {
    pub fn seeded() -> Self {
        Self {
            address: String::new(),
            token: SecretToken::default(),
            engine: EngineKind::default(),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            verified: false,
        }
    }

    pub fn set_address(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if self.address == address {
            return false;
        }
        self.address = address;
        self.verified = false;
        true
    }

    pub fn set_token(&mut self, token: SecretToken) -> bool {
        if self.token == token {
            return false;
        }
        self.token = token;
        self.verified = false;
        true
    }

    pub fn set_engine(&mut self, engine: EngineKind) -> bool {
        if self.engine == engine {
            return false;
        }
        self.engine = engine;
        self.verified = false;
        true
    }

    pub fn set_database_name(&mut self, database_name: impl Into<String>) -> bool {
        let database_name = database_name.into();
        if self.database_name == database_name {
            return false;
        }
        self.database_name = database_name;
        self.verified = false;
        true
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvatarFormat {
    Png,
    Jpeg,
    Gif,
    WebP,
}

impl AvatarFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            AvatarFormat::Png => "image/png",
            AvatarFormat::Jpeg => "image/jpeg",
            AvatarFormat::Gif => "image/gif",
            AvatarFormat::WebP => "image/webp",
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarImage {
    pub format: AvatarFormat,
    pub width: u32,
    pub height: u32,
    pub byte_len: usize,
    pub data_url: String,
}

impl fmt::Debug for AvatarImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("byte_len", &self.byte_len)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub discovery_mode: DiscoveryMode,
    pub radius: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_store: Option<ExternalStore>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            bio: DEFAULT_BIO.to_string(),
            interests: ["Music", "Travel", "Art"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            discovery_mode: DiscoveryMode::default(),
            radius: DEFAULT_RADIUS,
            avatar: None,
            external_store: None,
        }
    }
}

impl Profile {
    /// Symmetric difference on the interest list: removes `interest` when
    /// present, otherwise appends it. Returns whether it is now selected.
    pub fn toggle_interest(&mut self, interest: &str) -> bool {
        if let Some(pos) = self.interests.iter().position(|i| i == interest) {
            self.interests.remove(pos);
            false
        } else {
            self.interests.push(interest.to_string());
            true
        }
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests.iter().any(|i| i == interest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Credentials,
    Federated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub session_id: Uuid,
    pub identifier: String,
    pub display_name: String,
    pub provider: AuthProvider,
    pub authenticated_at: DateTime<Utc>,
}

impl SessionIdentity {
    pub fn new(identifier: impl Into<String>, provider: AuthProvider) -> Self {
        let identifier = identifier.into();
        Self {
            session_id: Uuid::new_v4(),
            display_name: display_name_for(&identifier),
            identifier,
            provider,
            authenticated_at: Utc::now(),
        }
    }
}

/// Local part of an email-like identifier; the whole string when there is no `@`.
pub fn display_name_for(identifier: &str) -> String {
    identifier
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(identifier)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_uses_local_part() {
        assert_eq!(display_name_for("demo@test.io"), "demo");
        assert_eq!(display_name_for("first.last@a@b"), "first.last");
        assert_eq!(display_name_for("plainname"), "plainname");
    }

    #[test]
    fn toggling_twice_restores_interests() {
        let mut profile = Profile::default();
        let before = profile.interests.clone();
        assert!(profile.toggle_interest("Gaming"));
        assert!(!profile.toggle_interest("Gaming"));
        assert_eq!(profile.interests, before);
    }

    #[test]
    fn descriptor_edits_drop_verification() {
        let mut store = ExternalStore::seeded();
        store.verified = true;
        assert!(!store.set_address(""));
        assert!(store.verified, "unchanged value keeps verification");

        assert!(store.set_address("https://nas.example"));
        assert!(!store.verified);

        store.verified = true;
        assert!(store.set_engine(EngineKind::Redis));
        assert!(!store.verified);

        store.verified = true;
        assert!(store.set_database_name("vibe_store"));
        assert!(!store.verified);

        store.verified = true;
        assert!(store.set_token(SecretToken::new("QNAP-API-SECRET-TOKEN")));
        assert!(!store.verified);
    }

    #[test]
    fn secret_token_is_redacted_but_serialized() {
        let token = SecretToken::new("hunter2");
        assert_eq!(format!("{token:?}"), "SecretToken(<redacted>)");
        assert_eq!(serde_json::to_string(&token).expect("json"), "\"hunter2\"");
    }

    #[test]
    fn engine_ids_round_trip_through_serde() {
        for kind in EngineKind::ALL {
            let json = serde_json::to_string(&kind).expect("json");
            assert_eq!(json, format!("\"{}\"", kind.id()));
            assert_eq!(EngineKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(EngineKind::from_id("sqlite"), None);
    }
}
