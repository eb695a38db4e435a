use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::errors::{Result, VictorOpsError};
use crate::settings::Settings;

/// Alert lifecycle verbs understood by the REST endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AlertVerb {
    #[serde(rename = "CRITICAL")]
    Critical,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "INFO")]
    Info,
    #[serde(rename = "ACKNOWLEDGEMENT")]
    Acknowledge,
    #[serde(rename = "RECOVERY")]
    Recovery,
}

impl AlertVerb {
    pub const ALL: [AlertVerb; 5] = [
        AlertVerb::Critical,
        AlertVerb::Warning,
        AlertVerb::Info,
        AlertVerb::Acknowledge,
        AlertVerb::Recovery,
    ];

    /// Wire value of the `message_type` field
    pub fn message_type(&self) -> &'static str {
        match self {
            AlertVerb::Critical => "CRITICAL",
            AlertVerb::Warning => "WARNING",
            AlertVerb::Info => "INFO",
            AlertVerb::Acknowledge => "ACKNOWLEDGEMENT",
            AlertVerb::Recovery => "RECOVERY",
        }
    }
}

impl Display for AlertVerb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message_type())
    }
}

impl FromStr for AlertVerb {
    type Err = VictorOpsError;

    fn from_str(s: &str) -> Result<Self> {
        AlertVerb::ALL
            .into_iter()
            .find(|verb| verb.message_type() == s)
            .ok_or(VictorOpsError::MissingMessageType)
    }
}

/// Caller-supplied alert fields
///
/// `message` and `author` are interpreted per verb; every other key is
/// passed through to the payload. `null` values are dropped.
///
/// # Example
///
/// ```rust
/// use victorops_client::AlertData;
///
/// let data = AlertData::new()
///     .with_message("Disk 95% full")
///     .with_field("state_start_time", 1_700_000_000)
///     .with_field("runbook", "https://wiki.example.com/disk");
/// assert_eq!(data.message(), Some("Disk 95% full"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertData(Map<String, Value>);

const MESSAGE: &str = "message";
const AUTHOR: &str = "author";

impl AlertData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free text; becomes `state_message`, or `ack_msg` on acknowledgements
    pub fn with_message(self, message: &str) -> Self {
        self.with_field(MESSAGE, message)
    }

    /// Acknowledging user; becomes `ack_author`
    pub fn with_author(self, author: &str) -> Self {
        self.with_field(AUTHOR, author)
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn message(&self) -> Option<&str> {
        self.0.get(MESSAGE).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Remove `key`, treating `null` as absent
    fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key).filter(|value| !value.is_null())
    }
}

impl From<Map<String, Value>> for AlertData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Finalized JSON body for a single POST
///
/// Always carries `message_type`, `state_start_time`, `entity_id`,
/// `entity_display_name` and `monitoring_tool`, and never a `null` value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlertPayload(Map<String, Value>);

impl AlertPayload {
    /// Start building a payload against the given settings
    pub fn builder(settings: &Settings) -> PayloadBuilder<'_> {
        PayloadBuilder::new(settings)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn message_type(&self) -> Option<&str> {
        self.get_str("message_type")
    }

    pub fn state_start_time(&self) -> Option<i64> {
        self.0.get("state_start_time").and_then(Value::as_i64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Assembles an [`AlertPayload`] from a verb and caller data
///
/// Identity fields are read from the settings when [`PayloadBuilder::build`]
/// runs, so the payload reflects overrides set up to that point and no later.
///
/// # Example
///
/// ```rust
/// use victorops_client::{AlertData, AlertPayload, AlertVerb, Settings, SettingsOptions};
///
/// let settings = Settings::new(SettingsOptions::new("http://example.com", "1234")).unwrap();
/// let payload = AlertPayload::builder(&settings)
///     .verb(AlertVerb::Critical)
///     .data(AlertData::new().with_message("disk full"))
///     .build()
///     .unwrap();
///
/// assert_eq!(payload.message_type(), Some("CRITICAL"));
/// assert_eq!(payload.get_str("state_message"), Some("disk full"));
/// ```
#[derive(Debug, Clone)]
pub struct PayloadBuilder<'a> {
    settings: &'a Settings,
    verb: Option<AlertVerb>,
    data: Option<AlertData>,
    started_at: Option<DateTime<Utc>>,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            verb: None,
            data: None,
            started_at: None,
        }
    }

    pub fn verb(mut self, verb: AlertVerb) -> Self {
        self.verb = Some(verb);
        self
    }

    pub fn data(mut self, data: AlertData) -> Self {
        self.data = Some(data);
        self
    }

    /// Set `state_start_time` explicitly instead of using the current time
    pub fn at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Finalize the payload
    ///
    /// # Errors
    ///
    /// Returns [`VictorOpsError::MissingMessageType`] if no verb was set.
    pub fn build(self) -> Result<AlertPayload> {
        let verb = self.verb.ok_or(VictorOpsError::MissingMessageType)?;
        let mut data = self.data.unwrap_or_default();
        let message = data.take(MESSAGE);

        match verb {
            AlertVerb::Acknowledge => {
                let author = data
                    .take(AUTHOR)
                    .unwrap_or_else(|| Value::String(self.settings.monitoring_tool()));
                insert_present(&mut data, "ack_msg", message);
                insert_present(&mut data, "ack_author", Some(author));
            }
            AlertVerb::Critical | AlertVerb::Warning | AlertVerb::Info | AlertVerb::Recovery => {
                insert_present(&mut data, "state_message", message);
            }
        }

        let started_at = self.started_at.unwrap_or_else(Utc::now);

        let mut payload = Map::new();
        payload.insert("message_type".to_string(), verb.message_type().into());
        payload.insert("state_start_time".to_string(), started_at.timestamp().into());
        payload.insert("entity_id".to_string(), self.settings.entity_id().into());
        payload.insert(
            "entity_display_name".to_string(),
            self.settings.entity_display_name().into(),
        );
        payload.insert(
            "monitoring_tool".to_string(),
            self.settings.monitoring_tool().into(),
        );

        // The verb decides the message type; nulls never replace seeded fields.
        for (key, value) in data.0 {
            if value.is_null() || key == "message_type" {
                continue;
            }
            payload.insert(key, value);
        }

        Ok(AlertPayload(payload))
    }
}

fn insert_present(data: &mut AlertData, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        data.0.insert(key.to_string(), value);
    }
}
