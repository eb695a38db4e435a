use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{Result, VictorOpsError};

/// Host reported when none is configured
pub const DEFAULT_HOST: &str = "localhost";

/// Client name reported when none is configured
pub const DEFAULT_NAME: &str = "rust REST client";

/// An identity field that is either derived from other settings or pinned
///
/// `Override(String::new())` is a deliberate empty value, distinct from
/// `Default`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DerivedField {
    #[default]
    Default,
    Override(String),
}

impl DerivedField {
    fn resolve(&self, derive: impl FnOnce() -> String) -> String {
        match self {
            DerivedField::Default => derive(),
            DerivedField::Override(value) => value.clone(),
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, DerivedField::Override(_))
    }
}

impl From<Option<String>> for DerivedField {
    fn from(value: Option<String>) -> Self {
        value.map_or(DerivedField::Default, DerivedField::Override)
    }
}

/// Raw configuration input, before defaults and validation
///
/// Deserializes from any mapping: recognized keys fill the named fields and
/// everything else lands in `extra`.
///
/// # Example
///
/// ```rust
/// use victorops_client::{Settings, SettingsOptions};
///
/// let options = SettingsOptions::new("https://alert.victorops.com/integrations/generic/20131114/alert/api-key", "ops")
///     .with_host("db1.example.com")
///     .with_extra("team", "storage");
///
/// let settings = Settings::new(options).unwrap();
/// assert_eq!(settings.entity_display_name(), "db1.example.com/rust REST client");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsOptions {
    pub api_url: Option<String>,
    pub routing_key: Option<String>,
    pub host: Option<String>,
    pub name: Option<String>,
    pub entity_display_name: Option<String>,
    pub entity_id: Option<String>,
    pub monitoring_tool: Option<String>,

    /// Caller-defined keys, retained but never interpreted
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl SettingsOptions {
    /// Options with the two required keys set
    pub fn new(api_url: &str, routing_key: &str) -> Self {
        Self {
            api_url: Some(api_url.to_string()),
            routing_key: Some(routing_key.to_string()),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_entity_display_name(mut self, entity_display_name: &str) -> Self {
        self.entity_display_name = Some(entity_display_name.to_string());
        self
    }

    pub fn with_entity_id(mut self, entity_id: &str) -> Self {
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_monitoring_tool(mut self, monitoring_tool: &str) -> Self {
        self.monitoring_tool = Some(monitoring_tool.to_string());
        self
    }

    /// Add a passthrough key
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Validated client configuration
///
/// `api_url` and `routing_key` are fixed at construction. The identity
/// overrides can be changed afterwards through `&mut self`; there is no
/// internal locking, so sharing a `Settings` across threads while mutating it
/// is up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    api_url: String,
    routing_key: String,
    host: String,
    name: String,
    entity_display_name: DerivedField,
    entity_id: DerivedField,
    monitoring_tool: DerivedField,
    extra: HashMap<String, Value>,
}

impl Settings {
    /// Apply defaults and validate
    ///
    /// Strips one trailing `/` from `api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`VictorOpsError::MissingSettings`] if `api_url` or
    /// `routing_key` is absent or empty.
    pub fn new(options: SettingsOptions) -> Result<Self> {
        let api_url = options
            .api_url
            .as_deref()
            .map(strip_trailing_slash)
            .filter(|url| !url.is_empty())
            .ok_or(VictorOpsError::MissingSettings("api_url"))?
            .to_string();

        let routing_key = options
            .routing_key
            .filter(|key| !key.is_empty())
            .ok_or(VictorOpsError::MissingSettings("routing_key"))?;

        Ok(Self {
            api_url,
            routing_key,
            host: options.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            name: options.name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            entity_display_name: options.entity_display_name.into(),
            entity_id: options.entity_id.into(),
            monitoring_tool: options.monitoring_tool.into(),
            extra: options.extra,
        })
    }

    /// Base URL, without a trailing slash
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `{api_url}/{routing_key}`
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.api_url, self.routing_key)
    }

    /// Override if set, else `{host}/{name}`
    pub fn entity_display_name(&self) -> String {
        self.entity_display_name
            .resolve(|| format!("{}/{}", self.host, self.name))
    }

    /// Override if set, else [`Settings::entity_display_name`]
    pub fn entity_id(&self) -> String {
        self.entity_id.resolve(|| self.entity_display_name())
    }

    /// Override if set, else `{routing_key}::{name}`
    pub fn monitoring_tool(&self) -> String {
        self.monitoring_tool
            .resolve(|| format!("{}::{}", self.routing_key, self.name))
    }

    pub fn set_entity_display_name(&mut self, value: &str) {
        self.entity_display_name = DerivedField::Override(value.to_string());
    }

    pub fn set_monitoring_tool(&mut self, value: &str) {
        self.monitoring_tool = DerivedField::Override(value.to_string());
    }

    /// A passthrough key from the configuration input
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn extras(&self) -> &HashMap<String, Value> {
        &self.extra
    }
}

fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}
