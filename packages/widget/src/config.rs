//! # Instance configuration
//!
//! A page binds a content block to a controller by handing it a
//! [`WidgetConfig`]. In HTML pages the config usually travels as a JSON
//! metadata attribute on the block; it can also live in TOML next to a
//! page definition.
//!
//! ```toml
//! id = 42                     # absent or 0: create mode
//! endpoint = "/api/posts"     # requests go to {endpoint}/{verb}
//! allow_delete = false        # permissions default to true
//!
//! [extra_context]             # merged into every request
//! adapter = "posts"
//! ```
//!
//! JSON configs may use the older key names `url`, `deleteable` and
//! `extraData`.

use api::{Params, ResourceId};
use serde::{Deserialize, Serialize};

/// Which initial actions a block offers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default = "allowed")]
    pub allow_create: bool,
    #[serde(default = "allowed")]
    pub allow_update: bool,
    #[serde(default = "allowed", alias = "deleteable")]
    pub allow_delete: bool,
}

fn allowed() -> bool {
    true
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            allow_create: true,
            allow_update: true,
            allow_delete: true,
        }
    }
}

/// Configuration of one editable block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Bound resource; `None` puts the block in create mode.
    #[serde(
        default,
        deserialize_with = "api::models::zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ResourceId>,
    /// Base URL of the model's API.
    #[serde(alias = "url")]
    pub endpoint: String,
    #[serde(flatten)]
    pub permissions: Permissions,
    /// Opaque key/value pairs merged into every request.
    #[serde(default, alias = "extraData", skip_serializing_if = "Params::is_empty")]
    pub extra_context: Params,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid widget config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid widget config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not serialize widget config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl WidgetConfig {
    /// Config for an existing resource.
    pub fn update(endpoint: impl Into<String>, id: ResourceId) -> Self {
        Self {
            id: (id != 0).then_some(id),
            ..Self::create(endpoint)
        }
    }

    /// Config for a block that will create a new resource.
    pub fn create(endpoint: impl Into<String>) -> Self {
        Self {
            id: None,
            endpoint: endpoint.into(),
            permissions: Permissions::default(),
            extra_context: Params::new(),
        }
    }

    /// Builder method to replace the permissions.
    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Builder method to add one extra-context entry.
    pub fn with_context(mut self, key: &str, value: &str) -> Self {
        self.extra_context
            .insert(key.to_string(), value.to_string());
        self
    }

    /// The same block bound to a (possibly new) resource.
    pub fn rebound(&self, id: Option<ResourceId>) -> Self {
        Self {
            id: id.or(self.id),
            ..self.clone()
        }
    }

    pub fn is_create_mode(&self) -> bool {
        self.id.is_none()
    }

    /// Parse from a JSON metadata attribute.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
