//! # Server response body
//!
//! Every verb answers with the same JSON object shape; which keys are present
//! depends on the verb and on the outcome:
//!
//! | Verb | Keys |
//! |------|------|
//! | `get_form` | `form`, `versions` (absent when history is not offered) |
//! | `save` | `valid`; then `html` + `id` when valid, `form` when invalid |
//! | `preview` | `valid`; then `html` when valid, `form` when invalid |
//! | `delete` / `order` | nothing the client reads |
//!
//! Older servers name the rendered block `partial` instead of `html`; both are
//! accepted when decoding.

use serde::{Deserialize, Deserializer, Serialize};

/// Primary key of a server-held resource. Zero is never a real id.
pub type ResourceId = u64;

/// Identifier of one entry in a resource's version history.
pub type VersionId = u64;

/// One prior version of a resource, as listed in the history menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    #[serde(alias = "versionId", alias = "id")]
    pub version_id: VersionId,
    pub label: String,
}

/// Parsed JSON body of a successful HTTP exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerResponse {
    /// Present only on `save` and `preview` answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    /// Edit-form markup (fresh on `get_form`, with inline errors when invalid).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Rendered display markup of the saved or previewed resource.
    #[serde(default, alias = "partial", skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Id of the saved resource, possibly newly assigned.
    #[serde(
        default,
        deserialize_with = "zero_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<ResourceId>,
    /// Version history, most recent first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Vec<VersionEntry>>,
}

impl ServerResponse {
    /// A missing `valid` key counts as invalid.
    pub fn is_valid(&self) -> bool {
        self.valid.unwrap_or(false)
    }

    /// Answer to `get_form`.
    pub fn form(markup: impl Into<String>, versions: Option<Vec<VersionEntry>>) -> Self {
        Self {
            form: Some(markup.into()),
            versions,
            ..Self::default()
        }
    }

    /// Successful `save`/`preview` answer.
    pub fn accepted(html: impl Into<String>, id: Option<ResourceId>) -> Self {
        Self {
            valid: Some(true),
            html: Some(html.into()),
            id,
            ..Self::default()
        }
    }

    /// Failed validation: the form comes back with error annotations.
    pub fn rejected(form: impl Into<String>) -> Self {
        Self {
            valid: Some(false),
            form: Some(form.into()),
            ..Self::default()
        }
    }
}

/// Treat `0` (and `null`) as "no id", matching the create-mode convention.
pub fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<ResourceId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ResourceId>::deserialize(deserializer)?.filter(|id| *id != 0))
}
