//! # Outgoing requests
//!
//! Every request is a form-encoded `POST` to `{endpoint}/{verb}`. The parameter
//! map is assembled in a fixed order so later sources win on key collisions:
//!
//! 1. the instance's extra context (opaque routing data for the server adapter),
//! 2. verb-specific fields (the serialized form, commit controls, `version`),
//! 3. the instance context: `id` (`0` in create mode) and `method`.
//!
//! `method` repeats the verb so single-URL servers can dispatch on it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::{ResourceId, VersionId};

/// Field set when the user asked for the save to be recorded in the history.
pub const COMMIT_FIELD: &str = "__do_commit_version";

/// Field carrying the history message that goes with [`COMMIT_FIELD`].
pub const COMMENT_FIELD: &str = "__version_comment";

/// Form-encoded request parameters.
pub type Params = BTreeMap<String, String>;

/// The remote operations a widget can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    GetForm,
    Save,
    Preview,
    Delete,
    Order,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::GetForm => "get_form",
            Verb::Save => "save",
            Verb::Preview => "preview",
            Verb::Delete => "delete",
            Verb::Order => "order",
        }
    }

    /// Whether the client reads the response body. Acknowledgement-only verbs
    /// ignore it on success.
    pub fn expects_body(&self) -> bool {
        !matches!(self, Verb::Delete | Verb::Order)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a path segment or `method` value names no known verb.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no api method {0:?}")]
pub struct UnknownVerb(pub String);

impl FromStr for Verb {
    type Err = UnknownVerb;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get_form" | "getForm" => Ok(Verb::GetForm),
            // `submit_form` is what single-dispatch servers call a save.
            "save" | "submit_form" => Ok(Verb::Save),
            "preview" => Ok(Verb::Preview),
            "delete" => Ok(Verb::Delete),
            "order" => Ok(Verb::Order),
            other => Err(UnknownVerb(other.to_string())),
        }
    }
}

/// A fully assembled request, ready to hand to a [`crate::RemoteApi`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub endpoint: String,
    pub verb: Verb,
    pub params: Params,
}

impl ApiRequest {
    fn build(
        endpoint: &str,
        verb: Verb,
        id: Option<ResourceId>,
        extra: &Params,
        fields: Params,
    ) -> Self {
        let mut params = extra.clone();
        params.extend(fields);
        params.insert("id".to_string(), id.unwrap_or(0).to_string());
        params.insert("method".to_string(), verb.as_str().to_string());
        Self {
            endpoint: endpoint.to_string(),
            verb,
            params,
        }
    }

    /// Fetch the edit form; `version` 0 means the current revision.
    pub fn get_form(
        endpoint: &str,
        id: Option<ResourceId>,
        version: VersionId,
        extra: &Params,
    ) -> Self {
        let fields = Params::from([("version".to_string(), version.to_string())]);
        Self::build(endpoint, Verb::GetForm, id, extra, fields)
    }

    /// Persist the serialized form, including any commit controls it carries.
    pub fn save(endpoint: &str, id: Option<ResourceId>, fields: Params, extra: &Params) -> Self {
        Self::build(endpoint, Verb::Save, id, extra, fields)
    }

    /// Render the serialized form without persisting. Commit controls are
    /// stripped: a preview never records history.
    pub fn preview(
        endpoint: &str,
        id: Option<ResourceId>,
        mut fields: Params,
        extra: &Params,
    ) -> Self {
        fields.remove(COMMIT_FIELD);
        fields.remove(COMMENT_FIELD);
        Self::build(endpoint, Verb::Preview, id, extra, fields)
    }

    pub fn delete(endpoint: &str, id: ResourceId, extra: &Params) -> Self {
        Self::build(endpoint, Verb::Delete, Some(id), extra, Params::new())
    }

    /// Persist a new display order for a set of resources.
    pub fn order(endpoint: &str, ids: &[ResourceId], extra: &Params) -> Self {
        let order = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let fields = Params::from([("order".to_string(), order)]);
        let mut request = Self::build(endpoint, Verb::Order, None, extra, fields);
        request.params.remove("id");
        request
    }

    /// Rebuild a request from what a server received.
    pub fn from_params(endpoint: &str, verb: Verb, params: Params) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            verb,
            params,
        }
    }

    /// `{endpoint}/{verb}`
    pub fn url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.verb)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The `id` parameter, with `0` and garbage both reading as "none".
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.param("id")
            .and_then(|id| id.parse::<ResourceId>().ok())
            .filter(|id| *id != 0)
    }
}
