//! # In-memory CRUD backend
//!
//! [`MemoryBackend`] answers every [`Verb`] the way a server-side model adapter
//! would, against a table held in memory. It backs the widget tests and the
//! demo server in the `web` package.
//!
//! ## Behaviour
//!
//! | Verb | Effect |
//! |------|--------|
//! | `get_form` | Renders the edit form for `id` (blank when `id` is 0), or for a stored `version` of it. Lists the history when enabled. |
//! | `save` | Validates required fields. Invalid input comes back as a re-rendered form with `class="error"` markers. Valid input is persisted (a new id is assigned in create mode), optionally committed to the history, and answered with the rendered block. |
//! | `preview` | Validates and renders without persisting. |
//! | `delete` | Removes the record. |
//! | `order` | Rearranges the given records among the slots they already occupy. |
//!
//! Unknown ids and malformed parameters become [`BackendError`]s, which the
//! [`RemoteApi`] impl reports as HTTP-level failures.
//!
//! Every request is logged (see [`MemoryBackend::requests`]) and the backend can
//! be switched offline to simulate a dead network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::RemoteApi;
use crate::error::TransportError;
use crate::models::{ResourceId, ServerResponse, VersionEntry, VersionId};
use crate::request::{ApiRequest, Params, Verb, COMMENT_FIELD, COMMIT_FIELD};

/// How a field is edited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
}

/// One column of the backend's schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn text(name: &str, label: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind: FieldKind::Text,
            required: false,
        }
    }

    pub fn textarea(name: &str, label: &str) -> Self {
        Self {
            kind: FieldKind::TextArea,
            ..Self::text(name, label)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Server-side failure. Maps onto an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("could not find object {0}")]
    NotFound(ResourceId),
    #[error("could not find version {version} of object {id}")]
    VersionNotFound { id: ResourceId, version: VersionId },
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl BackendError {
    pub fn status(&self) -> u16 {
        match self {
            BackendError::NotFound(_) | BackendError::VersionNotFound { .. } => 404,
            BackendError::BadRequest(_) => 400,
        }
    }
}

#[derive(Clone, Debug)]
struct Revision {
    version_id: VersionId,
    label: String,
    fields: Params,
}

#[derive(Clone, Debug, Default)]
struct Record {
    fields: Params,
    history: Vec<Revision>,
}

#[derive(Debug, Default)]
struct Table {
    next_id: ResourceId,
    order: Vec<ResourceId>,
    records: HashMap<ResourceId, Record>,
}

/// In-memory model adapter for testing and demos.
#[derive(Clone, Debug)]
pub struct MemoryBackend {
    schema: Arc<Vec<FieldSpec>>,
    history: bool,
    table: Arc<Mutex<Table>>,
    log: Arc<Mutex<Vec<ApiRequest>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBackend {
    pub fn new(schema: Vec<FieldSpec>) -> Self {
        Self {
            schema: Arc::new(schema),
            history: false,
            table: Arc::new(Mutex::new(Table::default())),
            log: Arc::new(Mutex::new(Vec::new())),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Offer a version history on every form.
    pub fn with_history(mut self) -> Self {
        self.history = true;
        self
    }

    /// Seed a record directly, bypassing validation. Returns its id.
    pub fn insert(&self, fields: &[(&str, &str)]) -> ResourceId {
        let fields = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut table = self.table.lock().unwrap();
        table.next_id += 1;
        let id = table.next_id;
        table.records.insert(
            id,
            Record {
                fields,
                history: Vec::new(),
            },
        );
        table.order.push(id);
        id
    }

    /// Stored field values of a record.
    pub fn get(&self, id: ResourceId) -> Option<Params> {
        let table = self.table.lock().unwrap();
        table.records.get(&id).map(|r| r.fields.clone())
    }

    /// Record ids in display order.
    pub fn ids(&self) -> Vec<ResourceId> {
        self.table.lock().unwrap().order.clone()
    }

    /// The rendered display block of a record.
    pub fn render(&self, id: ResourceId) -> Option<String> {
        self.get(id).map(|fields| self.render_block(Some(id), &fields))
    }

    /// History labels of a record, most recent first.
    pub fn versions(&self, id: ResourceId) -> Vec<VersionEntry> {
        let table = self.table.lock().unwrap();
        table
            .records
            .get(&id)
            .map(|r| list_versions(&r.history))
            .unwrap_or_default()
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Requests received for one verb.
    pub fn requests_for(&self, verb: Verb) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.verb == verb)
            .collect()
    }

    /// While offline every request fails with [`TransportError::Unreachable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Dispatch one request against the table.
    pub fn handle(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        tracing::debug!(verb = %request.verb, id = ?request.resource_id(), "memory backend request");
        match request.verb {
            Verb::GetForm => self.handle_get_form(request),
            Verb::Save => self.handle_save(request),
            Verb::Preview => self.handle_preview(request),
            Verb::Delete => self.handle_delete(request),
            Verb::Order => self.handle_order(request),
        }
    }

    fn handle_get_form(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        let version = match request.param("version") {
            None | Some("") => 0,
            Some(v) => v
                .parse::<VersionId>()
                .map_err(|_| BackendError::BadRequest(format!("bad version {v:?}")))?,
        };

        let Some(id) = request.resource_id() else {
            let versions = self.history.then(Vec::new);
            return Ok(ServerResponse::form(
                self.render_form(&Params::new(), &[]),
                versions,
            ));
        };

        let table = self.table.lock().unwrap();
        let record = table.records.get(&id).ok_or(BackendError::NotFound(id))?;
        let fields = if version == 0 {
            &record.fields
        } else {
            &record
                .history
                .iter()
                .find(|rev| rev.version_id == version)
                .ok_or(BackendError::VersionNotFound { id, version })?
                .fields
        };
        let versions = self.history.then(|| list_versions(&record.history));
        Ok(ServerResponse::form(self.render_form(fields, &[]), versions))
    }

    fn handle_save(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        let values = self.pick_fields(&request.params);
        let errors = self.validate(&values);
        if !errors.is_empty() {
            return Ok(ServerResponse::rejected(self.render_form(&values, &errors)));
        }

        let mut table = self.table.lock().unwrap();
        let id = match request.resource_id() {
            Some(id) => {
                if !table.records.contains_key(&id) {
                    return Err(BackendError::NotFound(id));
                }
                id
            }
            None => {
                table.next_id += 1;
                let id = table.next_id;
                table.records.insert(id, Record::default());
                table.order.push(id);
                id
            }
        };

        let record = table
            .records
            .get_mut(&id)
            .ok_or(BackendError::NotFound(id))?;
        record.fields = values.clone();
        if request.param(COMMIT_FIELD).is_some() {
            let version_id = record.history.len() as VersionId + 1;
            let label = match request.param(COMMENT_FIELD).map(str::trim) {
                Some(comment) if !comment.is_empty() => comment.to_string(),
                _ => format!("Version {version_id}"),
            };
            record.history.push(Revision {
                version_id,
                label,
                fields: values.clone(),
            });
        }
        drop(table);

        tracing::debug!(id, "memory backend saved record");
        Ok(ServerResponse::accepted(
            self.render_block(Some(id), &values),
            Some(id),
        ))
    }

    fn handle_preview(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        let values = self.pick_fields(&request.params);
        let errors = self.validate(&values);
        if !errors.is_empty() {
            return Ok(ServerResponse::rejected(self.render_form(&values, &errors)));
        }
        let id = request.resource_id();
        Ok(ServerResponse::accepted(self.render_block(id, &values), id))
    }

    fn handle_delete(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        let id = request
            .resource_id()
            .ok_or_else(|| BackendError::BadRequest("missing id".to_string()))?;
        let mut table = self.table.lock().unwrap();
        table.records.remove(&id).ok_or(BackendError::NotFound(id))?;
        table.order.retain(|other| *other != id);
        Ok(ServerResponse::default())
    }

    fn handle_order(&self, request: &ApiRequest) -> Result<ServerResponse, BackendError> {
        let raw = request.param("order").unwrap_or_default();
        let mut wanted = Vec::new();
        let mut seen = HashSet::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id = part
                .parse::<ResourceId>()
                .map_err(|_| BackendError::BadRequest(format!("bad id {part:?} in order")))?;
            // Placeholders for unsaved blocks carry id 0.
            if id == 0 {
                continue;
            }
            if !seen.insert(id) {
                return Err(BackendError::BadRequest(format!("id {id} repeated in order")));
            }
            wanted.push(id);
        }

        let mut table = self.table.lock().unwrap();
        if wanted.iter().any(|id| !table.records.contains_key(id)) {
            return Err(BackendError::BadRequest(
                "could not find all the items".to_string(),
            ));
        }

        let mut slots: Vec<usize> = table
            .order
            .iter()
            .enumerate()
            .filter(|(_, id)| wanted.contains(id))
            .map(|(i, _)| i)
            .collect();
        slots.sort_unstable();
        for (slot, id) in slots.into_iter().zip(wanted) {
            table.order[slot] = id;
        }
        Ok(ServerResponse::default())
    }

    fn pick_fields(&self, params: &Params) -> Params {
        self.schema
            .iter()
            .map(|spec| {
                let value = params.get(&spec.name).cloned().unwrap_or_default();
                (spec.name.clone(), value)
            })
            .collect()
    }

    fn validate(&self, values: &Params) -> Vec<String> {
        self.schema
            .iter()
            .filter(|spec| spec.required)
            .filter(|spec| {
                values
                    .get(&spec.name)
                    .map_or(true, |v| v.trim().is_empty())
            })
            .map(|spec| spec.name.clone())
            .collect()
    }

    fn render_form(&self, values: &Params, errors: &[String]) -> String {
        let mut out = String::new();
        for spec in self.schema.iter() {
            let value = values.get(&spec.name).map(String::as_str).unwrap_or("");
            let invalid = errors.contains(&spec.name);
            let class = if invalid { " class=\"error\"" } else { "" };
            out.push_str(&format!(
                "<p class=\"field\"><label for=\"field-{name}\">{label}</label>",
                name = spec.name,
                label = escape_html(&spec.label),
            ));
            match spec.kind {
                FieldKind::Text => out.push_str(&format!(
                    "<input type=\"text\" id=\"field-{name}\" name=\"{name}\" value=\"{value}\"{class}>",
                    name = spec.name,
                    value = escape_html(value),
                )),
                FieldKind::TextArea => out.push_str(&format!(
                    "<textarea id=\"field-{name}\" name=\"{name}\"{class}>{value}</textarea>",
                    name = spec.name,
                    value = escape_html(value),
                )),
            }
            if invalid {
                out.push_str("<span class=\"error-message\">This field is required.</span>");
            }
            out.push_str("</p>");
        }
        out
    }

    fn render_block(&self, id: Option<ResourceId>, values: &Params) -> String {
        let mut out = format!("<div class=\"record\" data-id=\"{}\">", id.unwrap_or(0));
        for spec in self.schema.iter() {
            let value = values.get(&spec.name).map(String::as_str).unwrap_or("");
            out.push_str(&format!(
                "<div class=\"{}\">{}</div>",
                spec.name,
                escape_html(value)
            ));
        }
        out.push_str("</div>");
        out
    }
}

impl RemoteApi for MemoryBackend {
    async fn send(&self, request: &ApiRequest) -> Result<ServerResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable);
        }
        self.handle(request).map_err(|e| {
            tracing::warn!(verb = %request.verb, error = %e, "memory backend error");
            TransportError::Status {
                url: request.url(),
                status: e.status(),
            }
        })
    }
}

fn list_versions(history: &[Revision]) -> Vec<VersionEntry> {
    history
        .iter()
        .rev()
        .map(|rev| VersionEntry {
            version_id: rev.version_id,
            label: rev.label.clone(),
        })
        .collect()
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> MemoryBackend {
        MemoryBackend::new(vec![
            FieldSpec::text("title", "Title").required(),
            FieldSpec::textarea("body", "Body"),
        ])
    }

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_form_renders_current_values() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello"), ("body", "a < b")]);
        let res = backend
            .handle(&ApiRequest::get_form("/api", Some(id), 0, &Params::new()))
            .unwrap();
        let form = res.form.unwrap();
        assert!(form.contains("name=\"title\" value=\"Hello\""));
        assert!(form.contains(">a &lt; b</textarea>"));
        assert_eq!(res.valid, None);
        assert!(res.versions.is_none());
    }

    #[test]
    fn test_get_form_unknown_id() {
        let err = backend()
            .handle(&ApiRequest::get_form("/api", Some(99), 0, &Params::new()))
            .unwrap_err();
        assert_eq!(err, BackendError::NotFound(99));
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_save_invalid_rerenders_with_errors() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        let req = ApiRequest::save("/api", Some(id), params(&[("title", "  ")]), &Params::new());
        let res = backend.handle(&req).unwrap();
        assert!(!res.is_valid());
        assert!(res.form.unwrap().contains("class=\"error\""));
        assert_eq!(backend.get(id).unwrap()["title"], "Hello");
    }

    #[test]
    fn test_save_create_assigns_id() {
        let backend = backend();
        let req = ApiRequest::save("/api", None, params(&[("title", "New")]), &Params::new());
        let res = backend.handle(&req).unwrap();
        assert!(res.is_valid());
        let id = res.id.unwrap();
        assert_eq!(backend.ids(), vec![id]);
        assert!(res.html.unwrap().contains("<div class=\"title\">New</div>"));
    }

    #[test]
    fn test_commit_records_history_and_versions_load() {
        let backend = backend().with_history();
        let id = backend.insert(&[("title", "v0")]);

        let first = params(&[("title", "v1"), (COMMIT_FIELD, "on"), (COMMENT_FIELD, "first")]);
        backend
            .handle(&ApiRequest::save("/api", Some(id), first, &Params::new()))
            .unwrap();
        let second = params(&[("title", "v2"), (COMMIT_FIELD, "on")]);
        backend
            .handle(&ApiRequest::save("/api", Some(id), second, &Params::new()))
            .unwrap();
        let uncommitted = params(&[("title", "v3")]);
        backend
            .handle(&ApiRequest::save("/api", Some(id), uncommitted, &Params::new()))
            .unwrap();

        let versions = backend.versions(id);
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].label, "Version 2");
        assert_eq!(versions[1].label, "first");

        let res = backend
            .handle(&ApiRequest::get_form("/api", Some(id), 1, &Params::new()))
            .unwrap();
        assert!(res.form.unwrap().contains("value=\"v1\""));
        assert_eq!(res.versions.unwrap().len(), 2);
    }

    #[test]
    fn test_preview_does_not_persist() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        let req = ApiRequest::preview("/api", Some(id), params(&[("title", "Draft")]), &Params::new());
        let res = backend.handle(&req).unwrap();
        assert!(res.is_valid());
        assert!(res.html.unwrap().contains("Draft"));
        assert_eq!(backend.get(id).unwrap()["title"], "Hello");
    }

    #[test]
    fn test_delete_removes_record() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        backend
            .handle(&ApiRequest::delete("/api", id, &Params::new()))
            .unwrap();
        assert!(backend.get(id).is_none());
        assert!(backend.ids().is_empty());
        assert!(backend
            .handle(&ApiRequest::delete("/api", id, &Params::new()))
            .is_err());
    }

    #[test]
    fn test_order_rearranges_given_ids() {
        let backend = backend();
        let a = backend.insert(&[("title", "a")]);
        let b = backend.insert(&[("title", "b")]);
        let c = backend.insert(&[("title", "c")]);
        backend
            .handle(&ApiRequest::order("/api", &[c, 0, a], &Params::new()))
            .unwrap();
        assert_eq!(backend.ids(), vec![c, b, a]);

        let err = backend
            .handle(&ApiRequest::order("/api", &[a, 77], &Params::new()))
            .unwrap_err();
        assert!(matches!(err, BackendError::BadRequest(_)));
    }

    #[test]
    fn test_order_rejects_repeated_ids() {
        let backend = backend();
        let a = backend.insert(&[("title", "a")]);
        let b = backend.insert(&[("title", "b")]);

        let err = backend
            .handle(&ApiRequest::order("/api", &[a, a, b], &Params::new()))
            .unwrap_err();
        assert!(matches!(err, BackendError::BadRequest(_)));
        assert_eq!(backend.ids(), vec![a, b]);

        backend
            .handle(&ApiRequest::order("/api", &[0, b, 0, a], &Params::new()))
            .unwrap();
        assert_eq!(backend.ids(), vec![b, a]);
    }

    #[tokio::test]
    async fn test_offline_backend_fails_transport() {
        let backend = backend();
        let id = backend.insert(&[("title", "Hello")]);
        backend.set_offline(true);
        let req = ApiRequest::get_form("/api", Some(id), 0, &Params::new());
        assert_eq!(backend.send(&req).await, Err(TransportError::Unreachable));
        assert_eq!(backend.requests().len(), 1);

        backend.set_offline(false);
        assert!(backend.send(&req).await.is_ok());
    }

    #[tokio::test]
    async fn test_backend_errors_surface_as_status() {
        let backend = backend();
        let req = ApiRequest::delete("/api/posts", 5, &Params::new());
        let err = backend.send(&req).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                url: "/api/posts/delete".to_string(),
                status: 404
            }
        );
    }
}
