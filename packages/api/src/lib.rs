//! # API crate: the thin JSON request layer behind editable blocks
//!
//! Everything an editable block says to its server goes through this crate. A
//! request is a form-encoded `POST` to `{endpoint}/{verb}`; the answer is a JSON
//! [`ServerResponse`]. The crate is stateless: it never decides what a response
//! means for the widget, it only moves it across the wire.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Wire types: [`ServerResponse`], [`VersionEntry`], id aliases |
//! | [`request`] | [`Verb`], [`ApiRequest`] builders and the commit-control field names |
//! | [`client`] | The [`RemoteApi`] capability and its `reqwest` implementation, [`HttpClient`] |
//! | [`memory`] | [`MemoryBackend`], an in-memory model adapter answering every verb |
//!
//! ## Verbs
//!
//! - **`get_form`**: `id`, `version` → `form`, `versions`
//! - **`save`**: `id`, form fields, optional `__do_commit_version` / `__version_comment`
//!   → `valid`, then `html` + `id` or `form`
//! - **`preview`**: like `save` without the commit fields; nothing is persisted
//! - **`delete`**: `id` → acknowledgement
//! - **`order`**: comma-separated `order` of ids → acknowledgement

pub mod client;
mod error;
pub mod memory;
pub mod models;
pub mod request;

pub use client::{HttpClient, RemoteApi};
pub use error::TransportError;
pub use memory::{BackendError, FieldKind, FieldSpec, MemoryBackend};
pub use models::{ResourceId, ServerResponse, VersionEntry, VersionId};
pub use request::{ApiRequest, Params, UnknownVerb, Verb, COMMENT_FIELD, COMMIT_FIELD};
