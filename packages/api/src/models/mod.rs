//! Wire models shared by the client, the in-memory backend and the widget controller.

mod response;

pub use response::{zero_as_none, ResourceId, ServerResponse, VersionEntry, VersionId};
