//! Demo record model: the blocks shown on the page and, server-side, the
//! in-memory store answering their requests.

use api::{FieldSpec, ResourceId};
use serde::{Deserialize, Serialize};

pub const RECORDS_PATH: &str = "/api/records";

/// A stored record as the page first shows it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordBlock {
    pub id: ResourceId,
    pub html: String,
}

pub fn schema() -> Vec<FieldSpec> {
    vec![
        FieldSpec::text("title", "Title").required(),
        FieldSpec::textarea("body", "Body"),
    ]
}

/// Load every record's display block.
pub async fn fetch_blocks(endpoint: &str) -> Result<Vec<RecordBlock>, reqwest::Error> {
    reqwest::get(endpoint)
        .await?
        .error_for_status()?
        .json()
        .await
}

#[cfg(feature = "server")]
pub use server::{dispatch, list, seeded_backend};

#[cfg(feature = "server")]
mod server {
    use api::{ApiRequest, MemoryBackend, Params, ServerResponse, UnknownVerb, Verb};
    use axum::extract::{Form, Path, State};
    use axum::http::StatusCode;
    use axum::Json;

    use super::{schema, RecordBlock, RECORDS_PATH};

    pub fn seeded_backend() -> MemoryBackend {
        let backend = MemoryBackend::new(schema()).with_history();
        backend.insert(&[
            ("title", "Welcome"),
            ("body", "Hover a block and press Edit to change it."),
        ]);
        backend.insert(&[
            ("title", "Previewing"),
            ("body", "Preview renders your change without saving it."),
        ]);
        backend.insert(&[
            ("title", "History"),
            ("body", "Tick \"Save as a new version\" to keep a revision."),
        ]);
        backend
    }

    /// `GET /api/records`
    pub async fn list(State(backend): State<MemoryBackend>) -> Json<Vec<RecordBlock>> {
        let blocks = backend
            .ids()
            .into_iter()
            .filter_map(|id| backend.render(id).map(|html| RecordBlock { id, html }))
            .collect();
        Json(blocks)
    }

    /// `POST /api/records/{verb}`
    pub async fn dispatch(
        State(backend): State<MemoryBackend>,
        Path(verb): Path<String>,
        Form(params): Form<Params>,
    ) -> Result<Json<ServerResponse>, (StatusCode, String)> {
        let verb: Verb = verb
            .parse()
            .map_err(|e: UnknownVerb| (StatusCode::NOT_FOUND, e.to_string()))?;
        let request = ApiRequest::from_params(RECORDS_PATH, verb, params);
        match backend.handle(&request) {
            Ok(response) => Ok(Json(response)),
            Err(e) => {
                tracing::warn!(%verb, error = %e, "record request failed");
                let status = StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_REQUEST);
                Err((status, e.to_string()))
            }
        }
    }

}
