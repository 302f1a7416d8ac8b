/// Network- or HTTP-level failure of a single request.
///
/// A `valid: false` answer is not a transport error: it arrives as an ordinary
/// [`crate::ServerResponse`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("server answered {status} for {url}")]
    Status { url: String, status: u16 },

    /// The body was not the JSON object we expected.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    /// The body decoded but lacks a key the verb requires.
    #[error("{verb} response is missing `{field}`")]
    MissingField { verb: String, field: String },

    /// The (simulated) server is not reachable at all.
    #[error("server unreachable")]
    Unreachable,
}

impl TransportError {
    pub fn missing(verb: crate::Verb, field: &str) -> Self {
        TransportError::MissingField {
            verb: verb.to_string(),
            field: field.to_string(),
        }
    }
}
