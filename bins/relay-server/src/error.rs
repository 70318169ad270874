use relay_api::{SchemaLoadError, TransportError};
use relay_http::HttpError;

/// Startup and shutdown failures. Any of these ends the process with exit
/// code 1; per-record failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("schema: {0}")]
    Schema(#[from] SchemaLoadError),

    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    #[error("http: {0}")]
    Http(#[from] HttpError),

    #[error("task: {0}")]
    Task(String),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
