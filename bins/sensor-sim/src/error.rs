#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("{0}")]
    Config(String),

    #[error("replay file '{path}' line {line}: {detail}")]
    Replay {
        path: String,
        line: usize,
        detail: String,
    },

    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
