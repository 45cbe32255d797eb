/// Errors that can occur in engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine is not started, or intake was closed by `stop`/`flush`.
    #[error("engine is not running")]
    NotRunning,

    /// Output type registration failed during start.
    #[error("registry error: {0}")]
    Registry(#[from] frameparse_registry::RegistryError),

    /// A binary image could not be generated for ingestion.
    #[error("image error: {0}")]
    Image(#[from] frameparse_image::ImageError),

    /// Configuration could not be loaded or is inconsistent.
    #[error("invalid config: {0}")]
    Config(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The background worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Protocol code panicked while parsing a buffer.
    #[error("parser panicked: {0}")]
    Panicked(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
