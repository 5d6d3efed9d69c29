/// Core error type for the unfold lowering.
///
/// Any error aborts the whole translation call; no partial output is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The IR contains a shape the target language cannot express.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A recognized shape whose lowering is not handled.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Internal consistency failure in the translator's own state.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
