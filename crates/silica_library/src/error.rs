//! Library construction errors.

/// Fatal errors at library load; recoverable problems (unsupported
/// cells) are warnings on the diagnostic sink instead.
#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    /// Two cells share a name.
    #[error("cell name collision for: {0}")]
    CellCollision(String),

    /// Two LUT templates share a name.
    #[error("template name collision for: {0}")]
    TemplateCollision(String),

    /// Two wire-load models share a name.
    #[error("wire-load model name collision for: {0}")]
    WlmCollision(String),

    /// A pin function failed to parse.
    #[error("cell {cell}: bad function `{formula}`: {reason}")]
    BadFormula {
        /// The owning cell.
        cell: String,
        /// The formula text.
        formula: String,
        /// What went wrong.
        reason: String,
    },
}
