//! Error types for rendering.

use crate::highlight::HighlightError;

/// Error returned when rendering fails.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Invalid or conflicting configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Code highlighting failed.
    #[error("Highlight error: {0}")]
    Highlight(#[from] HighlightError),
    /// A placeholder token was dropped or duplicated by the Markdown renderer.
    #[error("Placeholder {token} found {occurrences} times in rendered HTML, expected 1")]
    PlaceholderMismatch {
        /// The affected token.
        token: String,
        /// How often the token occurs in the rendered HTML.
        occurrences: usize,
    },
}
