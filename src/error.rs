/// Error taxonomy for the filter engine
///
/// All three variants are recoverable: the preview scheduler converts them
/// into events for the UI layer instead of propagating them as panics.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The source image could not be read or decoded.
    /// The scheduler degrades to displaying the original file directly.
    #[error("failed to load source image: {0}")]
    SourceLoadFailed(String),

    /// The external render process failed to start or exited nonzero.
    /// Carries the first line of captured stderr as the diagnostic.
    #[error("render process failed: {0}")]
    RenderFailed(String),

    /// The cache directory or an output file could not be written.
    #[error("failed to write output: {0}")]
    WriteFailed(String),
}
