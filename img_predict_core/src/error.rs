use thiserror::Error;

/// Conditions the pipeline reports as contract violations rather than I/O failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The label table and the classifier disagree on the number of classes.
    #[error("label table has {labels} entries but the classifier produces {classes} classes")]
    LabelCountMismatch { labels: usize, classes: usize },

    #[error("cannot derive a file name from url: {url}")]
    NoFileName { url: String },
}
