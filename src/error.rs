use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DeckError {
    #[error("dataset unavailable at {}: {reason}", path.display())]
    DatasetUnavailable { path: PathBuf, reason: String },

    #[error("invalid {column} value {value:?}")]
    InvalidCategory { column: String, value: String },

    #[error("no display name configured for measure {column}")]
    UnmappedMeasure { column: String },

    #[error("slide {index} is out of range (deck has {total} slides)")]
    SlideOutOfRange { index: usize, total: usize },

    #[error("unknown {selector} selection {value:?}")]
    UnknownSelector { selector: &'static str, value: String },
}
