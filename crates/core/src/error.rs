use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// Manifest file missing or unreadable. The whole sync is a no-op
    /// for that invocation; callers retry on the next tick.
    Io(String),
    /// Required column missing from the manifest header.
    MissingColumn { column: String },
    /// CSV-level read error (bad framing, invalid record).
    Csv(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::MissingColumn { column } => {
                write!(f, "manifest: missing column '{column}'")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
