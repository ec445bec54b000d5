use std::io;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a file uri: {0}")]
    InvalidUri(String),

    #[error("{rule} failed: {message}")]
    Evaluation { rule: String, message: String },
}

impl Error {
    pub fn evaluation(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Evaluation {
            rule: rule.into(),
            message: message.into(),
        }
    }
}
