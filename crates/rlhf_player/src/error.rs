use std::path::PathBuf;

use rlhf_pages::PageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not determine data directory")]
    NoDataDir,

    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("`{value}` is not a valid {what}")]
    InvalidArgument { what: &'static str, value: String },

    #[error("unknown page `{0}`")]
    UnknownPage(String),

    #[error(transparent)]
    Page(#[from] PageError),
}
