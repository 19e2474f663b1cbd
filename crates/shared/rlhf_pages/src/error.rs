use crate::catalog::PageKind;
use rlhf_viz::RlhfError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PageError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageError {
    #[error("page `{page}` has no parameter `{key}`")]
    UnknownParam { page: &'static str, key: String },

    #[error("page `{page}` does not support `{action}`")]
    Unsupported { page: &'static str, action: &'static str },

    #[error("{what} index {index} out of range (len {len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Formula(#[from] RlhfError),
}

impl PageError {
    pub(crate) fn unsupported(page: PageKind, action: &'static str) -> Self {
        PageError::Unsupported {
            page: page.label(),
            action,
        }
    }

    pub(crate) fn unknown_param(page: PageKind, key: &str) -> Self {
        PageError::UnknownParam {
            page: page.label(),
            key: key.to_string(),
        }
    }
}
