use thiserror::Error;

/// Failures constructing fundamental types from external input.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("member name must not be empty")]
    EmptyName,

    #[error("invalid token amount '{0}'")]
    InvalidAmount(String),
}
