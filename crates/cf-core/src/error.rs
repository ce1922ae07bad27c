use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors from the shared numeric helpers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{what} is not finite: {value}")]
    NonFinite { what: &'static str, value: f64 },
}
