use core::num::TryFromIntError;

use crate::DType;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("dimension error: {0}")]
    Dimension(String),
    #[error("unit error: {0}")]
    Unit(String),
    #[error("variances error: {0}")]
    Variances(String),
    #[error("type error: {0}")]
    Type(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("out of range: {0}")]
    Range(String),
    #[error("read-only: {0}")]
    Readonly(String),
    #[error(transparent)]
    TryFromInt(#[from] TryFromIntError),
}

impl Error {
    pub(crate) fn unsupported_dtypes(op: &str, dtypes: &[DType]) -> Self {
        let names = dtypes
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self::Type(format!("'{}' does not support dtypes ({})", op, names))
    }

    pub(crate) fn readonly(what: &str) -> Self {
        Self::Readonly(format!("cannot mutate {} of a read-only variable", what))
    }
}
