use thiserror::Error;

/// Ошибки построения и расчета разреженной сети
#[derive(Error, Debug)]
pub enum SparseNetError {
    #[error("cannot have more connections ({connections}) than neurons (inputs: {inputs}, outputs: {outputs})")]
    TooManyConnections {
        connections: usize,
        inputs: usize,
        outputs: usize,
    },

    #[error("chooser is exhausted")]
    ChooserExhausted,

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid spread: {0}")]
    InvalidSpread(f64),

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

pub type Result<T> = std::result::Result<T, SparseNetError>;

/// Проверка длины вектора
pub(crate) fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SparseNetError::ShapeMismatch { what, expected, actual });
    }
    Ok(())
}
