use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidInputShape {
        shape: Vec<usize>,
        reason: &'static str,
    },
    InvalidHyperparameter {
        name: &'static str,
        value: f32,
    },
    Shape(ShapeError),
    Init(String),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => {
                format!("There's a size mismatch in {what}, got {got} and expected {expected}")
            }
            MlErr::InvalidInputShape { shape, reason } => {
                format!("The input shape {shape:?} is invalid for this model: {reason}")
            }
            MlErr::InvalidHyperparameter { name, value } => {
                format!("The hyperparameter {name} has an invalid value of {value}")
            }
            MlErr::Shape(e) => format!("Failed to reshape a tensor: {e}"),
            MlErr::Init(msg) => format!("Failed to initialize the parameters: {msg}"),
        };

        write!(f, "{s}")
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
