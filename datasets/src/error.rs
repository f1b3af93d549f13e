use std::{error::Error, fmt, io, path::PathBuf};

/// The datasets module's result type.
pub type Result<T> = std::result::Result<T, DataErr>;

/// Failures while fetching or decoding a dataset.
#[derive(Debug)]
pub enum DataErr {
    Io(io::Error),
    MissingFile(PathBuf),
    InvalidMagic {
        expected: u32,
        got: u32,
    },
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    CountMismatch {
        images: usize,
        labels: usize,
    },
    InvalidHeader {
        what: &'static str,
        dims: Vec<usize>,
    },
    ShapeMismatch {
        split: &'static str,
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
    UnknownDataset(String),
    LabelOutOfRange {
        label: usize,
        num_classes: usize,
    },
    InvalidBatchSize,
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::Io(e) => write!(f, "io error: {e}"),
            DataErr::MissingFile(path) => write!(f, "file not found: {}", path.display()),
            DataErr::InvalidMagic { expected, got } => write!(
                f,
                "invalid IDX magic: expected {expected:#06x}, got {got:#06x}"
            ),
            DataErr::Truncated {
                what,
                expected,
                got,
            } => write!(
                f,
                "{what} truncated: expected {expected} bytes, got {got}"
            ),
            DataErr::CountMismatch { images, labels } => {
                write!(f, "count mismatch: {images} images vs {labels} labels")
            }
            DataErr::InvalidHeader { what, dims } => {
                write!(f, "{what} describes an impossible size: {dims:?}")
            }
            DataErr::ShapeMismatch {
                split,
                expected,
                got,
            } => write!(
                f,
                "the {split} images are {got:?}, the dataset's images are {expected:?}"
            ),
            DataErr::UnknownDataset(name) => write!(f, "unknown dataset {name}"),
            DataErr::LabelOutOfRange { label, num_classes } => write!(
                f,
                "label {label} is out of range for {num_classes} classes"
            ),
            DataErr::InvalidBatchSize => write!(f, "the batch size must be positive"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
