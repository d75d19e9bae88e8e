/// Errors returned by fallible [crate::MultiArray] constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiArrayError {
    ShapeOverflow { dims: Vec<usize> },
    LenMismatch { len: usize, expected: usize },
}

impl std::fmt::Display for MultiArrayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiArrayError::ShapeOverflow { dims } => {
                write!(f, "shape overflow for dimensions {:?}", dims)
            }
            MultiArrayError::LenMismatch { len, expected } => {
                write!(f, "length mismatch: got {}, expected {}", len, expected)
            }
        }
    }
}

impl std::error::Error for MultiArrayError {}
