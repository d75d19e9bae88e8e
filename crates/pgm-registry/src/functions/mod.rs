mod elementwise;
mod linear;

use std::sync::Arc;

use crate::function::Function;

pub use elementwise::{Exp, Log, Sum};
pub use linear::{Add, Identity, IndexSelect, MatMultiply, Negate, Scale, Subtract, Transpose};

/// The base function module. The eight linear ops form the closed affine set the
/// conjugacy detector recognizes when classifying a conjugate parameter slot as LINEAR
/// (§4.4); `exp`/`log`/`sum` round out the catalog for everyday deterministic nodes but
/// are deliberately excluded from `is_affine`.
pub fn base_module() -> Vec<Arc<dyn Function>> {
    vec![
        Arc::new(Identity),
        Arc::new(Add),
        Arc::new(Subtract),
        Arc::new(Negate),
        Arc::new(Scale),
        Arc::new(MatMultiply),
        Arc::new(Transpose),
        Arc::new(IndexSelect),
        Arc::new(Exp),
        Arc::new(Log),
        Arc::new(Sum),
    ]
}
