mod dinterval;
mod helpers;
mod multivariate;
mod scalar_continuous;
mod scalar_discrete;

use std::sync::Arc;

use crate::distribution::Distribution;

pub use dinterval::DInterval;
pub use multivariate::{DMNorm, DMNormVar, DMulti};
pub use scalar_continuous::{DBeta, DChisqr, DExp, DF, DGamma, DLnorm, DNorm, DNormVar, DT, DUnif, DWeib};
pub use scalar_discrete::{DBern, DBin, DCat, DPois};

/// The base distribution module, mirroring the required-names list: every entry a
/// compliant model language front-end may reference is registered here. `DPar` (Pareto)
/// is intentionally not included — its source declared an alias `"dbinom"` that collides
/// with the binomial family name, almost certainly a typo, and is dropped rather than
/// carried forward.
pub fn base_module() -> Vec<Arc<dyn Distribution>> {
    vec![
        Arc::new(DNorm),
        Arc::new(DNormVar),
        Arc::new(DMNorm),
        Arc::new(DMNormVar),
        Arc::new(DBeta),
        Arc::new(DBin),
        Arc::new(DBern),
        Arc::new(DCat),
        Arc::new(DUnif),
        Arc::new(DExp),
        Arc::new(DLnorm),
        Arc::new(DChisqr),
        Arc::new(DGamma),
        Arc::new(DT),
        Arc::new(DWeib),
        Arc::new(DPois),
        Arc::new(DF),
        Arc::new(DMulti),
        Arc::new(DInterval),
    ]
}
