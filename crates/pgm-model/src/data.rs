/// Sentinel for an unobserved component within an otherwise-supplied data buffer (§6 "Data
/// interchange": "a sentinel *missing* value is distinguishable from the observable
/// range"). `f64::NAN` never compares equal to anything including itself, so a lookup can
/// always tell a real observation from a hole by testing for NaN rather than by value.
pub const MISSING: f64 = f64::NAN;

pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// One named variable's data: a flat, column-major buffer over the variable's full declared
/// extent (`elem_dim.product() * len` values), with [MISSING] marking unobserved
/// components.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelData {
    pub name: String,
    pub elem_dim: Vec<usize>,
    pub values: Vec<f64>,
}

impl ModelData {
    pub fn new(name: impl Into<String>, elem_dim: Vec<usize>, values: Vec<f64>) -> Self {
        Self { name: name.into(), elem_dim, values }
    }

    fn elem_len(&self) -> usize {
        self.elem_dim.iter().product::<usize>().max(1)
    }

    /// The 1-based element `position`'s slice, if every component of it is present.
    pub fn element(&self, position: usize) -> Option<&[f64]> {
        let k = self.elem_len();
        let start = (position - 1) * k;
        let slice = self.values.get(start..start + k)?;
        if slice.iter().any(|v| is_missing(*v)) {
            None
        } else {
            Some(slice)
        }
    }
}
