use pgm_error::{Result, ensure};
use pgm_utils::ArenaKey;

/// A 1-based inclusive sub-range of a [NodeArray], mirroring the BUGS-like model
/// language's `x[lo:hi]` addressing (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub lo: usize,
    pub hi: usize,
}

impl IndexRange {
    pub fn new(lo: usize, hi: usize) -> Result<Self> {
        ensure!(lo >= 1 && lo <= hi, DataError: "index range [{}, {}] is empty or not 1-based", lo, hi);
        Ok(Self { lo, hi })
    }

    pub fn len(&self) -> usize {
        self.hi - self.lo + 1
    }
}

/// A named, ordered group of stochastic node ids produced by a model's `for`-loop
/// declaration. Monitors address a sub-range of this array rather than individual nodes.
#[derive(Debug, Clone)]
pub struct NodeArray {
    pub name: String,
    pub nodes: Vec<ArenaKey>,
}

impl NodeArray {
    pub fn new(name: impl Into<String>, nodes: Vec<ArenaKey>) -> Self {
        Self { name: name.into(), nodes }
    }

    pub fn full_range(&self) -> Result<IndexRange> {
        IndexRange::new(1, self.nodes.len())
    }

    /// Selects the node ids covered by `range`, in array order.
    pub fn select(&self, range: IndexRange) -> Result<Vec<ArenaKey>> {
        ensure!(range.hi <= self.nodes.len(), DataError: "range upper bound {} exceeds array '{}' length {}", range.hi, self.name, self.nodes.len());
        Ok(self.nodes[range.lo - 1..range.hi].to_vec())
    }
}
