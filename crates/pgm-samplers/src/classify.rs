use pgm_graph::{Graph, Node, NodeKind};
use pgm_utils::ArenaKey;

/// `value = A * target + b`, `A` row-major `out_dim x in_dim`. `in_dim` is always the
/// target node's own dimension, so every `Affine` produced while walking a single target's
/// descendants is directly composable with every other.
///
/// A value that does not depend on the target at all (KNOWN, in the model's terms) is
/// just the degenerate case `A = 0`; `is_known` tests for it rather than carrying a
/// separate variant, which keeps every composition rule below a single code path.
#[derive(Clone, Debug)]
pub struct Affine {
    pub out_dim: usize,
    pub in_dim: usize,
    pub a: Vec<f64>,
    pub b: Vec<f64>,
}

impl Affine {
    pub fn identity(dim: usize) -> Self {
        let mut a = vec![0.0; dim * dim];
        for i in 0..dim {
            a[i * dim + i] = 1.0;
        }
        Affine {
            out_dim: dim,
            in_dim: dim,
            a,
            b: vec![0.0; dim],
        }
    }

    pub fn known(value: Vec<f64>, in_dim: usize) -> Self {
        let out_dim = value.len();
        Affine {
            out_dim,
            in_dim,
            a: vec![0.0; out_dim * in_dim],
            b: value,
        }
    }

    pub fn is_known(&self) -> bool {
        self.a.iter().all(|&x| x == 0.0)
    }

    pub fn apply(&self, target_value: &[f64]) -> Vec<f64> {
        let mut out = self.b.clone();
        for i in 0..self.out_dim {
            for j in 0..self.in_dim {
                out[i] += self.a[i * self.in_dim + j] * target_value[j];
            }
        }
        out
    }

    fn zip_with(&self, other: &Affine, f: impl Fn(f64, f64) -> f64) -> Option<Affine> {
        if self.out_dim != other.out_dim || self.in_dim != other.in_dim {
            return None;
        }
        Some(Affine {
            out_dim: self.out_dim,
            in_dim: self.in_dim,
            a: self.a.iter().zip(&other.a).map(|(&x, &y)| f(x, y)).collect(),
            b: self.b.iter().zip(&other.b).map(|(&x, &y)| f(x, y)).collect(),
        })
    }

    fn scaled(&self, k: f64) -> Affine {
        Affine {
            out_dim: self.out_dim,
            in_dim: self.in_dim,
            a: self.a.iter().map(|v| v * k).collect(),
            b: self.b.iter().map(|v| v * k).collect(),
        }
    }
}

/// Walks `node` as a (possibly indirect) function of `target`, returning its affine
/// representation if every intermediate node is KNOWN or composed through the closed
/// affine function set (§4.4), `None` (OTHER) otherwise.
pub fn classify(graph: &Graph, node: ArenaKey, target: ArenaKey) -> Option<Affine> {
    let target_dim: usize = graph.node(target).ok()?.dim().iter().product::<usize>().max(1);
    classify_inner(graph, node, target, target_dim)
}

fn classify_inner(graph: &Graph, id: ArenaKey, target: ArenaKey, target_dim: usize) -> Option<Affine> {
    if id == target {
        return Some(Affine::identity(target_dim));
    }
    let node = graph.node(id).ok()?;
    if node.is_observed() {
        return Some(Affine::known(node.value()?.to_vec(), target_dim));
    }
    match node.kind() {
        NodeKind::Constant => Some(Affine::known(node.value()?.to_vec(), target_dim)),
        NodeKind::Stochastic { .. } => None,
        NodeKind::Logical { function } => {
            if !function.is_affine() {
                return None;
            }
            let parents: Vec<Affine> = node
                .parents()
                .iter()
                .map(|&p| classify_inner(graph, p, target, target_dim))
                .collect::<Option<_>>()?;
            compose(function.name(), &parents, node)
        }
    }
}

fn compose(name: &str, parents: &[Affine], node: &Node) -> Option<Affine> {
    match name {
        "identity" => Some(parents[0].clone()),
        "add" => parents[0].zip_with(&parents[1], |a, b| a + b),
        "subtract" => parents[0].zip_with(&parents[1], |a, b| a - b),
        "negate" => Some(parents[0].scaled(-1.0)),
        "scale" => {
            let (scalar, vector) = if parents[0].out_dim == 1 && parents[0].is_known() {
                (&parents[0], &parents[1])
            } else if parents[1].out_dim == 1 && parents[1].is_known() {
                (&parents[1], &parents[0])
            } else {
                return None;
            };
            Some(vector.scaled(scalar.b[0]))
        }
        "matmul" => {
            if !parents[0].is_known() {
                return None;
            }
            let x = &parents[1];
            let rows = node.dim()[0];
            let cols = x.out_dim;
            let matrix = &parents[0].b; // row-major rows x cols, known
            let mut a = vec![0.0; rows * x.in_dim];
            let mut b = vec![0.0; rows];
            for i in 0..rows {
                for j in 0..cols {
                    let coeff = matrix[i * cols + j];
                    b[i] += coeff * x.b[j];
                    for k in 0..x.in_dim {
                        a[i * x.in_dim + k] += coeff * x.a[j * x.in_dim + k];
                    }
                }
            }
            Some(Affine {
                out_dim: rows,
                in_dim: x.in_dim,
                a,
                b,
            })
        }
        "index_select" => {
            if !parents[1].is_known() {
                return None;
            }
            let x = &parents[0];
            let indices = &parents[1].b;
            let mut a = vec![0.0; indices.len() * x.in_dim];
            let mut b = vec![0.0; indices.len()];
            for (row, &idx) in indices.iter().enumerate() {
                let i = idx as usize;
                if i == 0 || i > x.out_dim {
                    return None;
                }
                b[row] = x.b[i - 1];
                a[row * x.in_dim..(row + 1) * x.in_dim]
                    .copy_from_slice(&x.a[(i - 1) * x.in_dim..i * x.in_dim]);
            }
            Some(Affine {
                out_dim: indices.len(),
                in_dim: x.in_dim,
                a,
                b,
            })
        }
        // `transpose` only ever needs to preserve KNOWNness (every caller of this
        // classifier already special-cases fully-observed nodes before reaching here);
        // a transpose of something genuinely linear in the target has no meaning as a
        // vector-affine value, so it is treated conservatively as OTHER.
        _ => None,
    }
}
