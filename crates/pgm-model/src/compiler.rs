use std::collections::HashMap;

use pgm_error::{Result, ensure, pgm_bail};
use pgm_graph::Graph;
use pgm_registry::Registry;
use pgm_utils::ArenaKey;

use crate::ast::{Expr, IndexExpr, Model, Stmt, Target};
use crate::data::ModelData;

/// The compiled graph plus, for every declared name, the node ids that name produced in
/// declaration order (position `p` lives at index `p - 1`) — this is what a
/// [pgm_monitor::NodeArray] is built from.
pub struct Compiled {
    pub graph: Graph,
    pub arrays: HashMap<String, Vec<ArenaKey>>,
}

struct Env<'a> {
    registry: &'a Registry,
    data: &'a HashMap<String, ModelData>,
    arrays: HashMap<String, Vec<ArenaKey>>,
    const_cache: HashMap<u64, ArenaKey>,
    loop_stack: Vec<i64>,
}

impl<'a> Env<'a> {
    fn resolve_position(&self, index: &Option<IndexExpr>) -> Result<usize> {
        match index {
            None => Ok(1),
            Some(IndexExpr::LoopVar) => self.innermost(),
            Some(IndexExpr::LoopVarOffset(off)) => {
                let i = self.innermost()?;
                let p = i as i64 + off;
                ensure!(p >= 1, ModelInvalid: "index {} out of range (loop offset {})", p, off);
                Ok(p as usize)
            }
            Some(IndexExpr::Literal(p)) => Ok(*p),
        }
    }

    fn innermost(&self) -> Result<usize> {
        let v = *self
            .loop_stack
            .last()
            .ok_or_else(|| pgm_error::pgm_err!(ModelInvalid: "loop-relative index used outside any for-loop"))?;
        ensure!(v >= 1, ModelInvalid: "loop counter {} is not a valid 1-based index", v);
        Ok(v as usize)
    }

    fn lookup(&self, name: &str, position: usize) -> Result<ArenaKey> {
        let nodes = self
            .arrays
            .get(name)
            .ok_or_else(|| pgm_error::pgm_err!(ModelInvalid: "undefined variable '{}'", name))?;
        nodes
            .get(position - 1)
            .copied()
            .ok_or_else(|| pgm_error::pgm_err!(ModelInvalid: "'{}' has no element at position {}", name, position))
    }

    fn resolve_target(&self, target: &Target) -> Result<ArenaKey> {
        let position = self.resolve_position(&target.index)?;
        self.lookup(&target.name, position)
    }

    fn resolve_expr(&mut self, graph: &mut Graph, expr: &Expr) -> Result<ArenaKey> {
        match expr {
            Expr::Const(v) => self.const_node(graph, *v),
            Expr::Ref(target) => self.resolve_target(target),
        }
    }

    fn const_node(&mut self, graph: &mut Graph, v: f64) -> Result<ArenaKey> {
        let bits = v.to_bits();
        if let Some(&id) = self.const_cache.get(&bits) {
            return Ok(id);
        }
        let id = graph.add_constant(vec![1], vec![v])?;
        self.const_cache.insert(bits, id);
        Ok(id)
    }
}

/// Compiles a [Model] against a distribution/function `registry` and observed `data` into a
/// [Graph] plus its named node arrays (§6, §9 "global distribution/function tables": the
/// catalog is passed in explicitly, never reached for globally).
pub fn compile(model: &Model, registry: &Registry, data: &HashMap<String, ModelData>) -> Result<Compiled> {
    let mut graph = Graph::new();
    let mut env = Env {
        registry,
        data,
        arrays: HashMap::new(),
        const_cache: HashMap::new(),
        loop_stack: Vec::new(),
    };

    for stmt in &model.statements {
        exec_stmt(&mut graph, &mut env, stmt)?;
    }

    graph.build()?;
    Ok(Compiled { graph, arrays: env.arrays })
}

fn exec_stmt(graph: &mut Graph, env: &mut Env, stmt: &Stmt) -> Result<()> {
    match stmt {
        Stmt::Logical { target, function, args } => {
            let parents = args.iter().map(|a| env.resolve_expr(graph, a)).collect::<Result<Vec<_>>>()?;
            let function = env.registry.require_function(function)?;
            let id = graph.add_logical(function, parents)?;
            let position = env.resolve_position(&target.index)?;
            place(env, &target.name, position, id)
        }
        Stmt::Stochastic { target, distribution, args, truncation } => {
            let parents = args.iter().map(|a| env.resolve_expr(graph, a)).collect::<Result<Vec<_>>>()?;
            let prior = env.registry.require_distribution(distribution)?;
            let bounds = match truncation {
                Some((lo, hi)) => {
                    let lo_id = env.resolve_expr(graph, lo)?;
                    let hi_id = env.resolve_expr(graph, hi)?;
                    (Some(lo_id), Some(hi_id))
                }
                None => (None, None),
            };

            let position = env.resolve_position(&target.index)?;
            let observation = env.data.get(&target.name).and_then(|d| d.element(position));
            let observed = observation.is_some();

            let id = graph.add_stochastic(prior, parents, observed, bounds.0, bounds.1)?;
            if let Some(values) = observation {
                graph.set_observation(id, values.to_vec())?;
            }
            place(env, &target.name, position, id)
        }
        Stmt::For { var: _, lo, hi, body } => {
            if lo > hi {
                pgm_bail!(ModelInvalid: "for-loop bounds [{}, {}] are inverted", lo, hi);
            }
            for i in *lo..=*hi {
                env.loop_stack.push(i);
                for inner in body {
                    exec_stmt(graph, env, inner)?;
                }
                env.loop_stack.pop();
            }
            Ok(())
        }
    }
}

/// Records `id` as variable `name`'s element at 1-based `position`. Every statement in this
/// language targets positions in increasing order (a bare scalar is always position 1; a
/// `for`-loop body runs `lo..=hi` in order), so a new name's elements always arrive
/// sequentially; an out-of-order position would mean a malformed model.
fn place(env: &mut Env, name: &str, position: usize, id: ArenaKey) -> Result<()> {
    let entry = env.arrays.entry(name.to_string()).or_default();
    if position == entry.len() + 1 {
        entry.push(id);
    } else if position <= entry.len() {
        entry[position - 1] = id;
    } else {
        pgm_bail!(ModelInvalid: "'{}' element {} assigned before element {}", name, position, entry.len() + 1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::load_base_module()
    }

    #[test]
    fn scalar_chain_compiles_and_builds() {
        let model = Model {
            statements: vec![
                Stmt::Stochastic {
                    target: Target::scalar("mu"),
                    distribution: "dnorm".into(),
                    args: vec![Expr::Const(0.0), Expr::Const(1.0)],
                    truncation: None,
                },
                Stmt::Stochastic {
                    target: Target::scalar("y"),
                    distribution: "dnorm".into(),
                    args: vec![Expr::var("mu"), Expr::Const(1.0)],
                    truncation: None,
                },
            ],
        };
        let mut data = HashMap::new();
        data.insert("y".to_string(), ModelData::new("y", vec![1], vec![0.2]));
        let registry = registry();
        let compiled = compile(&model, &registry, &data).unwrap();
        assert!(compiled.graph.is_built());
        assert_eq!(compiled.arrays["mu"].len(), 1);
        assert_eq!(compiled.arrays["y"].len(), 1);
    }

    #[test]
    fn hmm_for_loop_wires_each_state_to_its_predecessor() {
        let t = 5;
        let model = Model {
            statements: vec![
                Stmt::Stochastic {
                    target: Target::indexed("x", IndexExpr::Literal(1)),
                    distribution: "dnorm".into(),
                    args: vec![Expr::Const(0.0), Expr::Const(1.0)],
                    truncation: None,
                },
                Stmt::For {
                    var: "t".into(),
                    lo: 2,
                    hi: t,
                    body: vec![Stmt::Stochastic {
                        target: Target::indexed("x", IndexExpr::LoopVar),
                        distribution: "dnorm".into(),
                        args: vec![Expr::indexed("x", IndexExpr::LoopVarOffset(-1)), Expr::Const(1.0)],
                        truncation: None,
                    }],
                },
            ],
        };
        let registry = registry();
        let data = HashMap::new();
        let compiled = compile(&model, &registry, &data).unwrap();
        assert_eq!(compiled.arrays["x"].len(), 5);
        assert!(compiled.graph.is_built());
    }

    #[test]
    fn undefined_variable_reference_is_rejected() {
        let model = Model {
            statements: vec![Stmt::Stochastic {
                target: Target::scalar("y"),
                distribution: "dnorm".into(),
                args: vec![Expr::var("nope"), Expr::Const(1.0)],
                truncation: None,
            }],
        };
        let registry = registry();
        let data = HashMap::new();
        assert!(compile(&model, &registry, &data).is_err());
    }

    #[test]
    fn missing_observation_leaves_the_node_latent() {
        let model = Model {
            statements: vec![Stmt::Stochastic {
                target: Target::scalar("p"),
                distribution: "dbeta".into(),
                args: vec![Expr::Const(1.0), Expr::Const(1.0)],
                truncation: None,
            }],
        };
        let registry = registry();
        let data = HashMap::new();
        let compiled = compile(&model, &registry, &data).unwrap();
        let id = compiled.arrays["p"][0];
        assert!(!compiled.graph.node(id).unwrap().is_observed());
    }

    proptest::proptest! {
        /// `place()` never silently backfills: any position other than the next append or an
        /// existing in-range overwrite is rejected, regardless of how far out of order it is.
        #[test]
        fn place_rejects_every_out_of_order_position(gap in 2usize..10) {
            let registry = registry();
            let data = HashMap::new();
            let mut env = Env {
                registry: &registry,
                data: &data,
                arrays: HashMap::new(),
                const_cache: HashMap::new(),
                loop_stack: Vec::new(),
            };
            let mut graph = Graph::new();
            let first = graph.add_constant(vec![1], vec![0.0]).unwrap();
            place(&mut env, "x", 1, first).unwrap();

            let skipped = graph.add_constant(vec![1], vec![1.0]).unwrap();
            proptest::prop_assert!(place(&mut env, "x", 1 + gap, skipped).is_err());
        }
    }
}
