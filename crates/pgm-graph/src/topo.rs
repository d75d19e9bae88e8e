use std::cmp::Reverse;
use std::collections::BinaryHeap;

use pgm_error::{Result, pgm_bail};
use pgm_utils::{Arena, ArenaKey};

use crate::node::Node;

/// Kahn's algorithm over the parent edges stored on each node. Ties (multiple nodes
/// simultaneously ready) are broken by ascending node id, which is insertion order — so two
/// compilations of the same model produce byte-identical schedules.
pub fn topological_order(nodes: &Arena<Node>) -> Result<Vec<ArenaKey>> {
    let n = nodes.len();
    let all_keys: Vec<ArenaKey> = nodes.keys().collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree: Vec<usize> = vec![0; n];
    for (id, node) in nodes.iter() {
        indegree[id.index()] = node.parents.len();
        for parent in &node.parents {
            children[parent.index()].push(id.index());
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = indegree
        .iter()
        .enumerate()
        .filter(|&(_, &deg)| deg == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        order.push(all_keys[i]);
        for &child in &children[i] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                ready.push(Reverse(child));
            }
        }
    }

    if order.len() != n {
        pgm_bail!(ModelInvalid: "graph contains a cycle");
    }
    Ok(order)
}
