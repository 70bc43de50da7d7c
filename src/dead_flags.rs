//! Shared dead-flag computation used by both change-of-dimension routines
//! (§4.4, §4.5). A node is "dead" once every one of its parents is dead —
//! the conservative, AND-shaped counterpart to the single-witness-suffices
//! `v=1` propagation, avoiding over-claiming deadness through a path that
//! happens to be dead while a sibling path is still alive.

use std::collections::{HashSet, VecDeque};

use crate::tfg::{NodeId, Tfg};

/// Compute `node.dead` and `node.propagated` for every node, topologically
/// (parents before children). `extra_dead_seeds` are nodes treated as
/// dead regardless of their own parents — e.g. places of R whose reduced
/// diagonal value is already known to be `0`. Returns the topological
/// order used, for reuse by the independence closure.
pub fn compute_dead_flags(tfg: &mut Tfg, extra_dead_seeds: &[NodeId]) -> Vec<NodeId> {
    let n = tfg.len();
    let seeds: HashSet<NodeId> = extra_dead_seeds.iter().copied().collect();
    let mut remaining_parents: Vec<usize> = (0..n).map(|i| tfg.node(i).parents.len()).collect();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut order = Vec::with_capacity(n);

    for (i, count) in remaining_parents.iter().enumerate() {
        if *count == 0 {
            queue.push_back(i);
        }
    }

    while let Some(node_id) = queue.pop_front() {
        order.push(node_id);
        let dead = if node_id == tfg.dead_root() || seeds.contains(&node_id) {
            true
        } else {
            let parents = &tfg.node(node_id).parents;
            !parents.is_empty() && parents.iter().all(|p| tfg.node(*p).dead)
        };
        tfg.node_mut(node_id).dead = dead;
        tfg.node_mut(node_id).propagated = true;

        let children: Vec<NodeId> = tfg
            .node(node_id)
            .agglomerated
            .iter()
            .chain(tfg.node(node_id).redundant.iter())
            .copied()
            .collect();
        for child in children {
            remaining_parents[child] -= 1;
            if remaining_parents[child] == 0 {
                queue.push_back(child);
            }
        }
    }
    order
}
