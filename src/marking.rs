//! Marking projection (§4.6): projects a target marking of N onto R, or
//! proves unreachability directly from the reduction equations, without
//! ever consulting the reachability checker.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::tfg::{NodeId, NodeKind, Tfg};

/// A marking: place name to token count. `BTreeMap` gives deterministic
/// iteration order for display and tests.
pub type Marking = BTreeMap<String, u64>;

/// The result of projecting a target marking of N onto R.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectionOutcome {
    /// A non-trivial target marking on R was derived; the oracle should
    /// still be asked whether it is reachable in R.
    Reachable(Marking),
    /// Every projected target is `0`; reachability holds without asking
    /// the oracle (the all-zero marking is always reachable).
    TriviallyReachable,
    /// The equations alone prove `m` cannot be reached.
    Unreachable,
}

/// Bottom-up post-order visit of `root`'s subtree (agglomerated ∪
/// redundant children), using an explicit work stack to tolerate DAGs
/// many thousands of nodes deep. Returns `false` the moment a
/// well-definedness check fails (a proof of unreachability).
fn bottom_up(tfg: &mut Tfg, phi: &mut [u64], root: NodeId) -> bool {
    let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];

    while let Some(&(node_id, cursor)) = stack.last() {
        if tfg.node(node_id).propagated {
            stack.pop();
            continue;
        }

        let children: Vec<NodeId> = tfg
            .node(node_id)
            .agglomerated
            .iter()
            .chain(tfg.node(node_id).redundant.iter())
            .copied()
            .collect();

        if cursor < children.len() {
            let last = stack.len() - 1;
            stack[last].1 += 1;
            let child = children[cursor];
            if !tfg.node(child).propagated {
                stack.push((child, 0));
            }
            continue;
        }

        stack.pop();

        if !tfg.node(node_id).agglomerated.is_empty() {
            let sum: u64 = tfg.node(node_id).agglomerated.iter().map(|&c| phi[c]).sum();
            phi[node_id] = sum;
        }
        tfg.node_mut(node_id).propagated = true;

        let redundant_children = tfg.node(node_id).redundant.clone();
        for child in redundant_children {
            let parents = tfg.node(child).parents.clone();
            if parents.iter().all(|&p| tfg.node(p).propagated) {
                let sum: u64 = parents.iter().map(|&p| phi[p]).sum();
                let has_interval_parent = parents.iter().any(|&p| tfg.node(p).interval);
                let well_defined = if has_interval_parent {
                    sum >= phi[child]
                } else {
                    sum == phi[child]
                };
                if !well_defined {
                    return false;
                }
            }
        }
    }
    true
}

/// Project `target` (a marking of N) onto R.
pub fn marking_projection(tfg: &mut Tfg, target: &Marking) -> Result<ProjectionOutcome> {
    let mut phi = vec![0u64; tfg.len()];

    for idx in 0..tfg.n_places().len() {
        let node = tfg.n_place_node(idx);
        let name = &tfg.n_places()[idx];
        phi[node] = target.get(name).copied().unwrap_or(0);
    }
    for &root in tfg.non_dead_roots() {
        if let NodeKind::NonDeadRoot { k, .. } = tfg.node(root).kind {
            phi[root] = k;
        }
    }

    let mut roots: Vec<NodeId> = Vec::new();
    for name in tfg.r_places().to_vec() {
        roots.push(
            tfg.place_node(&name)
                .expect("every place of R was materialised as a node"),
        );
    }
    roots.push(tfg.dead_root());
    roots.extend(tfg.non_dead_roots().iter().copied());

    for root in roots {
        if !bottom_up(tfg, &mut phi, root) {
            return Ok(ProjectionOutcome::Unreachable);
        }
    }

    let mut projected = Marking::new();
    for name in tfg.r_places().to_vec() {
        let node = tfg.place_node(&name).expect("place of R has a node");
        projected.insert(name, phi[node]);
    }

    if projected.values().all(|&v| v == 0) {
        Ok(ProjectionOutcome::TriviallyReachable)
    } else {
        Ok(ProjectionOutcome::Reachable(projected))
    }
}
