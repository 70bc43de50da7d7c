//! Dead-places change-of-dimension: the lazy, diagonal-only variant of
//! §4.4. The output vector uses the opposite polarity of the concurrency
//! matrix diagonal — `1` means dead, `0` means alive — per `spec.md` §3.

use crate::concurrency::merge;
use crate::dead_flags::compute_dead_flags;
use crate::error::Result;
use crate::matrix::Cell;
use crate::tfg::{NodeId, Tfg};

/// One suspended call to `propagate_alive`, parked on an explicit work
/// stack so the traversal survives DAGs many thousands of nodes deep
/// (§5, §9) instead of recursing over the native call stack.
struct Frame {
    node_id: NodeId,
    children: Vec<NodeId>,
    idx: usize,
    successors: Vec<NodeId>,
}

fn start_node(tfg: &mut Tfg, vector: &mut [Cell], node_id: NodeId, stack: &mut Vec<Frame>) -> Option<Vec<NodeId>> {
    if let Some(cached) = tfg.node(node_id).successors.clone() {
        for &s in &cached {
            let idx = tfg.node(s).n_index().expect("cached successors are places of N");
            vector[idx] = merge(vector[idx], Cell::Zero);
        }
        return Some(cached);
    }

    let mut successors = Vec::new();
    if let Some(idx) = tfg.node(node_id).n_index() {
        vector[idx] = merge(vector[idx], Cell::Zero);
        successors.push(node_id);
    }

    let children: Vec<NodeId> = tfg
        .node(node_id)
        .agglomerated
        .iter()
        .chain(tfg.node(node_id).redundant.iter())
        .copied()
        .collect();
    stack.push(Frame {
        node_id,
        children,
        idx: 0,
        successors,
    });
    None
}

/// Propagate "alive" (`v = 0`, the sticky single-witness-suffices value
/// in this polarity) down the subtree rooted at `node`, writing into
/// `vector`. No cross-products are needed for the dead-places variant.
fn propagate_alive(tfg: &mut Tfg, vector: &mut [Cell], root: NodeId, memoize: bool) -> Vec<NodeId> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut carry = start_node(tfg, vector, root, &mut stack);

    while !stack.is_empty() {
        let last = stack.len() - 1;
        if let Some(child_result) = carry.take() {
            stack[last].successors.extend(child_result);
        }
        if stack[last].idx < stack[last].children.len() {
            let child = stack[last].children[stack[last].idx];
            stack[last].idx += 1;
            carry = start_node(tfg, vector, child, &mut stack);
            continue;
        }
        let finished = stack.pop().expect("frame just matched on");
        if memoize {
            tfg.node_mut(finished.node_id).successors = Some(finished.successors.clone());
        }
        carry = Some(finished.successors);
    }

    carry.unwrap_or_default()
}

/// Compute the dead-places vector of N from the dead-places vector of R,
/// per §4.5. `reduced` is indexed in the order of R's places; `1` denotes
/// dead. `reduced_complete` reflects whether the oracle's output on R
/// contained any `.`.
pub fn dead_places_vector(tfg: &mut Tfg, reduced: &[Cell], reduced_complete: bool) -> Result<(Vec<Cell>, bool)> {
    let n = tfg.n_places().len();
    let partial = !reduced_complete;
    let mut vector = vec![if partial { Cell::Unknown } else { Cell::One }; n];

    // "dead" (v=1) seeds: the global dead root, plus any place of R whose
    // reduced value is already known dead.
    if partial {
        let mut dead_seeds = Vec::new();
        for (i, &cell) in reduced.iter().enumerate() {
            if cell == Cell::One {
                dead_seeds.push(tfg.r_place_node(i)?);
            }
        }
        compute_dead_flags(tfg, &dead_seeds);
        for idx in 0..n {
            let node = tfg.n_place_node(idx);
            if tfg.node(node).dead {
                vector[idx] = merge(vector[idx], Cell::One);
            }
        }
    }

    for &root in tfg.non_dead_roots().to_vec().iter() {
        propagate_alive(tfg, &mut vector, root, true);
    }

    // A dead (v=1) root must never be pushed through `propagate_alive`:
    // that routine asserts alive unconditionally, but a descendant of a
    // dead place can still have another, not-yet-confirmed-dead parent
    // (e.g. a shortcut child). Deadness only ever follows from the
    // AND-shaped `compute_dead_flags` pass above; only v=0 (alive) is
    // safe to push down here.
    for (i, &cell) in reduced.iter().enumerate() {
        let r_i = tfg.r_place_node(i)?;
        if cell == Cell::Zero {
            propagate_alive(tfg, &mut vector, r_i, true);
        }
    }

    let complete = !vector.iter().any(|c| *c == Cell::Unknown);
    Ok((vector, complete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::parse_equations;
    use crate::tfg::Tfg;

    fn places(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identity_reduction_lifts_unchanged() {
        let mut tfg = Tfg::build(&[], &places(&["p", "q"]), &places(&["p", "q"])).unwrap();
        let reduced = vec![Cell::Zero, Cell::One];
        let (v, complete) = dead_places_vector(&mut tfg, &reduced, true).unwrap();
        assert!(complete);
        assert_eq!(v, reduced);
    }

    #[test]
    fn single_redundancy_marks_both_alive() {
        let eqs = parse_equations("# generated equations\nR |- p = q\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["p", "q", "r"]), &places(&["q", "r"])).unwrap();
        let reduced = vec![Cell::Zero, Cell::One]; // q alive, r dead
        let (v, complete) = dead_places_vector(&mut tfg, &reduced, true).unwrap();
        assert!(complete);
        let p = tfg.n_places().iter().position(|x| x == "p").unwrap();
        let q = tfg.n_places().iter().position(|x| x == "q").unwrap();
        let r = tfg.n_places().iter().position(|x| x == "r").unwrap();
        assert_eq!(v[p], Cell::Zero);
        assert_eq!(v[q], Cell::Zero);
        assert_eq!(v[r], Cell::One);
    }

    #[test]
    fn shortcut_child_with_one_dead_and_one_unknown_parent_stays_unknown() {
        // p = q + r; q is confirmed dead, r is still unknown (partial
        // oracle). p must not be asserted alive just because q's dead
        // diagonal got pushed through propagation.
        let eqs = parse_equations("# generated equations\nR |- p = q + r\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["p", "q", "r"]), &places(&["q", "r"])).unwrap();
        let reduced = vec![Cell::One, Cell::Unknown]; // q dead, r unknown
        let (v, complete) = dead_places_vector(&mut tfg, &reduced, false).unwrap();
        assert!(!complete);
        let p = tfg.n_places().iter().position(|x| x == "p").unwrap();
        let q = tfg.n_places().iter().position(|x| x == "q").unwrap();
        let r = tfg.n_places().iter().position(|x| x == "r").unwrap();
        assert_eq!(v[p], Cell::Unknown);
        assert_eq!(v[q], Cell::One);
        assert_eq!(v[r], Cell::Unknown);
    }

    #[test]
    fn diagonal_consistency_with_concurrency_matrix() {
        use crate::concurrency::concurrency_matrix;
        let eqs = parse_equations("# generated equations\nA |- a = p + q\n\n").unwrap();
        let mut tfg_c = Tfg::build(&eqs, &places(&["p", "q"]), &places(&["a"])).unwrap();
        let mut tfg_d = Tfg::build(&eqs, &places(&["p", "q"]), &places(&["a"])).unwrap();
        let reduced_matrix = vec![vec![Cell::One]];
        let reduced_vector = vec![Cell::Zero];
        let (m, _) = concurrency_matrix(&mut tfg_c, &reduced_matrix, true).unwrap();
        let (d, _) = dead_places_vector(&mut tfg_d, &reduced_vector, true).unwrap();
        for i in 0..2 {
            assert_eq!(m[i][i] == Cell::One, d[i] == Cell::Zero);
        }
    }
}
