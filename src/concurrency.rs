//! Concurrency change-of-dimension: lifts a concurrency matrix computed
//! on the reduced net R back onto N via the Token Flow Graph.

use std::collections::HashSet;

use crate::dead_flags::compute_dead_flags;
use crate::error::Result;
use crate::matrix::{Cell, HalfMatrix};
use crate::tfg::{NodeId, Tfg};

fn init_matrix(n: usize, partial: bool) -> HalfMatrix {
    let fill = if partial { Cell::Unknown } else { Cell::Zero };
    (0..n).map(|i| vec![fill; i + 1]).collect()
}

/// Merge an incoming cell value with precedence `1 > 0 > .`: a `1` is
/// final and sticky, a `0` may still be beaten by a later `1`.
pub(crate) fn merge(current: Cell, incoming: Cell) -> Cell {
    match (current, incoming) {
        (Cell::One, _) | (_, Cell::One) => Cell::One,
        (Cell::Zero, _) | (_, Cell::Zero) => Cell::Zero,
        _ => Cell::Unknown,
    }
}

fn write_cell(m: &mut HalfMatrix, a: usize, b: usize, v: Cell) {
    let (row, col) = if a >= b { (a, b) } else { (b, a) };
    m[row][col] = merge(m[row][col], v);
}

fn product(tfg: &Tfg, m: &mut HalfMatrix, a: &[NodeId], b: &[NodeId]) {
    for &x in a {
        let xi = tfg.node(x).n_index().expect("successors are places of N");
        for &y in b {
            let yi = tfg.node(y).n_index().expect("successors are places of N");
            write_cell(m, xi, yi, Cell::One);
        }
    }
}

fn mark_independent(tfg: &mut Tfg, a: NodeId, b: NodeId) {
    tfg.node_mut(a).independent.insert(b);
    tfg.node_mut(b).independent.insert(a);
}

enum Phase {
    Agglomerated,
    Redundant,
}

/// One suspended call to `propagate`, parked on an explicit work stack so
/// the traversal survives DAGs many thousands of nodes deep (§5, §9).
struct Frame {
    node_id: NodeId,
    agglomerated: Vec<NodeId>,
    redundant: Vec<NodeId>,
    idx: usize,
    phase: Phase,
    successors: Vec<NodeId>,
}

/// Enter `node_id`: either resolve instantly from the memoised cache, or
/// write its own diagonal cell and push a fresh frame to process its
/// children. Returns `Some(successors)` only on the cache-hit path.
fn start_node(tfg: &mut Tfg, m: &mut HalfMatrix, v: Cell, node_id: NodeId, stack: &mut Vec<Frame>) -> Option<Vec<NodeId>> {
    let effective_v = if v == Cell::Zero && !tfg.node(node_id).dead {
        Cell::Unknown
    } else {
        v
    };

    if let Some(cached) = tfg.node(node_id).successors.clone() {
        for &s in &cached {
            let idx = tfg.node(s).n_index().expect("cached successors are places of N");
            write_cell(m, idx, idx, effective_v);
        }
        return Some(cached);
    }

    let mut successors = Vec::new();
    if let Some(idx) = tfg.node(node_id).n_index() {
        write_cell(m, idx, idx, effective_v);
        successors.push(node_id);
    }

    let agglomerated = tfg.node(node_id).agglomerated.clone();
    let redundant = tfg.node(node_id).redundant.clone();
    stack.push(Frame {
        node_id,
        agglomerated,
        redundant,
        idx: 0,
        phase: Phase::Agglomerated,
        successors,
    });
    None
}

/// `propagate(node, v, memoize)` from §4.4: sets semantic value `v` along
/// the subtree rooted at `node`, returning the non-additional (place of
/// N) successors visited. A `v = 0` request is degraded to `.` unless the
/// node's precomputed `dead` flag says every parent is dead (the partial
/// mode refinement); `v = 1` is the only value that triggers the
/// cartesian-product side effect on redundant children. Iterative, with
/// an explicit work stack standing in for the call stack of the natural
/// recursive formulation.
fn propagate(tfg: &mut Tfg, m: &mut HalfMatrix, root: NodeId, v: Cell, memoize: bool) -> Vec<NodeId> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut carry = start_node(tfg, m, v, root, &mut stack);

    while !stack.is_empty() {
        let last = stack.len() - 1;
        match stack[last].phase {
            Phase::Agglomerated => {
                if let Some(child_result) = carry.take() {
                    stack[last].successors.extend(child_result);
                }
                if stack[last].idx < stack[last].agglomerated.len() {
                    let child = stack[last].agglomerated[stack[last].idx];
                    stack[last].idx += 1;
                    carry = start_node(tfg, m, v, child, &mut stack);
                    continue;
                }
                let siblings = stack[last].agglomerated.clone();
                for i in 0..siblings.len() {
                    for j in (i + 1)..siblings.len() {
                        mark_independent(tfg, siblings[i], siblings[j]);
                    }
                }
                stack[last].phase = Phase::Redundant;
                stack[last].idx = 0;
            }
            Phase::Redundant => {
                if let Some(child_result) = carry.take() {
                    if v == Cell::One {
                        product(tfg, m, &child_result, &stack[last].successors);
                    }
                    stack[last].successors.extend(child_result);
                }
                if stack[last].idx < stack[last].redundant.len() {
                    let child = stack[last].redundant[stack[last].idx];
                    stack[last].idx += 1;
                    carry = start_node(tfg, m, v, child, &mut stack);
                    continue;
                }
                let finished = stack.pop().expect("frame just matched on");
                if memoize {
                    tfg.node_mut(finished.node_id).successors = Some(finished.successors.clone());
                }
                carry = Some(finished.successors);
            }
        }
    }

    carry.unwrap_or_default()
}

fn independence_closure(tfg: &mut Tfg, order: &[NodeId], m: &mut HalfMatrix) {
    for &node_id in order {
        let non_dead_parents: Vec<NodeId> = tfg
            .node(node_id)
            .parents
            .iter()
            .filter(|&&p| !tfg.node(p).dead)
            .copied()
            .collect();
        if non_dead_parents.is_empty() {
            continue;
        }
        let mut intersection: Option<HashSet<NodeId>> = None;
        for &p in &non_dead_parents {
            let set = tfg.node(p).independent.clone();
            intersection = Some(match intersection {
                None => set,
                Some(acc) => acc.intersection(&set).copied().collect(),
            });
        }
        if let Some(inter) = intersection {
            tfg.node_mut(node_id).independent.extend(inter);
        }
    }

    for node_id in 0..tfg.len() {
        let Some(a) = tfg.node(node_id).n_index() else {
            continue;
        };
        let targets: Vec<NodeId> = tfg.node(node_id).independent.iter().copied().collect();
        for target in targets {
            if let Some(b) = tfg.node(target).n_index() {
                write_cell(m, a, b, Cell::Zero);
            }
        }
    }
}

fn dead_column_pass(m: &mut HalfMatrix) {
    let n = m.len();
    for i in 0..n {
        if m[i][i] == Cell::Zero {
            for j in 0..=i {
                write_cell(m, i, j, Cell::Zero);
            }
            for k in (i + 1)..n {
                write_cell(m, k, i, Cell::Zero);
            }
        }
    }
}

/// Lift a concurrency matrix computed on R to one on N, per the §4.4
/// driver sequence. `reduced_complete` reflects whether the oracle's
/// output on R contained any `.`.
pub fn concurrency_matrix(
    tfg: &mut Tfg,
    reduced: &HalfMatrix,
    reduced_complete: bool,
) -> Result<(HalfMatrix, bool)> {
    let n = tfg.n_places().len();
    let partial = !reduced_complete;
    let mut m = init_matrix(n, partial);

    let dead_order = if partial {
        let mut dead_seeds = Vec::new();
        for i in 0..reduced.len() {
            if reduced[i][i] == Cell::Zero {
                dead_seeds.push(tfg.r_place_node(i)?);
            }
        }
        compute_dead_flags(tfg, &dead_seeds)
    } else {
        Vec::new()
    };

    // Step 1: every non-dead root is alive.
    let non_dead_roots = tfg.non_dead_roots().to_vec();
    let mut root_successors = Vec::with_capacity(non_dead_roots.len());
    for &root in &non_dead_roots {
        root_successors.push(propagate(tfg, &mut m, root, Cell::One, true));
    }

    // Step 2: the dead root, partial mode only.
    if partial {
        propagate(tfg, &mut m, tfg.dead_root(), Cell::Zero, true);
    }

    // Step 3: each row of the reduced matrix.
    let mut reduced_successors = Vec::with_capacity(reduced.len());
    for i in 0..reduced.len() {
        let r_i = tfg.r_place_node(i)?;
        let diag = reduced[i][i];
        let succ = if diag == Cell::One {
            propagate(tfg, &mut m, r_i, Cell::One, true)
        } else if partial {
            propagate(tfg, &mut m, r_i, diag, true)
        } else {
            Vec::new()
        };
        for root_succ in &root_successors {
            product(tfg, &mut m, root_succ, &succ);
        }
        reduced_successors.push(succ);
    }

    // Step 4: every unordered pair of non-dead roots.
    for a in 0..root_successors.len() {
        for b in (a + 1)..root_successors.len() {
            let (left, right) = (root_successors[a].clone(), root_successors[b].clone());
            product(tfg, &mut m, &left, &right);
        }
    }

    // Step 5: pairwise relations among R's places.
    for i in 0..reduced.len() {
        for j in 0..i {
            match reduced[i][j] {
                Cell::One => {
                    let (left, right) = (reduced_successors[i].clone(), reduced_successors[j].clone());
                    product(tfg, &mut m, &left, &right);
                }
                Cell::Zero if partial => {
                    let r_i = tfg.r_place_node(i)?;
                    let r_j = tfg.r_place_node(j)?;
                    mark_independent(tfg, r_i, r_j);
                }
                _ => {}
            }
        }
    }

    if partial {
        independence_closure(tfg, &dead_order, &mut m);
        dead_column_pass(&mut m);
    }

    let complete = !m.iter().flatten().any(|c| *c == Cell::Unknown);
    Ok((m, complete))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::parse_equations;
    use crate::tfg::Tfg;

    fn places(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn half(rows: &[&[u8]]) -> HalfMatrix {
        rows.iter()
            .map(|row| {
                row.iter()
                    .map(|&b| match b {
                        0 => Cell::Zero,
                        1 => Cell::One,
                        _ => Cell::Unknown,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn identity_reduction_lifts_unchanged() {
        let mut tfg = Tfg::build(&[], &places(&["p", "q"]), &places(&["p", "q"])).unwrap();
        let reduced = half(&[&[1], &[1, 1]]);
        let (m, complete) = concurrency_matrix(&mut tfg, &reduced, true).unwrap();
        assert!(complete);
        assert_eq!(m, reduced);
    }

    #[test]
    fn single_redundancy_lifts_diagonal_and_pair() {
        let eqs = parse_equations("# generated equations\nR |- p = q\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["p", "q", "r"]), &places(&["q", "r"])).unwrap();
        let reduced = half(&[&[1], &[1, 1]]);
        let (m, complete) = concurrency_matrix(&mut tfg, &reduced, true).unwrap();
        assert!(complete);
        let p = tfg.n_places().iter().position(|x| x == "p").unwrap();
        let q = tfg.n_places().iter().position(|x| x == "q").unwrap();
        let r = tfg.n_places().iter().position(|x| x == "r").unwrap();
        assert_eq!(m[p][p], Cell::One);
        assert_eq!(m[q][q], Cell::One);
        assert_eq!(m[r][r], Cell::One);
        let (hi, lo) = if p > q { (p, q) } else { (q, p) };
        assert_eq!(m[hi][lo], Cell::One);
    }

    #[test]
    fn agglomeration_makes_siblings_independent() {
        let eqs = parse_equations("# generated equations\nA |- a = p + q\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["p", "q"]), &places(&["a"])).unwrap();
        let reduced = half(&[&[1]]);
        let (m, _) = concurrency_matrix(&mut tfg, &reduced, true).unwrap();
        let p = tfg.n_places().iter().position(|x| x == "p").unwrap();
        let q = tfg.n_places().iter().position(|x| x == "q").unwrap();
        assert_eq!(m[p][p], Cell::One);
        assert_eq!(m[q][q], Cell::One);
        let (hi, lo) = if p > q { (p, q) } else { (q, p) };
        assert_eq!(m[hi][lo], Cell::Zero);
    }

    #[test]
    fn shortcut_co_reaches_both_parents_but_they_stay_independent() {
        let eqs = parse_equations("# generated equations\nR |- p = q + r\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["p", "q", "r"]), &places(&["q", "r"])).unwrap();
        let reduced = half(&[&[1], &[0, 1]]);
        let (m, complete) = concurrency_matrix(&mut tfg, &reduced, true).unwrap();
        assert!(complete);
        let p = tfg.n_places().iter().position(|x| x == "p").unwrap();
        let q = tfg.n_places().iter().position(|x| x == "q").unwrap();
        let r = tfg.n_places().iter().position(|x| x == "r").unwrap();
        let cell = |a: usize, b: usize| if a >= b { m[a][b] } else { m[b][a] };
        assert_eq!(cell(p, p), Cell::One);
        assert_eq!(cell(q, q), Cell::One);
        assert_eq!(cell(r, r), Cell::One);
        assert_eq!(cell(p, q), Cell::One);
        assert_eq!(cell(p, r), Cell::One);
        assert_eq!(cell(q, r), Cell::Zero);
    }

    #[test]
    fn constant_non_dead_roots_are_pairwise_concurrent() {
        let eqs = parse_equations("# generated equations\nR |- a = 2\nR |- b = 2\n\n").unwrap();
        let mut tfg = Tfg::build(&eqs, &places(&["a", "b"]), &places(&["a", "b"])).unwrap();
        let reduced = half(&[&[1], &[1, 1]]);
        let (m, _) = concurrency_matrix(&mut tfg, &reduced, true).unwrap();
        let a = tfg.n_places().iter().position(|x| x == "a").unwrap();
        let b = tfg.n_places().iter().position(|x| x == "b").unwrap();
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        assert_eq!(m[hi][lo], Cell::One);
    }

    #[test]
    fn partial_oracle_never_invents_a_one() {
        let mut tfg = Tfg::build(&[], &places(&["p", "q"]), &places(&["p", "q"])).unwrap();
        let reduced = half(&[&[2], &[2, 2]]); // every cell unknown
        let (m, complete) = concurrency_matrix(&mut tfg, &reduced, false).unwrap();
        assert!(!complete);
        for row in &m {
            assert!(row.iter().all(|c| *c != Cell::One));
        }
    }
}
