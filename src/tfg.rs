//! Token Flow Graph construction.
//!
//! The TFG is a DAG over three kinds of variables — places of N, places of
//! R, and auxiliary variables introduced by the reducer — whose arcs
//! encode reduction equations. Nodes live in a single arena (`Tfg::nodes`)
//! and are addressed by index (`NodeId`), which avoids cyclic ownership
//! for a graph with multiple parents per node.

use std::collections::{HashMap, HashSet};

use crate::equation::{Equation, EquationKind};
use crate::error::{KongError, Result};

/// Index into [`Tfg::nodes`]. Cheap to copy, stable for the lifetime of
/// the `Tfg` that produced it.
pub type NodeId = usize;

/// The four-way tag for a TFG node, per the design notes: a place of N
/// carries its matrix index; a dead-end variable with no N-place identity
/// of its own (including any place of R that does not also name a place
/// of N) is `Additional`; the two root kinds are distinguished because
/// propagation treats them specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    PlaceOfN(usize),
    Additional,
    DeadRoot,
    NonDeadRoot { k: u64, instance: u64 },
}

/// One TFG node. `redundant` and `agglomerated` are the outgoing arc
/// lists (parent → child, stored on the parent); `parents` is the
/// reverse index.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub redundant: Vec<NodeId>,
    pub agglomerated: Vec<NodeId>,
    pub parents: Vec<NodeId>,
    pub propagated: bool,
    pub dead: bool,
    pub interval: bool,
    pub successors: Option<Vec<NodeId>>,
    pub predecessors: Vec<NodeId>,
    pub independent: HashSet<NodeId>,
}

impl Node {
    fn new(id: String, kind: NodeKind) -> Self {
        Node {
            id,
            kind,
            redundant: Vec::new(),
            agglomerated: Vec::new(),
            parents: Vec::new(),
            propagated: false,
            dead: false,
            interval: false,
            successors: None,
            predecessors: Vec::new(),
            independent: HashSet::new(),
        }
    }

    /// `Some(index)` iff this node is a place of N, with its matrix index.
    pub fn n_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::PlaceOfN(i) => Some(i),
            _ => None,
        }
    }
}

/// The Token Flow Graph. Owns every node in a single arena.
pub struct Tfg {
    pub(crate) nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
    dead_root: NodeId,
    non_dead_roots: Vec<NodeId>,
    root_counter: u64,
    n_places: Vec<String>,
    r_places: Vec<String>,
    n_place_nodes: Vec<NodeId>,
}

impl Tfg {
    /// Build the TFG from a parsed equation stream and the ordered place
    /// lists of N and R.
    pub fn build(equations: &[Equation], n_places: &[String], r_places: &[String]) -> Result<Tfg> {
        let mut tfg = Tfg {
            nodes: Vec::new(),
            index: HashMap::new(),
            dead_root: 0,
            non_dead_roots: Vec::new(),
            root_counter: 0,
            n_places: n_places.to_vec(),
            r_places: r_places.to_vec(),
            n_place_nodes: Vec::with_capacity(n_places.len()),
        };

        let dead_root_id = tfg.push_node(Node::new("0".to_string(), NodeKind::DeadRoot));
        tfg.dead_root = dead_root_id;

        for (i, place) in n_places.iter().enumerate() {
            let id = tfg.push_node(Node::new(place.clone(), NodeKind::PlaceOfN(i)));
            tfg.index.insert(place.clone(), id);
            tfg.n_place_nodes.push(id);
        }

        for equation in equations {
            let lhs = tfg.get_or_create(&equation.lhs);
            for rhs_token in &equation.rhs {
                let rhs = tfg.get_or_create(rhs_token);
                match equation.kind {
                    EquationKind::Redundant => {
                        tfg.nodes[rhs].redundant.push(lhs);
                        tfg.nodes[lhs].parents.push(rhs);
                        if equation.interval {
                            tfg.nodes[rhs].interval = true;
                        }
                    }
                    EquationKind::Agglomeration => {
                        tfg.nodes[lhs].agglomerated.push(rhs);
                        tfg.nodes[rhs].parents.push(lhs);
                    }
                }
            }
        }

        // Every place of R must appear as a node, even when it is never
        // mentioned by an equation (e.g. the identity reduction).
        for place in r_places {
            tfg.get_or_create(place);
        }

        Ok(tfg)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Resolve a raw equation token to a node, materialising it if this
    /// is its first occurrence. Positive integer literals always create a
    /// fresh non-dead root; `"0"` resolves to the shared dead root;
    /// everything else is a place (if its name was pre-registered from
    /// N's place list) or a fresh additional-variable node.
    fn get_or_create(&mut self, token: &str) -> NodeId {
        if token == "0" {
            return self.dead_root;
        }
        if let Ok(k) = token.parse::<u64>() {
            self.root_counter += 1;
            let id = format!("{}#{}", k, self.root_counter);
            let node_id = self.push_node(Node::new(id, NodeKind::NonDeadRoot {
                k,
                instance: self.root_counter,
            }));
            self.non_dead_roots.push(node_id);
            return node_id;
        }
        if let Some(&existing) = self.index.get(token) {
            return existing;
        }
        let node_id = self.push_node(Node::new(token.to_string(), NodeKind::Additional));
        self.index.insert(token.to_string(), node_id);
        node_id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dead_root(&self) -> NodeId {
        self.dead_root
    }

    pub fn non_dead_roots(&self) -> &[NodeId] {
        &self.non_dead_roots
    }

    pub fn n_places(&self) -> &[String] {
        &self.n_places
    }

    pub fn r_places(&self) -> &[String] {
        &self.r_places
    }

    /// Look up the node for a place name (of either N or R).
    pub fn place_node(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// The node for the i-th place of N, by matrix index.
    pub fn n_place_node(&self, i: usize) -> NodeId {
        self.n_place_nodes[i]
    }

    /// The node for the i-th place of R, per `reduced_places` in the
    /// driver sequence (§4.4 step 3).
    pub fn r_place_node(&self, i: usize) -> Result<NodeId> {
        let name = self.r_places.get(i).ok_or_else(|| {
            KongError::TfgInvariant(format!("reduced matrix row {i} has no corresponding place"))
        })?;
        self.place_node(name).ok_or_else(|| {
            KongError::TfgInvariant(format!("place of R '{name}' is not a TFG node"))
        })
    }
}
