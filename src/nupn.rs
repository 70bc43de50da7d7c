//! Nested-Unit Petri Net (NUPN) hierarchy and its projection onto a
//! reduced net (§4.7). `Nupn` owns its `Unit`s in an arena addressed by
//! index, the same ownership pattern as [`crate::tfg::Tfg`] — a unit tree
//! is still a DAG-shaped ownership problem once subunits can be shared
//! during simplification.

use std::collections::{HashMap, HashSet, VecDeque};

use regex::Regex;

use crate::error::{KongError, Result};
use crate::tfg::{NodeId, Tfg};

pub type UnitId = usize;

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: String,
    pub places: Vec<String>,
    pub subunits: Vec<UnitId>,
    removed: bool,
}

/// A Nested-Unit Petri Net: a tree of units, each owning a set of places
/// and a set of subunits.
#[derive(Debug, Clone)]
pub struct Nupn {
    pub unit_safe: bool,
    pub root: UnitId,
    units: Vec<Unit>,
    index: HashMap<String, UnitId>,
    order: HashMap<UnitId, usize>,
}

impl Nupn {
    pub fn new(unit_safe: bool) -> Nupn {
        let mut nupn = Nupn {
            unit_safe,
            root: 0,
            units: Vec::new(),
            index: HashMap::new(),
            order: HashMap::new(),
        };
        nupn.root = nupn.get_or_create("U0");
        nupn
    }

    /// Look up a unit by id, creating an empty one on first mention —
    /// mirrors `NUPN.get_unit` in the original source.
    pub fn get_or_create(&mut self, id: &str) -> UnitId {
        if let Some(&existing) = self.index.get(id) {
            return existing;
        }
        let unit_id = self.units.len();
        self.units.push(Unit {
            id: id.to_string(),
            places: Vec::new(),
            subunits: Vec::new(),
            removed: false,
        });
        self.index.insert(id.to_string(), unit_id);
        unit_id
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }

    pub fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id]
    }

    fn surviving_units(&self) -> Vec<UnitId> {
        (0..self.units.len()).filter(|&id| !self.units[id].removed).collect()
    }

    /// Descendant set (including `u` itself) for every surviving unit,
    /// computed bottom-up. The original source's equivalent method
    /// discards the recursive union (`descendants.union(...)` builds a
    /// new set but never assigns it back), which silently made every
    /// non-leaf unit's descendant set just itself; the cost function in
    /// §4.7 needs the real descendant set, so this computes it properly.
    pub fn compute_hierarchy(&self) -> HashMap<UnitId, HashSet<UnitId>> {
        let mut memo: HashMap<UnitId, HashSet<UnitId>> = HashMap::new();
        for &id in &self.surviving_units() {
            self.hierarchy_of(id, &mut memo);
        }
        memo
    }

    fn hierarchy_of(&self, id: UnitId, memo: &mut HashMap<UnitId, HashSet<UnitId>>) -> HashSet<UnitId> {
        if let Some(cached) = memo.get(&id) {
            return cached.clone();
        }
        let mut descendants = HashSet::new();
        descendants.insert(id);
        for &sub in &self.units[id].subunits {
            descendants.extend(self.hierarchy_of(sub, memo));
        }
        memo.insert(id, descendants.clone());
        descendants
    }

    /// Minimal covering set of units for `leaves`, per §4.7: select a
    /// unit the moment its own places intersect the leaf set, otherwise
    /// recurse into its subunits.
    fn minimal_units(&self, unit_id: UnitId, leaves: &HashSet<String>, out: &mut Vec<UnitId>) {
        if self.units[unit_id].places.iter().any(|p| leaves.contains(p)) {
            out.push(unit_id);
            return;
        }
        for &sub in &self.units[unit_id].subunits {
            self.minimal_units(sub, leaves, out);
        }
    }

    fn cost(&self, unit_id: UnitId, hierarchy: &HashMap<UnitId, HashSet<UnitId>>) -> usize {
        let descendants = &hierarchy[&unit_id];
        self.surviving_units()
            .iter()
            .filter(|id| !descendants.contains(id))
            .map(|&id| self.units[id].places.len())
            .sum()
    }

    /// Clear every unit's place list, keeping the tree shape — the
    /// starting point for projecting a fresh place set onto the same
    /// hierarchy (§4.7).
    fn clear_places(&mut self) {
        for unit in &mut self.units {
            unit.places.clear();
        }
    }

    /// Simplify the tree (merge single-subunit units, drop empty
    /// subunits) and assign the contiguous place order, per §4.7's final
    /// step and `NUPN.simplification` in the original source.
    pub fn simplify_and_order_places(&mut self) -> HashMap<String, usize> {
        let mut queue: VecDeque<UnitId> = VecDeque::from([self.root]);
        while let Some(unit_id) = queue.pop_front() {
            let mut changed = false;

            if self.units[unit_id].subunits.len() == 1 {
                let sub = self.units[unit_id].subunits[0];
                let sub_places = self.units[sub].places.clone();
                let sub_subunits = self.units[sub].subunits.clone();
                self.units[unit_id].places.extend(sub_places);
                self.units[unit_id].subunits = sub_subunits;
                self.units[sub].removed = true;
                changed = true;
            }

            let current_subunits = self.units[unit_id].subunits.clone();
            for sub in current_subunits {
                if self.units[sub].removed {
                    continue;
                }
                if self.units[sub].places.is_empty() {
                    let sub_subunits = self.units[sub].subunits.clone();
                    self.units[unit_id].subunits.retain(|&s| s != sub);
                    self.units[unit_id].subunits.extend(sub_subunits);
                    self.units[sub].removed = true;
                    changed = true;
                }
            }

            if changed {
                queue.push_back(unit_id);
            } else {
                queue.extend(self.units[unit_id].subunits.iter().copied());
            }
        }

        self.order.clear();
        let mut places_order = HashMap::new();
        let mut place_counter = 0;
        for (order_index, &unit_id) in self.surviving_units().iter().enumerate() {
            self.order.insert(unit_id, order_index);
            for place in &self.units[unit_id].places {
                places_order.insert(place.clone(), place_counter);
                place_counter += 1;
            }
        }
        places_order
    }

    /// `place -> order` for every place, assuming `simplify_and_order_places`
    /// has already run (used by `PetriNet::export_nupn`).
    pub fn place_order(&self) -> HashMap<String, usize> {
        let mut order = HashMap::new();
        let mut counter = 0;
        for &unit_id in &self.surviving_units() {
            for place in &self.units[unit_id].places {
                order.insert(place.clone(), counter);
                counter += 1;
            }
        }
        order
    }

    /// Render the `units`/`root unit`/`Un ...` block of the `.nupn` format.
    pub fn render_units(&self, place_order: &HashMap<String, usize>) -> String {
        let surviving = self.surviving_units();
        let mut out = String::new();
        out.push_str(&format!("units #{} 0...{}\n", surviving.len(), surviving.len().saturating_sub(1)));
        out.push_str("root unit 0\n");

        for &unit_id in &surviving {
            let unit = &self.units[unit_id];
            let order = self.order.get(&unit_id).copied().unwrap_or(0);
            let (start, end) = if unit.places.is_empty() {
                (1i64, 0i64)
            } else {
                (
                    place_order[&unit.places[0]] as i64,
                    place_order[unit.places.last().unwrap()] as i64,
                )
            };
            let subunit_orders: Vec<String> = unit
                .subunits
                .iter()
                .filter(|&&s| !self.units[s].removed)
                .map(|&s| self.order.get(&s).copied().unwrap_or(0).to_string())
                .collect();
            out.push_str(&format!(
                "U{order} #{} {start}...{end} #{}{}\n",
                unit.places.len(),
                subunit_orders.len(),
                if subunit_orders.is_empty() { String::new() } else { format!(" {}", subunit_orders.join(" ")) },
            ));
        }
        out
    }

    /// Parse a standalone `.nupn` file body (also the format this module
    /// exports), used when a pre-built unit decomposition is handed to
    /// the driver directly.
    pub fn parse(text: &str) -> Result<Nupn> {
        let unit_line = Regex::new(r"^U(\d+)\s+#\d+\s+(\d+)\.\.\.(-?\d+)\s+#\d+(.*)$").expect("static regex");
        let mut nupn = Nupn::new(text.contains("!unit_safe"));
        let mut by_order: HashMap<usize, UnitId> = HashMap::new();

        for line in text.lines() {
            let Some(caps) = unit_line.captures(line.trim()) else { continue };
            let order: usize = caps[1].parse().map_err(|_| KongError::MalformedMatrix(line.to_string()))?;
            let start: i64 = caps[2].parse().map_err(|_| KongError::MalformedMatrix(line.to_string()))?;
            let end: i64 = caps[3].parse().map_err(|_| KongError::MalformedMatrix(line.to_string()))?;
            let subunit_orders: Vec<usize> = caps[4]
                .split_whitespace()
                .filter_map(|t| t.parse().ok())
                .collect();

            let unit_id = nupn.get_or_create(&format!("U{order}"));
            by_order.insert(order, unit_id);
            if start <= end {
                nupn.units[unit_id].places = (start..=end).map(|i| format!("p{i}")).collect();
            }
            nupn.units[unit_id].subunits = subunit_orders
                .iter()
                .map(|&o| nupn.get_or_create(&format!("U{o}")))
                .collect();
        }

        if let Some(&root) = by_order.get(&0) {
            nupn.root = root;
        }
        Ok(nupn)
    }
}

/// Collect the non-additional (place-of-N) descendants of `node` by DFS
/// over agglomerated ∪ redundant arcs, per §4.7.
fn collect_leaves(tfg: &Tfg, root: NodeId) -> HashSet<String> {
    let mut leaves = HashSet::new();
    let mut stack = vec![root];
    let mut visited = HashSet::new();
    while let Some(node_id) = stack.pop() {
        if !visited.insert(node_id) {
            continue;
        }
        if tfg.node(node_id).n_index().is_some() {
            leaves.insert(tfg.node(node_id).id.clone());
        }
        stack.extend(tfg.node(node_id).agglomerated.iter().copied());
        stack.extend(tfg.node(node_id).redundant.iter().copied());
    }
    leaves
}

/// Project `nupn` (decomposed over places of N) onto the places of R,
/// per §4.7. Returns a fresh `Nupn` over the same tree shape with places
/// reassigned.
pub fn project(nupn: &Nupn, tfg: &Tfg, r_places: &[String]) -> Nupn {
    let mut projected = nupn.clone();
    projected.clear_places();
    let hierarchy = projected.compute_hierarchy();

    for r_place in r_places {
        let Some(node) = tfg.place_node(r_place) else { continue };
        let leaves = collect_leaves(tfg, node);
        if leaves.is_empty() {
            continue;
        }
        let mut candidates = Vec::new();
        projected.minimal_units(projected.root, &leaves, &mut candidates);
        if candidates.is_empty() {
            continue;
        }
        let best = *candidates
            .iter()
            .min_by_key(|&&u| projected.cost(u, &hierarchy))
            .expect("candidates is non-empty");
        projected.units[best].places.push(r_place.clone());
    }

    projected
}
