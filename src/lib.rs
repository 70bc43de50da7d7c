//! Kong: a change-of-dimension core for Petri-net structural reduction.
//!
//! Kong does not explore the state space of a Petri net N directly.
//! Instead it leans on two external collaborators — a structural
//! reducer that produces a smaller net R plus a system of reduction
//! equations, and a base oracle that answers concurrency, dead-places,
//! or reachability questions on R — and lifts the oracle's answer on R
//! back to N through the Token Flow Graph (TFG) built from those
//! equations.
//!
//! Module map:
//!
//!   - [`equation`] — parses the reducer's `# generated equations` block.
//!   - [`tfg`] — builds and owns the Token Flow Graph.
//!   - [`matrix`] — the half-matrix run-length codec shared with the oracle.
//!   - [`concurrency`] — lifts a concurrency matrix from R to N.
//!   - [`dead`] — lifts a dead-places vector from R to N.
//!   - [`dead_flags`] — the shared topological dead-flag pass both use.
//!   - [`marking`] — projects a target marking of N onto R.
//!   - [`nupn`] — the Nested-Unit Petri Net hierarchy and its projection.
//!   - [`pt`] — the thin Petri-net file I/O wrapper (`.net`/`.pnml`/`.nupn`).
//!   - [`oracle`], [`reducer`], [`reachability`] — the external-collaborator
//!     traits and their process-spawning implementations.
//!   - [`driver`] — orchestrates the above behind `conc`/`dead`/`reach`.
//!   - [`config`] — hierarchical configuration (defaults, `kong.toml`, env).
//!   - [`error`] — the crate-wide error taxonomy.

pub mod concurrency;
pub mod config;
pub mod dead;
pub mod dead_flags;
pub mod driver;
pub mod equation;
pub mod error;
pub mod marking;
pub mod matrix;
pub mod nupn;
pub mod oracle;
pub mod pt;
pub mod reachability;
pub mod reducer;
pub mod tfg;
