//! Driver (§4.8): orchestrates the reducer, the base oracle and
//! reachability checker, and the change-of-dimension core behind the
//! three entry points named by `spec.md` §6 — `conc`, `dead`, `reach`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::concurrency::concurrency_matrix;
use crate::config::Config;
use crate::dead::dead_places_vector;
use crate::equation::parse_equations;
use crate::error::{KongError, Result};
use crate::marking::{marking_projection, Marking, ProjectionOutcome};
use crate::matrix::{decode_matrix, encode_matrix, encode_row};
use crate::nupn::project;
use crate::oracle::Oracle;
use crate::pt::PetriNet;
use crate::reachability::ReachabilityChecker;
use crate::reducer::Reducer;
use crate::tfg::Tfg;

/// Flags shared by `conc` and `dead` (`spec.md` §6's common flag block).
#[derive(Debug, Clone, Default)]
pub struct ChangeOfDimensionOptions {
    pub no_units: bool,
    pub no_rle: bool,
    pub place_names: bool,
    pub show_reduction_ratio: bool,
    pub show_equations: bool,
    pub show_reduced_matrix: bool,
    pub save_reduced: bool,
    pub reduced_net_path: Option<PathBuf>,
    pub reduced_matrix_path: Option<PathBuf>,
    pub use_fallback_reducer: bool,
    pub show_times: bool,
}

/// Flags unique to `reach`.
#[derive(Debug, Clone, Default)]
pub struct ReachOptions {
    pub show_projected_marking: bool,
    pub show_reduction_ratio: bool,
    pub show_equations: bool,
    pub save_reduced: bool,
    pub reduced_net_path: Option<PathBuf>,
    pub use_fallback_reducer: bool,
    pub show_times: bool,
}

pub struct ConcDeadReport {
    pub encoded: String,
    pub complete: bool,
    pub equations_text: Option<String>,
    pub reduced_matrix_text: Option<String>,
    pub reduction_ratio: Option<f64>,
    pub elapsed: Option<Duration>,
}

pub struct ReachReport {
    pub reachable: bool,
    pub projected_marking: Option<Marking>,
    pub equations_text: Option<String>,
    pub reduction_ratio: Option<f64>,
    pub elapsed: Option<Duration>,
}

fn reduced_net_text(
    input_path: &Path,
    pre_reduced: Option<&Path>,
    reducer: &dyn Reducer,
    config: &Config,
    use_fallback: bool,
) -> Result<String> {
    match pre_reduced {
        Some(path) => std::fs::read_to_string(path).map_err(|e| KongError::io(path, e)),
        None => {
            info!("Reduce the input net");
            reducer.reduce(input_path, &config.reducer, use_fallback)
        }
    }
}

fn maybe_save_reduced(input_path: &Path, net_text: &str, save: bool) -> Result<()> {
    if !save {
        return Ok(());
    }
    let stem = input_path.file_stem().and_then(|s| s.to_str()).unwrap_or("net");
    let out_path = input_path.with_file_name(format!("{stem}_reduced.net"));
    std::fs::write(&out_path, net_text).map_err(|e| KongError::io(&out_path, e))
}

fn reduction_ratio(original: &PetriNet, reduced: &PetriNet) -> f64 {
    if original.places.is_empty() {
        1.0
    } else {
        reduced.places.len() as f64 / original.places.len() as f64
    }
}

/// `conc FILE ...`: lift the reduced net's concurrency matrix back to N.
pub fn conc(
    input_path: &Path,
    options: &ChangeOfDimensionOptions,
    config: &Config,
    reducer: &dyn Reducer,
    oracle: &dyn Oracle,
) -> Result<ConcDeadReport> {
    let start = Instant::now();
    let original = PetriNet::parse(input_path)?;
    let net_text = reduced_net_text(
        input_path,
        options.reduced_net_path.as_deref(),
        reducer,
        config,
        options.use_fallback_reducer,
    )?;
    maybe_save_reduced(input_path, &net_text, options.save_reduced)?;

    let reduced_petri = PetriNet::from_net_text(&net_text);
    let equations = parse_equations(&net_text)?;
    debug!(count = equations.len(), "Build the Token Flow Graph");
    let mut tfg = Tfg::build(&equations, &original.places, &reduced_petri.places)?;

    let (reduced_matrix, reduced_complete) = match &options.reduced_matrix_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| KongError::io(path, e))?;
            decode_matrix(&text)?
        }
        None => {
            let nupn_file = tempfile::Builder::new()
                .suffix(".nupn")
                .tempfile()
                .map_err(|e| KongError::io(input_path, e))?;
            let mut export = reduced_petri.clone();
            if !options.no_units {
                if let Some(nupn) = &original.nupn {
                    export.nupn = Some(project(nupn, &tfg, &reduced_petri.places));
                }
            }
            export.export_nupn(nupn_file.path())?;
            oracle.concurrency_matrix(nupn_file.path(), &config.oracle)?
        }
    };

    info!("Change of dimension");
    let (matrix, complete) = concurrency_matrix(&mut tfg, &reduced_matrix, reduced_complete)?;

    let place_names = options.place_names.then_some(original.places.as_slice());
    let encoded = encode_matrix(&matrix, place_names, !options.no_rle);

    Ok(ConcDeadReport {
        encoded,
        complete,
        equations_text: options
            .show_equations
            .then(|| equations.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")),
        reduced_matrix_text: options
            .show_reduced_matrix
            .then(|| encode_matrix(&reduced_matrix, None, !options.no_rle)),
        reduction_ratio: options.show_reduction_ratio.then(|| reduction_ratio(&original, &reduced_petri)),
        elapsed: options.show_times.then(|| start.elapsed()),
    })
}

/// `dead FILE ...`: lift the reduced net's dead-places vector back to N.
pub fn dead(
    input_path: &Path,
    options: &ChangeOfDimensionOptions,
    config: &Config,
    reducer: &dyn Reducer,
    oracle: &dyn Oracle,
) -> Result<ConcDeadReport> {
    let start = Instant::now();
    let original = PetriNet::parse(input_path)?;
    let net_text = reduced_net_text(
        input_path,
        options.reduced_net_path.as_deref(),
        reducer,
        config,
        options.use_fallback_reducer,
    )?;
    maybe_save_reduced(input_path, &net_text, options.save_reduced)?;

    let reduced_petri = PetriNet::from_net_text(&net_text);
    let equations = parse_equations(&net_text)?;
    let mut tfg = Tfg::build(&equations, &original.places, &reduced_petri.places)?;

    let (reduced_vector, reduced_complete) = match &options.reduced_matrix_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| KongError::io(path, e))?;
            crate::matrix::decode_vector(&text)?
        }
        None => {
            let nupn_file = tempfile::Builder::new()
                .suffix(".nupn")
                .tempfile()
                .map_err(|e| KongError::io(input_path, e))?;
            let mut export = reduced_petri.clone();
            if !options.no_units {
                if let Some(nupn) = &original.nupn {
                    export.nupn = Some(project(nupn, &tfg, &reduced_petri.places));
                }
            }
            export.export_nupn(nupn_file.path())?;
            oracle.dead_places_vector(nupn_file.path(), &config.oracle)?
        }
    };

    info!("Change of dimension");
    let (vector, complete) = dead_places_vector(&mut tfg, &reduced_vector, reduced_complete)?;

    let encoded = encode_row(&vector, None, !options.no_rle);

    Ok(ConcDeadReport {
        encoded,
        complete,
        equations_text: options
            .show_equations
            .then(|| equations.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")),
        reduced_matrix_text: options
            .show_reduced_matrix
            .then(|| encode_row(&reduced_vector, None, !options.no_rle)),
        reduction_ratio: options.show_reduction_ratio.then(|| reduction_ratio(&original, &reduced_petri)),
        elapsed: options.show_times.then(|| start.elapsed()),
    })
}

/// `reach FILE -m MARKING_FILE ...`: decide whether a target marking of
/// N is reachable, consulting the checker only when the equations alone
/// do not already settle it.
pub fn reach(
    input_path: &Path,
    marking_path: &Path,
    options: &ReachOptions,
    config: &Config,
    reducer: &dyn Reducer,
    checker: &dyn ReachabilityChecker,
) -> Result<ReachReport> {
    let start = Instant::now();
    let original = PetriNet::parse(input_path)?;
    let marking_text = std::fs::read_to_string(marking_path).map_err(|e| KongError::io(marking_path, e))?;
    let target = parse_marking(&marking_text)?;

    let net_text = reduced_net_text(
        input_path,
        options.reduced_net_path.as_deref(),
        reducer,
        config,
        options.use_fallback_reducer,
    )?;
    maybe_save_reduced(input_path, &net_text, options.save_reduced)?;

    let reduced_petri = PetriNet::from_net_text(&net_text);
    let equations = parse_equations(&net_text)?;
    let mut tfg = Tfg::build(&equations, &original.places, &reduced_petri.places)?;

    let outcome = marking_projection(&mut tfg, &target)?;

    let (reachable, projected) = match outcome {
        ProjectionOutcome::TriviallyReachable => (true, Some(Marking::new())),
        ProjectionOutcome::Unreachable => (false, None),
        ProjectionOutcome::Reachable(m) => {
            let formula = render_formula(&m);
            let net_file = tempfile::Builder::new()
                .suffix(".net")
                .tempfile()
                .map_err(|e| KongError::io(input_path, e))?;
            std::fs::write(net_file.path(), &net_text).map_err(|e| KongError::io(net_file.path(), e))?;
            let reachable = checker.check(net_file.path(), &formula, &config.checker)?;
            (reachable, Some(m))
        }
    };

    Ok(ReachReport {
        reachable,
        projected_marking: if options.show_projected_marking { projected } else { None },
        equations_text: options
            .show_equations
            .then(|| equations.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")),
        reduction_ratio: options.show_reduction_ratio.then(|| reduction_ratio(&original, &reduced_petri)),
        elapsed: options.show_times.then(|| start.elapsed()),
    })
}

/// Parse a marking file body: whitespace-separated `PLACE` or
/// `PLACE*COUNT` tokens (count defaults to 1), per `spec.md` §6.
pub fn parse_marking(text: &str) -> Result<Marking> {
    let mut marking = Marking::new();
    for token in text.split_whitespace() {
        let (place, count) = match token.split_once('*') {
            Some((place, count)) => (
                place,
                count
                    .parse::<u64>()
                    .map_err(|_| KongError::InvalidMarking(token.to_string()))?,
            ),
            None => (token, 1),
        };
        marking.insert(place.to_string(), count);
    }
    Ok(marking)
}

/// Render a target marking as the checker's query formula:
/// `- (p1 = n1 /\ p2 = n2 /\ ...)`.
fn render_formula(marking: &Marking) -> String {
    let clauses: Vec<String> = marking.iter().map(|(place, count)| format!("{place} = {count}")).collect();
    format!("- ({})", clauses.join(" /\\ "))
}
