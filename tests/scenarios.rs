//! End-to-end scenarios from `spec.md` §8, driving the `conc`/`dead`/
//! `reach` entry points against mock collaborators (no subprocess is
//! spawned).

use std::io::Write;

use kong::config::Config;
use kong::driver::{self, ChangeOfDimensionOptions, ReachOptions};
use kong::matrix::Cell;
use kong::oracle::mock::MockOracle;
use kong::reachability::mock::MockChecker;
use kong::reducer::mock::MockReducer;

fn write_net(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".net").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn write_marking(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".marking").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn oracle(matrix: Vec<Vec<Cell>>, complete: bool) -> MockOracle {
    MockOracle {
        matrix,
        matrix_complete: complete,
        vector: Vec::new(),
        vector_complete: true,
    }
}

#[test]
fn identity_reduction_lifts_bit_for_bit() {
    let input = write_net("pl p (1)\npl q\n");
    let reducer = MockReducer {
        net_text: "pl p (1)\npl q\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::One], vec![Cell::One, Cell::One]], true);
    let report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &mock,
    )
    .unwrap();
    assert!(report.complete);
    assert_eq!(report.encoded, "1\n11");
}

#[test]
fn single_redundancy_lifts_diagonal_and_pair() {
    // places(N) = {p,q,r}; E = {R |- p = q}; places(R) = {q,r}.
    let input = write_net("pl p (1)\npl q\npl r\n");
    let reducer = MockReducer {
        net_text: "pl q\npl r\n# generated equations\nR |- p = q\n\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::One], vec![Cell::One, Cell::One]], true);
    let report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &mock,
    )
    .unwrap();
    assert!(report.complete);
    // p,q,r in insertion order from the original net: p=0, q=1, r=2.
    assert_eq!(report.encoded, "1\n11\n111");
}

#[test]
fn agglomeration_splits_siblings_independent() {
    // places(N)={p,q}; places(R)={a}; E = {A |- a = p + q}.
    let input = write_net("pl p (1)\npl q\n");
    let reducer = MockReducer {
        net_text: "pl a\n# generated equations\nA |- a = p + q\n\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::One]], true);
    let report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &mock,
    )
    .unwrap();
    assert!(report.complete);
    assert_eq!(report.encoded, "1\n01");
}

#[test]
fn shortcut_co_reaches_both_parents_independently() {
    // places(N)={p,q,r}; E={R |- p = q + r}; places(R)={q,r}, C(R)[q][r]=0.
    let input = write_net("pl p (1)\npl q\npl r\n");
    let reducer = MockReducer {
        net_text: "pl q\npl r\n# generated equations\nR |- p = q + r\n\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::One], vec![Cell::Zero, Cell::One]], true);
    let report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &mock,
    )
    .unwrap();
    assert!(report.complete);
    assert_eq!(report.encoded, "1\n11\n101");
}

#[test]
fn constant_non_dead_roots_are_pairwise_concurrent() {
    let input = write_net("pl a\npl b\n");
    let reducer = MockReducer {
        net_text: "pl a\npl b\n# generated equations\nR |- a = 2\nR |- b = 2\n\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::One], vec![Cell::One, Cell::One]], true);
    let report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &mock,
    )
    .unwrap();
    assert!(report.complete);
    assert_eq!(report.encoded, "1\n11");
}

#[test]
fn partial_oracle_never_invents_a_one() {
    let input = write_net("pl p (1)\npl q\n");
    let reducer = MockReducer {
        net_text: "pl p (1)\npl q\n".to_string(),
    };
    let mock = oracle(vec![vec![Cell::Unknown], vec![Cell::Unknown, Cell::Unknown]], false);
    let mut options = ChangeOfDimensionOptions::default();
    options.no_rle = true;
    let report = driver::conc(input.path(), &options, &Config::default(), &reducer, &mock).unwrap();
    assert!(!report.complete);
    assert!(!report.encoded.contains('1'));
}

#[test]
fn marking_projection_contradiction_skips_the_checker() {
    let input = write_net("pl p (1)\npl q\n");
    let marking = write_marking("p q*0");
    let reducer = MockReducer {
        net_text: "pl q\n# generated equations\nR |- p = q\n\n".to_string(),
    };
    let checker = MockChecker { reachable: true };
    let report = driver::reach(
        input.path(),
        marking.path(),
        &ReachOptions::default(),
        &Config::default(),
        &reducer,
        &checker,
    )
    .unwrap();
    assert!(!report.reachable);
}

#[test]
fn all_zero_marking_is_trivially_reachable_without_the_checker() {
    let input = write_net("pl p\npl q\n");
    let marking = write_marking("");
    let reducer = MockReducer {
        net_text: "pl p\npl q\n".to_string(),
    };
    let checker = MockChecker { reachable: false };
    let report = driver::reach(
        input.path(),
        marking.path(),
        &ReachOptions::default(),
        &Config::default(),
        &reducer,
        &checker,
    )
    .unwrap();
    assert!(report.reachable);
}
