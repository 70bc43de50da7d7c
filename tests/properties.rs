//! Property tests for the testable invariants of `spec.md` §8: matrix
//! codec round-trip (3), symmetry of a lifted concurrency matrix (1),
//! diagonal consistency against the dead-places result (2), and
//! monotonic refinement as the oracle goes from partial to complete (4).

use proptest::prelude::*;

use kong::concurrency::concurrency_matrix;
use kong::config::Config;
use kong::driver::{self, ChangeOfDimensionOptions};
use kong::matrix::{decode_matrix, encode_matrix, Cell};
use kong::oracle::mock::MockOracle;
use kong::reducer::mock::MockReducer;
use kong::tfg::Tfg;

fn cell_strategy() -> impl Strategy<Value = Cell> {
    prop_oneof![Just(Cell::Zero), Just(Cell::One), Just(Cell::Unknown)]
}

fn half_matrix_strategy(n: usize) -> impl Strategy<Value = Vec<Vec<Cell>>> {
    (0..n)
        .map(|i| proptest::collection::vec(cell_strategy(), i + 1))
        .collect::<Vec<_>>()
}

/// A half-matrix over {0,1} only (no `.`), for the "complete oracle"
/// baseline in the refinement property.
fn known_half_matrix_strategy(n: usize) -> impl Strategy<Value = Vec<Vec<Cell>>> {
    (0..n)
        .map(|i| proptest::collection::vec(prop_oneof![Just(Cell::Zero), Just(Cell::One)], i + 1))
        .collect::<Vec<_>>()
}

/// Mirror a half-matrix into a full `n x n` square: `full[i][j] =
/// m[max][min]` for every pair, the reconstruction `spec.md` §8
/// invariant 1 names explicitly.
fn to_full_square(m: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
    let n = m.len();
    (0..n)
        .map(|i| (0..n).map(|j| if i >= j { m[i][j] } else { m[j][i] }).collect())
        .collect()
}

proptest! {
    /// Encoding a half-matrix and decoding it again yields the same
    /// cells, with or without run-length collapsing.
    #[test]
    fn matrix_codec_round_trips(matrix in half_matrix_strategy(6)) {
        for rle in [false, true] {
            let encoded = encode_matrix(&matrix, None, rle);
            let (decoded, _) = decode_matrix(&encoded).unwrap();
            prop_assert_eq!(decoded, matrix.clone());
        }
    }

    /// A lifted concurrency matrix, reconstructed as a full square per
    /// §8 invariant 1, is symmetric: `full[i][j] == full[j][i]`.
    #[test]
    fn lifted_matrix_is_symmetric(matrix in half_matrix_strategy(4)) {
        let net = "pl p0\npl p1\npl p2\npl p3\n";
        let reducer = MockReducer { net_text: net.to_string() };
        let complete = !matrix.iter().flatten().any(|c| *c == Cell::Unknown);
        let oracle = MockOracle {
            matrix: matrix.clone(),
            matrix_complete: complete,
            vector: Vec::new(),
            vector_complete: true,
        };
        let input = tempfile::Builder::new().suffix(".net").tempfile().unwrap();
        std::fs::write(input.path(), net).unwrap();
        let report = driver::conc(
            input.path(),
            &ChangeOfDimensionOptions::default(),
            &Config::default(),
            &reducer,
            &oracle,
        ).unwrap();
        let (lifted, _) = decode_matrix(&report.encoded).unwrap();
        let full = to_full_square(&lifted);
        for i in 0..full.len() {
            for j in 0..full.len() {
                prop_assert_eq!(full[i][j], full[j][i]);
            }
        }
    }

    /// §8 invariant 4: masking some cells of a complete reduced matrix
    /// to `.` and re-lifting never flips a cell the complete run
    /// already settled — only `.` cells may change.
    #[test]
    fn refinement_never_flips_a_settled_cell(
        complete_reduced in known_half_matrix_strategy(3),
        mask in proptest::collection::vec(any::<bool>(), 6),
    ) {
        let names: Vec<String> = (0..3).map(|i| format!("p{i}")).collect();

        let mut partial_reduced = complete_reduced.clone();
        let mut mask_iter = mask.iter();
        for row in &mut partial_reduced {
            for cell in row.iter_mut() {
                if *mask_iter.next().unwrap_or(&false) {
                    *cell = Cell::Unknown;
                }
            }
        }

        let mut tfg_complete = Tfg::build(&[], &names, &names).unwrap();
        let (full_result, _) = concurrency_matrix(&mut tfg_complete, &complete_reduced, true).unwrap();

        let mut tfg_partial = Tfg::build(&[], &names, &names).unwrap();
        let (partial_result, _) = concurrency_matrix(&mut tfg_partial, &partial_reduced, false).unwrap();

        for i in 0..partial_result.len() {
            for j in 0..partial_result[i].len() {
                if partial_result[i][j] != Cell::Unknown {
                    prop_assert_eq!(partial_result[i][j], full_result[i][j]);
                }
            }
        }
    }
}

#[test]
fn diagonal_of_concurrency_and_dead_agree_on_identity_reduction() {
    use kong::driver::dead;

    let net = "pl p\npl q\n";
    let reducer = MockReducer { net_text: net.to_string() };
    let conc_oracle = MockOracle {
        matrix: vec![vec![Cell::One], vec![Cell::Zero, Cell::One]],
        matrix_complete: true,
        vector: Vec::new(),
        vector_complete: true,
    };
    let dead_oracle = MockOracle {
        matrix: Vec::new(),
        matrix_complete: true,
        vector: vec![Cell::Zero, Cell::Zero],
        vector_complete: true,
    };

    let input = tempfile::Builder::new().suffix(".net").tempfile().unwrap();
    std::fs::write(input.path(), net).unwrap();

    let conc_report = driver::conc(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &conc_oracle,
    )
    .unwrap();
    let dead_report = dead(
        input.path(),
        &ChangeOfDimensionOptions::default(),
        &Config::default(),
        &reducer,
        &dead_oracle,
    )
    .unwrap();

    let (matrix, _) = decode_matrix(&conc_report.encoded).unwrap();
    // A place that is alive (diagonal cell `1`) must not be reported dead.
    for (i, row) in matrix.iter().enumerate() {
        if row[i] == Cell::One {
            assert_ne!(dead_report.encoded.chars().nth(i), Some('1'));
        }
    }
}
