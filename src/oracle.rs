//! Base oracle collaborator (`caesar.bdd`): computes the concurrency
//! matrix or dead-places vector of the reduced net R, per `spec.md` §6.
//! Defined as a trait so the driver can be exercised against an
//! in-memory mock in tests (§4.12) instead of spawning a real process.

use std::path::Path;
use std::process::Command;

use crate::config::OracleConfig;
use crate::error::{KongError, Result};
use crate::matrix::{decode_matrix, decode_vector, Cell, HalfMatrix};

pub trait Oracle {
    fn concurrency_matrix(&self, nupn_path: &Path, config: &OracleConfig) -> Result<(HalfMatrix, bool)>;
    fn dead_places_vector(&self, nupn_path: &Path, config: &OracleConfig) -> Result<(Vec<Cell>, bool)>;
}

/// Spawns the real `caesar.bdd` binary. Exit status 0 means complete
/// output, 5 means partial (bounded exploration), anything else is an
/// oracle failure.
pub struct ProcessOracle;

impl ProcessOracle {
    fn run(&self, nupn_path: &Path, mode_flag: &str, config: &OracleConfig) -> Result<String> {
        let mut command = Command::new(&config.binary);
        command.arg(mode_flag).arg(nupn_path);
        if let Some(secs) = config.bdd_timeout_secs {
            command.env("CAESAR_BDD_TIMEOUT", secs.to_string());
        }
        if let Some(iterations) = config.bdd_iterations {
            command.env("CAESAR_BDD_ITERATIONS", iterations.to_string());
        }

        let output = command.output().map_err(|e| KongError::io(nupn_path, e))?;
        match output.status.code() {
            Some(0) | Some(5) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            other => Err(KongError::OracleFailure {
                status: other.unwrap_or(-1),
                detail: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
        }
    }
}

impl Oracle for ProcessOracle {
    fn concurrency_matrix(&self, nupn_path: &Path, config: &OracleConfig) -> Result<(HalfMatrix, bool)> {
        let text = self.run(nupn_path, "-concur", config)?;
        decode_matrix(&text)
    }

    fn dead_places_vector(&self, nupn_path: &Path, config: &OracleConfig) -> Result<(Vec<Cell>, bool)> {
        let text = self.run(nupn_path, "-dead", config)?;
        decode_vector(&text)
    }
}

/// Test doubles for the driver's integration tests (§4.12). Not
/// `#[cfg(test)]`-gated so `tests/` can construct them too; they carry
/// no I/O and cost nothing in a release binary beyond a few bytes.
pub mod mock {
    use super::*;

    /// A canned oracle response, used by driver integration tests so no
    /// real subprocess is spawned (§4.12).
    pub struct MockOracle {
        pub matrix: HalfMatrix,
        pub matrix_complete: bool,
        pub vector: Vec<Cell>,
        pub vector_complete: bool,
    }

    impl Oracle for MockOracle {
        fn concurrency_matrix(&self, _nupn_path: &Path, _config: &OracleConfig) -> Result<(HalfMatrix, bool)> {
            Ok((self.matrix.clone(), self.matrix_complete))
        }

        fn dead_places_vector(&self, _nupn_path: &Path, _config: &OracleConfig) -> Result<(Vec<Cell>, bool)> {
            Ok((self.vector.clone(), self.vector_complete))
        }
    }
}
