//! Reachability checker collaborator (`sift`): decides a single
//! temporal-logic-style query on the reduced net R, per `spec.md` §6.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::CheckerConfig;
use crate::error::{KongError, Result};

pub trait ReachabilityChecker {
    /// Decide whether `formula` (already rendered as
    /// `- (p1 = n1 /\ p2 = n2 /\ ...)`) is reachable on the net at
    /// `net_path`.
    fn check(&self, net_path: &Path, formula: &str, config: &CheckerConfig) -> Result<bool>;
}

/// Spawns the real `sift` binary, feeding the formula on standard
/// input. Per §6, output whose first line reads
/// `some state violates condition -f:` denotes REACHABLE.
pub struct ProcessReachabilityChecker;

impl ReachabilityChecker for ProcessReachabilityChecker {
    fn check(&self, net_path: &Path, formula: &str, config: &CheckerConfig) -> Result<bool> {
        let mut child = Command::new(&config.binary)
            .arg(net_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| KongError::io(net_path, e))?;

        child
            .stdin
            .take()
            .expect("stdin was requested as piped")
            .write_all(formula.as_bytes())
            .map_err(|e| KongError::io(net_path, e))?;

        let output = child.wait_with_output().map_err(|e| KongError::io(net_path, e))?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .next()
            .is_some_and(|first| first.starts_with("some state violates condition -f:")))
    }
}

/// Test doubles for the driver's integration tests (§4.12).
pub mod mock {
    use super::*;

    /// A canned checker response, used by driver integration tests.
    pub struct MockChecker {
        pub reachable: bool,
    }

    impl ReachabilityChecker for MockChecker {
        fn check(&self, _net_path: &Path, _formula: &str, _config: &CheckerConfig) -> Result<bool> {
            Ok(self.reachable)
        }
    }
}
