//! Structural reducer collaborator (`reduce`, or `shrink` as the
//! `-sk` fallback): produces the reduced net R and its reduction
//! equations from N, per `spec.md` §6.

use std::path::Path;
use std::process::Command;

use crate::config::ReducerConfig;
use crate::error::{KongError, Result};

pub trait Reducer {
    /// Reduce the net at `input`, returning the full text of the
    /// resulting `.net` file (including its `# generated equations`
    /// block).
    fn reduce(&self, input: &Path, config: &ReducerConfig, use_fallback: bool) -> Result<String>;
}

/// Spawns the real `reduce`/`shrink` binary with the tuning knobs from
/// `examples/original_source/kong/kong.py`'s `conc_dead`/`reach`
/// invocation.
pub struct ProcessReducer;

impl Reducer for ProcessReducer {
    fn reduce(&self, input: &Path, config: &ReducerConfig, use_fallback: bool) -> Result<String> {
        let binary = if use_fallback { &config.fallback_binary } else { &config.binary };
        let output = Command::new(binary)
            .arg(input)
            .arg("-redundant-limit")
            .arg(config.redundant_limit.to_string())
            .arg("-redundant-time")
            .arg(config.redundant_time.to_string())
            .arg("-inv-limit")
            .arg(config.inv_limit.to_string())
            .arg("-inv-time")
            .arg(config.inv_time.to_string())
            .output()
            .map_err(|e| KongError::io(input, e))?;

        if !output.status.success() {
            return Err(KongError::ReducerFailure {
                binary: binary.clone(),
                detail: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Test doubles for the driver's integration tests (§4.12).
pub mod mock {
    use super::*;

    /// A canned reducer response, used by driver integration tests.
    pub struct MockReducer {
        pub net_text: String,
    }

    impl Reducer for MockReducer {
        fn reduce(&self, _input: &Path, _config: &ReducerConfig, _use_fallback: bool) -> Result<String> {
            Ok(self.net_text.clone())
        }
    }
}
