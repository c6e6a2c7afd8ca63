//! Stimulus producers: the actions that make the service start a job.
//!
//! The verification side only cares that an action was dispatched and when.
//! Delivery is best effort: a dispatched stimulus may still be ignored by the
//! service, which then shows up as a timeout during verification.

use crate::error::HarnessError;
use chrono::{DateTime, Utc};
use deidcheck_core::config::StimulusConfig;
use std::path::PathBuf;
use std::process::Command;
use tracing::info;

/// Proof that a stimulus was dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub description: String,
    pub dispatched_at: DateTime<Utc>,
}

/// Something that triggers the service.
pub trait Stimulus {
    fn describe(&self) -> String;
    fn dispatch(&self) -> Result<DispatchRecord, HarnessError>;
}

/// Build the stimulus for a `[[tests]]` entry.
pub fn stimulus_from_config(cfg: &StimulusConfig) -> Box<dyn Stimulus> {
    match cfg {
        StimulusConfig::None => Box::new(OutOfBand),
        StimulusConfig::Copy {
            source,
            destination,
        } => Box::new(DropFile {
            from: source.clone(),
            to: destination.clone(),
        }),
        StimulusConfig::Command { program, args } => Box::new(RunCommand {
            program: program.clone(),
            args: args.clone(),
        }),
    }
}

fn record(description: String) -> DispatchRecord {
    info!(stimulus = %description, "dispatched");
    DispatchRecord {
        description,
        dispatched_at: Utc::now(),
    }
}

/// The action happens elsewhere (an operator, a previous step).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutOfBand;

impl Stimulus for OutOfBand {
    fn describe(&self) -> String {
        "out of band".to_string()
    }

    fn dispatch(&self) -> Result<DispatchRecord, HarnessError> {
        Ok(record(self.describe()))
    }
}

/// Copy an input file into the service's watch folder.
#[derive(Debug, Clone)]
pub struct DropFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

impl Stimulus for DropFile {
    fn describe(&self) -> String {
        format!("copy {} -> {}", self.from.display(), self.to.display())
    }

    fn dispatch(&self) -> Result<DispatchRecord, HarnessError> {
        let copy_err = |source: std::io::Error| HarnessError::Copy {
            from: self.from.clone(),
            to: self.to.clone(),
            source,
        };
        if let Some(parent) = self.to.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(copy_err)?;
        }
        std::fs::copy(&self.from, &self.to).map_err(copy_err)?;
        Ok(record(self.describe()))
    }
}

/// Run an external client, e.g. a SOAP/REST or Part10 batch script.
/// A non-zero exit status is a dispatch failure.
#[derive(Debug, Clone)]
pub struct RunCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Stimulus for RunCommand {
    fn describe(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn dispatch(&self) -> Result<DispatchRecord, HarnessError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(HarnessError::CommandFailed {
                program: self.describe(),
                code: output.status.code(),
                output: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(record(self.describe()))
    }
}
