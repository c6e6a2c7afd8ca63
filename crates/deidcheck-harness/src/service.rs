//! Service lifecycle control.
//!
//! The harness only needs three operations on the service under test
//! (start, stop, status) plus a bounded wait for a target status. On Windows
//! these go through `sc.exe`; [`UnmanagedService`] stands in when the service
//! is run by someone else.

use crate::error::HarnessError;
use deidcheck_core::config::{ControllerKind, ServiceSettings};
use deidcheck_core::JobOutcome;
use serde::Serialize;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Status as reported by the service control manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ServiceStatus {
    Stopped,
    StartPending,
    StopPending,
    Running,
    ContinuePending,
    PausePending,
    Paused,
    Unknown,
}

impl ServiceStatus {
    /// Map a status onto the outcome taxonomy used by the report.
    pub fn health(self) -> JobOutcome {
        match self {
            ServiceStatus::Running => JobOutcome::Success,
            ServiceStatus::Stopped => JobOutcome::Failed,
            ServiceStatus::StartPending
            | ServiceStatus::StopPending
            | ServiceStatus::ContinuePending
            | ServiceStatus::PausePending => JobOutcome::InProgress,
            ServiceStatus::Paused => JobOutcome::Warning,
            ServiceStatus::Unknown => JobOutcome::Unknown,
        }
    }
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Stopped => write!(f, "STOPPED"),
            ServiceStatus::StartPending => write!(f, "START_PENDING"),
            ServiceStatus::StopPending => write!(f, "STOP_PENDING"),
            ServiceStatus::Running => write!(f, "RUNNING"),
            ServiceStatus::ContinuePending => write!(f, "CONTINUE_PENDING"),
            ServiceStatus::PausePending => write!(f, "PAUSE_PENDING"),
            ServiceStatus::Paused => write!(f, "PAUSED"),
            ServiceStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Start/stop/query capability for the service under test.
pub trait ServiceController {
    fn name(&self) -> &str;
    fn start(&self) -> Result<(), HarnessError>;
    fn stop(&self) -> Result<(), HarnessError>;
    fn status(&self) -> Result<ServiceStatus, HarnessError>;

    /// Poll [`status`](Self::status) until it equals `target` or `timeout`
    /// elapses. Returns whether the target was reached.
    fn wait_for(
        &self,
        target: ServiceStatus,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<bool, HarnessError> {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status()?;
            debug!(service = self.name(), %status, %target, "service status");
            if status == target {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(poll_interval.min(deadline - now));
        }
    }
}

/// Build the controller named in `[service]`.
pub fn controller_from_settings(settings: &ServiceSettings) -> Box<dyn ServiceController> {
    match settings.controller {
        ControllerKind::Sc => Box::new(ScController::new(&settings.name)),
        ControllerKind::None => Box::new(UnmanagedService::new(&settings.name)),
    }
}

/// Query the controller and turn the answer into a health outcome plus a
/// one-line explanation. A failing query is reported, not raised.
pub fn check_health(controller: &dyn ServiceController) -> (JobOutcome, String) {
    match controller.status() {
        Ok(status) => (
            status.health(),
            format!("service {} is {status}", controller.name()),
        ),
        Err(err) => {
            warn!(service = controller.name(), error = %err, "service status query failed");
            (
                JobOutcome::Unknown,
                format!("service {} status unavailable: {err}", controller.name()),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// sc.exe
// ---------------------------------------------------------------------------

/// `sc start` exit code when the service is already running.
const ERROR_SERVICE_ALREADY_RUNNING: i32 = 1056;
/// `sc stop` exit code when the service is not started.
const ERROR_SERVICE_NOT_ACTIVE: i32 = 1062;

/// Controls a Windows service through the `sc.exe` command-line tool.
#[derive(Debug, Clone)]
pub struct ScController {
    name: String,
    program: String,
}

impl ScController {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: "sc.exe".to_string(),
        }
    }

    /// Use a different executable (a wrapper script, or a fake in tests).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn sc(&self, verb: &str, tolerated: &[i32]) -> Result<String, HarnessError> {
        let output = Command::new(&self.program)
            .args([verb, self.name.as_str()])
            .output()
            .map_err(|source| HarnessError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let code = output.status.code();
        if output.status.success() || code.is_some_and(|c| tolerated.contains(&c)) {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(HarnessError::CommandFailed {
            program: format!("{} {verb} {}", self.program, self.name),
            code,
            output: format!("{}{}", stdout.trim(), stderr.trim()),
        })
    }
}

impl ServiceController for ScController {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), HarnessError> {
        info!(service = %self.name, "starting service");
        self.sc("start", &[ERROR_SERVICE_ALREADY_RUNNING]).map(drop)
    }

    fn stop(&self) -> Result<(), HarnessError> {
        info!(service = %self.name, "stopping service");
        self.sc("stop", &[ERROR_SERVICE_NOT_ACTIVE]).map(drop)
    }

    fn status(&self) -> Result<ServiceStatus, HarnessError> {
        self.sc("query", &[]).map(|out| parse_sc_state(&out))
    }
}

/// Extract the status from `sc query` output, e.g.
/// `        STATE              : 4  RUNNING`.
pub fn parse_sc_state(output: &str) -> ServiceStatus {
    let Some(value) = output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "STATE").then_some(value)
    }) else {
        return ServiceStatus::Unknown;
    };

    match value.split_whitespace().next().and_then(|code| code.parse::<u8>().ok()) {
        Some(1) => ServiceStatus::Stopped,
        Some(2) => ServiceStatus::StartPending,
        Some(3) => ServiceStatus::StopPending,
        Some(4) => ServiceStatus::Running,
        Some(5) => ServiceStatus::ContinuePending,
        Some(6) => ServiceStatus::PausePending,
        Some(7) => ServiceStatus::Paused,
        _ => ServiceStatus::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Unmanaged
// ---------------------------------------------------------------------------

/// A service the harness does not control. Start/stop are no-ops and the
/// status is always [`ServiceStatus::Unknown`].
#[derive(Debug, Clone)]
pub struct UnmanagedService {
    name: String,
}

impl UnmanagedService {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ServiceController for UnmanagedService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), HarnessError> {
        debug!(service = %self.name, "unmanaged service, not starting");
        Ok(())
    }

    fn stop(&self) -> Result<(), HarnessError> {
        debug!(service = %self.name, "unmanaged service, not stopping");
        Ok(())
    }

    fn status(&self) -> Result<ServiceStatus, HarnessError> {
        Ok(ServiceStatus::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    const SC_RUNNING: &str = "
SERVICE_NAME: DeIdentificationService
        TYPE               : 10  WIN32_OWN_PROCESS
        STATE              : 4  RUNNING
                                (STOPPABLE, NOT_PAUSABLE, ACCEPTS_SHUTDOWN)
        WIN32_EXIT_CODE    : 0  (0x0)
        SERVICE_EXIT_CODE  : 0  (0x0)
        CHECKPOINT         : 0x0
        WAIT_HINT          : 0x0
";

    #[test]
    fn parses_sc_query_output() {
        assert_eq!(parse_sc_state(SC_RUNNING), ServiceStatus::Running);
        assert_eq!(
            parse_sc_state(&SC_RUNNING.replace("4  RUNNING", "2  START_PENDING")),
            ServiceStatus::StartPending
        );
        assert_eq!(
            parse_sc_state("[SC] EnumQueryServicesStatus:OpenService FAILED 1060"),
            ServiceStatus::Unknown
        );
    }

    #[test]
    fn health_mapping() {
        assert_eq!(ServiceStatus::Running.health(), JobOutcome::Success);
        assert_eq!(ServiceStatus::Stopped.health(), JobOutcome::Failed);
        assert_eq!(ServiceStatus::StartPending.health(), JobOutcome::InProgress);
        assert_eq!(ServiceStatus::Unknown.health(), JobOutcome::Unknown);
    }

    /// Reports StartPending a fixed number of times, then Running.
    struct Warming {
        remaining: Cell<u32>,
    }

    impl ServiceController for Warming {
        fn name(&self) -> &str {
            "warming"
        }
        fn start(&self) -> Result<(), HarnessError> {
            Ok(())
        }
        fn stop(&self) -> Result<(), HarnessError> {
            Ok(())
        }
        fn status(&self) -> Result<ServiceStatus, HarnessError> {
            let left = self.remaining.get();
            if left == 0 {
                return Ok(ServiceStatus::Running);
            }
            self.remaining.set(left - 1);
            Ok(ServiceStatus::StartPending)
        }
    }

    #[test]
    fn wait_for_reaches_target() {
        let svc = Warming {
            remaining: Cell::new(3),
        };
        assert!(svc
            .wait_for(
                ServiceStatus::Running,
                Duration::from_secs(5),
                Duration::from_millis(1)
            )
            .unwrap());
    }

    #[test]
    fn wait_for_times_out() {
        let svc = Warming {
            remaining: Cell::new(u32::MAX),
        };
        assert!(!svc
            .wait_for(
                ServiceStatus::Running,
                Duration::from_millis(30),
                Duration::from_millis(5)
            )
            .unwrap());
    }

    #[test]
    fn unmanaged_service_health_is_unknown() {
        let (outcome, details) = check_health(&UnmanagedService::new("svc"));
        assert_eq!(outcome, JobOutcome::Unknown);
        assert!(details.contains("svc"));
    }

    #[test]
    fn missing_sc_binary_is_a_spawn_error() {
        let sc = ScController::new("svc").with_program("definitely-not-a-real-sc-binary");
        assert!(matches!(sc.status(), Err(HarnessError::Spawn { .. })));
        let (outcome, _) = check_health(&sc);
        assert_eq!(outcome, JobOutcome::Unknown);
    }
}
