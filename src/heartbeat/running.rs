//! Agent liveness checks.
//!
//! Three independent probes, tried in order. A probe only hands over to the
//! next one when all it can say is [`Diagnosis::AgentWontRun`].

use crate::Result;
use crate::models::{Diagnosis, Evidence, Outcome};
use crate::sys::{Host, NOT_FOUND_STATUS};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static AGENT_INVOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^/opt/microsoft/omsagent/ruby/bin/ruby /opt/microsoft/omsagent/bin/omsagent ",
        r"-d /var/opt/microsoft/omsagent/(\S+)/run/omsagent\.pid ",
        r"-o /var/opt/microsoft/omsagent/(\S+)/log/omsagent\.log ",
        r"-c /etc/opt/microsoft/omsagent/(\S+)/conf/omsagent\.conf ",
        r"--no-supervisor"
    ))
    .expect("Invalid regex")
});

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Primary Workspace: (\S+)\s+Status: (\w+)\(([^)]*)\)")
        .expect("Invalid regex")
});

static STATUS_ERROR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^-e error\t(.+?)\s*$").expect("Invalid regex"));

/// Known `(status, detail)` pairs reported by `omsadmin.sh -l`.
const STATUS_TABLE: &[(&str, &str, Diagnosis)] = &[
    ("Onboarded", "OMS Agent Running", Diagnosis::Healthy),
    ("Warning", "OMSAgent Registered, Not Running", Diagnosis::AgentStopped),
    (
        "Saved",
        "OMSAgent Not Registered, Workspace Configuration Saved",
        Diagnosis::AgentDisabled,
    ),
];

const ROOT_REQUIRED: &str = "This script must be run as root or as the omsagent user.";

fn wont_run(message: String) -> Outcome {
    Outcome::issue(Diagnosis::AgentWontRun, Evidence::new([message]))
}

/// Ask the service manager whether the agent is running.
///
/// `service_control is-running` exits 1 when running and 0 when not.
pub fn check_running_service(host: &Host) -> Result<Outcome> {
    let sc = host.paths.service_control();
    let output = host.run(&sc.display().to_string(), &["is-running"])?;
    Ok(match output.status {
        Some(1) => Outcome::healthy(),
        Some(0) => Outcome {
            diagnosis: Diagnosis::AgentWontRun,
            evidence: None,
        },
        status => wont_run(format!(
            "Command '{} is-running' returned {}",
            sc.display(),
            status.map_or_else(|| "no exit status".to_string(), |s| s.to_string())
        )),
    })
}

/// Workspace id of an agent invocation, if all three embedded ids agree.
pub fn invocation_workspace(command: &str) -> Option<&str> {
    let captures = AGENT_INVOCATION.captures(command)?;
    let pid_ws = captures.get(1)?.as_str();
    let log_ws = captures.get(2)?.as_str();
    let conf_ws = captures.get(3)?.as_str();
    (pid_ws == log_ws && log_ws == conf_ws).then_some(pid_ws)
}

/// Look for a running agent process in `ps -ef`.
pub fn check_running_processes(host: &Host, workspace: &str) -> Result<Outcome> {
    let output = host.run("ps", &["-ef"])?;

    for line in output.stdout.lines() {
        if !line.starts_with("omsagent") {
            continue;
        }
        // UID PID PPID C STIME TTY TIME CMD
        let command = line.split_whitespace().skip(7).collect::<Vec<_>>().join(" ");
        let Some(found) = invocation_workspace(&command) else {
            continue;
        };
        if found != workspace {
            return Ok(Outcome::issue(
                Diagnosis::WrongWorkspace,
                Evidence::new([found, workspace]),
            ));
        }
        return Ok(Outcome::healthy());
    }

    Ok(Outcome {
        diagnosis: Diagnosis::AgentWontRun,
        evidence: None,
    })
}

/// Classify the output of `omsadmin.sh -l`.
pub fn parse_status_output(output: &str, workspace: &str, script: &Path) -> Outcome {
    let script = script.display().to_string();

    let Some(captures) = STATUS_LINE.captures(output) else {
        return match STATUS_ERROR.captures(output).and_then(|c| c.get(1)) {
            Some(message) if message.as_str() == ROOT_REQUIRED => {
                Outcome::issue(Diagnosis::PermissionDenied, Evidence::new([script]))
            }
            Some(message) => Outcome::issue(
                Diagnosis::FileAccessFailed,
                Evidence::new([script, message.as_str().to_string()]),
            ),
            None => Outcome::issue(
                Diagnosis::FileAccessFailed,
                Evidence::new([script, output.trim().to_string()]),
            ),
        };
    };

    let found = &captures[1];
    let status = &captures[2];
    let detail = &captures[3];

    if found != workspace {
        return Outcome::issue(Diagnosis::WrongWorkspace, Evidence::new([found, workspace]));
    }

    match STATUS_TABLE
        .iter()
        .find(|(s, d, _)| *s == status && *d == detail)
    {
        Some((_, _, Diagnosis::Healthy)) => Outcome::healthy(),
        Some((_, _, diagnosis)) => Outcome::issue(
            *diagnosis,
            Evidence::new([format!("OMS Agent has status {} ({})", status, detail)]),
        ),
        None => wont_run(format!("OMS Agent has status {} ({})", status, detail)),
    }
}

/// Ask the agent's own admin script for its status.
pub fn check_running_status(host: &Host, workspace: &str) -> Result<Outcome> {
    let script = host.paths.omsadmin_sh();
    let output = host.run("sh", &[&script.display().to_string(), "-l"])?;
    Ok(parse_status_output(&output.combined(), workspace, &script))
}

/// Run the liveness probes in order.
pub fn check_agent_running(host: &Host, workspace: &str) -> Result<Outcome> {
    let service = check_running_service(host)?;
    if service.diagnosis != Diagnosis::AgentWontRun {
        return Ok(service);
    }
    tracing::debug!("service manager reports agent not running; scanning processes");

    let processes = check_running_processes(host, workspace)?;
    if processes.diagnosis != Diagnosis::AgentWontRun {
        return Ok(processes);
    }
    tracing::debug!("no agent process found; asking the admin script");

    check_running_status(host, workspace)
}

/// Enable and start the agent, then re-check liveness once.
pub fn start_agent(host: &Host, workspace: &str) -> Result<Outcome> {
    tracing::warn!(workspace, "agent not running, attempting to start it");
    let sc = host.paths.service_control();
    let program = sc.display().to_string();

    for step in ["enable", "start"] {
        let output = host.run(&program, &[step])?;
        match output.status {
            Some(0) => continue,
            Some(NOT_FOUND_STATUS) => {
                return Ok(Outcome::issue(
                    Diagnosis::MissingFile,
                    Evidence::missing("executable shell script", &sc),
                ));
            }
            status => {
                return Ok(wont_run(format!(
                    "Command '{} {}' returned {}",
                    program,
                    step,
                    status.map_or_else(|| "no exit status".to_string(), |s| s.to_string())
                )));
            }
        }
    }

    check_agent_running(host, workspace)
}
