//! Fact gathering against the live system.

use super::{FactSource, Facts, GatherError, keys};
use crate::models::{Diagnosis, Evidence, Outcome, Package};
use crate::sys::{CommandRunner, Host};
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;

type Gather<T> = std::result::Result<T, GatherError>;

fn diagnosed(diagnosis: Diagnosis, evidence: Evidence) -> GatherError {
    GatherError::Diagnosed(Outcome::issue(diagnosis, evidence))
}

/// Supported package managers, in probe order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Dpkg,
    Rpm,
}

impl PackageManager {
    pub const PROBE_ORDER: [PackageManager; 2] = [PackageManager::Dpkg, PackageManager::Rpm];

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageManager::Dpkg => "dpkg",
            PackageManager::Rpm => "rpm",
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distribution prefixes mapped to the agent's readable OS ids.
const READABLE_OS_IDS: &[(&str, &str)] = &[
    ("redhat", "rhel"),
    ("red hat", "rhel"),
    ("centos", "centos"),
    ("oracle", "oracle"),
    ("debian", "debian"),
    ("ubuntu", "ubuntu"),
    ("suse", "sles"),
    ("sles", "sles"),
    ("amzn", "amzn"),
];

/// Gathers facts from the host's tools and files.
pub struct SystemFacts {
    host: Host,
}

impl SystemFacts {
    pub fn new(host: Host) -> Self {
        Self { host }
    }
}

impl FactSource for SystemFacts {
    fn gather(&self) -> Gather<Facts> {
        let runner = self.host.runner();
        let mut facts = Facts::new();

        facts.insert(keys::CPU_BITS.to_string(), cpu_bits(runner)?);

        let (os_id, os_version) = os_identity(&self.host)?;
        if let Some(readable) = readable_os_id(&os_id) {
            facts.insert(keys::OS_READABLE_ID.to_string(), readable.to_string());
        }
        facts.insert(keys::OS_ID.to_string(), os_id);
        facts.insert(keys::OS_VERSION_ID.to_string(), os_version);

        let manager = detect_package_manager(runner)?.ok_or_else(|| {
            diagnosed(Diagnosis::NoPackageManager, Evidence::new(["dpkg", "rpm"]))
        })?;
        facts.insert(keys::PKG_MANAGER.to_string(), manager.as_str().to_string());

        for package in Package::REQUIRED {
            let version = package_version(runner, manager, package)?.ok_or_else(|| {
                diagnosed(
                    Diagnosis::PackageMissing(package),
                    Evidence::new(["package", package.name()]),
                )
            })?;
            facts.insert(keys::package_version(package), version);
        }

        facts.extend(read_onboarding(&self.host.paths.omsadmin_conf())?);
        Ok(facts)
    }
}

/// CPU word width from `lscpu` ("32-bit" or "64-bit").
fn cpu_bits(runner: &dyn CommandRunner) -> Gather<String> {
    let output = runner.run("lscpu", &[])?;
    let bits = parse_cpu_bits(&output.stdout).unwrap_or_default();
    if bits == "32-bit" || bits == "64-bit" {
        Ok(bits)
    } else {
        Err(diagnosed(
            Diagnosis::CpuBitsUnreadable,
            Evidence::new(["lscpu".to_string(), bits]),
        ))
    }
}

/// The last six characters of the op-mode line (second line if unlabeled).
fn parse_cpu_bits(lscpu: &str) -> Option<String> {
    let line = lscpu
        .lines()
        .find(|l| l.starts_with("CPU op-mode(s):"))
        .or_else(|| lscpu.lines().nth(1))?;
    let chars: Vec<char> = line.trim_end().chars().collect();
    let start = chars.len().saturating_sub(6);
    Some(chars[start..].iter().collect())
}

/// Distribution id and major version.
fn os_identity(host: &Host) -> Gather<(String, String)> {
    let mut dist = lsb_release(host.runner(), "-si")?;
    let mut version = lsb_release(host.runner(), "-sr")?;

    let os_release = host.paths.os_release();
    if dist.is_empty() && version.is_empty() {
        let contents = match fs::read_to_string(&os_release) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!(path = %os_release.display(), error = %e, "os-release unreadable");
                String::new()
            }
        };
        let (id, version_id) = parse_os_release(&contents);
        dist = id.unwrap_or_default();
        version = version_id.unwrap_or_default();
    }

    if dist.is_empty() || version.is_empty() {
        return Err(diagnosed(
            Diagnosis::OsUnidentified,
            Evidence::new([os_release.display().to_string()]),
        ));
    }
    Ok((dist, version))
}

fn lsb_release(runner: &dyn CommandRunner, flag: &str) -> Result<String> {
    let output = runner.run("lsb_release", &[flag])?;
    if output.success() {
        Ok(output.stdout.trim().to_string())
    } else {
        Ok(String::new())
    }
}

/// `ID=` (up to the first `-`) and `VERSION_ID=` (up to the first `.`), unquoted.
pub(crate) fn parse_os_release(contents: &str) -> (Option<String>, Option<String>) {
    let mut id = None;
    let mut version = None;
    for line in contents.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key {
            "ID" => id = value.split('-').next().map(unquote),
            "VERSION_ID" => version = value.split('.').next().map(unquote),
            _ => {}
        }
    }
    (id, version)
}

fn unquote(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

fn readable_os_id(dist: &str) -> Option<&'static str> {
    let lower = dist.to_lowercase();
    READABLE_OS_IDS
        .iter()
        .find(|(prefix, _)| lower.starts_with(prefix))
        .map(|(_, id)| *id)
}

/// First supported package manager found on the `PATH`.
pub fn detect_package_manager(runner: &dyn CommandRunner) -> Result<Option<PackageManager>> {
    for manager in PackageManager::PROBE_ORDER {
        let output = runner.run("which", &[manager.as_str()])?;
        if output.success() && !output.stdout.trim().is_empty() {
            return Ok(Some(manager));
        }
    }
    Ok(None)
}

/// Installed version of `package`, or `None` if it is not properly installed.
pub fn package_version(
    runner: &dyn CommandRunner,
    manager: PackageManager,
    package: Package,
) -> Result<Option<String>> {
    let name = package.name();
    let output = match manager {
        PackageManager::Dpkg => runner.run("dpkg", &["-s", name])?,
        PackageManager::Rpm => runner.run("rpm", &["-qi", name])?,
    };
    if !output.success() {
        return Ok(None);
    }
    Ok(match manager {
        PackageManager::Dpkg => parse_dpkg_status(&output.combined(), name),
        PackageManager::Rpm => parse_rpm_info(&output.combined(), name),
    })
}

pub(crate) fn parse_dpkg_status(text: &str, package: &str) -> Option<String> {
    for line in text.lines().map(str::trim_end) {
        if line.starts_with("Package: ") && !line.ends_with(package) {
            return None;
        }
        if line.starts_with("Status: ") && !line.ends_with("installed") {
            return None;
        }
        if line.starts_with("Version: ") {
            return line.split_whitespace().last().map(str::to_string);
        }
    }
    None
}

pub(crate) fn parse_rpm_info(text: &str, package: &str) -> Option<String> {
    if text.contains(&format!("package {} is not installed", package)) {
        return None;
    }
    for line in text.lines().map(str::trim_end) {
        if line.starts_with("Name") && !line.ends_with(package) {
            return None;
        }
        if line.starts_with("Version") {
            let compact = line.replace(' ', "");
            return compact.split(':').nth(1).map(str::to_string);
        }
    }
    None
}

/// Onboarding facts from omsadmin.conf.
fn read_onboarding(path: &Path) -> Gather<Facts> {
    fs::read_to_string(path)
        .map(|contents| parse_onboarding(&contents))
        .map_err(|e| onboarding_error(path, e))
}

fn onboarding_error(path: &Path, e: io::Error) -> GatherError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => diagnosed(
            Diagnosis::PermissionDenied,
            Evidence::new([path.display().to_string()]),
        ),
        io::ErrorKind::NotFound => diagnosed(Diagnosis::MissingFile, Evidence::missing("file", path)),
        _ => GatherError::Fault(Error::Io(e)),
    }
}

/// `key=value` lines; everything after the first `=` is the value.
pub(crate) fn parse_onboarding(contents: &str) -> Facts {
    contents
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| match line.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sys::CommandOutput;
    use crate::test_utils::TestHost;

    const LSCPU: &str =
        "Architecture:        x86_64\nCPU op-mode(s):      32-bit, 64-bit\nByte Order:          Little Endian\n";

    fn script_healthy_host(test: &TestHost) {
        test.runner.on("lscpu", CommandOutput::new(0, LSCPU));
        test.runner.on("lsb_release -si", CommandOutput::new(0, "Ubuntu\n"));
        test.runner.on("lsb_release -sr", CommandOutput::new(0, "18.04\n"));
        test.runner.on("which dpkg", CommandOutput::new(0, "/usr/bin/dpkg\n"));
        for package in Package::REQUIRED {
            test.runner.on(
                format!("dpkg -s {}", package.name()),
                CommandOutput::new(
                    0,
                    format!(
                        "Package: {}\nStatus: install ok installed\nVersion: 1.13.{}\n",
                        package.name(),
                        package.name().len()
                    ),
                ),
            );
        }
    }

    #[test]
    fn test_parse_cpu_bits() {
        assert_eq!(parse_cpu_bits(LSCPU).as_deref(), Some("64-bit"));
        assert_eq!(parse_cpu_bits("x\n").as_deref(), None);
    }

    #[test]
    fn test_parse_os_release_strips_quotes_and_minor() {
        let contents = "NAME=\"CentOS Linux\"\nID=\"centos\"\nVERSION_ID=\"7.9\"\n";
        let (id, version) = parse_os_release(contents);
        assert_eq!(id.as_deref(), Some("centos"));
        assert_eq!(version.as_deref(), Some("7"));
    }

    #[test]
    fn test_parse_os_release_truncates_id_at_dash() {
        let (id, _) = parse_os_release("ID=opensuse-leap\nVERSION_ID=\"15.2\"\n");
        assert_eq!(id.as_deref(), Some("opensuse"));
    }

    #[test]
    fn test_readable_os_id() {
        assert_eq!(readable_os_id("Ubuntu"), Some("ubuntu"));
        assert_eq!(readable_os_id("Red Hat Enterprise"), Some("rhel"));
        assert_eq!(readable_os_id("SLES"), Some("sles"));
        assert_eq!(readable_os_id("gentoo"), None);
    }

    #[test]
    fn test_parse_dpkg_status() {
        let ok = "Package: omi\nStatus: install ok installed\nVersion: 1.6.4-0\n";
        assert_eq!(parse_dpkg_status(ok, "omi").as_deref(), Some("1.6.4-0"));

        let removed = "Package: omi\nStatus: deinstall ok config-files\nVersion: 1.6.4-0\n";
        assert_eq!(parse_dpkg_status(removed, "omi"), None);

        let wrong = "Package: omi-dev\nStatus: install ok installed\nVersion: 1\n";
        assert_eq!(parse_dpkg_status(wrong, "omi"), None);
    }

    #[test]
    fn test_parse_rpm_info() {
        let ok = "Name        : scx\nVersion     : 1.6.4\nRelease     : 7\n";
        assert_eq!(parse_rpm_info(ok, "scx").as_deref(), Some("1.6.4"));
        assert_eq!(parse_rpm_info("package scx is not installed\n", "scx"), None);
    }

    #[test]
    fn test_parse_onboarding_keeps_equals_in_value() {
        let facts = parse_onboarding("WORKSPACE_ID=abc\nURL=https://x/?a=b\nEMPTY=\n");
        assert_eq!(facts["WORKSPACE_ID"], "abc");
        assert_eq!(facts["URL"], "https://x/?a=b");
        assert_eq!(facts["EMPTY"], "");
    }

    #[test]
    fn test_gather_healthy_host() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.write(crate::paths::OMSADMIN_CONF, "WORKSPACE_ID=ws-1\nAGENT_GUID=g\n");

        let facts = SystemFacts::new(test.host()).gather().unwrap();
        assert_eq!(facts[keys::CPU_BITS], "64-bit");
        assert_eq!(facts[keys::OS_ID], "Ubuntu");
        assert_eq!(facts[keys::OS_READABLE_ID], "ubuntu");
        assert_eq!(facts[keys::PKG_MANAGER], "dpkg");
        assert_eq!(facts["OMSAGENT_VERSION"], "1.13.8");
        assert_eq!(facts[keys::WORKSPACE_ID], "ws-1");
    }

    #[test]
    fn test_gather_falls_back_to_os_release() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.runner.on("lsb_release -si", CommandOutput::exit(1));
        test.runner.on("lsb_release -sr", CommandOutput::exit(1));
        test.write(crate::paths::OS_RELEASE, "ID=\"rhel\"\nVERSION_ID=\"8.4\"\n");
        test.write(crate::paths::OMSADMIN_CONF, "WORKSPACE_ID=ws-1\n");

        let facts = SystemFacts::new(test.host()).gather().unwrap();
        assert_eq!(facts[keys::OS_ID], "rhel");
        assert_eq!(facts[keys::OS_VERSION_ID], "8");
    }

    #[test]
    fn test_gather_bad_cpu_bits() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.runner.on("lscpu", CommandOutput::new(0, "Architecture: ?\nweird\n"));

        match SystemFacts::new(test.host()).gather() {
            Err(GatherError::Diagnosed(outcome)) => {
                assert_eq!(outcome.diagnosis, Diagnosis::CpuBitsUnreadable)
            }
            other => panic!("expected diagnosed failure, got {:?}", other),
        }
    }

    #[test]
    fn test_gather_stops_at_first_missing_package() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.runner.on("dpkg -s omi", CommandOutput::exit(1));

        match SystemFacts::new(test.host()).gather() {
            Err(GatherError::Diagnosed(outcome)) => {
                assert_eq!(outcome.diagnosis, Diagnosis::PackageMissing(Package::Omi))
            }
            other => panic!("expected diagnosed failure, got {:?}", other),
        }
        assert!(!test.runner.was_called("dpkg -s scx"));
    }

    #[test]
    fn test_gather_no_package_manager() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.runner.on("which dpkg", CommandOutput::exit(1));

        match SystemFacts::new(test.host()).gather() {
            Err(GatherError::Diagnosed(outcome)) => {
                assert_eq!(outcome.diagnosis, Diagnosis::NoPackageManager)
            }
            other => panic!("expected diagnosed failure, got {:?}", other),
        }
        assert!(test.runner.was_called("which rpm"));
    }

    #[test]
    fn test_gather_missing_onboarding_file() {
        let test = TestHost::new();
        script_healthy_host(&test);

        match SystemFacts::new(test.host()).gather() {
            Err(GatherError::Diagnosed(outcome)) => {
                assert_eq!(outcome.diagnosis, Diagnosis::MissingFile);
                let evidence = outcome.evidence.unwrap();
                assert_eq!(evidence.field(0), Some("file"));
                assert!(evidence.field(1).unwrap().ends_with("omsadmin.conf"));
            }
            other => panic!("expected diagnosed failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_onboarding_file_needs_privilege() {
        let path = Path::new(crate::paths::OMSADMIN_CONF);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);

        match onboarding_error(path, denied) {
            GatherError::Diagnosed(outcome) => {
                assert_eq!(outcome.diagnosis, Diagnosis::PermissionDenied);
                assert_eq!(outcome.evidence.unwrap().field(0), Some(crate::paths::OMSADMIN_CONF));
            }
            other => panic!("expected diagnosed failure, got {:?}", other),
        }
    }

    #[test]
    fn test_other_onboarding_io_error_is_a_fault() {
        let test = TestHost::new();
        script_healthy_host(&test);
        test.mkdir(crate::paths::OMSADMIN_CONF);

        match SystemFacts::new(test.host()).gather() {
            Err(GatherError::Fault(Error::Io(_))) => {}
            other => panic!("expected an I/O fault, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_rpm_when_no_dpkg() {
        let test = TestHost::new();
        test.runner.on("which dpkg", CommandOutput::exit(1));
        test.runner.on("which rpm", CommandOutput::new(0, "/usr/bin/rpm\n"));
        assert_eq!(
            detect_package_manager(test.runner.as_ref()).unwrap(),
            Some(PackageManager::Rpm)
        );
    }
}
