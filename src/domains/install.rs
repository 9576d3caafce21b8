use super::InstallCheck;
use crate::Result;
use crate::facts::{detect_package_manager, package_version};
use crate::models::{Diagnosis, Evidence, Package};
use crate::session::Session;
use crate::sys::Host;

/// Installation check backed by the host package manager.
///
/// Queries the package manager directly rather than through the fact cache,
/// since a failed install is exactly what makes the cache unusable.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageInstallCheck;

impl InstallCheck for PackageInstallCheck {
    fn installed_version(&self, host: &Host) -> Result<Option<String>> {
        let Some(manager) = detect_package_manager(host.runner())? else {
            return Ok(None);
        };
        package_version(host.runner(), manager, Package::Omsagent)
    }

    fn diagnose(&self, session: &mut Session<'_>, prior: Diagnosis) -> Result<Diagnosis> {
        tracing::info!("checking agent installation");
        session.note("CHECKING INSTALLATION...");

        let Some(manager) = detect_package_manager(session.host.runner())? else {
            session.evidence.push(Evidence::new(["dpkg", "rpm"]));
            return Ok(session.render(Diagnosis::NoPackageManager));
        };

        for package in Package::REQUIRED {
            session.note(&format!("Checking if {} is installed...", package));
            if package_version(session.host.runner(), manager, package)?.is_none() {
                session
                    .evidence
                    .push(Evidence::new(["package", package.name()]));
                return Ok(session.render(Diagnosis::PackageMissing(package)));
            }
        }

        Ok(prior)
    }
}
