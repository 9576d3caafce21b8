//! Neighbouring diagnostic domains the heartbeat check hands off to.
//!
//! When a heartbeat step turns out to be an installation or connectivity
//! problem, the session's verdict comes from the domain that owns it.

mod connect;
mod install;

pub use connect::OnboardingConnectionCheck;
pub use install::PackageInstallCheck;

use crate::Result;
use crate::models::Diagnosis;
use crate::session::Session;
use crate::sys::Host;

/// Installation diagnostics.
pub trait InstallCheck {
    /// Installed agent version, or `None` if the agent package is missing.
    fn installed_version(&self, host: &Host) -> Result<Option<String>>;

    /// Diagnose the installation, returning its verdict.
    fn diagnose(&self, session: &mut Session<'_>, prior: Diagnosis) -> Result<Diagnosis>;
}

/// Connectivity diagnostics.
pub trait ConnectionCheck {
    /// Diagnose connectivity, returning its verdict.
    ///
    /// Unless `carry_errors` is set, evidence still pending from the caller
    /// is discarded first.
    fn diagnose(
        &self,
        session: &mut Session<'_>,
        carry_errors: bool,
        prior: Diagnosis,
    ) -> Result<Diagnosis>;
}
