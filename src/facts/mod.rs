//! Lazily populated cache of system facts.
//!
//! Facts are cheap to gather together and expensive to gather one at a time
//! (each needs an external tool), so a miss on any key triggers one full
//! refresh. A refresh commits all of its facts or none of them.

mod probe;

pub use probe::{PackageManager, SystemFacts, detect_package_manager, package_version};

use crate::models::Outcome;
use crate::sys::Host;
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Symbolic fact keys.
pub mod keys {
    use crate::models::Package;

    pub const CPU_BITS: &str = "CPU_BITS";
    pub const OS_ID: &str = "OS_ID";
    pub const OS_VERSION_ID: &str = "OS_VERSION_ID";
    pub const OS_READABLE_ID: &str = "OS_READABLE_ID";
    pub const PKG_MANAGER: &str = "PKG_MANAGER";
    /// Onboarding keys (from omsadmin.conf)
    pub const WORKSPACE_ID: &str = "WORKSPACE_ID";
    pub const OMS_ENDPOINT: &str = "OMS_ENDPOINT";

    /// Key holding the installed version of `package`.
    pub fn package_version(package: Package) -> String {
        format!("{}_VERSION", package.name().to_uppercase())
    }
}

/// A complete set of facts from one refresh.
pub type Facts = BTreeMap<String, String>;

/// Why a refresh did not produce facts.
#[derive(Debug, thiserror::Error)]
pub enum GatherError {
    /// The environment explains the failure (e.g. a missing package)
    #[error("fact refresh failed: {}", .0.diagnosis)]
    Diagnosed(Outcome),

    /// Unclassified fault; propagated to the caller
    #[error(transparent)]
    Fault(#[from] Error),
}

/// Gathers every fact in a single pass.
pub trait FactSource {
    fn gather(&self) -> std::result::Result<Facts, GatherError>;
}

/// Read-through cache over a [`FactSource`].
pub struct FactCache {
    source: Box<dyn FactSource>,
    facts: Facts,
    refreshed: bool,
    failure: Option<Outcome>,
}

impl FactCache {
    pub fn new(source: Box<dyn FactSource>) -> Self {
        Self {
            source,
            facts: Facts::new(),
            refreshed: false,
            failure: None,
        }
    }

    /// Cache backed by the live host.
    pub fn for_host(host: &Host) -> Self {
        Self::new(Box::new(SystemFacts::new(host.clone())))
    }

    /// Look up a fact, refreshing once if the key has never been seen.
    ///
    /// Returns `None` for keys that are absent or blank after a refresh. A
    /// key missing after a refresh does not trigger another one; use
    /// [`FactCache::force_refresh`] for that.
    pub fn lookup(&mut self, key: &str) -> Result<Option<String>> {
        if !self.facts.contains_key(key) && !self.refreshed {
            self.refresh()?;
        }
        Ok(self
            .facts
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned())
    }

    /// Re-gather all facts, e.g. after remediation.
    ///
    /// Returns `Ok(false)` when the refresh was diagnosed as failing; the
    /// failure is kept for [`FactCache::take_failure`].
    pub fn force_refresh(&mut self) -> Result<bool> {
        self.refresh()
    }

    fn refresh(&mut self) -> Result<bool> {
        tracing::debug!("refreshing system facts");
        self.refreshed = true;
        match self.source.gather() {
            Ok(facts) => {
                tracing::debug!(count = facts.len(), "system facts refreshed");
                self.facts = facts;
                self.failure = None;
                Ok(true)
            }
            Err(GatherError::Diagnosed(outcome)) => {
                tracing::info!(diagnosis = %outcome.diagnosis, "system fact refresh failed");
                self.failure = Some(outcome);
                Ok(false)
            }
            Err(GatherError::Fault(e)) => Err(e),
        }
    }

    /// The diagnosed failure of the most recent refresh, if it failed.
    pub fn take_failure(&mut self) -> Option<Outcome> {
        self.failure.take()
    }

    /// All committed facts, refreshing first if nothing has been gathered.
    pub fn all(&mut self) -> Result<&Facts> {
        if !self.refreshed {
            self.refresh()?;
        }
        Ok(&self.facts)
    }
}
