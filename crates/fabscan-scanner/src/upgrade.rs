//! Upgrade availability check

use fabscan_core::UpgradeInfo;

/// Answers "is there a newer release than `current_version`?"
///
/// Implementations swallow their own failures and report no upgrade.
pub trait UpgradeChecker: Send + Sync {
    fn check(&self, current_version: &str) -> UpgradeInfo;
}

impl<F> UpgradeChecker for F
where
    F: Fn(&str) -> UpgradeInfo + Send + Sync,
{
    fn check(&self, current_version: &str) -> UpgradeInfo {
        self(current_version)
    }
}

/// Checker for installs without an update channel
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpgrade;

impl UpgradeChecker for NoUpgrade {
    fn check(&self, current_version: &str) -> UpgradeInfo {
        UpgradeInfo {
            available: false,
            version: current_version.to_string(),
        }
    }
}
