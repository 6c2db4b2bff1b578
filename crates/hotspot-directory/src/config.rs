//! Directory configuration and lookup strategy.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// LookupStrategy
// ---------------------------------------------------------------------------

/// How an account is located by name.
///
/// - **FullScan**: list every account and match `name` locally. Always
///   correct, costs one full listing.
/// - **Filtered**: send `?name=<name>` and let the router filter. Some
///   firmware answers a filtered print with nothing even when the account
///   exists, so an empty answer falls back to a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LookupStrategy {
    #[default]
    FullScan,
    Filtered,
}

impl std::fmt::Display for LookupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullScan => f.write_str("full-scan"),
            Self::Filtered => f.write_str("filtered"),
        }
    }
}

// ---------------------------------------------------------------------------
// DirectoryConfig
// ---------------------------------------------------------------------------

/// Configuration for hotspot directory operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Command menu the hotspot lives under.
    ///
    /// Default: `/ip/hotspot`, giving `/ip/hotspot/user/print` and so on.
    pub menu: String,

    /// How accounts are found by name. Removal verification always does a
    /// full scan regardless.
    pub lookup: LookupStrategy,
}

impl DirectoryConfig {
    /// Builds a command path under the hotspot menu, e.g.
    /// `command("user", "print")` → `/ip/hotspot/user/print`.
    pub fn command(&self, table: &str, verb: &str) -> String {
        format!("{}/{table}/{verb}", self.menu.trim_end_matches('/'))
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            menu: "/ip/hotspot".to_string(),
            lookup: LookupStrategy::FullScan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_config_default() {
        let config = DirectoryConfig::default();
        assert_eq!(config.lookup, LookupStrategy::FullScan);
        assert_eq!(config.command("user", "print"), "/ip/hotspot/user/print");
    }

    #[test]
    fn test_command_trims_trailing_slash() {
        let config = DirectoryConfig {
            menu: "/hotspot/".into(),
            ..DirectoryConfig::default()
        };
        assert_eq!(config.command("active", "remove"), "/hotspot/active/remove");
    }

    #[test]
    fn test_lookup_strategy_display() {
        assert_eq!(LookupStrategy::FullScan.to_string(), "full-scan");
        assert_eq!(LookupStrategy::Filtered.to_string(), "filtered");
    }
}
