//! Store version parsing.

use std::fmt;
use std::str::FromStr;

use crate::errors::StoreError;

/// A store version as an ordered tuple of integers, e.g. `5.6.2` -> `[5, 6, 2]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct StoreVersion(Vec<u32>);

impl StoreVersion {
    /// The major component. A version always has at least one component.
    pub fn major(&self) -> u32 {
        self.0.first().copied().unwrap_or(0)
    }

    /// All components in order.
    pub fn parts(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for StoreVersion {
    type Err = StoreError;

    /// Parse a dot-separated version string. Any non-numeric component makes
    /// the whole version untrustworthy, so no partial tuple is returned.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('.')
            .map(|part| part.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
            .map_err(|_| StoreError::invalid_version(s))
    }
}

impl fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let version: StoreVersion = "5.6.2".parse().unwrap();

        assert_eq!(version.parts(), &[5, 6, 2]);
        assert_eq!(version.major(), 5);
        assert_eq!(version.to_string(), "5.6.2");
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let result = "bad.version".parse::<StoreVersion>();

        assert!(matches!(result, Err(StoreError::InvalidVersion(v)) if v == "bad.version"));
    }

    #[test]
    fn test_parse_rejects_empty_and_suffixed() {
        assert!("".parse::<StoreVersion>().is_err());
        assert!("7.10.2-SNAPSHOT".parse::<StoreVersion>().is_err());
        assert!("5..1".parse::<StoreVersion>().is_err());
    }

    #[test]
    fn test_versions_order_numerically() {
        let old: StoreVersion = "2.4.6".parse().unwrap();
        let new: StoreVersion = "10.0".parse().unwrap();

        assert!(old < new);
    }
}
