//! Protocol logging severities.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight syslog-style severities a client may request from a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Detailed debugging information
    Debug,
    /// General informational messages
    Info,
    /// Normal but significant events
    Notice,
    /// Warning conditions
    Warning,
    /// Error conditions
    Error,
    /// Critical conditions
    Critical,
    /// Action must be taken immediately
    Alert,
    /// System is unusable
    Emergency,
}

impl LogLevel {
    /// All levels, least severe first.
    pub const ALL: [Self; 8] = [
        Self::Debug,
        Self::Info,
        Self::Notice,
        Self::Warning,
        Self::Error,
        Self::Critical,
        Self::Alert,
        Self::Emergency,
    ];

    /// Wire name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        }
    }

    /// Fold the levels many servers do not distinguish onto their neighbours:
    /// `notice` becomes `warning`, `alert` and `emergency` become `critical`.
    #[must_use]
    pub fn normalized(self) -> Self {
        match self {
            Self::Notice => Self::Warning,
            Self::Alert | Self::Emergency => Self::Critical,
            other => other,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names none of the eight levels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid logging level '{0}', expected one of debug, info, notice, warning, error, critical, alert, emergency")]
pub struct ParseLogLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| ParseLogLevelError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_levels() {
        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        let err = "verbose".parse::<LogLevel>().unwrap_err();
        assert!(err.to_string().contains("verbose"));
        assert!("DEBUG".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_normalized() {
        assert_eq!(LogLevel::Notice.normalized(), LogLevel::Warning);
        assert_eq!(LogLevel::Alert.normalized(), LogLevel::Critical);
        assert_eq!(LogLevel::Emergency.normalized(), LogLevel::Critical);
        assert_eq!(LogLevel::Debug.normalized(), LogLevel::Debug);
        assert_eq!(LogLevel::Error.normalized(), LogLevel::Error);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Warning).unwrap(), "\"warning\"");
        let parsed: LogLevel = serde_json::from_str("\"emergency\"").unwrap();
        assert_eq!(parsed, LogLevel::Emergency);
    }
}
