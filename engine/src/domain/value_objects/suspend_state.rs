//! Suspend state value objects
//! Admission-control states and the suspend timeout convention

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Admission state of a process, owned by its admission controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SuspendState {
    /// New work is admitted
    #[default]
    Running,

    /// New work is refused, in-flight work is draining
    Suspending,

    /// Drained: nothing is in flight and nothing is admitted
    Suspended,
}

impl fmt::Display for SuspendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendState::Running => write!(f, "running"),
            SuspendState::Suspending => write!(f, "suspending"),
            SuspendState::Suspended => write!(f, "suspended"),
        }
    }
}

/// How long a suspend request may wait for in-flight work to drain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendTimeout {
    /// Do not wait at all
    Immediate,

    /// Wait until drained, however long it takes
    Infinite,

    /// Wait at most this long
    Bounded(Duration),
}

impl SuspendTimeout {
    /// Convert the management-surface convention: 0 means immediate, a negative
    /// value waits forever, a positive value is a number of seconds.
    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            0 => SuspendTimeout::Immediate,
            s if s < 0 => SuspendTimeout::Infinite,
            s => SuspendTimeout::Bounded(Duration::from_secs(s.unsigned_abs())),
        }
    }

    /// Timeout in the admission controller's millisecond unit (-1 = infinite)
    pub fn as_millis(&self) -> i64 {
        match self {
            SuspendTimeout::Immediate => 0,
            SuspendTimeout::Infinite => -1,
            SuspendTimeout::Bounded(duration) => {
                i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
            }
        }
    }
}

impl fmt::Display for SuspendTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspendTimeout::Immediate => write!(f, "immediate"),
            SuspendTimeout::Infinite => write!(f, "infinite"),
            SuspendTimeout::Bounded(duration) => write!(f, "{}ms", duration.as_millis()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_seconds() {
        assert_eq!(SuspendTimeout::from_seconds(0), SuspendTimeout::Immediate);
        assert_eq!(SuspendTimeout::from_seconds(-1), SuspendTimeout::Infinite);
        assert_eq!(SuspendTimeout::from_seconds(-30), SuspendTimeout::Infinite);
        assert_eq!(
            SuspendTimeout::from_seconds(5),
            SuspendTimeout::Bounded(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_as_millis() {
        assert_eq!(SuspendTimeout::from_seconds(0).as_millis(), 0);
        assert_eq!(SuspendTimeout::from_seconds(-1).as_millis(), -1);
        assert_eq!(SuspendTimeout::from_seconds(3).as_millis(), 3000);
    }

    #[test]
    fn test_default_state() {
        assert_eq!(SuspendState::default(), SuspendState::Running);
    }
}
