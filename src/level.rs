// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of logit.
//
// logit is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// logit is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with logit.  If not,
// see <http://www.gnu.org/licenses/>.

//! Event level definitions.
//!
//! [`Level`] replicates the names used on the wire (the `MsgType` field of the broker envelope),
//! in the file sink & in the persistent store, so the variants are spelled exactly as they
//! appear there.

use serde::{Deserialize, Serialize};

type StdResult<T, E> = std::result::Result<T, E>;

/// The four levels at which an event may be emitted.
///
/// There is no DEBUG; `tracing`'s DEBUG is folded into [`Level::TRACE`] by the bridge
/// [`Layer`](crate::layer::Layer).
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// fine-grained diagnostic
    TRACE,
    /// normal, but significant condition
    INFO,
    /// warning conditions
    WARN,
    /// error conditions
    ERROR,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::TRACE, Level::INFO, Level::WARN, Level::ERROR];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::TRACE => "TRACE",
            Level::INFO => "INFO",
            Level::WARN => "WARN",
            Level::ERROR => "ERROR",
        }
    }
    /// Four-letter names get one column of padding after them so that console & file lines
    /// line up with the five-letter ones.
    pub fn is_padded(&self) -> bool {
        matches!(self, Level::INFO | Level::WARN)
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl std::fmt::Display for UnknownLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "'{}' is not one of TRACE, INFO, WARN or ERROR", self.0)
    }
}

impl std::error::Error for UnknownLevel {}

impl std::str::FromStr for Level {
    type Err = UnknownLevel;
    fn from_str(s: &str) -> StdResult<Self, Self::Err> {
        match s {
            "TRACE" => Ok(Level::TRACE),
            "INFO" => Ok(Level::INFO),
            "WARN" => Ok(Level::WARN),
            "ERROR" => Ok(Level::ERROR),
            _ => Err(UnknownLevel(s.to_owned())),
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::TRACE,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod level_tests {
    use super::*;

    #[test]
    fn names() {
        for level in Level::ALL {
            assert_eq!(level.as_str().parse::<Level>().unwrap(), level);
            assert_eq!(format!("{}", level), level.as_str());
        }
        assert!("DEBUG".parse::<Level>().is_err());
        assert!("info".parse::<Level>().is_err());
    }

    #[test]
    fn padding() {
        assert!(!Level::TRACE.is_padded());
        assert!(Level::INFO.is_padded());
        assert!(Level::WARN.is_padded());
        assert!(!Level::ERROR.is_padded());
    }

    #[test]
    fn tracing_levels() {
        assert_eq!(Level::from(&tracing::Level::DEBUG), Level::TRACE);
        assert_eq!(Level::from(&tracing::Level::WARN), Level::WARN);
    }
}
