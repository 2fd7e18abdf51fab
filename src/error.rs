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
//! [logit](crate) errors

use backtrace::Backtrace;

use std::path::PathBuf;

/// [logit](crate) error type
///
/// [logit](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of a
/// straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to respond.
///
/// None of these ever escape the four public entry points on [`Logger`]; they surface from
/// initialization (where they are fatal) and from the individual sinks (where they are reported
/// & discarded).
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
/// [`Logger`]: crate::logger::Logger
#[non_exhaustive]
pub enum Error {
    /// The configuration could not be read or parsed
    BadConfig {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The configuration parsed, but a setting is unusable
    InvalidSetting {
        name: &'static str,
        reason: String,
        back: Backtrace,
    },
    /// chrono refused the date/time pattern
    BadDateTimeFormat { pattern: String, back: Backtrace },
    /// A timestamp did not match the configured date/time pattern
    BadTimestamp {
        text: String,
        source: chrono::ParseError,
        back: Backtrace,
    },
    /// File sink I/O failure
    Io {
        path: PathBuf,
        source: std::io::Error,
        back: Backtrace,
    },
    /// Console sink I/O failure
    Console {
        source: std::io::Error,
        back: Backtrace,
    },
    /// Failed to serialize an Event
    Encode {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// A broker message was not a valid envelope
    Decode {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// General broker error
    Broker {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General persistent store error
    Store {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// The consumer's dispatch worker could not keep up & a message was dropped
    BacklogFull { capacity: usize, back: Backtrace },
    /// The consumer's dispatch worker could not be started
    Worker {
        source: std::io::Error,
        back: Backtrace,
    },
}

impl Error {
    pub fn broker<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Broker {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
    pub fn store<E>(err: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Store {
            source: Box::new(err),
            back: Backtrace::new(),
        }
    }
    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Error {
        Error::Io {
            path: path.into(),
            source,
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { source, .. } => write!(f, "Failed to load configuration: {}", source),
            Error::InvalidSetting { name, reason, .. } => {
                write!(f, "Invalid setting '{}': {}", name, reason)
            }
            Error::BadDateTimeFormat { pattern, .. } => {
                write!(f, "'{}' is not a valid date/time pattern", pattern)
            }
            Error::BadTimestamp { text, source, .. } => write!(
                f,
                "'{}' does not match the configured date/time pattern: {}",
                text, source
            ),
            Error::Io { path, source, .. } => {
                write!(f, "While writing {}, got {}", path.display(), source)
            }
            Error::Console { source, .. } => write!(f, "While writing to the console, got {}", source),
            Error::Encode { source, .. } => write!(f, "Failed to encode event: {}", source),
            Error::Decode { source, .. } => {
                write!(f, "Failed to decode broker message: {}", source)
            }
            Error::Broker { source, .. } => write!(f, "Broker error: {}", source),
            Error::Store { source, .. } => write!(f, "Store error: {}", source),
            Error::BacklogFull { capacity, .. } => write!(
                f,
                "Dispatch backlog of {} messages is full; message dropped",
                capacity
            ),
            Error::Worker { source, .. } => {
                write!(f, "Failed to start the dispatch worker: {}", source)
            }
            _ => write!(f, "Other logit error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadConfig { back, .. }
            | Error::InvalidSetting { back, .. }
            | Error::BadDateTimeFormat { back, .. }
            | Error::BadTimestamp { back, .. }
            | Error::Io { back, .. }
            | Error::Console { back, .. }
            | Error::Encode { back, .. }
            | Error::Decode { back, .. }
            | Error::Broker { back, .. }
            | Error::Store { back, .. }
            | Error::BacklogFull { back, .. }
            | Error::Worker { back, .. } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "logit error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::BadConfig { source, .. }
            | Error::Broker { source, .. }
            | Error::Store { source, .. } => Some(source.as_ref()),
            Error::BadTimestamp { source, .. } => Some(source),
            Error::Io { source, .. }
            | Error::Console { source, .. }
            | Error::Worker { source, .. } => Some(source),
            Error::Encode { source, .. } | Error::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
