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

//! Leveled, caller-annotated log events fanned out to the console, per-day files, an AMQP
//! broker & a SQL table.
//!
//! # Introduction
//!
//! [logit](crate) is a small structured-logging pipeline. Application code emits events at one of
//! four levels (TRACE, INFO, WARN & ERROR), each carrying the site from which it was emitted
//! (package, source file, function & line), a free-form message and an opaque correlation
//! context (a request id, say). Each event is delivered to every sink the process has enabled:
//!
//! - the console, with per-level visibility
//! - a file beneath a directory named for the current day
//! - a message broker queue
//!
//! A separate consumer process ([`logit-server`]) drains that queue & delivers each event again
//! to its own sinks: console, file, and a relational table. Producers are thereby decoupled from
//! slow (or absent) storage.
//!
//! [`logit-server`]: https://docs.rs/logit-server
//!
//! Sinks are independent of one another: a failing file write doesn't suppress the console line
//! or the broker publish. Nor do sink failures ever reach the code that logged; they are
//! reported to stderr (or to your [`tracing`] subscriber, if you've installed one) & discarded.
//!
//! # Usage
//!
//! Build a [`Config`](config::Config) once, at startup, and construct a
//! [`Logger`](logger::Logger) from it:
//!
//! ```rust
//! use logit::{config::Config, logger::Logger};
//!
//! let config = Config::builder()
//!     .console(true)
//!     .build()
//!     .unwrap();
//! let logger = Logger::new(&config).unwrap();
//!
//! // The macros capture their call site at compile time...
//! logit::info!(logger, "someLogText", "someLogContext");
//! logit::error!(logger, "upstream refused the order", "req-42", "E1");
//! // while the methods use `#[track_caller]` (and, optionally, the call stack).
//! logger.warn("disk space low", "");
//! ```
//!
//! Configuration may also be read from JSON; see [`config`]. Applications already instrumented
//! with [`tracing`] can route their events through [logit](crate) with [`layer::Layer`].
//!
//! See [`_docs`] for an overview of how the pieces fit together.

pub mod _docs;
pub mod broker;
pub mod caller;
pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod event;
pub mod formatter;
pub mod layer;
pub mod level;
pub mod logger;
pub mod sink;
pub mod store;

mod macros;
