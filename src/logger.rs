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

//! The producer's public entry points.
//!
//! A [`Logger`] is constructed once, from a [`Config`], & shared by reference (or [`Arc`]) with
//! whatever needs to log. Its four entry points, [`Logger::trace`], [`Logger::info`],
//! [`Logger::warn`] & [`Logger::error`], never fail & never panic: each builds an [`Event`], tries
//! every enabled sink & returns. Per-sink failures are reported via
//! [`report_failure`](crate::dispatch::report_failure).
//!
//! # Examples
//!
//! ```rust
//! use logit::{config::Config, logger::Logger};
//! let logger = Logger::new(&Config::builder().build().unwrap()).unwrap();
//! logger.info("someLogText", "someLogContext");
//! logger.error("disk full", "req-42", "E1");
//! ```
//!
//! [`Event`]: crate::event::Event

use crate::{
    broker::{AmqpBroker, Publisher},
    caller::{app_name, CallerContext},
    config::Config,
    dispatch::{DispatchReport, Dispatcher},
    error::Result,
    event::EventBuilder,
    level::Level,
    sink,
};

use tracing::debug;

use std::{panic::Location, sync::Arc};

/// Stack distance from an entry point to the frame whose site we record: its caller.
const CALLER_DEPTH: usize = 1;

/// Builds [`Event`](crate::event::Event)s & hands them to a [`Dispatcher`].
pub struct Logger {
    builder: EventBuilder,
    dispatcher: Dispatcher,
    resolve_symbols: bool,
}

impl Logger {
    /// Construct a [`Logger`] with the producer sinks `config` enables.
    ///
    /// This is where the prerequisites of each sink are established: the file sink's base
    /// directory is created, and if the broker sink is enabled, the broker is connected. Any
    /// failure here is returned; a process that can't set up its logger should not carry on.
    pub fn new(config: &Config) -> Result<Logger> {
        config.validate()?;
        if config.sinks.file {
            sink::prepare_base(&config.file)?;
        }
        let publisher: Option<Arc<dyn Publisher>> = if config.sinks.broker {
            let broker = AmqpBroker::connect(config.broker_address.clone())?;
            debug!(address = broker.address(), "connected to the broker");
            Some(Arc::new(broker))
        } else {
            None
        };
        Logger::with_dispatcher(config, Dispatcher::producer(config, publisher))
    }
    /// Construct a [`Logger`] that delivers to an arbitrary set of sinks; only the date/time
    /// pattern & symbol resolution settings are taken from `config`.
    pub fn with_dispatcher(config: &Config, dispatcher: Dispatcher) -> Result<Logger> {
        Ok(Logger {
            builder: EventBuilder::new(config.date_time_format()?, app_name()),
            dispatcher,
            resolve_symbols: config.resolve_symbols,
        })
    }
    pub fn builder(&self) -> &EventBuilder {
        &self.builder
    }
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
    #[track_caller]
    #[inline(never)]
    pub fn trace(&self, text: &str, context: &str) {
        let site = self.site(Location::caller());
        self.log(Level::TRACE, text, context, "", site);
    }
    #[track_caller]
    #[inline(never)]
    pub fn info(&self, text: &str, context: &str) {
        let site = self.site(Location::caller());
        self.log(Level::INFO, text, context, "", site);
    }
    #[track_caller]
    #[inline(never)]
    pub fn warn(&self, text: &str, context: &str) {
        let site = self.site(Location::caller());
        self.log(Level::WARN, text, context, "", site);
    }
    #[track_caller]
    #[inline(never)]
    pub fn error(&self, text: &str, context: &str, err_code: &str) {
        let site = self.site(Location::caller());
        self.log(Level::ERROR, text, context, err_code, site);
    }
    /// Build & dispatch an event whose caller has already been worked out; this is what the
    /// macros & the [`tracing`] bridge use.
    pub fn log(
        &self,
        level: Level,
        text: &str,
        context: &str,
        err_code: &str,
        caller: CallerContext,
    ) -> DispatchReport {
        let event = self.builder.build(level, text, context, err_code, caller);
        self.dispatcher.dispatch(&event)
    }
    /// File & line come from `#[track_caller]`; package & function, if asked for, from the
    /// stack. Must be called directly from an entry point.
    #[inline(never)]
    fn site(&self, location: &Location<'_>) -> CallerContext {
        let here = CallerContext::from_location(location);
        if self.resolve_symbols {
            here.or(CallerContext::resolve(CALLER_DEPTH))
        } else {
            here
        }
    }
}
