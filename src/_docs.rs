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

//! # General logit Documentation
//!
//! ## Introduction
//!
//! General (i.e. not documenting a particular struct or a method) documentation goes here.
//!
//! ## From Call Site to Sink
//!
//! An event travels in one direction:
//!
//! ```text
//! call site -> CallerContext -> EventBuilder -> Dispatcher -> {console, file, broker}
//!                                                                           |
//!                     {console, file, store} <- Dispatcher <- Consumer <----+
//! ```
//!
//! ### Capturing the Caller
//!
//! A [CallerContext] names the package, source file, function & line from which an event was
//! emitted. The logging macros ([info!](crate::info) & friends) fill it in at compile time. The
//! [Logger] methods are `#[track_caller]`, which gives the file & line; when `ResolveSymbols` is
//! set they also walk the stack for the package & function. That walk is best-effort: anything
//! it can't make out is left empty.
//!
//! [CallerContext]: crate::caller::CallerContext
//! [Logger]: crate::logger::Logger
//!
//! ### Building the Event
//!
//! An [EventBuilder] stamps the current local time (formatted per the configured chrono pattern)
//! & the process name onto the caller context, message, correlation context & error code. The
//! resulting [Event] is immutable; sinks only read it.
//!
//! [EventBuilder]: crate::event::EventBuilder
//! [Event]: crate::event::Event
//!
//! ### Dispatching
//!
//! A [Dispatcher] holds an ordered list of [Sink]s & tries each in turn. Each sink renders the
//! event with a [Formatter] & ships the result:
//!
//! | sink            | format                      | destination                                  |
//! |-----------------|-----------------------------|----------------------------------------------|
//! | [ConsoleSink]   | [ConsoleLine]               | stdout, subject to per-level flags           |
//! | [FileSink]      | [DelimitedLine] or JSON     | `<base>/[<method>/]<DD-MM-YYYY>/<file name>` |
//! | [BrokerSink]    | the [envelope]              | the `logs` queue                             |
//! | [StoreWriter]   | one row                     | the `t_logs` table                           |
//!
//! [Dispatcher]: crate::dispatch::Dispatcher
//! [Sink]: crate::sink::Sink
//! [Formatter]: crate::formatter::Formatter
//! [ConsoleSink]: crate::sink::ConsoleSink
//! [FileSink]: crate::sink::FileSink
//! [BrokerSink]: crate::sink::BrokerSink
//! [StoreWriter]: crate::store::StoreWriter
//! [ConsoleLine]: crate::formatter::ConsoleLine
//! [DelimitedLine]: crate::formatter::DelimitedLine
//! [envelope]: crate::envelope
//!
//! A sink that fails doesn't stop the others; its error is collected in the [DispatchReport] &
//! reported via [report_failure].
//!
//! [DispatchReport]: crate::dispatch::DispatchReport
//! [report_failure]: crate::dispatch::report_failure
//!
//! ### The Consumer
//!
//! A [Consumer] subscribes to the `logs` queue through a [Subscriber] (normally an
//! [AmqpBroker]), decodes each message & hands the event to its own [Dispatcher]. Messages are
//! acknowledged as soon as they're taken off the queue, so delivery is at-most-once. A message
//! that won't decode is reported & skipped.
//!
//! [Consumer]: crate::consumer::Consumer
//! [Subscriber]: crate::broker::Subscriber
//! [AmqpBroker]: crate::broker::AmqpBroker
//!
//! ## How This Plugs-In to the Tracing Framework
//!
//! [logit](crate) uses [tracing] for its own diagnostics. Going the other way, [Layer] implements
//! [tracing_subscriber::layer::Layer], so that an application's tracing events can be delivered
//! through a [Logger] like any other. The Layer ignores events whose target is [logit](crate)'s
//! own, so the pipeline's reports about itself are never fed back into it.
//!
//! [Layer]: crate::layer::Layer
