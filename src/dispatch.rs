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

//! Fanning one [`Event`] out to every enabled [`Sink`].
//!
//! Sinks are isolated from one another: each is attempted in turn, in a fixed order, & a
//! failure in one is reported but never stops the next from being tried.

use crate::{
    broker::Publisher,
    config::Config,
    error::Error,
    event::Event,
    sink::{BrokerSink, ConsoleSink, FileSink, Sink},
    store::StoreWriter,
};

use tracing::error;

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

fn write_failure<W: Write + ?Sized>(out: &mut W, origin: &str, err: &Error) -> std::io::Result<()> {
    writeln!(out, "logit: {}: {}", origin, err)
}

/// Report a per-event failure to the operator; `origin` names the sink (or other component)
/// that failed.
///
/// If the process has installed a global [`tracing`] subscriber this goes there; otherwise a
/// single line is written to stderr. Either way it is independent of the console sink & its
/// level flags.
pub fn report_failure(origin: &str, err: &Error) {
    if tracing::dispatcher::has_been_set() {
        error!(origin, "{}", err);
    } else {
        // Nowhere left to report a failure to report.
        let _ = write_failure(&mut std::io::stderr().lock(), origin, err);
    }
}

/// The outcome of a single [`Dispatcher::dispatch`] call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    attempted: usize,
    failures: Vec<(&'static str, Error)>,
}

impl DispatchReport {
    /// The number of sinks tried
    pub fn attempted(&self) -> usize {
        self.attempted
    }
    /// The sinks that failed, by name, in the order in which they were tried
    pub fn failures(&self) -> &[(&'static str, Error)] {
        &self.failures
    }
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// An ordered collection of [`Sink`]s.
#[derive(Default)]
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
    diagnostics: Option<Mutex<Box<dyn Write + Send>>>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }
    /// The producer's sinks: console, then file, then broker.
    ///
    /// The broker sink is included only when it is enabled in `config` _and_ a `publisher` is
    /// supplied.
    pub fn producer(config: &Config, publisher: Option<Arc<dyn Publisher>>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        if config.sinks.console {
            dispatcher.push(ConsoleSink::stdout(config.console_levels));
        }
        if config.sinks.file {
            dispatcher.push(FileSink::new(&config.file));
        }
        if let Some(publisher) = publisher.filter(|_| config.sinks.broker) {
            dispatcher.push(BrokerSink::new(publisher));
        }
        dispatcher
    }
    /// The consumer's sinks: console, then file (beneath its output-method directory), then the
    /// persistent store.
    pub fn consumer(config: &Config, store: Option<StoreWriter>) -> Dispatcher {
        let mut dispatcher = Dispatcher::new();
        if config.sinks.console {
            dispatcher.push(ConsoleSink::stdout(config.console_levels));
        }
        if config.sinks.file {
            dispatcher.push(FileSink::by_method(&config.file));
        }
        if let Some(store) = store.filter(|_| config.sinks.store) {
            dispatcher.push(store);
        }
        dispatcher
    }
    /// Append a sink; it will be tried after all those already present.
    pub fn push<S: Sink + 'static>(&mut self, sink: S) -> &mut Dispatcher {
        self.sinks.push(Box::new(sink));
        self
    }
    /// Write failure reports to `out`, one line apiece, rather than via [`report_failure`].
    pub fn with_diagnostics<W: Write + Send + 'static>(&mut self, out: W) -> &mut Dispatcher {
        self.diagnostics = Some(Mutex::new(Box::new(out)));
        self
    }
    pub fn len(&self) -> usize {
        self.sinks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
    /// Sink names, in dispatch order
    pub fn names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|s| s.name()).collect()
    }
    /// Attempt delivery of `event` to every sink.
    pub fn dispatch(&self, event: &Event) -> DispatchReport {
        let mut report = DispatchReport::default();
        for sink in &self.sinks {
            report.attempted += 1;
            if let Err(err) = sink.deliver(event) {
                self.report(sink.name(), &err);
                report.failures.push((sink.name(), err));
            }
        }
        report
    }
    fn report(&self, origin: &str, err: &Error) {
        match &self.diagnostics {
            Some(out) => {
                let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
                let _ = write_failure(&mut *out, origin, err);
            }
            None => report_failure(origin, err),
        }
    }
}

#[cfg(test)]
pub(crate) mod test {

    use super::*;

    use crate::{
        broker::MemoryBroker,
        envelope,
        error::Result,
        level::Level,
        sink::test::{event, SharedBuffer},
    };

    /// A sink that always fails
    pub(crate) struct Broken;

    impl Sink for Broken {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn deliver(&self, _: &Event) -> Result<()> {
            Err(Error::io(
                "/dev/full",
                std::io::Error::new(std::io::ErrorKind::Other, "no space left on device"),
            ))
        }
    }

    /// A sink that remembers what it was given
    #[derive(Clone, Default)]
    pub(crate) struct Recorder(pub Arc<Mutex<Vec<Event>>>);

    impl Sink for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn deliver(&self, event: &Event) -> Result<()> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn isolation() {
        let recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(Broken).push(recorder.clone()).push(Broken);

        let report = dispatcher.dispatch(&event(Level::WARN));
        assert_eq!(report.attempted(), 3);
        assert!(!report.is_clean());
        assert_eq!(report.failures().len(), 2);
        assert_eq!(report.failures()[0].0, "broken");
        assert!(matches!(report.failures()[1].1, Error::Io { .. }));
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn producer_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .file(true)
            .file_path(dir.path())
            .broker(true)
            .build()
            .unwrap();
        let broker = MemoryBroker::new();
        assert_eq!(
            Dispatcher::producer(&config, Some(Arc::new(broker.clone()))).names(),
            vec!["console", "file", "broker"]
        );
        // No publisher, no broker sink
        assert_eq!(Dispatcher::producer(&config, None).names(), vec!["console", "file"]);

        // Same order, but with a console we can read
        let console = SharedBuffer::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher
            .push(ConsoleSink::new(console.clone(), config.console_levels))
            .push(FileSink::new(&config.file))
            .push(BrokerSink::new(Arc::new(broker.clone())));
        assert_eq!(dispatcher.names(), vec!["console", "file", "broker"]);

        let report = dispatcher.dispatch(&event(Level::INFO));
        assert!(report.is_clean());
        assert!(console.contents().ends_with(": someLogText\n"));
        assert_eq!(broker.pending(envelope::QUEUE), 1);
    }

    #[test]
    fn failure_reported_with_console_off() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the day directories ought to go
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let config = Config::builder()
            .console(false)
            .file(true)
            .file_path(&blocker)
            .build()
            .unwrap();

        let diagnostics = SharedBuffer::default();
        let mut dispatcher = Dispatcher::producer(&config, None);
        dispatcher.with_diagnostics(diagnostics.clone());
        assert_eq!(dispatcher.names(), vec!["file"]);

        let report = dispatcher.dispatch(&event(Level::ERROR));
        assert_eq!(report.failures().len(), 1);
        let out = diagnostics.contents();
        assert_eq!(out.lines().count(), 1, "{}", out);
        assert!(out.starts_with("logit: file: "), "{}", out);
    }

    #[test]
    fn broker_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::builder()
            .console(false)
            .file(true)
            .file_path(dir.path())
            .build()
            .unwrap();
        let broker = MemoryBroker::new();
        let dispatcher = Dispatcher::producer(&config, Some(Arc::new(broker.clone())));
        assert_eq!(dispatcher.names(), vec!["file"]);
        assert!(dispatcher.dispatch(&event(Level::INFO)).is_clean());
        assert_eq!(broker.pending(envelope::QUEUE), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn consumer_order() {
        let config = Config::builder()
            .file(true)
            .store(true)
            .store_url("sqlite::memory:")
            .build()
            .unwrap();
        let store = StoreWriter::connect(&config.store_url).unwrap();
        assert_eq!(
            Dispatcher::consumer(&config, Some(store)).names(),
            vec!["console", "file", "store"]
        );
        let config = Config::builder().console(false).build().unwrap();
        assert!(Dispatcher::consumer(&config, None).is_empty());
    }
}
