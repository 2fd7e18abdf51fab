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

//! Event destinations.
//!
//! This module defines the [`Sink`] trait that every destination implements, as well as the
//! console, file & broker implementations. The persistent store lives in
//! [`store`](crate::store).

use crate::{
    broker::Publisher,
    config::{ConsoleLevels, FileSettings, OutputMethod},
    envelope,
    error::{Error, Result},
    event::Event,
    formatter::{ConsoleLine, Formatter, LineFormat},
};

use backtrace::Backtrace;
use chrono::{Local, NaiveDate};

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Operations all sinks must support.
///
/// A sink neither retains nor alters the [`Event`]; it renders it & ships it. Failures are
/// returned, never panicked, so that the [`Dispatcher`](crate::dispatch::Dispatcher) can carry on
/// to the next sink.
pub trait Sink: Send + Sync {
    /// A short, human-readable name used in diagnostics
    fn name(&self) -> &'static str;
    fn deliver(&self, event: &Event) -> Result<()>;
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                            console                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Writes [`ConsoleLine`]s to a terminal (or anything else that implements [`Write`]).
///
/// Each level may be shown or suppressed independently of whether the console sink is enabled
/// at all.
pub struct ConsoleSink<W: Write + Send> {
    writer: Mutex<W>,
    levels: ConsoleLevels,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(levels: ConsoleLevels) -> Self {
        ConsoleSink::new(std::io::stdout(), levels)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W, levels: ConsoleLevels) -> Self {
        ConsoleSink {
            writer: Mutex::new(writer),
            levels,
        }
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn name(&self) -> &'static str {
        "console"
    }
    fn deliver(&self, event: &Event) -> Result<()> {
        if !self.levels.shows(event.level()) {
            return Ok(());
        }
        let line = ConsoleLine.format(event)?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer
            .write_all(&line)
            .and_then(|_| writer.flush())
            .map_err(|source| Error::Console {
                source,
                back: Backtrace::new(),
            })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                              file                                              //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The calendar-day directory name: `DD-MM-YYYY`.
pub fn day_directory(day: NaiveDate) -> String {
    day.format("%d-%m-%Y").to_string()
}

/// Create the file sink's base directory, if need be; run at startup, where failure is fatal.
pub fn prepare_base(settings: &FileSettings) -> Result<()> {
    std::fs::create_dir_all(&settings.path).map_err(|err| Error::io(&settings.path, err))
}

/// Appends one line per event to `<base>/[<method>/]<DD-MM-YYYY>/<file name>`.
///
/// The day is taken from the clock at the moment of writing, so each day's events land in a
/// file of their own. Directories & the file are created on first use; the file is opened in
/// append mode for each write & the line handed over in a single write, leaving concurrent
/// writers to the operating system's append semantics.
pub struct FileSink {
    base: PathBuf,
    namespace: Option<&'static str>,
    file_name: String,
    format: LineFormat,
    today: Box<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl FileSink {
    /// A sink laid out the producer's way, with no output-method directory.
    pub fn new(settings: &FileSettings) -> FileSink {
        FileSink {
            base: settings.path.clone(),
            namespace: None,
            file_name: settings.name.clone(),
            format: LineFormat::new(settings.method, &settings.separator),
            today: Box::new(|| Local::now().date_naive()),
        }
    }
    /// A sink laid out the consumer's way, beneath a `text/` or `json/` directory.
    pub fn by_method(settings: &FileSettings) -> FileSink {
        FileSink {
            namespace: Some(settings.method.as_str()),
            ..FileSink::new(settings)
        }
    }
    /// Replace the clock from which the day directory is chosen.
    pub fn with_clock<F>(mut self, today: F) -> FileSink
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Box::new(today);
        self
    }
    pub fn method(&self) -> OutputMethod {
        self.format.method()
    }
    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        let mut path = self.base.clone();
        if let Some(namespace) = self.namespace {
            path.push(namespace);
        }
        path.push(day_directory(day));
        path.push(&self.file_name);
        path
    }
}

fn append(path: &Path, line: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| Error::io(path, err))?;
    file.write_all(line).map_err(|err| Error::io(path, err))
}

impl Sink for FileSink {
    fn name(&self) -> &'static str {
        "file"
    }
    fn deliver(&self, event: &Event) -> Result<()> {
        let line = self.format.format(event)?;
        append(&self.path_for((self.today)()), &line)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                             broker                                             //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Publishes the [`envelope`] to the well-known queue; fire-and-forget.
pub struct BrokerSink<P: Publisher> {
    publisher: P,
}

impl<P: Publisher> BrokerSink<P> {
    pub fn new(publisher: P) -> Self {
        BrokerSink { publisher }
    }
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<P: Publisher> Sink for BrokerSink<P> {
    fn name(&self) -> &'static str {
        "broker"
    }
    fn deliver(&self, event: &Event) -> Result<()> {
        self.publisher
            .publish(envelope::QUEUE, &envelope::encode(event)?)
    }
}

#[cfg(test)]
pub(crate) mod test {

    use super::*;

    use crate::{
        broker::MemoryBroker,
        caller::CallerContext,
        event::{DateTimeFormat, EventBuilder},
        level::Level,
    };

    use std::sync::Arc;

    /// A [`Write`] implementation whose contents the test can inspect afterward
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn event(level: Level) -> Event {
        EventBuilder::new(DateTimeFormat::default(), "svc".to_owned()).build(
            level,
            "someLogText",
            "someLogContext",
            if level == Level::ERROR { "E1" } else { "" },
            CallerContext::from_site("app", "src/main.rs", "app::main", 12),
        )
    }

    #[test]
    fn console_levels() {
        let buffer = SharedBuffer::default();
        let sink = ConsoleSink::new(
            buffer.clone(),
            ConsoleLevels {
                trace: false,
                ..ConsoleLevels::default()
            },
        );
        sink.deliver(&event(Level::TRACE)).unwrap();
        assert_eq!(buffer.contents(), "");
        sink.deliver(&event(Level::INFO)).unwrap();
        let out = buffer.contents();
        assert!(out.starts_with("INFO  "));
        assert!(out.ends_with(" ::svc:app:main.rs:main:12: someLogText\n"));
    }

    #[test]
    fn file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings {
            path: dir.path().to_path_buf(),
            name: "app.log".to_owned(),
            separator: "|".to_owned(),
            method: OutputMethod::Json,
        };
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            FileSink::new(&settings).path_for(day),
            dir.path().join("09-03-2024").join("app.log")
        );
        assert_eq!(
            FileSink::by_method(&settings).path_for(day),
            dir.path().join("json").join("09-03-2024").join("app.log")
        );
    }

    #[test]
    fn file_days() {
        let dir = tempfile::tempdir().unwrap();
        let settings = FileSettings {
            path: dir.path().to_path_buf(),
            name: "app.log".to_owned(),
            ..FileSettings::default()
        };
        let monday = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();

        FileSink::new(&settings)
            .with_clock(move || monday)
            .deliver(&event(Level::INFO))
            .unwrap();
        let sink = FileSink::new(&settings).with_clock(move || tuesday);
        sink.deliver(&event(Level::ERROR)).unwrap();
        sink.deliver(&event(Level::WARN)).unwrap();

        let first = std::fs::read_to_string(dir.path().join("11-03-2024/app.log")).unwrap();
        let second = std::fs::read_to_string(dir.path().join("12-03-2024/app.log")).unwrap();
        assert_eq!(first.lines().count(), 1);
        assert!(first.starts_with("INFO |"));
        assert!(first.ends_with("|someLogText|someLogContext\n"));
        assert_eq!(second.lines().count(), 2);
        assert!(second.starts_with("ERROR|"));
        assert!(second.contains("|E1|svc|app|main.rs|main|12|"));
    }

    #[test]
    fn file_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the sink wants a directory
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let sink = FileSink::new(&FileSettings {
            path: blocker,
            ..FileSettings::default()
        });
        assert!(matches!(sink.deliver(&event(Level::INFO)), Err(Error::Io { .. })));
    }

    #[test]
    fn broker_envelope() {
        let broker = MemoryBroker::new();
        let sink = BrokerSink::new(broker.clone());
        sink.deliver(&event(Level::ERROR)).unwrap();
        assert_eq!(broker.pending(envelope::QUEUE), 1);
        broker.close();
        assert!(sink.deliver(&event(Level::ERROR)).is_err());
    }
}
