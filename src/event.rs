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

//! The canonical [`Event`] record & its construction.

use crate::{
    caller::CallerContext,
    error::{Error, Result},
    level::Level,
};

use backtrace::Backtrace;
use chrono::{format::Item, format::StrftimeItems, DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One structured log record.
///
/// An [`Event`] is immutable once built: every field is private & exposed only by reference.
/// Sinks receive it by shared reference & may not change it.
///
/// The serde field names are the wire names of the broker envelope (and of the JSON file
/// format); all ten are required when deserializing, though any may be empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "MsgType")]
    level: Level,
    #[serde(rename = "DtTimeStr")]
    timestamp: String,
    #[serde(rename = "ErrCode")]
    err_code: String,
    #[serde(rename = "AppName")]
    app_name: String,
    #[serde(rename = "PkgName")]
    pkg_name: String,
    #[serde(rename = "ModuleName")]
    module_name: String,
    #[serde(rename = "FuncName")]
    func_name: String,
    #[serde(rename = "Line")]
    line: String,
    #[serde(rename = "LogText")]
    text: String,
    #[serde(rename = "LogContext")]
    context: String,
}

impl Event {
    pub fn level(&self) -> Level {
        self.level
    }
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
    pub fn err_code(&self) -> &str {
        &self.err_code
    }
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
    pub fn pkg_name(&self) -> &str {
        &self.pkg_name
    }
    pub fn module_name(&self) -> &str {
        &self.module_name
    }
    pub fn func_name(&self) -> &str {
        &self.func_name
    }
    pub fn line(&self) -> &str {
        &self.line
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn context(&self) -> &str {
        &self.context
    }
    /// All ten fields, as text, in wire order.
    pub fn fields(&self) -> [&str; 10] {
        [
            self.level.as_str(),
            &self.timestamp,
            &self.err_code,
            &self.app_name,
            &self.pkg_name,
            &self.module_name,
            &self.func_name,
            &self.line,
            &self.text,
            &self.context,
        ]
    }
}

/// A validated chrono `strftime` pattern.
///
/// chrono only discovers a bad pattern when it is asked to render it (at which point `Display`
/// fails), so we check up-front & refuse to construct one that would. A pattern must also name
/// both a date & a time, since every timestamp it renders has to parse back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateTimeFormat(String);

impl DateTimeFormat {
    pub fn new<S: Into<String>>(pattern: S) -> Result<DateTimeFormat> {
        let pattern = pattern.into();
        if pattern.is_empty() || StrftimeItems::new(&pattern).any(|item| item == Item::Error) {
            return Err(Error::BadDateTimeFormat {
                pattern,
                back: Backtrace::new(),
            });
        }
        let sample = Local::now().format(&pattern).to_string();
        if NaiveDateTime::parse_from_str(&sample, &pattern).is_err() {
            return Err(Error::BadDateTimeFormat {
                pattern,
                back: Backtrace::new(),
            });
        }
        Ok(DateTimeFormat(pattern))
    }
    pub fn pattern(&self) -> &str {
        &self.0
    }
    pub fn format(&self, when: &DateTime<Local>) -> String {
        when.format(&self.0).to_string()
    }
    /// Parse a timestamp produced by [`DateTimeFormat::format`] back into a time value.
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text, &self.0).map_err(|source| Error::BadTimestamp {
            text: text.to_owned(),
            source,
            back: Backtrace::new(),
        })
    }
}

impl std::default::Default for DateTimeFormat {
    /// `DD.MM.YYYY hh:mm:ss`
    fn default() -> Self {
        DateTimeFormat("%d.%m.%Y %H:%M:%S".to_owned())
    }
}

/// Assembles [`Event`]s.
///
/// Pure assembly, no I/O: the builder holds the only two things that don't vary per call (the
/// timestamp pattern & the process name) and stamps everything else in from its arguments.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    format: DateTimeFormat,
    app_name: String,
}

impl EventBuilder {
    pub fn new(format: DateTimeFormat, app_name: String) -> EventBuilder {
        EventBuilder { format, app_name }
    }
    pub fn date_time_format(&self) -> &DateTimeFormat {
        &self.format
    }
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
    /// Build an [`Event`] stamped with the current local time.
    pub fn build(
        &self,
        level: Level,
        text: &str,
        context: &str,
        err_code: &str,
        caller: CallerContext,
    ) -> Event {
        self.build_at(level, text, context, err_code, caller, &Local::now())
    }
    pub fn build_at(
        &self,
        level: Level,
        text: &str,
        context: &str,
        err_code: &str,
        caller: CallerContext,
        when: &DateTime<Local>,
    ) -> Event {
        Event {
            level,
            timestamp: self.format.format(when),
            err_code: err_code.to_owned(),
            app_name: self.app_name.clone(),
            pkg_name: caller.pkg_name,
            module_name: caller.module_name,
            func_name: caller.func_name,
            line: caller.line,
            text: text.to_owned(),
            context: context.to_owned(),
        }
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use chrono::TimeZone;

    fn caller() -> CallerContext {
        CallerContext {
            pkg_name: "app".to_owned(),
            module_name: "main.rs".to_owned(),
            func_name: "main".to_owned(),
            line: "12".to_owned(),
        }
    }

    #[test]
    fn bad_patterns() {
        assert!(DateTimeFormat::new("%d.%m.%Y %H:%M:%S").is_ok());
        assert!(DateTimeFormat::new("%Q").is_err());
        assert!(DateTimeFormat::new("").is_err());
    }

    #[test]
    fn partial_patterns() {
        // Rendered fine, but can't be read back
        assert!(matches!(
            DateTimeFormat::new("%H:%M:%S"),
            Err(Error::BadDateTimeFormat { .. })
        ));
        assert!(matches!(
            DateTimeFormat::new("%d-%m-%Y"),
            Err(Error::BadDateTimeFormat { .. })
        ));
    }

    #[test]
    fn timestamp_round_trip() {
        let fmt = DateTimeFormat::default();
        let now = Local::now();
        let text = fmt.format(&now);
        let parsed = fmt.parse(&text).unwrap();
        assert_eq!(parsed.format(fmt.pattern()).to_string(), text);

        let fmt = DateTimeFormat::new("%Y-%m-%dT%H:%M:%S%.3f").unwrap();
        let text = fmt.format(&now);
        assert_eq!(fmt.parse(&text).unwrap().format(fmt.pattern()).to_string(), text);
    }

    #[test]
    fn default_pattern_shape() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(DateTimeFormat::default().format(&when), "09.03.2024 07:05:01");
        assert!(DateTimeFormat::default().parse("not a time").is_err());
    }

    #[test]
    fn build() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let builder = EventBuilder::new(DateTimeFormat::default(), "svc".to_owned());
        let event = builder.build_at(Level::WARN, "disk low", "req-1", "", caller(), &when);
        assert_eq!(event.level(), Level::WARN);
        assert_eq!(
            event.fields(),
            [
                "WARN",
                "09.03.2024 07:05:01",
                "",
                "svc",
                "app",
                "main.rs",
                "main",
                "12",
                "disk low",
                "req-1"
            ]
        );
    }
}
