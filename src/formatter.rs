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

//! Event formatting primitives.
//!
//! This module defines the [`Formatter`] trait along with the line formats the console & file
//! sinks use.

use crate::{
    config::OutputMethod,
    error::{Error, Result},
    event::Event,
};

use backtrace::Backtrace;
use bytes::BufMut;

use std::ops::Deref;

/// Operations all formatters must support
/// ======================================
///
/// # Introduction
///
/// Getting an [`Event`] to a sink occurs in two parts:
///
/// 1. rendering the event into the bytes that sink expects
///
/// 2. handing those bytes to the sink's destination (a terminal, a file, a queue)
///
/// [`Formatter`] implements step 1.
///
/// # Design
///
/// The associated type `Output` is designed to make illegal states unrepresentable. If a sink
/// simply took, say, a slice of `u8` then callers could mistakenly pass _anything_ to it. The
/// rule I'd like to enforce is "The thing written to a sink must have been returned from a
/// [`Formatter`] implementation." Hence the associated type, and the constraint that it be
/// dereferenceable to a slice of `u8` (so the sink can deal with it).
pub trait Formatter {
    type Output: Deref<Target = [u8]>;
    fn format(&self, event: &Event) -> Result<Self::Output>;
}

/// The level name, followed by a single column of padding for INFO & WARN.
fn put_level(buf: &mut Vec<u8>, event: &Event) {
    buf.put_slice(event.level().as_str().as_bytes());
    if event.level().is_padded() {
        buf.put_u8(b' ');
    }
}

/// `"<MsgType> <DtTimeStr> :<ErrCode>:<AppName>:<PkgName>:<ModuleName>:<FuncName>:<Line>: <LogText>\n"`
///
/// The correlation context is not shown on the console.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleLine;

impl Formatter for ConsoleLine {
    type Output = Vec<u8>;
    fn format(&self, event: &Event) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(128);
        put_level(&mut buf, event);
        buf.put_u8(b' ');
        buf.put_slice(event.timestamp().as_bytes());
        buf.put_slice(b" :");
        for field in [
            event.err_code(),
            event.app_name(),
            event.pkg_name(),
            event.module_name(),
            event.func_name(),
            event.line(),
        ] {
            buf.put_slice(field.as_bytes());
            buf.put_u8(b':');
        }
        buf.put_u8(b' ');
        buf.put_slice(event.text().as_bytes());
        buf.put_u8(b'\n');
        Ok(buf)
    }
}

/// All ten fields in wire order, joined by `separator`, terminated by a newline.
#[derive(Clone, Debug)]
pub struct DelimitedLine {
    separator: String,
}

impl DelimitedLine {
    pub fn new<S: Into<String>>(separator: S) -> DelimitedLine {
        DelimitedLine {
            separator: separator.into(),
        }
    }
}

impl Formatter for DelimitedLine {
    type Output = Vec<u8>;
    fn format(&self, event: &Event) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(160);
        put_level(&mut buf, event);
        for field in &event.fields()[1..] {
            buf.put_slice(self.separator.as_bytes());
            buf.put_slice(field.as_bytes());
        }
        buf.put_u8(b'\n');
        Ok(buf)
    }
}

/// One JSON object (the broker envelope) per line.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonLine;

impl Formatter for JsonLine {
    type Output = Vec<u8>;
    fn format(&self, event: &Event) -> Result<Vec<u8>> {
        let mut buf = serde_json::to_vec(event).map_err(|source| Error::Encode {
            source,
            back: Backtrace::new(),
        })?;
        buf.put_u8(b'\n');
        Ok(buf)
    }
}

/// The file sink's choice of line format.
#[derive(Clone, Debug)]
pub enum LineFormat {
    Text(DelimitedLine),
    Json(JsonLine),
}

impl LineFormat {
    pub fn new(method: OutputMethod, separator: &str) -> LineFormat {
        match method {
            OutputMethod::Text => LineFormat::Text(DelimitedLine::new(separator)),
            OutputMethod::Json => LineFormat::Json(JsonLine),
        }
    }
    pub fn method(&self) -> OutputMethod {
        match self {
            LineFormat::Text(_) => OutputMethod::Text,
            LineFormat::Json(_) => OutputMethod::Json,
        }
    }
}

impl Formatter for LineFormat {
    type Output = Vec<u8>;
    fn format(&self, event: &Event) -> Result<Vec<u8>> {
        match self {
            LineFormat::Text(f) => f.format(event),
            LineFormat::Json(f) => f.format(event),
        }
    }
}
