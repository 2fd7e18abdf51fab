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

//! The producer → broker → consumer wire contract.
//!
//! Each message is a single JSON object with exactly ten string fields:
//!
//! ```text
//! {"MsgType":"ERROR","DtTimeStr":"09.03.2024 07:05:01","ErrCode":"E1","AppName":"svc",
//!  "PkgName":"app","ModuleName":"main.rs","FuncName":"main","Line":"12",
//!  "LogText":"...","LogContext":"..."}
//! ```
//!
//! All are required (though any may be empty) & `MsgType` must be one of `TRACE`, `INFO`, `WARN`
//! or `ERROR`. Messages are published to the single queue named [`QUEUE`].

use crate::{
    error::{Error, Result},
    event::Event,
};

use backtrace::Backtrace;

/// The one work queue producers publish to & the consumer drains.
pub const QUEUE: &str = "logs";

pub fn encode(event: &Event) -> Result<Vec<u8>> {
    serde_json::to_vec(event).map_err(|source| Error::Encode {
        source,
        back: Backtrace::new(),
    })
}

pub fn decode(body: &[u8]) -> Result<Event> {
    serde_json::from_slice(body).map_err(|source| Error::Decode {
        source,
        back: Backtrace::new(),
    })
}
