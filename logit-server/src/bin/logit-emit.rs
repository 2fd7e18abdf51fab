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

//! Emit one event at each level, through each of the ways in.
//!
//! Takes an optional configuration file as its first argument; without one, events go to the
//! console only.

use logit::{config::Config, layer::Layer, logger::Logger};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

fn make_logger() -> logit::error::Result<Logger> {
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::builder().build()?,
    };
    Logger::new(&config)
}

pub fn main() {
    let logger = match make_logger() {
        Ok(logger) => Arc::new(logger),
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(Layer::new(logger.clone()))
        .init();

    // Compile-time call sites
    logit::trace!(logger, "Hello, 世界!", "emit-1");
    logit::info!(logger, "Hello, 世界!", "emit-1");
    logit::warn!(logger, "Hello, 世界!", "emit-1");
    logit::error!(logger, "Hello, 世界!", "emit-1", "E1");

    // `#[track_caller]` & the call stack
    logger.trace("Hello, 世界!", "emit-2");
    logger.info("Hello, 世界!", "emit-2");
    logger.warn("Hello, 世界!", "emit-2");
    logger.error("Hello, 世界!", "emit-2", "E2");

    // By way of tracing
    tracing::debug!(context = "emit-3", "Hello, 世界!");
    tracing::info!(context = "emit-3", "Hello, 世界!");
    tracing::warn!(context = "emit-3", "Hello, 世界!");
    tracing::error!(context = "emit-3", err_code = "E3", "Hello, 世界!");
}
