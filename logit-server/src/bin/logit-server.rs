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

//! The logit consumer.
//!
//! Drains the broker's `logs` queue into the console, file & persistent-store sinks named in the
//! configuration file given as the first argument (default `./config.json`). Set `RUST_LOG` to
//! control the server's own diagnostics.

use logit::{
    broker::AmqpBroker,
    config::Config,
    consumer::{Consumer, ConsumerStats},
    dispatch::Dispatcher,
    error::Result,
    sink,
    store::StoreWriter,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use std::path::{Path, PathBuf};

fn run(path: &Path) -> Result<ConsumerStats> {
    let config = Config::from_file(path)?;
    if config.sinks.file {
        sink::prepare_base(&config.file)?;
    }
    let store = if config.sinks.store {
        Some(StoreWriter::connect(&config.store_url)?)
    } else {
        None
    };
    let dispatcher = Dispatcher::consumer(&config, store);
    info!(
        config = %path.display(),
        broker = %config.broker_address,
        sinks = ?dispatcher.names(),
        "starting"
    );
    Consumer::new(
        AmqpBroker::new(config.broker_address.clone()),
        dispatcher,
        &config,
    )
    .run()
}

pub fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"));

    match run(&path) {
        Ok(stats) => info!(received = stats.received, "done"),
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }
}
