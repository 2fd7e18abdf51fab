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

//! The consumer's persistent store.
//!
//! [`StoreWriter`] inserts one row per [`Event`] into the `t_logs` table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS t_logs (
//!     msg_type    TEXT NOT NULL,
//!     timestamp   TEXT NOT NULL,
//!     err_code    TEXT NOT NULL,
//!     app_name    TEXT NOT NULL,
//!     pkg_name    TEXT NOT NULL,
//!     module_name TEXT NOT NULL,
//!     func_name   TEXT NOT NULL,
//!     line        TEXT NOT NULL,
//!     log_text    TEXT NOT NULL,
//!     err_context TEXT NOT NULL
//! )
//! ```
//!
//! [sqlx] is asynchronous & the rest of [logit](crate) is not, so the writer owns a private
//! single-threaded [tokio] runtime & blocks on each statement. It holds exactly one connection,
//! kept open for its lifetime; concurrent inserts queue for it.
//!
//! [sqlx]: https://docs.rs/sqlx
//! [tokio]: https://docs.rs/tokio

use crate::{
    error::{Error, Result},
    event::Event,
    sink::Sink,
};

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use tracing::debug;

use std::path::PathBuf;

const CREATE_TABLE: &str = r#"CREATE TABLE IF NOT EXISTS t_logs (
    msg_type TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    err_code TEXT NOT NULL,
    app_name TEXT NOT NULL,
    pkg_name TEXT NOT NULL,
    module_name TEXT NOT NULL,
    func_name TEXT NOT NULL,
    line TEXT NOT NULL,
    log_text TEXT NOT NULL,
    err_context TEXT NOT NULL
)"#;

const INSERT: &str = r#"INSERT INTO t_logs (msg_type, timestamp, err_code, app_name, pkg_name,
    module_name, func_name, line, log_text, err_context) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#;

/// The SQLite driver won't create a missing database file, nor the directories above it.
fn prepare_sqlite_path(url: &str) -> Result<()> {
    let path = match url.strip_prefix("sqlite://") {
        Some(rest) if !url.contains(":memory:") => rest.split('?').next().unwrap_or_default(),
        _ => return Ok(()),
    };
    if path.is_empty() {
        return Ok(());
    }
    let path = PathBuf::from(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|err| Error::io(parent, err))?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| Error::io(&path, err))?;
    Ok(())
}

/// Persistent-store [`Sink`] backed by [sqlx](https://docs.rs/sqlx)'s `Any` driver.
pub struct StoreWriter {
    runtime: tokio::runtime::Runtime,
    pool: sqlx::AnyPool,
}

impl StoreWriter {
    /// Connect to the database at `url` (e.g. `sqlite://logs/logs.db`, `sqlite::memory:`) &
    /// create `t_logs` if need be.
    pub fn connect(url: &str) -> Result<StoreWriter> {
        prepare_sqlite_path(url)?;
        install_default_drivers();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(Error::store)?;
        let pool = runtime.block_on(async {
            let pool = AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(url)
                .await?;
            sqlx::query(CREATE_TABLE).execute(&pool).await?;
            Ok::<_, sqlx::Error>(pool)
        });
        let pool = pool.map_err(Error::store)?;
        debug!(url, "persistent store ready");
        Ok(StoreWriter { runtime, pool })
    }
    pub fn insert(&self, event: &Event) -> Result<()> {
        let [msg_type, timestamp, err_code, app_name, pkg_name, module_name, func_name, line, text, context] =
            event.fields();
        self.runtime
            .block_on(
                sqlx::query(INSERT)
                    .bind(msg_type.to_owned())
                    .bind(timestamp.to_owned())
                    .bind(err_code.to_owned())
                    .bind(app_name.to_owned())
                    .bind(pkg_name.to_owned())
                    .bind(module_name.to_owned())
                    .bind(func_name.to_owned())
                    .bind(line.to_owned())
                    .bind(text.to_owned())
                    .bind(context.to_owned())
                    .execute(&self.pool),
            )
            .map_err(Error::store)?;
        Ok(())
    }
    #[cfg(test)]
    fn count(&self) -> i64 {
        self.runtime
            .block_on(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM t_logs").fetch_one(&self.pool))
            .unwrap()
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        // Close inside the runtime that opened the connection.
        self.runtime.block_on(self.pool.close());
    }
}

impl Sink for StoreWriter {
    fn name(&self) -> &'static str {
        "store"
    }
    fn deliver(&self, event: &Event) -> Result<()> {
        self.insert(event)
    }
}
