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

//! A [`tracing-subscriber`] [`Layer`] that feeds [`tracing`] events into a [`Logger`].
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//!
//! Each event becomes one [logit](crate) event:
//!
//! - DEBUG & TRACE map to TRACE; the other levels map to themselves
//! - the `message` field becomes the text
//! - a `context` field, if present, becomes the correlation context
//! - an `err_code` field, if present, becomes the error code
//! - the package, module (file) & line come from the event's metadata; the function is unknown
//!
//! Events whose target is [logit](crate)'s own are ignored, so that the pipeline's diagnostics
//! about itself never loop back into it.
//!
//! ```rust
//! use logit::{config::Config, layer::Layer, logger::Logger};
//! use std::sync::Arc;
//! use tracing_subscriber::{layer::SubscriberExt, registry::Registry};
//!
//! let logger = Arc::new(Logger::new(&Config::builder().build().unwrap()).unwrap());
//! let subscriber = Registry::default().with(Layer::new(logger));
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::info!(context = "req-42", "someLogText");
//! });
//! ```

use crate::{caller::CallerContext, level::Level, logger::Logger};

use tracing::Event;
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated from the `log` crate.
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

use std::sync::Arc;

fn is_own_target(target: &str) -> bool {
    let ours = env!("CARGO_CRATE_NAME");
    target == ours
        || target
            .strip_prefix(ours)
            .map(|rest| rest.starts_with("::"))
            .unwrap_or(false)
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    context: String,
    err_code: String,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_owned(),
            "context" => self.context = value.to_owned(),
            "err_code" => self.err_code = value.to_owned(),
            _ => (),
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros "pre-format" `message` as `fmt::Arguments`, whose `Debug`
        // implementation adds no quotes.
        match field.name() {
            "message" => self.message = format!("{:?}", value),
            "context" => self.context = format!("{:?}", value),
            "err_code" => self.err_code = format!("{:?}", value),
            _ => (),
        }
    }
}

/// Bridges [`tracing`] into [logit](crate).
pub struct Layer {
    logger: Arc<Logger>,
}

impl Layer {
    pub fn new(logger: Arc<Logger>) -> Layer {
        Layer { logger }
    }
    pub fn logger(&self) -> &Logger {
        &self.logger
    }
}

impl<S> tracing_subscriber::layer::Layer<S> for Layer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        if is_own_target(meta.target()) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut caller = CallerContext::from_site(
            meta.module_path().unwrap_or_default(),
            meta.file().unwrap_or_default(),
            "",
            meta.line().unwrap_or_default(),
        );
        if meta.line().is_none() {
            caller.line.clear();
        }

        // Failures have already been reported by the dispatcher.
        let _ = self.logger.log(
            Level::from(meta.level()),
            &visitor.message,
            &visitor.context,
            &visitor.err_code,
            caller,
        );
    }
}

#[cfg(test)]
mod test {

    use super::*;

    use crate::{
        config::Config,
        dispatch::{test::Recorder, Dispatcher},
    };

    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    #[test]
    fn own_targets() {
        assert!(is_own_target("logit"));
        assert!(is_own_target("logit::dispatch"));
        assert!(!is_own_target("logit_server"));
        assert!(!is_own_target("app::logit"));
    }

    #[test]
    fn bridge() {
        let recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(recorder.clone());
        let logger = Arc::new(Logger::with_dispatcher(&Config::default(), dispatcher).unwrap());

        let subscriber = Registry::default().with(Layer::new(logger));
        let line = tracing::subscriber::with_default(subscriber, || {
            let line = line!() + 1;
            tracing::info!(target: "app", context = "req-1", "hello, {}", "world");
            tracing::debug!(target: "app", "details");
            tracing::error!(target: "app", err_code = "E9", "it broke");
            // Our own diagnostics are never fed back in.
            tracing::warn!("from logit itself");
            line
        });

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].level(), Level::INFO);
        assert_eq!(events[0].text(), "hello, world");
        assert_eq!(events[0].context(), "req-1");
        assert_eq!(events[0].err_code(), "");
        assert_eq!(events[0].pkg_name(), "logit");
        assert_eq!(events[0].module_name(), "layer.rs");
        assert_eq!(events[0].func_name(), "");
        assert_eq!(events[0].line(), line.to_string());

        assert_eq!(events[1].level(), Level::TRACE);
        assert_eq!(events[1].text(), "details");

        assert_eq!(events[2].level(), Level::ERROR);
        assert_eq!(events[2].err_code(), "E9");
    }
}
