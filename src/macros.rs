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

//! Logging macros that capture their call site at compile time.
//!
//! ```rust
//! use logit::{config::Config, logger::Logger};
//! let logger = Logger::new(&Config::builder().build().unwrap()).unwrap();
//! logit::info!(logger, "someLogText", "someLogContext");
//! logit::error!(logger, "disk full", "req-42", "E1");
//! ```

/// The fully-qualified path of the enclosing function, as a `&'static str`.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap_or(name)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __call_site {
    () => {
        $crate::caller::CallerContext::from_site(
            ::std::module_path!(),
            ::std::file!(),
            $crate::function_name!(),
            ::std::line!(),
        )
    };
}

/// Log at TRACE: `trace!(logger, text, context)`
#[macro_export]
macro_rules! trace {
    ($logger:expr, $text:expr, $context:expr) => {{
        let _ = $logger.log(
            $crate::level::Level::TRACE,
            $text,
            $context,
            "",
            $crate::__call_site!(),
        );
    }};
}

/// Log at INFO: `info!(logger, text, context)`
#[macro_export]
macro_rules! info {
    ($logger:expr, $text:expr, $context:expr) => {{
        let _ = $logger.log(
            $crate::level::Level::INFO,
            $text,
            $context,
            "",
            $crate::__call_site!(),
        );
    }};
}

/// Log at WARN: `warn!(logger, text, context)`
#[macro_export]
macro_rules! warn {
    ($logger:expr, $text:expr, $context:expr) => {{
        let _ = $logger.log(
            $crate::level::Level::WARN,
            $text,
            $context,
            "",
            $crate::__call_site!(),
        );
    }};
}

/// Log at ERROR: `error!(logger, text, context, err_code)`
#[macro_export]
macro_rules! error {
    ($logger:expr, $text:expr, $context:expr, $err_code:expr) => {{
        let _ = $logger.log(
            $crate::level::Level::ERROR,
            $text,
            $context,
            $err_code,
            $crate::__call_site!(),
        );
    }};
}

#[cfg(test)]
mod test {

    use crate::{
        config::Config,
        dispatch::{test::Recorder, Dispatcher},
        level::Level,
        logger::Logger,
    };

    #[test]
    fn macro_site() {
        let recorder = Recorder::default();
        let mut dispatcher = Dispatcher::new();
        dispatcher.push(recorder.clone());
        let logger = Logger::with_dispatcher(&Config::default(), dispatcher).unwrap();

        let line = line!() + 1;
        crate::info!(logger, "someLogText", "someLogContext");
        crate::error!(&logger, "boom", "", "E1");
        let text = String::from("owned");
        crate::warn!(logger, &text, &text);
        crate::trace!(logger, "t", "");

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].level(), Level::INFO);
        assert_eq!(events[0].pkg_name(), "logit");
        assert_eq!(events[0].module_name(), "macros.rs");
        assert_eq!(events[0].func_name(), "macro_site");
        assert_eq!(events[0].line(), line.to_string());
        assert_eq!(events[1].err_code(), "E1");
        assert_eq!(events[2].text(), "owned");
        assert_eq!(events[3].level(), Level::TRACE);
    }

    #[test]
    fn inside_closure() {
        let name = (|| crate::function_name!())();
        assert!(name.ends_with("inside_closure::{{closure}}"), "{}", name);
    }
}
