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

//! Recovering the site from which an event was emitted.
//!
//! There are two ways in. The macros ([`info!`](crate::info) & friends) know their call site at
//! compile time & build a [`CallerContext`] via [`CallerContext::from_site`]; this costs nothing
//! at runtime. The methods on [`Logger`](crate::logger::Logger) are `#[track_caller]`, which
//! gets us the file & line for free, but not the package or function; for those we walk the
//! stack with [`CallerContext::resolve`].
//!
//! Neither path can fail: anything we can't make out is left as an empty string.

use backtrace::{Backtrace, BacktraceSymbol};

use std::path::Path;

/// Demangled path prefix shared by the public entry points on [`Logger`].
///
/// [`Logger`]: crate::logger::Logger
const ENTRY_PREFIX: &str = concat!(env!("CARGO_CRATE_NAME"), "::logger::Logger::");

/// Where an event came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerContext {
    /// The crate (first segment of the module path)
    pub pkg_name: String,
    /// The source file's base name
    pub module_name: String,
    /// The function's own name, sans its path
    pub func_name: String,
    pub line: String,
}

fn base_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn package_of(path: &str) -> String {
    path.trim_start_matches('<')
        .split("::")
        .next()
        .unwrap_or_default()
        .to_owned()
}

/// The last path segment that names a function, skipping closures & symbol hashes.
fn function_of(path: &str) -> String {
    path.rsplit("::")
        .find(|seg| {
            !seg.is_empty()
                && *seg != "{{closure}}"
                && !(seg.len() == 17 && seg.starts_with('h') && seg[1..].bytes().all(|b| b.is_ascii_hexdigit()))
        })
        .unwrap_or_default()
        .trim_end_matches('>')
        .to_owned()
}

impl CallerContext {
    /// Build from the pieces the compiler hands the logging macros: `module_path!()`,
    /// `file!()`, [`function_name!()`](crate::function_name) & `line!()`.
    pub fn from_site(module_path: &str, file: &str, function: &str, line: u32) -> CallerContext {
        CallerContext {
            pkg_name: package_of(module_path),
            module_name: base_name(file),
            func_name: function_of(function),
            line: line.to_string(),
        }
    }
    /// Build from a `#[track_caller]` location; the package & function are unknown.
    pub fn from_location(location: &std::panic::Location<'_>) -> CallerContext {
        CallerContext {
            pkg_name: String::new(),
            module_name: base_name(location.file()),
            func_name: String::new(),
            line: location.line().to_string(),
        }
    }
    /// Fill-in any empty fields in `self` from `other`.
    pub fn or(mut self, other: CallerContext) -> CallerContext {
        if self.pkg_name.is_empty() {
            self.pkg_name = other.pkg_name;
        }
        if self.module_name.is_empty() {
            self.module_name = other.module_name;
        }
        if self.func_name.is_empty() {
            self.func_name = other.func_name;
        }
        if self.line.is_empty() {
            self.line = other.line;
        }
        self
    }
    /// Inspect the live call stack to find the frame `depth` levels out from the public entry
    /// point (so 1 is whoever called `Logger::info()`, say).
    ///
    /// Intervening frames inside [logit](crate) are not counted. If the stack can't be
    /// symbolized, if we weren't called beneath an entry point, or if the stack simply isn't
    /// that deep, every field comes back empty.
    pub fn resolve(depth: usize) -> CallerContext {
        let back = Backtrace::new();
        let symbols: Vec<&BacktraceSymbol> =
            back.frames().iter().flat_map(|f| f.symbols()).collect();
        let names: Vec<String> = symbols
            .iter()
            .map(|s| s.name().map(|n| format!("{:#}", n)).unwrap_or_default())
            .collect();

        let entry = match names.iter().position(|n| n.starts_with(ENTRY_PREFIX)) {
            Some(first) => names[first..]
                .iter()
                .take_while(|n| n.starts_with(ENTRY_PREFIX))
                .count()
                + first
                - 1,
            None => return CallerContext::default(),
        };
        if depth == 0 {
            return CallerContext::default();
        }
        match (symbols.get(entry + depth), names.get(entry + depth)) {
            (Some(symbol), Some(name)) => CallerContext {
                pkg_name: package_of(name),
                module_name: symbol
                    .filename()
                    .and_then(|p| p.file_name())
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                func_name: function_of(name),
                line: symbol.lineno().map(|n| n.to_string()).unwrap_or_default(),
            },
            _ => CallerContext::default(),
        }
    }
}

/// The name under which this process was invoked.
///
/// Prefers the base name of `argv[0]`, falling back to that of [`std::env::current_exe`]. It
/// cannot fail; if neither is available the result is empty.
pub fn app_name() -> String {
    std::env::args_os()
        .next()
        .and_then(|arg0| {
            Path::new(&arg0)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .or_else(|| {
            std::env::current_exe().ok().and_then(|pbuf| {
                pbuf.file_name()
                    .map(|s| s.to_string_lossy().into_owned())
            })
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn from_site() {
        let ctx = CallerContext::from_site(
            "app::handlers::orders",
            "src/handlers/orders.rs",
            "app::handlers::orders::place::{{closure}}",
            42,
        );
        assert_eq!(ctx.pkg_name, "app");
        assert_eq!(ctx.module_name, "orders.rs");
        assert_eq!(ctx.func_name, "place");
        assert_eq!(ctx.line, "42");
    }

    #[test]
    fn function_name_macro() {
        fn some_caller() -> CallerContext {
            CallerContext::from_site(module_path!(), file!(), crate::function_name!(), line!())
        }
        let ctx = some_caller();
        assert_eq!(ctx.pkg_name, "logit");
        assert_eq!(ctx.module_name, "caller.rs");
        assert_eq!(ctx.func_name, "some_caller");
        assert!(ctx.line.parse::<u32>().is_ok());
    }

    #[test]
    fn hashes_are_skipped() {
        assert_eq!(function_of("app::run::h0123456789abcdef"), "run");
        assert_eq!(package_of("<app::Thing as core::fmt::Display>::fmt"), "app");
    }

    #[test]
    fn unresolvable_is_empty() {
        // Not beneath an entry point at all
        assert_eq!(CallerContext::resolve(1), CallerContext::default());
        assert_eq!(CallerContext::resolve(10_000), CallerContext::default());
    }

    #[test]
    fn or_fills_gaps() {
        let loc = CallerContext {
            module_name: "main.rs".to_owned(),
            line: "7".to_owned(),
            ..Default::default()
        };
        let sym = CallerContext {
            pkg_name: "app".to_owned(),
            module_name: "other.rs".to_owned(),
            func_name: "main".to_owned(),
            line: "99".to_owned(),
        };
        let ctx = loc.or(sym);
        assert_eq!(ctx.pkg_name, "app");
        assert_eq!(ctx.module_name, "main.rs");
        assert_eq!(ctx.func_name, "main");
        assert_eq!(ctx.line, "7");
    }

    #[test]
    fn app_name_is_basename() {
        assert!(!app_name().contains('/'));
    }
}
