// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Minimal structured logging with severity levels
//! OWNERS: @kernel-boot-team
//! STATUS: Functional
//! API_STABILITY: Unstable
//! PUBLIC API: log_* macros, emit(level,target,args), emit_panic(args), set_sink()
//! DEPENDS_ON: spin::Mutex, arch::cortexm::interrupt_free
//! INVARIANTS: Debug/Trace only in debug builds; single-line emission; never blocks; silent until a sink is set
//!
//! The sink slot lives in `.bss`, so nothing may log before stage two has
//! built the memory image.

use core::fmt::{self, Arguments, Write};

use spin::Mutex;

use crate::arch::cortexm::interrupt_free;

/// Logging severity.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    const fn tag(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    const fn enabled(self) -> bool {
        match self {
            Level::Debug | Level::Trace => cfg!(debug_assertions),
            _ => true,
        }
    }
}

/// Byte sink receiving formatted log text.
pub type Sink = fn(&str);

static SINK: Mutex<Option<Sink>> = Mutex::new(None);

/// Routes all further log lines to `sink`, replacing any previous one.
pub fn set_sink(sink: Sink) {
    *SINK.lock() = Some(sink);
}

/// Stops emission; lines are dropped until a new sink is set.
pub fn clear_sink() {
    *SINK.lock() = None;
}

struct SinkWriter(Sink);

impl Write for SinkWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

/// Emits a structured log line if the level is enabled for the current build.
pub fn emit(level: Level, target: &'static str, args: Arguments<'_>) {
    if !level.enabled() {
        return;
    }

    // Interrupts stay masked for the whole line so a handler cannot preempt
    // a half-written line. A sink that logs from inside itself finds the
    // lock taken and its nested line is dropped.
    interrupt_free(|| {
        let Some(guard) = SINK.try_lock() else {
            return;
        };
        let Some(sink) = *guard else {
            return;
        };
        let mut writer = SinkWriter(sink);
        let _ = writer.write_fmt(format_args!("[{} {}] ", level.tag(), target));
        let _ = writer.write_fmt(args);
        let _ = writer.write_char('\n');
    });
}

/// Panic-path emission: never waits on the sink lock and drops the line if
/// the panic happened while a line was being written.
pub fn emit_panic(args: Arguments<'_>) {
    let Some(guard) = SINK.try_lock() else {
        return;
    };
    let Some(sink) = *guard else {
        return;
    };
    let mut writer = SinkWriter(sink);
    let _ = writer.write_str("\nPANIC: ");
    let _ = writer.write_fmt(args);
    let _ = writer.write_char('\n');
}

#[macro_export]
macro_rules! log_error {
    (target: $target:expr, $($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Error, $target, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Error, module_path!(), format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_warn {
    (target: $target:expr, $($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Warn, $target, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Warn, module_path!(), format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_info {
    (target: $target:expr, $($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Info, $target, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Info, module_path!(), format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_debug {
    (target: $target:expr, $($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Debug, $target, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Debug, module_path!(), format_args!($($arg)+));
    }};
}

#[macro_export]
macro_rules! log_trace {
    (target: $target:expr, $($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Trace, $target, format_args!($($arg)+));
    }};
    ($($arg:tt)+) => {{
        $crate::log::emit($crate::log::Level::Trace, module_path!(), format_args!($($arg)+));
    }};
}
