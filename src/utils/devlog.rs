//! Developer logging with a custom "level 6" and a thread-local sink for deterministic tests.
//!
//! Two producers write here. `QueryBuilder` traces every compiled request it
//! hands to a store (see [`trace_request`]), tagged [`BUILDER_TAG`], and
//! `MemoryStore` traces the ids it assigns on insert, tagged [`MEMORY_TAG`].
//! Builders are single-owner, so capturing per thread lets tests assert on the
//! requests a chain produced without racing on the global logger. With
//! `enable_dev6` the same lines are also persisted to `dev6.log`.

use std::cell::RefCell;

use crate::query::QueryLog;

/// Pseudo-level for developer logs.
pub const DEV_LEVEL: u32 = 6;

/// Prefix of request traces written by the query builder.
pub const BUILDER_TAG: &str = "[qb]";
/// Prefix of traces written by `MemoryStore`.
pub const MEMORY_TAG: &str = "[memory]";

thread_local! {
    static TL_SINK: RefCell<Option<Vec<String>>> = const { RefCell::new(None) };
}

/// Guard that disables the thread-local sink on drop.
pub struct DevSinkGuard;

impl Drop for DevSinkGuard {
    fn drop(&mut self) {
        TL_SINK.with(|s| *s.borrow_mut() = None);
    }
}

/// Enable the thread-local sink for the current thread. Returns a guard that disables it on drop.
#[must_use]
pub fn enable_thread_sink() -> DevSinkGuard {
    TL_SINK.with(|s| *s.borrow_mut() = Some(Vec::new()));
    DevSinkGuard
}

/// Push a message into the thread-local sink if enabled.
pub fn write_str(msg: &str) {
    TL_SINK.with(|s| {
        if let Some(buf) = s.borrow_mut().as_mut() {
            buf.push(msg.to_owned());
        }
    });
}

/// Drain and return the captured messages for the current thread.
pub fn drain() -> Vec<String> {
    TL_SINK.with(|s| s.borrow_mut().as_mut().map(std::mem::take).unwrap_or_default())
}

/// Peek at the captured messages without clearing them.
pub fn snapshot() -> Vec<String> {
    TL_SINK.with(|s| s.borrow().as_ref().cloned().unwrap_or_default())
}

/// Takes the captured lines starting with `tag`, leaving the others in the sink.
pub fn drain_tagged(tag: &str) -> Vec<String> {
    TL_SINK.with(|s| {
        let mut sink = s.borrow_mut();
        let Some(buf) = sink.as_mut() else {
            return Vec::new();
        };
        let (hit, rest): (Vec<String>, Vec<String>) =
            std::mem::take(buf).into_iter().partition(|l| l.starts_with(tag));
        *buf = rest;
        hit
    })
}

/// Traces one completed request: action, collection and the compiled documents.
pub fn trace_request(log: &QueryLog) {
    let action = log.action.map_or("-", |a| a.as_str());
    crate::dev6!(
        "{BUILDER_TAG} {action} on {}: filter={} update={} sort={} limit={} offset={}",
        log.collection,
        log.filter,
        log.update,
        log.sort,
        log.limit,
        log.offset
    );
}

/// Emit a developer log (level 6) and capture it in the thread-local sink if enabled.
#[macro_export]
macro_rules! dev6 {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        $crate::utils::devlog::write_str(&__s);
        log::log!(target: $crate::logger::DEV6_TARGET, log::Level::Trace, "{}", __s);
    }};
}
