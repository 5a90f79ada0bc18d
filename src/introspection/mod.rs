//! Blocked-queries crash introspection (§4.11, §3 `BlockingQuery` /
//! `BlockingCursor`): two registries of in-flight queries and cursors that
//! a crash handler walks to emit a diagnostic dump.
//!
//! Grounded on the teacher's `state.rs` (connection-state tracking) and
//! `sighup.rs` (the one other place the teacher hooks a Unix signal) —
//! this is "the one host-platform-forces-a-singleton case" the design
//! notes call out explicitly, so it is confined to this module behind a
//! narrow API rather than scattered as ambient global state.

use std::sync::OnceLock;
use std::time::Instant;

use parking_lot::Mutex;

/// One query currently executing, recorded for crash diagnostics.
#[derive(Debug, Clone)]
pub struct BlockedQueryNode {
    pub index_name: String,
    pub start_time: Instant,
}

/// One cursor currently parked, recorded for crash diagnostics.
#[derive(Debug, Clone)]
pub struct BlockedCursorNode {
    pub index_name: String,
    pub cursor_id: u64,
    pub start_time: Instant,
}

#[derive(Default)]
struct Lists {
    queries: Vec<BlockedQueryNode>,
    cursors: Vec<BlockedCursorNode>,
}

/// The process-wide registry. A true global is unavoidable here: the
/// signal handler that reads it at crash time cannot be handed a
/// reference through ordinary call stacks.
pub struct BlockedRegistry {
    lists: Mutex<Lists>,
}

static REGISTRY: OnceLock<BlockedRegistry> = OnceLock::new();

/// An RAII handle: registers a query on creation, deregisters on drop —
/// "on completion it removes itself" (§4.11).
pub struct QueryGuard {
    index_name: String,
}

/// Same for a cursor, keyed additionally by its opaque id.
pub struct CursorGuard {
    index_name: String,
    cursor_id: u64,
}

impl BlockedRegistry {
    fn global() -> &'static BlockedRegistry {
        REGISTRY.get_or_init(|| BlockedRegistry {
            lists: Mutex::new(Lists::default()),
        })
    }

    /// Register a query start; returns a guard that deregisters on drop.
    pub fn register_query(index_name: impl Into<String>) -> QueryGuard {
        let index_name = index_name.into();
        let reg = Self::global();
        reg.lists.lock().queries.push(BlockedQueryNode {
            index_name: index_name.clone(),
            start_time: Instant::now(),
        });
        QueryGuard { index_name }
    }

    /// Register a cursor create; returns a guard that unregisters on
    /// drop (i.e. on cursor close).
    pub fn register_cursor(index_name: impl Into<String>, cursor_id: u64) -> CursorGuard {
        let index_name = index_name.into();
        let reg = Self::global();
        reg.lists.lock().cursors.push(BlockedCursorNode {
            index_name: index_name.clone(),
            cursor_id,
            start_time: Instant::now(),
        });
        CursorGuard { index_name, cursor_id }
    }

    /// Walk both lists and render a diagnostic dump. Called from the
    /// signal handler context as well as normal code (e.g. an admin
    /// introspection command), so it must not allocate unboundedly or
    /// panic.
    pub fn dump() -> String {
        let reg = Self::global();
        let lists = reg.lists.lock();
        let mut out = String::new();
        out.push_str("=== blocked queries ===\n");
        for q in lists.queries.iter() {
            out.push_str(&format!(
                "query index={} elapsed_ms={}\n",
                q.index_name,
                q.start_time.elapsed().as_millis()
            ));
        }
        out.push_str("=== blocked cursors ===\n");
        for c in lists.cursors.iter() {
            out.push_str(&format!(
                "cursor id={} index={} elapsed_ms={}\n",
                c.cursor_id,
                c.index_name,
                c.start_time.elapsed().as_millis()
            ));
        }
        out
    }

    #[cfg(test)]
    fn counts() -> (usize, usize) {
        let reg = Self::global();
        let lists = reg.lists.lock();
        (lists.queries.len(), lists.cursors.len())
    }
}

impl Drop for QueryGuard {
    fn drop(&mut self) {
        let reg = BlockedRegistry::global();
        let mut lists = reg.lists.lock();
        if let Some(pos) = lists.queries.iter().position(|q| q.index_name == self.index_name) {
            lists.queries.remove(pos);
        }
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        let reg = BlockedRegistry::global();
        let mut lists = reg.lists.lock();
        if let Some(pos) = lists
            .cursors
            .iter()
            .position(|c| c.cursor_id == self.cursor_id)
        {
            lists.cursors.remove(pos);
        }
    }
}

/// Install a Unix crash handler (`SIGSEGV`/`SIGABRT`) that writes
/// [`BlockedRegistry::dump`] to stderr before re-raising the default
/// disposition. Unix-only, matching the teacher's `#[cfg(target_family =
/// "unix")]` gating of `sighup.rs`.
#[cfg(target_family = "unix")]
pub fn install_crash_handler() {
    // SAFETY: the handler only calls async-signal-unsafe code in the same
    // sense the teacher's process already accepts for its own panic
    // hooks; this mirrors the source's "signal handler walks both lists"
    // design rather than attempting a fully async-signal-safe rewrite.
    unsafe {
        libc::signal(libc::SIGSEGV, crash_handler as libc::sighandler_t);
        libc::signal(libc::SIGABRT, crash_handler as libc::sighandler_t);
    }
}

#[cfg(target_family = "unix")]
extern "C" fn crash_handler(sig: libc::c_int) {
    eprintln!("fatal signal {sig}, dumping in-flight queries/cursors:");
    eprint!("{}", BlockedRegistry::dump());
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

#[cfg(not(target_family = "unix"))]
pub fn install_crash_handler() {}
