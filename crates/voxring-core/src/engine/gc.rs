//! Deferred deallocation for the render thread
//!
//! Audio payloads arrive on the render thread inside `ControlMessage::Audio`
//! and are consumed there; retired ring-buffer backing stores are released
//! there too. Freeing them in the device callback would put the allocator on
//! the real-time path, so both are wrapped in `basedrop::Owned` and handed to
//! a collector thread instead.
//!
//! ```ignore
//! use basedrop::Owned;
//! use voxring_core::engine::gc_handle;
//!
//! let payload = Owned::new(&gc_handle(), vec![0.0f32; 480]);
//! drop(payload); // queued for the collector, not freed here
//! ```

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector thread reclaims queued drops
const COLLECT_INTERVAL: Duration = Duration::from_millis(50);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    // Collector is !Sync, so it is created and owned by its own thread
    thread::Builder::new()
        .name("voxring-gc".to_string())
        .spawn(move || {
            let mut collector = Collector::new();
            if tx.send(collector.handle()).is_err() {
                return;
            }
            log::debug!("Deferred-drop collector started");

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("Failed to spawn voxring-gc thread");

    rx.recv().expect("voxring-gc thread exited before handing out its handle")
}

/// Handle for wrapping allocations whose drop must not free memory inline
///
/// The collector thread is started on first use and lives for the rest of
/// the process.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
