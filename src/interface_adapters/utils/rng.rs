use std::sync::{
    OnceLock,
    atomic::{AtomicU64, Ordering},
};

/// Returns a process-unique identifier for connections and players.
///
/// Ids are sequential from a random starting offset, so two ids handed out in the
/// same instant never collide and restarts do not reuse the same range.
pub fn rand_id() -> u64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    let counter = COUNTER.get_or_init(|| AtomicU64::new(u64::from(rand::random::<u32>()) + 1));
    counter.fetch_add(1, Ordering::Relaxed)
}
