use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use std::{collections::HashMap, sync::Mutex, time::Instant};

/* ───────────── Buffer‑Allokationen ───────────────────── */

/// Device buffers currently alive, across all backends.
pub static LIVE_BUFFERS: AtomicUsize = AtomicUsize::new(0);
pub static LIVE_BYTES: AtomicUsize = AtomicUsize::new(0);
/// Buffers ever allocated by this process.
pub static TOTAL_ALLOCS: AtomicUsize = AtomicUsize::new(0);

pub(crate) fn note_alloc(bytes: usize) {
    LIVE_BUFFERS.fetch_add(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_add(bytes, Ordering::Relaxed);
    TOTAL_ALLOCS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn note_release(bytes: usize) {
    LIVE_BUFFERS.fetch_sub(1, Ordering::Relaxed);
    LIVE_BYTES.fetch_sub(bytes, Ordering::Relaxed);
}

pub fn live_buffers() -> usize {
    LIVE_BUFFERS.load(Ordering::Relaxed)
}

/* ───────────── Roh‑Latenzen ─────────────────────────── */

#[cfg(feature = "metrics")]
static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// `record("write_blocking", t)` right after the call that started at `t`.
#[cfg(feature = "metrics")]
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    if let Ok(mut times) = TIMES.lock() {
        times.push((name, dur));
    }
}

/* ───────────── Zusammenfassung ─────────────────────── */

/// Logs mean/p95 per operation and the allocation counters, then clears
/// the latency table.
#[cfg(feature = "metrics")]
pub fn summary() {
    let mut map: HashMap<&str, Vec<u128>> = HashMap::new();
    if let Ok(mut times) = TIMES.lock() {
        for (name, us) in times.drain(..) {
            map.entry(name).or_default().push(us);
        }
    }

    for (name, mut v) in map {
        v.sort_unstable();
        let mean = v.iter().sum::<u128>() / v.len() as u128;
        let p95 = v[((v.len() * 95) / 100).saturating_sub(1)];
        tracing::info!(op = name, samples = v.len(), mean_us = mean as u64, p95_us = p95 as u64, "latency");
    }

    tracing::info!(
        total = TOTAL_ALLOCS.load(Ordering::Relaxed),
        live = LIVE_BUFFERS.load(Ordering::Relaxed),
        live_bytes = LIVE_BYTES.load(Ordering::Relaxed),
        "device allocations"
    );
}
