//! Snapshot store: the only state shared between the tick thread and readers.
//!
//! [`SnapshotStore`] keeps the most recent committed [`Snapshot`]s in a
//! fixed-capacity ring. There is exactly one writer (the tick engine) and
//! any number of readers. Each snapshot is immutable once committed and is
//! handed out behind an `Arc`, so a reader holding one can never observe a
//! mix of two ticks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use indexmap::IndexMap;
use orrery_core::{BodyId, Position, TickId};

/// Positions of every body as committed at the end of one tick.
///
/// Iteration order is registration order.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    tick: TickId,
    positions: IndexMap<BodyId, Position>,
}

impl Snapshot {
    /// Build a snapshot. Only the engine commits snapshots to a store.
    pub fn new(tick: TickId, positions: IndexMap<BodyId, Position>) -> Self {
        Self { tick, positions }
    }

    /// The tick that produced these positions. Tick 0 is the initial layout.
    pub fn tick(&self) -> TickId {
        self.tick
    }

    /// Position of one body, or `None` for an unknown id.
    pub fn get(&self, id: BodyId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    /// `(id, position)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, Position)> + '_ {
        self.positions.iter().map(|(id, p)| (*id, *p))
    }

    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the snapshot has no bodies.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub(crate) fn positions(&self) -> &IndexMap<BodyId, Position> {
        &self.positions
    }
}

/// A tagged slot: the tag is the tick stored in it, so a reader can tell
/// whether the slot was overwritten after it chose which one to lock.
type Slot = Option<(u64, Arc<Snapshot>)>;

/// Fixed-capacity history of committed snapshots.
///
/// Single-producer: only the engine calls `commit`. Multi-consumer: any
/// thread can call [`latest`](Self::latest), [`read`](Self::read) or
/// [`get_by_tick`](Self::get_by_tick).
///
/// The latest tick counter only grows. Slot index is `tick % capacity`.
pub struct SnapshotStore {
    slots: Vec<Mutex<Slot>>,
    latest_tick: AtomicU64,
    capacity: usize,
}

// Compile-time assertion: SnapshotStore must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SnapshotStore>();
};

impl SnapshotStore {
    /// Create a store holding `seed` as its first readable snapshot.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`. One slot is needed for the snapshot being
    /// read as the previous tick and one for the snapshot being committed.
    pub fn new(capacity: usize, seed: Snapshot) -> Self {
        assert!(
            capacity >= 2,
            "SnapshotStore capacity must be >= 2, got {capacity}"
        );
        let tick = seed.tick.0;
        let slots: Vec<Mutex<Slot>> = (0..capacity).map(|_| Mutex::new(None)).collect();
        *slots[(tick as usize) % capacity]
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some((tick, Arc::new(seed)));
        Self {
            slots,
            latest_tick: AtomicU64::new(tick),
            capacity,
        }
    }

    /// Publish a new snapshot. Single-producer only.
    ///
    /// # Panics
    ///
    /// Panics if `snapshot` is not strictly newer than the latest commit.
    pub(crate) fn commit(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let tick = snapshot.tick.0;
        let current = self.latest_tick.load(Ordering::Relaxed);
        assert!(
            tick > current,
            "commit of tick {tick} does not follow latest tick {current}"
        );
        let arc = Arc::new(snapshot);
        {
            let mut slot = self.slots[(tick as usize) % self.capacity]
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = Some((tick, Arc::clone(&arc)));
        }
        // Release: the slot contents are visible before readers see the
        // new tick.
        self.latest_tick.store(tick, Ordering::Release);
        arc
    }

    /// The most recently committed snapshot.
    pub fn latest(&self) -> Arc<Snapshot> {
        loop {
            let tick = self.latest_tick.load(Ordering::Acquire);
            if let Some(snapshot) = self.slot_if_tagged(tick) {
                return snapshot;
            }
            // The writer lapped the whole ring between the load and the
            // lock. Retry with the newer tick.
            std::thread::yield_now();
        }
    }

    /// Last committed position of `id`, or `None` for an unknown id.
    pub fn read(&self, id: BodyId) -> Option<Position> {
        self.latest().get(id)
    }

    /// A retained snapshot by tick.
    ///
    /// Returns `None` if the tick has been evicted or not committed yet.
    pub fn get_by_tick(&self, tick: TickId) -> Option<Arc<Snapshot>> {
        let current = self.latest_tick.load(Ordering::Acquire);
        if tick.0 > current || current - tick.0 >= self.capacity as u64 {
            return None;
        }
        self.slot_if_tagged(tick.0)
    }

    /// The latest committed tick.
    pub fn latest_tick(&self) -> TickId {
        TickId(self.latest_tick.load(Ordering::Acquire))
    }

    /// Number of snapshots the store retains.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot_if_tagged(&self, tick: u64) -> Option<Arc<Snapshot>> {
        let slot = self.slots[(tick as usize) % self.capacity]
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some((tag, arc)) if *tag == tick => Some(Arc::clone(arc)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("capacity", &self.capacity)
            .field("latest_tick", &self.latest_tick())
            .finish()
    }
}
