//! # Seed Authority
//!
//! Owns the one generation seed of a running world and tells interested
//! parties when it changes.
//!
//! Every change bumps an *epoch*. Work that started under an older epoch must
//! be discarded by whoever started it; nothing here cancels it.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::{ProceduralError, ProceduralResult};
use crate::noise::WorldSeed;

/// Callback invoked with the new seed after a change.
pub type SeedListener = Box<dyn Fn(WorldSeed) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Seed plus the epoch it was installed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeedState {
    /// Current seed.
    pub seed: WorldSeed,
    /// Incremented on every change.
    pub epoch: u64,
}

/// Holder of the current seed with change notification.
pub struct SeedAuthority {
    state: RwLock<SeedState>,
    listeners: Mutex<Vec<(ListenerId, SeedListener)>>,
    next_listener: AtomicU64,
}

impl SeedAuthority {
    /// Creates an authority holding `seed` at epoch 0.
    #[must_use]
    pub fn new(seed: WorldSeed) -> Self {
        Self {
            state: RwLock::new(SeedState { seed, epoch: 0 }),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Current seed.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.state.read().seed
    }

    /// Current seed and epoch, read atomically.
    #[must_use]
    pub fn snapshot(&self) -> SeedState {
        *self.state.read()
    }

    /// Current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.state.read().epoch
    }

    /// Installs a new seed.
    ///
    /// Returns the new epoch, or `None` if `seed` was already current (no
    /// listeners fire in that case).
    ///
    /// Listeners run on the calling thread after the seed is visible. A
    /// listener must not call `subscribe` or `unsubscribe`.
    ///
    /// # Errors
    ///
    /// `InvalidSeed` for the zero seed; the current seed is kept.
    pub fn set(&self, seed: WorldSeed) -> ProceduralResult<Option<u64>> {
        if seed.value() == 0 {
            return Err(ProceduralError::InvalidSeed(seed.value().to_string()));
        }
        let epoch = {
            let mut state = self.state.write();
            if state.seed == seed {
                return Ok(None);
            }
            state.seed = seed;
            state.epoch += 1;
            state.epoch
        };

        tracing::info!(seed = seed.value(), epoch, "generation seed changed");

        for (_, listener) in self.listeners.lock().iter() {
            listener(seed);
        }
        Ok(Some(epoch))
    }

    /// Registers a change callback.
    pub fn subscribe(&self, listener: SeedListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Removes a change callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }
}

impl Default for SeedAuthority {
    fn default() -> Self {
        Self::new(WorldSeed::DEFAULT)
    }
}

impl std::fmt::Debug for SeedAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAuthority")
            .field("state", &self.snapshot())
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_default_seed() {
        let authority = SeedAuthority::default();
        assert_eq!(authority.seed().value(), 1337);
        assert_eq!(authority.epoch(), 0);
    }

    #[test]
    fn test_set_bumps_epoch_and_notifies() {
        let authority = SeedAuthority::new(WorldSeed::new(1));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        authority.subscribe(Box::new(move |seed| sink.lock().push(seed.value())));

        assert_eq!(authority.set(WorldSeed::new(2)).unwrap(), Some(1));
        assert_eq!(authority.set(WorldSeed::new(3)).unwrap(), Some(2));
        assert_eq!(*seen.lock(), vec![2, 3]);
        assert_eq!(authority.seed().value(), 3);
    }

    #[test]
    fn test_same_seed_is_not_a_change() {
        let authority = SeedAuthority::new(WorldSeed::new(5));
        let calls = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&calls);
        authority.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        assert_eq!(authority.set(WorldSeed::new(5)).unwrap(), None);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(authority.epoch(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let authority = SeedAuthority::new(WorldSeed::new(5));
        let calls = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&calls);
        let id = authority.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        assert!(authority.unsubscribe(id));
        assert!(!authority.unsubscribe(id));
        authority.set(WorldSeed::new(6)).unwrap();
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_zero_seed_is_rejected() {
        let authority = SeedAuthority::new(WorldSeed::new(5));
        let calls = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&calls);
        authority.subscribe(Box::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        assert!(matches!(
            authority.set(WorldSeed::new(0)),
            Err(ProceduralError::InvalidSeed(_))
        ));
        assert_eq!(authority.snapshot(), SeedState { seed: WorldSeed::new(5), epoch: 0 });
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }
}
