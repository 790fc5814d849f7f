//! Keyed per-slot state owned by the form session.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fieldcap_core::{ArtifactSlot, CaptureError, SlotKey};

/// Exactly one [`ArtifactSlot`] per [`SlotKey`] for the lifetime of the form
/// session. Slots are mutated in place and never removed.
#[derive(Debug)]
pub struct SlotStore {
    slots: Mutex<HashMap<SlotKey, ArtifactSlot>>,
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore {
    pub fn new() -> Self {
        let slots = SlotKey::ALL
            .iter()
            .map(|&key| (key, ArtifactSlot::new(key)))
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SlotKey, ArtifactSlot>> {
        // Every mutation leaves the slot valid, so a poisoned map is still usable.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: SlotKey) -> ArtifactSlot {
        self.lock()
            .entry(key)
            .or_insert_with(|| ArtifactSlot::new(key))
            .clone()
    }

    /// All slots in catalogue order
    pub fn snapshot(&self) -> Vec<ArtifactSlot> {
        let slots = self.lock();
        SlotKey::ALL
            .iter()
            .map(|key| {
                slots
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| ArtifactSlot::new(*key))
            })
            .collect()
    }

    /// Supersede whatever attempt the slot is running and return the new
    /// attempt counter.
    pub fn begin_attempt(&self, key: SlotKey) -> u64 {
        let mut slots = self.lock();
        let slot = slots.entry(key).or_insert_with(|| ArtifactSlot::new(key));
        let attempt = slot.begin_attempt();
        tracing::debug!(slot = %key, attempt, "Attempt started");
        attempt
    }

    /// Apply `update` only if `attempt` is still the slot's latest attempt.
    ///
    /// Returns `Ok(false)` when the write was discarded as stale.
    pub fn apply_if_current<F>(&self, key: SlotKey, attempt: u64, update: F) -> Result<bool, CaptureError>
    where
        F: FnOnce(&mut ArtifactSlot) -> Result<(), CaptureError>,
    {
        let mut slots = self.lock();
        let slot = slots.entry(key).or_insert_with(|| ArtifactSlot::new(key));
        if slot.attempt() != attempt {
            tracing::debug!(
                slot = %key,
                attempt,
                current = slot.attempt(),
                "Discarding stale slot update"
            );
            return Ok(false);
        }
        update(slot)?;
        Ok(true)
    }

    /// Return a terminal slot to `Pending` without supplying a new file.
    pub fn reset(&self, key: SlotKey) -> Result<(), CaptureError> {
        let mut slots = self.lock();
        slots
            .entry(key)
            .or_insert_with(|| ArtifactSlot::new(key))
            .reset()
    }
}
