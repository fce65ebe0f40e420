//! Finger registry and active-set management.
//!
//! The registry owns one [`FingerSlot`] per finger and the ordered list of
//! *active* slots the operator steps through. It keeps these invariants
//! after every change:
//!
//! - the active set is sorted by priority (lower first)
//! - exactly one active slot is flagged last-in-sequence, the final one
//! - excluded fingers are never active
//! - required fingers are always active
//! - the cursor points inside the active set
//!
//! # Examples
//!
//! ```
//! use fingercap_core::{CaptureSettings, FingerId};
//! use fingercap_engine::FingerRegistry;
//!
//! let mut settings = CaptureSettings::default();
//! settings.activate_optional_by_default = false;
//!
//! let mut registry = FingerRegistry::from_settings(&settings).unwrap();
//! assert_eq!(registry.active_ids(), vec![FingerId::LeftThumb, FingerId::LeftIndex]);
//!
//! assert_eq!(registry.auto_add(), Some(FingerId::RightThumb));
//! assert!(registry.current_mut().is_some());
//! assert!(registry.check_invariants().is_ok());
//! ```

use fingercap_core::{
    CaptureSettings, CaptureStatus, FingerId, FingerRequirement, Template,
};
use serde::Serialize;

use crate::error::{EngineError, Result};

/// Capture state of one finger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerSlot {
    pub id: FingerId,
    pub requirement: FingerRequirement,
    pub priority: u8,
    pub active: bool,
    pub last_in_sequence: bool,
    pub status: CaptureStatus,
    /// Best template captured so far.
    pub template: Option<Template>,
}

impl FingerSlot {
    fn new(id: FingerId, requirement: FingerRequirement, priority: u8) -> Self {
        Self {
            id,
            requirement,
            priority,
            active: false,
            last_in_sequence: false,
            status: CaptureStatus::NotCollected,
            template: None,
        }
    }

    /// Accepted status, with or without a stored template.
    pub fn has_accepted_scan(&self) -> bool {
        self.status.is_accepted()
    }
}

/// Outcome of an active-set edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveSetEdit {
    pub added: Vec<FingerId>,
    pub removed: Vec<FingerId>,
    /// Toggles refused because they would activate an excluded finger or
    /// deactivate a required one.
    pub rejected: Vec<FingerId>,
}

impl ActiveSetEdit {
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// All finger slots plus the ordered active set and cursor.
#[derive(Debug, Clone)]
pub struct FingerRegistry {
    slots: Vec<FingerSlot>,
    /// Indices into `slots`, sorted by priority.
    active: Vec<usize>,
    cursor: usize,
}

impl FingerRegistry {
    /// Build the registry from validated settings.
    ///
    /// Required fingers are always active. Optional fingers start active
    /// unless `activate_optional_by_default` is off.
    pub fn from_settings(settings: &CaptureSettings) -> Result<Self> {
        settings.validate()?;

        let slots = settings
            .fingers
            .iter()
            .map(|entry| {
                let mut slot = FingerSlot::new(entry.finger, entry.requirement, entry.priority);
                slot.active = match entry.requirement {
                    FingerRequirement::Required => true,
                    FingerRequirement::Optional => settings.activate_optional_by_default,
                    FingerRequirement::Excluded => false,
                };
                slot
            })
            .collect::<Vec<_>>();

        let active = (0..slots.len()).filter(|&i| slots[i].active).collect();

        let mut registry = Self {
            slots,
            active,
            cursor: 0,
        };
        registry.sort_active();
        registry.mark_last();
        Ok(registry)
    }

    fn index_of(&self, id: FingerId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    fn sort_active(&mut self) {
        let slots = &self.slots;
        self.active
            .sort_by_key(|&i| (slots[i].priority, slots[i].id));
    }

    fn mark_last(&mut self) {
        for slot in &mut self.slots {
            slot.last_in_sequence = false;
        }
        if let Some(&last) = self.active.last() {
            self.slots[last].last_in_sequence = true;
        }
    }

    /// Re-anchor the cursor to `anchor` if still active, else index 0.
    fn reanchor(&mut self, anchor: Option<FingerId>) {
        self.cursor = anchor.and_then(|id| self.position(id)).unwrap_or(0);
    }

    pub fn slot(&self, id: FingerId) -> Option<&FingerSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn slot_mut(&mut self, id: FingerId) -> Option<&mut FingerSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Every slot, in table order.
    pub fn slots(&self) -> &[FingerSlot] {
        &self.slots
    }

    /// Active slots in capture order.
    pub fn active_slots(&self) -> impl Iterator<Item = &FingerSlot> {
        self.active.iter().map(|&i| &self.slots[i])
    }

    pub fn active_ids(&self) -> Vec<FingerId> {
        self.active_slots().map(|slot| slot.id).collect()
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Position of `id` in the active set.
    pub fn position(&self, id: FingerId) -> Option<usize> {
        self.active.iter().position(|&i| self.slots[i].id == id)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Slot under the cursor.
    pub fn current(&self) -> Option<&FingerSlot> {
        self.active.get(self.cursor).map(|&i| &self.slots[i])
    }

    pub fn current_mut(&mut self) -> Option<&mut FingerSlot> {
        self.active.get(self.cursor).map(|&i| &mut self.slots[i])
    }

    pub fn current_id(&self) -> Option<FingerId> {
        self.current().map(|slot| slot.id)
    }

    /// Move the cursor to `index` in the active set.
    pub fn select(&mut self, index: usize) -> Result<FingerId> {
        let len = self.active.len();
        let &slot = self
            .active
            .get(index)
            .ok_or(EngineError::IndexOutOfRange { index, len })?;
        self.cursor = index;
        Ok(self.slots[slot].id)
    }

    /// Move the cursor to the next active finger. Returns the new index, or
    /// `None` when the cursor is already on the last finger.
    pub fn advance(&mut self) -> Option<usize> {
        if self.cursor + 1 < self.active.len() {
            self.cursor += 1;
            Some(self.cursor)
        } else {
            None
        }
    }

    /// Apply operator toggles to the active set.
    ///
    /// Excluded fingers cannot be activated and required fingers cannot be
    /// deactivated; such toggles are reported in
    /// [`ActiveSetEdit::rejected`]. The cursor stays on the finger it
    /// pointed at if that finger is still active, otherwise it returns to
    /// the first finger.
    pub fn edit_active_set(&mut self, changes: &[(FingerId, bool)]) -> ActiveSetEdit {
        let anchor = self.current_id();
        let mut edit = ActiveSetEdit::default();

        for &(id, activate) in changes {
            let Some(index) = self.index_of(id) else {
                edit.rejected.push(id);
                continue;
            };
            let slot = &mut self.slots[index];

            if slot.active == activate {
                continue;
            }

            let allowed = match slot.requirement {
                FingerRequirement::Excluded => !activate,
                FingerRequirement::Required => activate,
                FingerRequirement::Optional => true,
            };
            if !allowed {
                edit.rejected.push(id);
                continue;
            }

            slot.active = activate;
            if activate {
                self.active.push(index);
                edit.added.push(id);
            } else {
                self.active.retain(|&i| i != index);
                edit.removed.push(id);
            }
        }

        self.sort_active();
        self.reanchor(anchor);
        self.mark_last();
        edit
    }

    /// Activate the highest-priority inactive, non-excluded finger.
    ///
    /// Returns `None` (and changes nothing) when every eligible finger is
    /// already active.
    pub fn auto_add(&mut self) -> Option<FingerId> {
        let anchor = self.current_id();

        let index = (0..self.slots.len())
            .filter(|&i| !self.slots[i].active && !self.slots[i].requirement.is_excluded())
            .min_by_key(|&i| (self.slots[i].priority, self.slots[i].id))?;

        self.slots[index].active = true;
        self.active.push(index);

        self.sort_active();
        self.reanchor(anchor);
        self.mark_last();
        Some(self.slots[index].id)
    }

    /// Verify the registry invariants, describing the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let sorted = self.active.windows(2).all(|pair| {
            let (a, b) = (&self.slots[pair[0]], &self.slots[pair[1]]);
            (a.priority, a.id) < (b.priority, b.id)
        });
        if !sorted {
            return Err("active set is not sorted by priority".to_string());
        }

        let last_flags = self.slots.iter().filter(|s| s.last_in_sequence).count();
        if last_flags != 1 {
            return Err(format!("{last_flags} slots flagged last-in-sequence"));
        }
        if self
            .active
            .last()
            .is_none_or(|&i| !self.slots[i].last_in_sequence)
        {
            return Err("last-in-sequence flag is not on the final active slot".to_string());
        }

        for (index, slot) in self.slots.iter().enumerate() {
            if slot.active != self.active.contains(&index) {
                return Err(format!("{} active flag disagrees with active set", slot.id));
            }
            if slot.active && slot.requirement.is_excluded() {
                return Err(format!("excluded finger {} is active", slot.id));
            }
            if !slot.active && slot.requirement.is_required() {
                return Err(format!("required finger {} is inactive", slot.id));
            }
        }

        if self.cursor >= self.active.len() {
            return Err(format!(
                "cursor {} outside {} active fingers",
                self.cursor,
                self.active.len()
            ));
        }

        Ok(())
    }
}
