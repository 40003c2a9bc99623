//! Pre-save lifecycle hook.
//!
//! # Responsibility
//! - Fill the start date once a record leaves the draft-equivalent state.
//! - Maintain `modified` and `status_changed` timestamps.
//!
//! # Invariants
//! - An existing `start` is never overwritten.
//! - The hook never validates date ordering; `Record::clean` does that.

use crate::model::record::{Record, Timestamps};
use crate::model::status::{Status, StatusChoices};
use chrono::{DateTime, Utc};

/// What the hook changed on the record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveEffects {
    /// `start` was empty and has been set to the day of `now`.
    pub start_autofilled: bool,
    /// The status differs from the persisted one (or the record is new).
    pub status_changed: bool,
}

/// Runs immediately before a record is written.
///
/// `persisted_status` is the status currently stored for this record, or
/// `None` when the record is being inserted.
pub fn before_save(
    record: &mut Record,
    persisted_status: Option<&Status>,
    choices: &StatusChoices,
    now: DateTime<Utc>,
) -> SaveEffects {
    let mut effects = SaveEffects::default();

    if !choices.is_initial(&record.publication.status) && record.publication.start.is_none() {
        record.publication.start = Some(now.date_naive());
        effects.start_autofilled = true;
    }

    effects.status_changed = persisted_status != Some(&record.publication.status);
    match persisted_status {
        Some(_) => record.timestamps.touch(now, effects.status_changed),
        None => record.timestamps = Timestamps::new(now),
    }

    effects
}
