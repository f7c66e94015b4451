//! Duplicate suppression for incoming snapshots.

use healthwatch_types::StatusSnapshot;

/// Decide whether `candidate` should be broadcast.
///
/// Returns `true` when nothing has been accepted yet or when any field
/// differs from `last`, and `false` only for an exact duplicate.
pub fn has_changed(last: Option<&StatusSnapshot>, candidate: &StatusSnapshot) -> bool {
    match last {
        None => true,
        Some(last) => last != candidate,
    }
}
