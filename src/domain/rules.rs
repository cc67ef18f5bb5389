/// Movement and interaction rules, truth-table driven.
///
/// Pure functions over occupants and the held key, no side effects.
/// These encode "what is legal" without performing the action.
///
/// ## Entry Truth Table
///
/// Checked in order; the first DENY wins.
/// ┌──────────────────────────────────────┬────────┬─────────────┐
/// │ Condition                            │ Allow? │ Reason      │
/// ├──────────────────────────────────────┼────────┼─────────────┤
/// │ Session solved                       │ DENY   │ SessionOver │
/// │ Target outside grid                  │ DENY   │ Edge        │
/// │ Target visible occupant is Wall      │ DENY   │ Wall        │
/// │ Target is Door, no key held          │ DENY   │ Locked      │
/// │ Target is Door, held tag ≠ door tag  │ DENY   │ Locked      │
/// │ Target is Key, key held, drop spot   │ DENY   │ NoRoom      │
/// │   at the source is not Empty         │        │             │
/// │ Otherwise                            │ ALLOW  │             │
/// └──────────────────────────────────────┴────────┴─────────────┘
///
/// Edge and SessionOver are checked by the caller, which owns the grid.

use crate::domain::entity::HeldKey;
use crate::domain::occupant::Occupant;

/// Why a move was refused. A refused move changes nothing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockReason {
    Edge,
    Wall,
    Locked,
    /// Picking up would drop the held key onto an occupied cell.
    NoRoom,
    SessionOver,
}

/// Can the player step onto a visible `target` occupant?
pub fn check_entry(target: Occupant, held: Option<HeldKey>) -> Result<(), BlockReason> {
    match target {
        Occupant::Wall => Err(BlockReason::Wall),
        Occupant::Door { tag } if !unlocks(held, tag) => Err(BlockReason::Locked),
        _ => Ok(()),
    }
}

/// Does the held key open a door tagged `door_tag`?
pub fn unlocks(held: Option<HeldKey>, door_tag: usize) -> bool {
    held.map_or(false, |k| k.tag == door_tag)
}

/// Grabbing a key while holding one drops the held key on `drop_spot`,
/// the cell that becomes visible at the source once the player leaves.
/// The drop needs an Empty spot so no occupant is overwritten.
pub fn check_swap(target: Occupant, held: Option<HeldKey>, drop_spot: Occupant) -> Result<(), BlockReason> {
    match (target, held) {
        (Occupant::Key { .. }, Some(_)) if !drop_spot.is_empty() => Err(BlockReason::NoRoom),
        _ => Ok(()),
    }
}
