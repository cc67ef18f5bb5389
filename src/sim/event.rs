/// Effects emitted by the grid.
/// The presentation layer consumes these for drawing, tweening and sound;
/// the order of a batch is the order they must be applied in.

use std::time::Duration;

use crate::domain::entity::{Coord, OccupantId};
use crate::domain::occupant::OccupantKind;

/// Something the host draws and may later destroy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VisualRef {
    Tile(Coord),
    Occupant(OccupantId),
}

/// Where a tweened visual should end up.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TweenTarget {
    Cell(Coord),
    /// The slot that shows the key currently in hand.
    HeldSlot,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Easing {
    Linear,
    #[default]
    EaseOutQuad,
    EaseInOutCubic,
    EaseOutBack,
}

impl Easing {
    pub fn from_name(s: &str) -> Option<Easing> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "linear" => Some(Easing::Linear),
            "ease_out_quad" | "out_quad" => Some(Easing::EaseOutQuad),
            "ease_in_out_cubic" | "in_out_cubic" => Some(Easing::EaseInOutCubic),
            "ease_out_back" | "out_back" => Some(Easing::EaseOutBack),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Effect {
    SpawnTile { coord: Coord, color: usize },
    SpawnOccupant { id: OccupantId, coord: Coord, kind: OccupantKind, color: usize },
    DestroyVisual(VisualRef),
    TweenMove { id: OccupantId, to: TweenTarget, duration: Duration, easing: Easing },
    RecolorVisual { coord: Coord, color: usize },
    MovePlayer { d_row: i32, d_col: i32 },
}
