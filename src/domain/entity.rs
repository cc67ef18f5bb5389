/// Entities: Coord, Cell, HeldKey, Direction and the per-tick FrameInput.
/// Plain data; the state machine that mutates them lives in `sim::step`.

use crate::domain::occupant::Occupant;

/// A unique cell across the whole stack.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Coord {
    pub level: usize,
    pub row: usize,
    pub column: usize,
}

impl Coord {
    pub fn new(level: usize, row: usize, column: usize) -> Self {
        Coord { level, row, column }
    }
}

/// Opaque handle for an occupant's visual, assigned at spawn time.
/// Follows a key when it is picked up and dropped elsewhere.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct OccupantId(pub u32);

/// Combined movement for one tick. Each axis is -1, 0 or +1 and at least
/// one axis is non-zero, so a `Direction` always leaves the current cell.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Direction {
    d_row: i8,
    d_col: i8,
}

impl Direction {
    pub const UP: Direction = Direction { d_row: -1, d_col: 0 };
    pub const DOWN: Direction = Direction { d_row: 1, d_col: 0 };
    pub const LEFT: Direction = Direction { d_row: 0, d_col: -1 };
    pub const RIGHT: Direction = Direction { d_row: 0, d_col: 1 };

    /// Build from per-axis sums of simultaneous presses.
    /// Each axis is clamped to its sign; a zero vector is no direction.
    pub fn from_axes(d_row: i32, d_col: i32) -> Option<Direction> {
        let d_row = d_row.signum() as i8;
        let d_col = d_col.signum() as i8;
        if d_row == 0 && d_col == 0 {
            None
        } else {
            Some(Direction { d_row, d_col })
        }
    }

    pub fn d_row(self) -> i32 {
        self.d_row as i32
    }

    pub fn d_col(self) -> i32 {
        self.d_col as i32
    }

    /// Apply to `(row, column)`; None when the result leaves `[0, size)`.
    pub fn offset(self, row: usize, column: usize, size: usize) -> Option<(usize, usize)> {
        let r = row as i64 + self.d_row as i64;
        let c = column as i64 + self.d_col as i64;
        let size = size as i64;
        if r < 0 || c < 0 || r >= size || c >= size {
            None
        } else {
            Some((r as usize, c as usize))
        }
    }
}

/// Frame input: at most one combined move plus the finish signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub movement: Option<Direction>,
    pub finish: bool,
}

/// One `(level, row, column)` slot. `destroyed` only ever flips to true.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub coord: Coord,
    pub occupant: Occupant,
    /// Visual of the occupant, None while Empty.
    pub visual: Option<OccupantId>,
    pub destroyed: bool,
}

impl Cell {
    pub fn new(coord: Coord, occupant: Occupant, visual: Option<OccupantId>) -> Self {
        Cell { coord, occupant, visual, destroyed: false }
    }
}

/// The single key carried by the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeldKey {
    pub tag: usize,
    pub visual: OccupantId,
}

impl HeldKey {
    pub fn occupant(self) -> Occupant {
        Occupant::Key { tag: self.tag }
    }
}
