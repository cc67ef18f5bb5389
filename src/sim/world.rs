/// PuzzleGrid: the mutable state of one puzzle session.
///
/// ## Cell Architecture
///
/// All cells live in one arena, `cells`, indexed by `(level, row, column)`:
///   `index = (level * size + row) * size + column`
///
/// For every `(row, column)` the levels form a stack. The visible cell is
/// the first one, scanning level 0 upward, that is not destroyed. Leaving a
/// cell destroys it and reveals the next level. Destruction always hits the
/// visible cell, so the destroyed part of a stack is a prefix `0..k`.
///
/// The last surviving cell of a stack is the floor. It is never destroyed;
/// walking off it marks it worn instead (see `sim::step`).
///
/// The grid never owns drawables. Occupant visuals are opaque `OccupantId`s
/// handed out in the spawn effects of `initialize`.

use crate::config::SessionConfig;
use crate::domain::entity::{Cell, Coord, HeldKey, OccupantId};
use crate::sim::event::Effect;
use crate::sim::level::{LevelError, LevelStack};

#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("level stack is empty")]
    NoLevels,
    #[error("no visible cell at ({row}, {column}): every level is destroyed")]
    NoVisibleCell { row: usize, column: usize },
    #[error("({row}, {column}) is outside the {size}x{size} grid")]
    OutOfBounds { row: usize, column: usize, size: usize },
    #[error("occupant at {coord:?} has no visual")]
    UntrackedOccupant { coord: Coord },
    #[error(transparent)]
    Level(#[from] LevelError),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SessionState {
    Active,
    Solved,
}

pub struct PuzzleGrid {
    pub(super) cells: Vec<Cell>,
    pub(super) size: usize,
    pub(super) level_count: usize,
    /// `(row, column)`; the player always stands on the visible cell.
    pub(super) player: (usize, usize),
    pub(super) held: Option<HeldKey>,
    pub(super) state: SessionState,
    pub(super) rules: SessionConfig,
}

// ── Construction ──

impl PuzzleGrid {
    /// Build a fresh session from the authored stack.
    /// Returns the grid and its spawn effects in level → row → column order:
    /// each cell's tile, followed by its occupant when it has one.
    pub fn initialize(stack: &LevelStack, rules: &SessionConfig) -> Result<(PuzzleGrid, Vec<Effect>), GridError> {
        let level_count = stack.level_count();
        if level_count == 0 {
            return Err(GridError::NoLevels);
        }
        let size = stack.grid_size();

        let mut cells = Vec::with_capacity(level_count * size * size);
        let mut effects = Vec::with_capacity(level_count * size * size);
        let mut next_id = 0u32;

        for level in 0..level_count {
            for row in 0..size {
                for column in 0..size {
                    let coord = Coord::new(level, row, column);
                    let occupant = stack.occupant_at(level, row, column)?;
                    effects.push(Effect::SpawnTile { coord, color: level });

                    let visual = occupant.kind().map(|kind| {
                        let id = OccupantId(next_id);
                        next_id += 1;
                        effects.push(Effect::SpawnOccupant {
                            id,
                            coord,
                            kind,
                            color: occupant.color_on(level),
                        });
                        id
                    });
                    cells.push(Cell::new(coord, occupant, visual));
                }
            }
        }

        let grid = PuzzleGrid {
            cells,
            size,
            level_count,
            player: (0, 0),
            held: None,
            state: SessionState::Active,
            rules: rules.clone(),
        };
        Ok((grid, effects))
    }
}

// ── Cell queries ──

impl PuzzleGrid {
    #[inline]
    pub(super) fn index(&self, level: usize, row: usize, column: usize) -> usize {
        (level * self.size + row) * self.size + column
    }

    #[cfg(test)]
    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        if coord.level >= self.level_count || coord.row >= self.size || coord.column >= self.size {
            return None;
        }
        Some(&self.cells[self.index(coord.level, coord.row, coord.column)])
    }

    /// Level of the visible cell at `(row, column)`: the first level,
    /// scanning from 0 upward, that is not destroyed.
    pub fn top_level_at(&self, row: usize, column: usize) -> Result<usize, GridError> {
        if row >= self.size || column >= self.size {
            return Err(GridError::OutOfBounds { row, column, size: self.size });
        }
        (0..self.level_count)
            .find(|&level| !self.cells[self.index(level, row, column)].destroyed)
            .ok_or(GridError::NoVisibleCell { row, column })
    }

    pub fn top_cell_at(&self, row: usize, column: usize) -> Result<&Cell, GridError> {
        let level = self.top_level_at(row, column)?;
        Ok(&self.cells[self.index(level, row, column)])
    }

    /// Next surviving level above `level` in the same stack.
    /// None when `level` is the floor.
    pub(super) fn next_alive_above(&self, level: usize, row: usize, column: usize) -> Option<usize> {
        (level + 1..self.level_count).find(|&l| !self.cells[self.index(l, row, column)].destroyed)
    }

    /// Doors still standing on the grid.
    pub fn doors_remaining(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| !c.destroyed && c.occupant.is_door())
            .count()
    }

    /// Keys lying on the grid, not counting the one in hand.
    #[cfg(test)]
    pub fn keys_on_grid(&self) -> usize {
        self.cells
            .iter()
            .filter(|c| !c.destroyed && matches!(c.occupant, crate::domain::occupant::Occupant::Key { .. }))
            .count()
    }
}

// ── Session queries ──

impl PuzzleGrid {
    #[cfg(test)]
    pub fn player(&self) -> (usize, usize) {
        self.player
    }

    pub fn held_key(&self) -> Option<HeldKey> {
        self.held
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn grid_size(&self) -> usize {
        self.size
    }

    /// Palette index used for a worn floor.
    pub fn worn_color(&self) -> usize {
        self.level_count
    }
}
