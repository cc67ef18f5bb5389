/// The step function: resolves one tick of input against the grid.
///
/// Processing order:
///   1. Finish signal
///   2. Movement (at most one combined move)
///
/// A move runs in two phases so a refused move changes nothing:
///   - Check: bounds, entry rules, key-swap room (no mutation)
///   - Apply: consume source, interaction, player move
///
/// Effects of an applied move, in order:
///   1. Source consumed (DestroyVisual tile, or RecolorVisual for a floor)
///   2. Held key dropped on the revealed source cell (TweenMove), if swapping
///   3. Key grabbed (TweenMove to held slot) or door opened
///      (DestroyVisual door, held key, and every wall on the door's level)
///   4. MovePlayer

use log::{debug, info};

use crate::config::FinishPolicy;
use crate::domain::entity::{Coord, Direction, FrameInput, HeldKey};
use crate::domain::occupant::Occupant;
use crate::domain::rules::{self, BlockReason};
use super::event::{Effect, TweenTarget, VisualRef};
use super::world::{GridError, PuzzleGrid, SessionState};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { effects: Vec<Effect> },
    Blocked(BlockReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishOutcome {
    Solved,
    AlreadySolved,
    Refused { doors_remaining: usize },
}

/// What one tick did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub finish: Option<FinishOutcome>,
    pub movement: Option<MoveOutcome>,
}

impl StepReport {
    /// Effects to hand to the presentation layer.
    pub fn effects(&self) -> &[Effect] {
        match &self.movement {
            Some(MoveOutcome::Moved { effects }) => effects,
            _ => &[],
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(grid: &mut PuzzleGrid, input: FrameInput) -> Result<StepReport, GridError> {
    let mut report = StepReport::default();
    if input.finish {
        report.finish = Some(grid.request_finish());
    }
    if let Some(dir) = input.movement {
        report.movement = Some(grid.try_move(dir)?);
    }
    Ok(report)
}

// ══════════════════════════════════════════════════════════════
// Movement
// ══════════════════════════════════════════════════════════════

impl PuzzleGrid {
    /// Attempt one combined move. A refused move changes nothing and
    /// reports why: `Edge`, `Wall`, `Locked` (no matching key), `NoRoom`
    /// (a held key has nowhere to be dropped when grabbing another) or
    /// `SessionOver` (already solved).
    pub fn try_move(&mut self, dir: Direction) -> Result<MoveOutcome, GridError> {
        if self.state == SessionState::Solved {
            return Ok(MoveOutcome::Blocked(BlockReason::SessionOver));
        }

        let (pr, pc) = self.player;
        let (tr, tc) = match dir.offset(pr, pc, self.size) {
            Some(t) => t,
            None => return Ok(self.blocked(BlockReason::Edge)),
        };

        // ── Check ──
        let target_cell = self.top_cell_at(tr, tc)?;
        let target_level = target_cell.coord.level;
        let target = target_cell.occupant;
        let target_visual = target_cell.visual;
        let target_idx = self.index(target_level, tr, tc);
        if let Err(reason) = rules::check_entry(target, self.held) {
            return Ok(self.blocked(reason));
        }

        let source_level = self.top_level_at(pr, pc)?;
        let drop_level = self.next_alive_above(source_level, pr, pc).unwrap_or(source_level);
        let drop_spot = self.cells[self.index(drop_level, pr, pc)].occupant;
        if let Err(reason) = rules::check_swap(target, self.held, drop_spot) {
            return Ok(self.blocked(reason));
        }

        let grabbed = match target {
            Occupant::Key { tag } => match target_visual {
                Some(visual) => Some(HeldKey { tag, visual }),
                None => return Err(GridError::UntrackedOccupant { coord: Coord::new(target_level, tr, tc) }),
            },
            _ => None,
        };

        // ── Apply ──
        let mut effects = Vec::new();
        self.consume(source_level, pr, pc, &mut effects);

        match target {
            Occupant::Key { .. } => {
                if let Some(old) = self.held.take() {
                    self.drop_key(old, Coord::new(drop_level, pr, pc), &mut effects);
                }
                let cell = &mut self.cells[target_idx];
                cell.occupant = Occupant::Empty;
                cell.visual = None;
                if let Some(key) = grabbed {
                    self.grab_key(key, &mut effects);
                }
            }
            Occupant::Door { tag } => self.open_door(target_idx, tag, &mut effects),
            Occupant::Empty | Occupant::Wall => {}
        }

        self.player = (tr, tc);
        effects.push(Effect::MovePlayer { d_row: dir.d_row(), d_col: dir.d_col() });
        debug!("moved ({pr},{pc}) -> ({tr},{tc}) onto level {target_level}, {} effects", effects.len());

        Ok(MoveOutcome::Moved { effects })
    }

    fn blocked(&self, reason: BlockReason) -> MoveOutcome {
        debug!("move from {:?} blocked: {reason:?}", self.player);
        MoveOutcome::Blocked(reason)
    }

    /// Peel the cell the player is leaving. A floor is worn, not destroyed.
    fn consume(&mut self, level: usize, row: usize, column: usize, effects: &mut Vec<Effect>) {
        let coord = Coord::new(level, row, column);
        if self.next_alive_above(level, row, column).is_none() {
            effects.push(Effect::RecolorVisual { coord, color: self.worn_color() });
            return;
        }

        let idx = self.index(level, row, column);
        let cell = &mut self.cells[idx];
        cell.destroyed = true;
        cell.occupant = Occupant::Empty;
        effects.push(Effect::DestroyVisual(VisualRef::Tile(coord)));
        if let Some(visual) = cell.visual.take() {
            effects.push(Effect::DestroyVisual(VisualRef::Occupant(visual)));
        }
    }

    fn drop_key(&mut self, key: HeldKey, at: Coord, effects: &mut Vec<Effect>) {
        let idx = self.index(at.level, at.row, at.column);
        let cell = &mut self.cells[idx];
        cell.occupant = key.occupant();
        cell.visual = Some(key.visual);
        effects.push(Effect::TweenMove {
            id: key.visual,
            to: TweenTarget::Cell(at),
            duration: self.rules.tween.duration,
            easing: self.rules.tween.easing,
        });
        debug!("dropped key {} at {at:?}", key.tag);
    }

    fn grab_key(&mut self, key: HeldKey, effects: &mut Vec<Effect>) {
        self.held = Some(key);
        effects.push(Effect::TweenMove {
            id: key.visual,
            to: TweenTarget::HeldSlot,
            duration: self.rules.tween.duration,
            easing: self.rules.tween.easing,
        });
        debug!("picked up key {}", key.tag);
    }

    /// Open the door at `idx`, spend the held key, and clear every wall
    /// authored on the door's level.
    fn open_door(&mut self, idx: usize, tag: usize, effects: &mut Vec<Effect>) {
        let door = &mut self.cells[idx];
        door.occupant = Occupant::Empty;
        if let Some(visual) = door.visual.take() {
            effects.push(Effect::DestroyVisual(VisualRef::Occupant(visual)));
        }

        if let Some(key) = self.held.take() {
            effects.push(Effect::DestroyVisual(VisualRef::Occupant(key.visual)));
        }

        let start = self.index(tag, 0, 0);
        let end = start + self.size * self.size;
        let mut cleared = 0;
        for cell in &mut self.cells[start..end] {
            if cell.destroyed || !cell.occupant.is_wall() {
                continue;
            }
            cell.occupant = Occupant::Empty;
            if let Some(visual) = cell.visual.take() {
                effects.push(Effect::DestroyVisual(VisualRef::Occupant(visual)));
            }
            cleared += 1;
        }
        info!("door {tag} opened, {cleared} walls cleared");
    }
}

// ══════════════════════════════════════════════════════════════
// Finish
// ══════════════════════════════════════════════════════════════

impl PuzzleGrid {
    pub fn request_finish(&mut self) -> FinishOutcome {
        if self.state == SessionState::Solved {
            return FinishOutcome::AlreadySolved;
        }
        if self.rules.finish_policy == FinishPolicy::DoorsCleared {
            let doors_remaining = self.doors_remaining();
            if doors_remaining > 0 {
                info!("finish refused: {doors_remaining} doors remain");
                return FinishOutcome::Refused { doors_remaining };
            }
        }
        self.state = SessionState::Solved;
        info!("session solved");
        FinishOutcome::Solved
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::domain::entity::OccupantId;
    use crate::domain::occupant::OccupantKind;
    use crate::sim::level::{stack_from, LevelStack};

    fn grid_with(levels: &[&[&str]], rules: SessionConfig) -> (PuzzleGrid, Vec<Effect>) {
        PuzzleGrid::initialize(&stack_from(levels), &rules).unwrap()
    }

    fn grid(levels: &[&[&str]]) -> (PuzzleGrid, Vec<Effect>) {
        grid_with(levels, SessionConfig::default())
    }

    fn moved(outcome: MoveOutcome) -> Vec<Effect> {
        match outcome {
            MoveOutcome::Moved { effects } => effects,
            other => panic!("expected a move, got {other:?}"),
        }
    }

    fn walk(g: &mut PuzzleGrid, dirs: &[Direction]) {
        for &d in dirs {
            moved(g.try_move(d).unwrap());
        }
    }

    /// Visual id spawned for the occupant authored at `coord`.
    fn spawned_id(effects: &[Effect], at: Coord) -> OccupantId {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::SpawnOccupant { id, coord, .. } if *coord == at => Some(*id),
                _ => None,
            })
            .unwrap()
    }

    fn destroyed_flags(g: &PuzzleGrid) -> Vec<bool> {
        g.cells.iter().map(|c| c.destroyed).collect()
    }

    fn tween(id: OccupantId, to: TweenTarget) -> Effect {
        let rules = SessionConfig::default();
        Effect::TweenMove { id, to, duration: rules.tween.duration, easing: rules.tween.easing }
    }

    const OPEN_3: &[&str] = &["...", "...", "..."];

    // ── Bounds ──

    #[test]
    fn edge_blocks_without_change() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3]);
        let before = destroyed_flags(&g);
        assert_eq!(g.try_move(Direction::UP).unwrap(), MoveOutcome::Blocked(BlockReason::Edge));
        assert_eq!(g.try_move(Direction::LEFT).unwrap(), MoveOutcome::Blocked(BlockReason::Edge));
        assert_eq!(g.player(), (0, 0));
        assert_eq!(destroyed_flags(&g), before);
    }

    #[test]
    fn diagonal_combined_move() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3]);
        let diag = Direction::from_axes(1, 1).unwrap();
        let effects = moved(g.try_move(diag).unwrap());
        assert_eq!(g.player(), (1, 1));
        assert_eq!(effects.last(), Some(&Effect::MovePlayer { d_row: 1, d_col: 1 }));
    }

    // ── Walls ──

    #[test]
    fn wall_blocks_without_change() {
        let (mut g, _) = grid(&[&[".W.", "...", "..."], OPEN_3]);
        let before = destroyed_flags(&g);
        assert_eq!(g.try_move(Direction::RIGHT).unwrap(), MoveOutcome::Blocked(BlockReason::Wall));
        assert_eq!(g.player(), (0, 0));
        assert_eq!(destroyed_flags(&g), before);
    }

    #[test]
    fn hidden_wall_does_not_block() {
        let (mut g, _) = grid(&[OPEN_3, &[".W.", "...", "..."]]);
        moved(g.try_move(Direction::RIGHT).unwrap());
        assert_eq!(g.player(), (0, 1));
    }

    #[test]
    fn revealed_wall_blocks() {
        // Peel (0,1) by walking over it, then try to come back.
        let (mut g, _) = grid(&[OPEN_3, &[".W.", "...", "..."]]);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT]);
        assert_eq!(g.top_cell_at(0, 1).unwrap().occupant, Occupant::Wall);
        assert_eq!(g.try_move(Direction::LEFT).unwrap(), MoveOutcome::Blocked(BlockReason::Wall));
        assert_eq!(g.player(), (0, 2));
    }

    // ── Reveal-by-destruction ──

    #[test]
    fn leaving_a_cell_reveals_the_next_level() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3, OPEN_3]);
        let effects = moved(g.try_move(Direction::RIGHT).unwrap());

        assert!(g.cell(Coord::new(0, 0, 0)).unwrap().destroyed);
        assert_eq!(g.top_cell_at(0, 0).unwrap().coord, Coord::new(1, 0, 0));
        // Not yet revealed: the player's new cell and everything untouched.
        assert_eq!(g.top_cell_at(0, 1).unwrap().coord.level, 0);
        assert_eq!(g.top_cell_at(2, 2).unwrap().coord.level, 0);
        assert_eq!(
            effects,
            vec![
                Effect::DestroyVisual(VisualRef::Tile(Coord::new(0, 0, 0))),
                Effect::MovePlayer { d_row: 0, d_col: 1 },
            ]
        );
    }

    #[test]
    fn floor_is_worn_not_destroyed() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3]);
        walk(&mut g, &[Direction::RIGHT, Direction::LEFT]);
        // Level 0 at (0,0) is gone; level 1 is the floor now.
        let effects = moved(g.try_move(Direction::RIGHT).unwrap());
        assert_eq!(effects[0], Effect::RecolorVisual { coord: Coord::new(1, 0, 0), color: 2 });
        assert!(!g.cell(Coord::new(1, 0, 0)).unwrap().destroyed);
        assert_eq!(g.top_cell_at(0, 0).unwrap().coord.level, 1);
    }

    #[test]
    fn destroyed_flags_never_reset() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3, OPEN_3]);
        let mut seen = destroyed_flags(&g);
        let dirs = [Direction::RIGHT, Direction::DOWN, Direction::LEFT, Direction::UP];
        for i in 0..24 {
            let _ = g.try_move(dirs[i % 4]).unwrap();
            let now = destroyed_flags(&g);
            for (was, is) in seen.iter().zip(&now) {
                assert!(!was || *is);
            }
            seen = now;
        }
        // Every stack keeps a floor.
        for r in 0..3 {
            for c in 0..3 {
                assert!(g.top_cell_at(r, c).is_ok());
            }
        }
    }

    // ── Keys and doors ──

    #[test]
    fn simple_key_and_door() {
        let level: &[&str] = &[
            "....D",
            ".....",
            ".....",
            ".....",
            "K....",
        ];
        let (mut g, spawn) = grid(&[level]);
        let key_id = spawned_id(&spawn, Coord::new(0, 4, 0));
        let door_id = spawned_id(&spawn, Coord::new(0, 0, 4));

        // Without the key the door is locked.
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::RIGHT]);
        let before = destroyed_flags(&g);
        assert_eq!(g.try_move(Direction::RIGHT).unwrap(), MoveOutcome::Blocked(BlockReason::Locked));
        assert_eq!(g.player(), (0, 3));
        assert_eq!(destroyed_flags(&g), before);

        // Fetch the key at (4,0).
        walk(&mut g, &[Direction::LEFT, Direction::LEFT, Direction::LEFT]);
        walk(&mut g, &[Direction::DOWN, Direction::DOWN, Direction::DOWN]);
        let effects = moved(g.try_move(Direction::DOWN).unwrap());
        assert_eq!(g.player(), (4, 0));
        assert_eq!(g.held_key(), Some(HeldKey { tag: 0, visual: key_id }));
        assert_eq!(g.top_cell_at(4, 0).unwrap().occupant, Occupant::Empty);
        assert_eq!(effects[1], tween(key_id, TweenTarget::HeldSlot));

        // Walk back up column 0, across row 0, into the door.
        walk(&mut g, &[Direction::UP, Direction::UP, Direction::UP, Direction::UP]);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::RIGHT]);
        let effects = moved(g.try_move(Direction::RIGHT).unwrap());
        assert_eq!(g.player(), (0, 4));
        assert_eq!(g.held_key(), None);
        assert_eq!(g.top_cell_at(0, 4).unwrap().occupant, Occupant::Empty);
        assert_eq!(g.doors_remaining(), 0);
        assert_eq!(
            effects[1..],
            [
                Effect::DestroyVisual(VisualRef::Occupant(door_id)),
                Effect::DestroyVisual(VisualRef::Occupant(key_id)),
                Effect::MovePlayer { d_row: 0, d_col: 1 },
            ]
        );
    }

    #[test]
    fn door_needs_its_own_key() {
        // Key tag 1 under (0,1); door tag 0 at (0,2) on the top layer.
        let (mut g, _) = grid(&[&["...", "..D", "..."], &[".K.", "...", "..."]]);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::LEFT]);
        assert_eq!(g.held_key().map(|k| k.tag), Some(1));
        walk(&mut g, &[Direction::RIGHT]);
        assert_eq!(g.player(), (0, 2));
        assert_eq!(g.try_move(Direction::DOWN).unwrap(), MoveOutcome::Blocked(BlockReason::Locked));
        assert_eq!(g.held_key().map(|k| k.tag), Some(1));
        assert_eq!(g.doors_remaining(), 1);
    }

    #[test]
    fn door_cascade_clears_walls_on_its_level() {
        let level: &[&str] = &[
            ".KD..",
            ".....",
            "..W..",
            ".....",
            ".W...",
        ];
        let (mut g, spawn) = grid(&[level]);
        let wall_a = spawned_id(&spawn, Coord::new(0, 2, 2));
        let wall_b = spawned_id(&spawn, Coord::new(0, 4, 1));

        walk(&mut g, &[Direction::RIGHT]);
        let effects = moved(g.try_move(Direction::RIGHT).unwrap());

        assert_eq!(g.top_cell_at(2, 2).unwrap().occupant, Occupant::Empty);
        assert_eq!(g.top_cell_at(4, 1).unwrap().occupant, Occupant::Empty);
        assert!(effects.contains(&Effect::DestroyVisual(VisualRef::Occupant(wall_a))));
        assert!(effects.contains(&Effect::DestroyVisual(VisualRef::Occupant(wall_b))));
        assert_eq!(effects.last(), Some(&Effect::MovePlayer { d_row: 0, d_col: 1 }));

        // The player never visited (2,2) but can walk through it now.
        walk(&mut g, &[Direction::DOWN, Direction::DOWN]);
        assert_eq!(g.player(), (2, 2));
    }

    #[test]
    fn cascade_spares_walls_on_other_levels() {
        let (mut g, _) = grid(&[&[".KD", "...", "..."], &["...", "...", ".W."]]);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT]);
        assert_eq!(g.cell(Coord::new(1, 2, 1)).unwrap().occupant, Occupant::Wall);
    }

    #[test]
    fn second_key_drops_first_on_revealed_cell() {
        // Key A (tag 0) at (0,1) on top; key B (tag 1) under (0,2).
        let (mut g, spawn) = grid(&[
            &[".K..", "....", "....", "...."][..],
            &["..K.", "....", "....", "...."][..],
        ]);
        let key_a = spawned_id(&spawn, Coord::new(0, 0, 1));
        let key_b = spawned_id(&spawn, Coord::new(1, 0, 2));

        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::RIGHT]);
        assert_eq!(g.held_key(), Some(HeldKey { tag: 0, visual: key_a }));
        assert_eq!(g.top_cell_at(0, 2).unwrap().occupant, Occupant::Key { tag: 1 });

        let effects = moved(g.try_move(Direction::LEFT).unwrap());
        assert_eq!(g.held_key(), Some(HeldKey { tag: 1, visual: key_b }));
        let dropped = g.top_cell_at(0, 3).unwrap();
        assert_eq!(dropped.coord, Coord::new(1, 0, 3));
        assert_eq!(dropped.occupant, Occupant::Key { tag: 0 });
        assert_eq!(dropped.visual, Some(key_a));
        assert_eq!(
            effects,
            vec![
                Effect::DestroyVisual(VisualRef::Tile(Coord::new(0, 0, 3))),
                tween(key_a, TweenTarget::Cell(Coord::new(1, 0, 3))),
                tween(key_b, TweenTarget::HeldSlot),
                Effect::MovePlayer { d_row: 0, d_col: -1 },
            ]
        );
    }

    #[test]
    fn swap_refused_when_drop_spot_is_occupied() {
        let (mut g, _) = grid(&[
            &[".K..", "....", "....", "...."][..],
            &["..KW", "....", "....", "...."][..],
        ]);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::RIGHT]);
        let before = destroyed_flags(&g);
        assert_eq!(g.try_move(Direction::LEFT).unwrap(), MoveOutcome::Blocked(BlockReason::NoRoom));
        assert_eq!(g.player(), (0, 3));
        assert_eq!(g.held_key().map(|k| k.tag), Some(0));
        assert_eq!(destroyed_flags(&g), before);
    }

    #[test]
    fn swap_on_floor_drops_key_where_player_stood() {
        // One level, so every cell is a floor. The start cell holds a key.
        let (mut g, spawn) = grid(&[&["K.K", "...", "..."]]);
        let start_key = spawned_id(&spawn, Coord::new(0, 0, 0));
        let far_key = spawned_id(&spawn, Coord::new(0, 0, 2));

        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT, Direction::LEFT]);
        assert_eq!(g.held_key().map(|k| k.visual), Some(far_key));
        // Walking off a floor keeps what lies on it.
        assert_eq!(g.cell(Coord::new(0, 0, 0)).unwrap().occupant, Occupant::Key { tag: 0 });

        let effects = moved(g.try_move(Direction::LEFT).unwrap());
        assert_eq!(g.held_key().map(|k| k.visual), Some(start_key));
        assert_eq!(g.cell(Coord::new(0, 0, 1)).unwrap().occupant, Occupant::Key { tag: 0 });
        assert_eq!(
            effects,
            vec![
                Effect::RecolorVisual { coord: Coord::new(0, 0, 1), color: 1 },
                tween(far_key, TweenTarget::Cell(Coord::new(0, 0, 1))),
                tween(start_key, TweenTarget::HeldSlot),
                Effect::MovePlayer { d_row: 0, d_col: -1 },
            ]
        );
    }

    // ── Conservation walk ──

    #[test]
    fn keys_are_never_lost_on_a_long_walk() {
        let stack = LevelStack::builtin();
        let (mut g, _) = PuzzleGrid::initialize(&stack, &SessionConfig::default()).unwrap();
        let initial_keys = g.keys_on_grid();
        let initial_doors = g.doors_remaining();

        let dirs = [
            Direction::UP, Direction::DOWN, Direction::LEFT, Direction::RIGHT,
            Direction::from_axes(1, 1).unwrap(), Direction::from_axes(-1, 1).unwrap(),
            Direction::from_axes(1, -1).unwrap(), Direction::from_axes(-1, -1).unwrap(),
        ];
        let mut seed: u32 = 0x2545_f491;
        for _ in 0..2000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let dir = dirs[(seed >> 24) as usize % dirs.len()];
            let _ = g.try_move(dir).unwrap();

            let (r, c) = g.player();
            assert!(r < 5 && c < 5);
            let opened = initial_doors - g.doors_remaining();
            let held = g.held_key().is_some() as usize;
            assert_eq!(g.keys_on_grid() + held + opened, initial_keys);
        }
    }

    // ── Finish ──

    #[test]
    fn free_finish_solves_immediately() {
        let (mut g, _) = grid(&[&["D"]]);
        assert_eq!(g.request_finish(), FinishOutcome::Solved);
        assert_eq!(g.state(), SessionState::Solved);
        assert_eq!(g.request_finish(), FinishOutcome::AlreadySolved);
    }

    #[test]
    fn doors_cleared_policy_refuses_until_open() {
        let rules = SessionConfig { finish_policy: FinishPolicy::DoorsCleared, ..SessionConfig::default() };
        let (mut g, _) = grid_with(&[&[".KD", "...", "..."]], rules);
        assert_eq!(g.request_finish(), FinishOutcome::Refused { doors_remaining: 1 });
        assert_eq!(g.state(), SessionState::Active);
        walk(&mut g, &[Direction::RIGHT, Direction::RIGHT]);
        assert_eq!(g.request_finish(), FinishOutcome::Solved);
    }

    #[test]
    fn no_moves_after_solved() {
        let (mut g, _) = grid(&[OPEN_3]);
        g.request_finish();
        assert_eq!(g.try_move(Direction::RIGHT).unwrap(), MoveOutcome::Blocked(BlockReason::SessionOver));
        assert_eq!(g.player(), (0, 0));
    }

    // ── step ──

    #[test]
    fn step_without_input_does_nothing() {
        let (mut g, _) = grid(&[OPEN_3]);
        let report = step(&mut g, FrameInput::default()).unwrap();
        assert_eq!(report, StepReport::default());
        assert!(report.effects().is_empty());
    }

    #[test]
    fn step_finishes_before_moving() {
        let (mut g, _) = grid(&[OPEN_3]);
        let input = FrameInput { movement: Some(Direction::RIGHT), finish: true };
        let report = step(&mut g, input).unwrap();
        assert_eq!(report.finish, Some(FinishOutcome::Solved));
        assert_eq!(report.movement, Some(MoveOutcome::Blocked(BlockReason::SessionOver)));
    }

    #[test]
    fn step_reports_move_effects() {
        let (mut g, _) = grid(&[OPEN_3, OPEN_3]);
        let report = step(&mut g, FrameInput { movement: Some(Direction::DOWN), finish: false }).unwrap();
        assert_eq!(report.effects().len(), 2);
        assert_eq!(g.player(), (1, 0));
    }

    #[test]
    fn visible_cell_lost_is_a_hard_error() {
        let (mut g, _) = grid(&[OPEN_3]);
        let i = g.index(0, 0, 1);
        g.cells[i].destroyed = true;
        assert!(matches!(
            g.try_move(Direction::RIGHT),
            Err(GridError::NoVisibleCell { row: 0, column: 1 })
        ));
    }

    #[test]
    fn spawned_kinds_match_symbols() {
        let (_, spawn) = grid(&[&["KDW", "...", "..."]]);
        let kinds: Vec<_> = spawn
            .iter()
            .filter_map(|e| match e {
                Effect::SpawnOccupant { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![OccupantKind::Key, OccupantKind::Door, OccupantKind::Wall]);
    }
}
