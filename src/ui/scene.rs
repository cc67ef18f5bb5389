/// Visual table driven by grid effects.
///
/// The scene never reads the grid. It is told what to spawn, destroy,
/// move and recolor, and keeps just enough state to draw:
///   - Tiles keyed by `Coord`, with their palette color
///   - Occupant visuals keyed by id, anchored to a cell or the held slot
///   - The player position, moved by relative deltas
///
/// The drawable tile at a `(row, column)` is the lowest level still present.

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::entity::{Coord, OccupantId};
use crate::domain::occupant::OccupantKind;
use crate::sim::event::{Effect, TweenTarget, VisualRef};
use super::tween::{Point, Tween};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Anchor {
    Cell(Coord),
    HeldSlot,
}

#[derive(Clone, Copy, Debug)]
pub struct OccupantVisual {
    pub kind: OccupantKind,
    pub color: usize,
    pub anchor: Anchor,
    tween: Option<Tween>,
}

/// Where an occupant visual is drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sprite {
    pub kind: OccupantKind,
    pub color: usize,
    pub at: Point,
    pub held: bool,
}

pub struct Scene {
    size: usize,
    tiles: HashMap<Coord, usize>,
    occupants: HashMap<OccupantId, OccupantVisual>,
    player: (i32, i32),
}

impl Scene {
    pub fn new(size: usize) -> Self {
        Scene {
            size,
            tiles: HashMap::new(),
            occupants: HashMap::new(),
            player: (0, 0),
        }
    }

    /// Grid position of the held-key slot, just right of the board.
    pub fn held_slot(&self) -> Point {
        (0.0, self.size as f32 + 1.0)
    }

    pub fn apply(&mut self, effects: &[Effect]) {
        for effect in effects {
            self.apply_one(effect);
        }
    }

    fn apply_one(&mut self, effect: &Effect) {
        match *effect {
            Effect::SpawnTile { coord, color } => {
                self.tiles.insert(coord, color);
            }
            Effect::SpawnOccupant { id, coord, kind, color } => {
                self.occupants.insert(id, OccupantVisual { kind, color, anchor: Anchor::Cell(coord), tween: None });
            }
            Effect::DestroyVisual(VisualRef::Tile(coord)) => {
                self.tiles.remove(&coord);
            }
            Effect::DestroyVisual(VisualRef::Occupant(id)) => {
                self.occupants.remove(&id);
            }
            Effect::TweenMove { id, to, duration, easing } => {
                let held_slot = self.held_slot();
                if let Some(vis) = self.occupants.get_mut(&id) {
                    let from = match vis.tween {
                        Some(tw) => tw.position(),
                        None => anchor_point(vis.anchor, held_slot),
                    };
                    vis.anchor = match to {
                        TweenTarget::Cell(coord) => Anchor::Cell(coord),
                        TweenTarget::HeldSlot => Anchor::HeldSlot,
                    };
                    let dest = anchor_point(vis.anchor, held_slot);
                    vis.tween = Some(Tween::new(from, dest, duration, easing));
                }
            }
            Effect::RecolorVisual { coord, color } => {
                if let Some(c) = self.tiles.get_mut(&coord) {
                    *c = color;
                }
            }
            Effect::MovePlayer { d_row, d_col } => {
                self.player.0 += d_row;
                self.player.1 += d_col;
            }
        }
    }

    /// Advance every in-flight tween; landed tweens are dropped.
    pub fn advance(&mut self, dt: Duration) {
        for vis in self.occupants.values_mut() {
            if let Some(tw) = &mut vis.tween {
                tw.advance(dt);
                if tw.finished() {
                    vis.tween = None;
                }
            }
        }
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.occupants.values().any(|v| v.tween.is_some())
    }

    pub fn player(&self) -> (i32, i32) {
        self.player
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Lowest level still present at `(row, column)` and its color.
    pub fn visible_tile(&self, row: usize, column: usize) -> Option<(usize, usize)> {
        self.tiles
            .iter()
            .filter(|(c, _)| c.row == row && c.column == column)
            .map(|(c, &color)| (c.level, color))
            .min_by_key(|&(level, _)| level)
    }

    /// Occupants that should be drawn: in flight, held, or resting on
    /// the visible tile of their cell.
    pub fn sprites(&self) -> Vec<Sprite> {
        let held_slot = self.held_slot();
        let mut out: Vec<(OccupantId, Sprite)> = self
            .occupants
            .iter()
            .filter(|(_, vis)| match (vis.tween, vis.anchor) {
                (Some(_), _) | (None, Anchor::HeldSlot) => true,
                (None, Anchor::Cell(c)) => {
                    self.visible_tile(c.row, c.column).map(|(level, _)| level) == Some(c.level)
                }
            })
            .map(|(&id, vis)| {
                let at = match vis.tween {
                    Some(tw) => tw.position(),
                    None => anchor_point(vis.anchor, held_slot),
                };
                let held = vis.anchor == Anchor::HeldSlot;
                (id, Sprite { kind: vis.kind, color: vis.color, at, held })
            })
            .collect();
        // Stable draw order: later spawns on top
        out.sort_by_key(|(id, _)| *id);
        out.into_iter().map(|(_, s)| s).collect()
    }

    #[cfg(test)]
    fn occupant(&self, id: OccupantId) -> Option<&OccupantVisual> {
        self.occupants.get(&id)
    }
}

fn anchor_point(anchor: Anchor, held_slot: Point) -> Point {
    match anchor {
        Anchor::Cell(c) => (c.row as f32, c.column as f32),
        Anchor::HeldSlot => held_slot,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::domain::entity::{Direction, FrameInput};
    use crate::sim::event::Easing;
    use crate::sim::level::stack_from;
    use crate::sim::step::step;
    use crate::sim::world::PuzzleGrid;

    fn tween_to(id: u32, to: TweenTarget) -> Effect {
        Effect::TweenMove { id: OccupantId(id), to, duration: Duration::from_millis(100), easing: Easing::Linear }
    }

    #[test]
    fn lowest_tile_is_visible() {
        let mut scene = Scene::new(2);
        scene.apply(&[
            Effect::SpawnTile { coord: Coord::new(0, 1, 1), color: 0 },
            Effect::SpawnTile { coord: Coord::new(1, 1, 1), color: 1 },
        ]);
        assert_eq!(scene.visible_tile(1, 1), Some((0, 0)));
        scene.apply(&[Effect::DestroyVisual(VisualRef::Tile(Coord::new(0, 1, 1)))]);
        assert_eq!(scene.visible_tile(1, 1), Some((1, 1)));
        scene.apply(&[Effect::RecolorVisual { coord: Coord::new(1, 1, 1), color: 2 }]);
        assert_eq!(scene.visible_tile(1, 1), Some((1, 2)));
        assert_eq!(scene.visible_tile(0, 0), None);
    }

    #[test]
    fn buried_occupants_are_hidden() {
        let mut scene = Scene::new(2);
        scene.apply(&[
            Effect::SpawnTile { coord: Coord::new(0, 0, 1), color: 0 },
            Effect::SpawnTile { coord: Coord::new(1, 0, 1), color: 1 },
            Effect::SpawnOccupant { id: OccupantId(0), coord: Coord::new(1, 0, 1), kind: OccupantKind::Key, color: 1 },
        ]);
        assert!(scene.sprites().is_empty());
        scene.apply(&[Effect::DestroyVisual(VisualRef::Tile(Coord::new(0, 0, 1)))]);
        let sprites = scene.sprites();
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].at, (0.0, 1.0));
    }

    #[test]
    fn tween_to_held_slot_and_back() {
        let mut scene = Scene::new(3);
        scene.apply(&[
            Effect::SpawnTile { coord: Coord::new(0, 2, 2), color: 0 },
            Effect::SpawnOccupant { id: OccupantId(4), coord: Coord::new(0, 2, 2), kind: OccupantKind::Key, color: 0 },
            tween_to(4, TweenTarget::HeldSlot),
        ]);
        assert!(scene.is_animating());
        scene.advance(Duration::from_millis(50));
        let mid = scene.sprites()[0].at;
        assert!((mid.0 - 1.0).abs() < 1e-4 && (mid.1 - 3.0).abs() < 1e-4);

        scene.advance(Duration::from_millis(60));
        assert!(!scene.is_animating());
        let sprite = scene.sprites()[0];
        assert!(sprite.held);
        assert_eq!(sprite.at, scene.held_slot());

        scene.apply(&[tween_to(4, TweenTarget::Cell(Coord::new(0, 2, 2)))]);
        assert_eq!(scene.occupant(OccupantId(4)).map(|v| v.anchor), Some(Anchor::Cell(Coord::new(0, 2, 2))));
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut scene = Scene::new(2);
        scene.apply(&[
            tween_to(9, TweenTarget::HeldSlot),
            Effect::DestroyVisual(VisualRef::Occupant(OccupantId(9))),
            Effect::RecolorVisual { coord: Coord::new(0, 0, 0), color: 3 },
        ]);
        assert!(scene.sprites().is_empty());
        assert_eq!(scene.visible_tile(0, 0), None);
    }

    #[test]
    fn mirrors_grid_through_a_session() {
        let stack = stack_from(&[&[".K", ".D"], &[".D", "K."]]);
        let (mut grid, spawn) = PuzzleGrid::initialize(&stack, &SessionConfig::default()).unwrap();
        let mut scene = Scene::new(grid.grid_size());
        scene.apply(&spawn);

        for dir in [Direction::RIGHT, Direction::DOWN, Direction::LEFT] {
            let report = step(&mut grid, FrameInput { movement: Some(dir), finish: false }).unwrap();
            scene.apply(report.effects());
            scene.advance(Duration::from_secs(1));
        }

        let (pr, pc) = grid.player();
        assert_eq!(scene.player(), (pr as i32, pc as i32));
        for r in 0..2 {
            for c in 0..2 {
                let top = grid.top_level_at(r, c).unwrap();
                assert_eq!(scene.visible_tile(r, c).map(|(level, _)| level), Some(top));
            }
        }
        let held = scene.sprites().iter().filter(|s| s.held).count();
        assert_eq!(held, usize::from(grid.held_key().is_some()));
    }
}
