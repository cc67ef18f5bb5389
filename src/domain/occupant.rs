/// Occupant types and their properties.
/// Properties are queried via methods, not stored as flags,
/// so occupant semantics are centralized here.
///
/// A key or door carries a `tag`: the level it was authored on. The tag is
/// its color and pairs a key with its door. It stays with the occupant when a
/// key is carried and dropped onto another level's cell.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Occupant {
    #[default]
    Empty,
    Key { tag: usize },
    Door { tag: usize },
    Wall,
}

/// Kind of an occupant without its tag, for visuals and logging.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OccupantKind {
    Key,
    Door,
    Wall,
}

impl Occupant {
    /// Map a level symbol authored on `level` to an occupant.
    /// Returns None for symbols outside the level alphabet.
    pub fn from_symbol(ch: char, level: usize) -> Option<Occupant> {
        match ch {
            '.' => Some(Occupant::Empty),
            'K' => Some(Occupant::Key { tag: level }),
            'D' => Some(Occupant::Door { tag: level }),
            'W' => Some(Occupant::Wall),
            _ => None,
        }
    }

    pub fn kind(self) -> Option<OccupantKind> {
        match self {
            Occupant::Empty => None,
            Occupant::Key { .. } => Some(OccupantKind::Key),
            Occupant::Door { .. } => Some(OccupantKind::Door),
            Occupant::Wall => Some(OccupantKind::Wall),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Occupant::Empty)
    }

    /// Can the player never enter a cell holding this?
    pub fn is_wall(self) -> bool {
        matches!(self, Occupant::Wall)
    }

    pub fn is_door(self) -> bool {
        matches!(self, Occupant::Door { .. })
    }

    /// Pairing tag for keys and doors.
    pub fn tag(self) -> Option<usize> {
        match self {
            Occupant::Key { tag } | Occupant::Door { tag } => Some(tag),
            Occupant::Empty | Occupant::Wall => None,
        }
    }

    /// Palette index used to draw this occupant sitting on `cell_level`.
    /// Keys and doors show their tag; walls take the color of their level.
    pub fn color_on(self, cell_level: usize) -> usize {
        self.tag().unwrap_or(cell_level)
    }
}
