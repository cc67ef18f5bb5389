/// Level stack and level-pack loader.
///
/// ## Sources (priority order):
///   1. Level pack file named by `general.levels_file` in config.toml
///   2. Built-in embedded levels
///
/// ## Pack format:
///   ```text
///   ## Pack Name
///   ## Author: name
///   ---
///   # Level 1 - Name
///   <grid_size rows of grid_size symbols>
///   ---
///   # Level 2 - Name
///   <rows>
///   ```
///
/// Levels are separated by a line containing only `---`.
/// Pack metadata lines start with `##` and come before the first `---`.
/// A file without any `---` is a single level. Blank lines are ignored.
///
/// ## Symbol legend:
///   '.' = Empty    'K' = Key
///   'D' = Door     'W' = Wall
///
/// Level index is z-depth: level 0 is peeled first. It is also the color
/// that pairs a key with the door authored on the same level.

use std::path::Path;

use log::{debug, info, warn};

use crate::domain::occupant::Occupant;

pub const BUILTIN_GRID_SIZE: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("grid size must be at least 1")]
    ZeroGridSize,
    #[error("level {level}: expected {expected} rows, found {found}")]
    WrongRowCount { level: usize, expected: usize, found: usize },
    #[error("level {level} row {row}: expected {expected} symbols, found {found}")]
    WrongRowWidth { level: usize, row: usize, expected: usize, found: usize },
    #[error("level {level} row {row} column {column}: unrecognized symbol '{symbol}'")]
    UnknownSymbol { level: usize, row: usize, column: usize, symbol: char },
    #[error("cell ({level}, {row}, {column}) is outside the level stack")]
    OutOfRange { level: usize, row: usize, column: usize },
    #[error("could not read level pack {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Authored level as text (owned strings, loaded from file or embedded).
#[derive(Clone, Debug)]
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

/// A validated `grid_size × grid_size` layer.
#[derive(Clone, Debug)]
struct Level {
    name: String,
    cells: Vec<Occupant>,
}

/// The immutable, ordered set of authored levels.
#[derive(Clone, Debug)]
pub struct LevelStack {
    name: String,
    grid_size: usize,
    levels: Vec<Level>,
}

// ══════════════════════════════════════════════════════════════
// Construction + queries
// ══════════════════════════════════════════════════════════════

impl LevelStack {
    /// Validate and build from level matrices, bottom (level 0) first.
    pub fn new(grid_size: usize, defs: Vec<LevelDef>) -> Result<Self, LevelError> {
        if grid_size == 0 {
            return Err(LevelError::ZeroGridSize);
        }
        let levels = defs
            .into_iter()
            .enumerate()
            .map(|(idx, def)| parse_level(idx, grid_size, def))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LevelStack { name: String::from("Untitled Pack"), grid_size, levels })
    }

    /// The levels shipped with the game.
    pub fn builtin() -> Self {
        let defs = embedded_levels();
        let mut stack = match LevelStack::new(BUILTIN_GRID_SIZE, defs) {
            Ok(stack) => stack,
            Err(e) => unreachable!("embedded levels are malformed: {e}"),
        };
        stack.name = String::from("Built-in Levels");
        stack
    }

    /// Built-in levels when no pack is configured. They are always
    /// `BUILTIN_GRID_SIZE` wide, whatever size was asked for.
    pub fn builtin_for(grid_size: usize) -> Self {
        if grid_size != BUILTIN_GRID_SIZE {
            warn!(
                "grid_size {grid_size} ignored: built-in levels are {BUILTIN_GRID_SIZE}x{BUILTIN_GRID_SIZE}; set general.levels_file for other sizes"
            );
        }
        LevelStack::builtin()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level_name(&self, level: usize) -> Option<&str> {
        self.levels.get(level).map(|l| l.name.as_str())
    }

    /// Authored content of one cell. Pure lookup.
    pub fn occupant_at(&self, level: usize, row: usize, column: usize) -> Result<Occupant, LevelError> {
        if row >= self.grid_size || column >= self.grid_size {
            return Err(LevelError::OutOfRange { level, row, column });
        }
        self.levels
            .get(level)
            .map(|l| l.cells[row * self.grid_size + column])
            .ok_or(LevelError::OutOfRange { level, row, column })
    }
}

fn parse_level(idx: usize, grid_size: usize, def: LevelDef) -> Result<Level, LevelError> {
    if def.rows.len() != grid_size {
        return Err(LevelError::WrongRowCount { level: idx, expected: grid_size, found: def.rows.len() });
    }
    let mut cells = Vec::with_capacity(grid_size * grid_size);
    for (row, line) in def.rows.iter().enumerate() {
        let found = line.chars().count();
        if found != grid_size {
            return Err(LevelError::WrongRowWidth { level: idx, row, expected: grid_size, found });
        }
        for (column, symbol) in line.chars().enumerate() {
            let occupant = Occupant::from_symbol(symbol, idx)
                .ok_or(LevelError::UnknownSymbol { level: idx, row, column, symbol })?;
            cells.push(occupant);
        }
    }
    Ok(Level { name: def.name, cells })
}

// ══════════════════════════════════════════════════════════════
// Pack loading
// ══════════════════════════════════════════════════════════════

/// Read and parse a level pack from disk.
pub fn load_pack(path: &Path, grid_size: usize) -> Result<LevelStack, LevelError> {
    let content = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut stack = parse_pack(&content, grid_size)?;
    if stack.name.is_empty() {
        stack.name = path
            .file_stem()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
    }
    info!("loaded pack '{}' ({} levels) from {}", stack.name, stack.level_count(), path.display());
    Ok(stack)
}

/// Parse a pack from text.
pub fn parse_pack(content: &str, grid_size: usize) -> Result<LevelStack, LevelError> {
    let (name, sections) = split_pack(content);
    let defs: Vec<LevelDef> = sections
        .iter()
        .filter_map(|section| parse_level_section(section))
        .enumerate()
        .map(|(i, mut def)| {
            if def.name.is_empty() {
                def.name = format!("Layer {}", i + 1);
            }
            def
        })
        .collect();
    debug!("pack '{}': {} level sections", name, defs.len());
    let mut stack = LevelStack::new(grid_size, defs)?;
    stack.name = name;
    Ok(stack)
}

/// Split into (pack name, level sections).
fn split_pack(content: &str) -> (String, Vec<String>) {
    let mut name = String::new();
    let mut sections = vec![];
    let mut current = String::new();
    let has_separators = content.lines().any(|l| l.trim() == "---");
    let mut in_levels = !has_separators;

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed == "---" {
            if in_levels && !current.trim().is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            current.clear();
            in_levels = true;
            continue;
        }

        if trimmed.starts_with("##") {
            let meta = trimmed[2..].trim();
            if name.is_empty() && !meta.contains(':') {
                name = meta.to_string();
            }
            continue;
        }

        if !in_levels {
            continue;
        }

        current.push_str(trimmed);
        current.push('\n');
    }

    if !current.trim().is_empty() {
        sections.push(current);
    }

    (name, sections)
}

/// Parse one level section. Returns None if it has no rows.
fn parse_level_section(section: &str) -> Option<LevelDef> {
    let mut name = String::new();
    let mut rows = vec![];

    for line in section.lines() {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
            continue;
        }
        rows.push(line.to_string());
    }

    if rows.is_empty() {
        return None;
    }
    Some(LevelDef { name, rows })
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Topsoil", &[
            "....K",
            ".....",
            ".....",
            ".....",
            "....D",
        ]),
        make_embedded("Clay", &[
            ".....",
            ".....",
            ".K.D.",
            ".....",
            ".....",
        ]),
        make_embedded("Bedrock", &[
            "..K..",
            ".....",
            ".....",
            ".....",
            "..D..",
        ]),
    ]
}

fn make_embedded(name: &str, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
pub(crate) fn stack_from(levels: &[&[&str]]) -> LevelStack {
    let size = levels.first().map_or(1, |l| l.len());
    let defs = levels.iter().map(|rows| make_embedded("", rows)).collect();
    LevelStack::new(size, defs).expect("test levels are well formed")
}
