/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::sim::event::Easing;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub session: SessionConfig,
    pub palette: PaletteConfig,
    pub gamepad: GamepadConfig,
    /// Level pack to load; None means the built-in levels.
    pub levels_file: Option<PathBuf>,
    pub grid_size: usize,
}

/// Rules a puzzle session runs under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub tick_rate_ms: u64,
    pub finish_policy: FinishPolicy,
    pub tween: TweenConfig,
}

/// When the finish signal is honored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FinishPolicy {
    /// Any time, regardless of grid state.
    #[default]
    Free,
    /// Only once every door has been opened.
    DoorsCleared,
}

impl FinishPolicy {
    fn from_name(s: &str) -> Option<FinishPolicy> {
        match s.to_lowercase().as_str() {
            "free" => Some(FinishPolicy::Free),
            "doors_cleared" | "doors-cleared" => Some(FinishPolicy::DoorsCleared),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TweenConfig {
    pub duration: Duration,
    pub easing: Easing,
}

/// Colors as `(r, g, b)`; the renderer maps them to terminal colors.
#[derive(Clone, Debug)]
pub struct PaletteConfig {
    /// Indexed by level; also the key/door pairing color.
    pub levels: Vec<(u8, u8, u8)>,
    /// Color of a floor that has been walked over and cannot be peeled.
    pub worn: (u8, u8, u8),
}

impl PaletteConfig {
    /// Color for a palette index; indices past the list wrap around,
    /// except `level_count` which is the worn-floor color.
    pub fn color(&self, index: usize, level_count: usize) -> (u8, u8, u8) {
        if index == level_count || self.levels.is_empty() {
            return self.worn;
        }
        self.levels[index % self.levels.len()]
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub finish: Vec<String>,
    pub restart: Vec<String>,
    pub quit: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    session: TomlSession,
    #[serde(default)]
    tween: TomlTween,
    #[serde(default)]
    palette: TomlPalette,
    #[serde(default)]
    gamepad: TomlGamepad,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    levels_file: Option<String>,
    #[serde(default = "default_grid_size")]
    grid_size: usize,
}

#[derive(Deserialize, Debug)]
struct TomlSession {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_finish_policy")]
    finish_policy: String,
}

#[derive(Deserialize, Debug)]
struct TomlTween {
    #[serde(default = "default_tween_duration")]
    duration_ms: u64,
    #[serde(default = "default_easing")]
    easing: String,
}

#[derive(Deserialize, Debug)]
struct TomlPalette {
    #[serde(default = "default_level_colors")]
    levels: Vec<String>,
    #[serde(default = "default_worn_color")]
    worn: String,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_pad_finish")]
    finish: Vec<String>,
    #[serde(default = "default_pad_restart")]
    restart: Vec<String>,
    #[serde(default = "default_pad_quit")]
    quit: Vec<String>,
}

// ── Defaults ──

fn default_grid_size() -> usize { crate::sim::level::BUILTIN_GRID_SIZE }
fn default_tick_rate() -> u64 { 50 }
fn default_finish_policy() -> String { "free".into() }
fn default_tween_duration() -> u64 { 180 }
fn default_easing() -> String { "ease_out_quad".into() }

// Same order as the level stack: topsoil, clay, bedrock, then extras.
fn default_level_colors() -> Vec<String> {
    vec![
        "#6cbf4b".into(),
        "#c0803a".into(),
        "#7a7a8c".into(),
        "#3a8cc0".into(),
        "#b04ab0".into(),
    ]
}
fn default_worn_color() -> String { "#2a2a36".into() }

fn default_pad_finish() -> Vec<String> { vec!["Y".into()] }
fn default_pad_restart() -> Vec<String> { vec!["Start".into()] }
fn default_pad_quit() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_file: None,
            grid_size: default_grid_size(),
        }
    }
}

impl Default for TomlSession {
    fn default() -> Self {
        TomlSession {
            tick_rate_ms: default_tick_rate(),
            finish_policy: default_finish_policy(),
        }
    }
}

impl Default for TomlTween {
    fn default() -> Self {
        TomlTween {
            duration_ms: default_tween_duration(),
            easing: default_easing(),
        }
    }
}

impl Default for TomlPalette {
    fn default() -> Self {
        TomlPalette {
            levels: default_level_colors(),
            worn: default_worn_color(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            finish: default_pad_finish(),
            restart: default_pad_restart(),
            quit: default_pad_quit(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            tick_rate_ms: default_tick_rate(),
            finish_policy: FinishPolicy::Free,
            tween: TweenConfig {
                duration: Duration::from_millis(default_tween_duration()),
                easing: Easing::default(),
            },
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let finish_policy = FinishPolicy::from_name(&cfg.session.finish_policy).unwrap_or_else(|| {
            warn!("unknown finish_policy '{}', using 'free'", cfg.session.finish_policy);
            FinishPolicy::Free
        });
        let easing = Easing::from_name(&cfg.tween.easing).unwrap_or_else(|| {
            warn!("unknown easing '{}', using 'ease_out_quad'", cfg.tween.easing);
            Easing::default()
        });
        let tween = TweenConfig {
            duration: Duration::from_millis(cfg.tween.duration_ms),
            easing,
        };

        let grid_size = if cfg.general.grid_size == 0 {
            warn!("grid_size must be at least 1, using {}", default_grid_size());
            default_grid_size()
        } else {
            cfg.general.grid_size
        };

        // Resolve levels file against the search dirs when relative
        let levels_file = cfg.general.levels_file.map(|name| {
            let path = PathBuf::from(&name);
            if path.is_absolute() {
                return path;
            }
            search_dirs
                .iter()
                .map(|d| d.join(&name))
                .find(|p| p.is_file())
                .unwrap_or(path)
        });

        let mut levels: Vec<_> = cfg.palette.levels.iter().filter_map(|s| parse_hex(s)).collect();
        if levels.len() != cfg.palette.levels.len() {
            warn!("palette: ignored {} malformed colors", cfg.palette.levels.len() - levels.len());
        }
        if levels.is_empty() {
            levels = default_level_colors().iter().filter_map(|s| parse_hex(s)).collect();
        }
        let worn = parse_hex(&cfg.palette.worn).unwrap_or((42, 42, 54));

        GameConfig {
            session: SessionConfig {
                tick_rate_ms: cfg.session.tick_rate_ms.max(1),
                finish_policy,
                tween,
            },
            palette: PaletteConfig { levels, worn },
            gamepad: GamepadConfig {
                finish: cfg.gamepad.finish,
                restart: cfg.gamepad.restart,
                quit: cfg.gamepad.quit,
            },
            levels_file,
            grid_size,
        }
    }
}

/// `#rrggbb` → `(r, g, b)`.
fn parse_hex(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.trim().strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
