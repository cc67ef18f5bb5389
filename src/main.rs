/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use log::{error, info};

use config::GameConfig;
use sim::level::{load_pack, LevelError, LevelStack};
use sim::step::{self, FinishOutcome, StepReport};
use sim::world::{GridError, PuzzleGrid, SessionState};
use ui::gamepad::GamepadState;
use ui::input::InputState;
use ui::renderer::{Hud, Renderer};
use ui::scene::Scene;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

/// Ticks a HUD message stays up.
const MESSAGE_TICKS: u32 = 40;

/// Log file override; the terminal belongs to the renderer.
const LOG_FILE_ENV: &str = "PEELGRID_LOG_FILE";

fn main() {
    init_logging();
    let config = GameConfig::load();

    let stack = match load_stack(&config) {
        Ok(stack) => stack,
        Err(e) => {
            error!("level pack rejected: {e}");
            eprintln!("Could not load levels: {e}");
            return;
        }
    };

    let mut renderer = Renderer::new(&config.palette);

    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&stack, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        error!("game loop aborted: {e}");
        eprintln!("Game error: {e}");
    }
}

fn init_logging() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Ok(path) = std::env::var(LOG_FILE_ENV) {
        match File::create(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("{LOG_FILE_ENV}={path}: {e}; logging to stderr"),
        }
    }
    builder.init();
}

fn load_stack(config: &GameConfig) -> Result<LevelStack, LevelError> {
    match &config.levels_file {
        Some(path) => load_pack(path, config.grid_size),
        None => {
            info!("using built-in levels");
            Ok(LevelStack::builtin_for(config.grid_size))
        }
    }
}

/// One playthrough of the stack: grid, its visuals, and the HUD message.
struct Session {
    grid: PuzzleGrid,
    scene: Scene,
    message: String,
    message_timer: u32,
}

impl Session {
    fn start(stack: &LevelStack, config: &GameConfig) -> Result<Session, GridError> {
        let (grid, spawn) = PuzzleGrid::initialize(stack, &config.session)?;
        let mut scene = Scene::new(grid.grid_size());
        scene.apply(&spawn);
        info!("session started on \"{}\": {} levels of {}x{}", stack.name(), stack.level_count(), grid.grid_size(), grid.grid_size());
        Ok(Session { grid, scene, message: String::new(), message_timer: 0 })
    }

    fn show(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.message_timer = MESSAGE_TICKS;
    }

    fn tick_message(&mut self) {
        if self.message_timer > 0 {
            self.message_timer -= 1;
            if self.message_timer == 0 { self.message.clear(); }
        }
    }

    fn report(&mut self, report: &StepReport) {
        match report.finish {
            Some(FinishOutcome::Solved) => self.show("Solved!"),
            Some(FinishOutcome::Refused { doors_remaining }) => {
                self.show(format!("{doors_remaining} door(s) still locked"))
            }
            Some(FinishOutcome::AlreadySolved) | None => {}
        }
    }
}

fn game_loop(
    stack: &LevelStack,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let tick_rate = Duration::from_millis(config.session.tick_rate_ms);

    let level_names: Vec<String> = (0..stack.level_count())
        .map(|i| stack.level_name(i).unwrap_or("?").to_string())
        .collect();

    let mut session = Session::start(stack, config)?;
    let mut last_tick = Instant::now();
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();
        gp.feed(&mut kb.intents);

        if kb.intents.quit_requested() {
            break;
        }

        if kb.intents.take_restart() {
            info!("restart requested");
            session = Session::start(stack, config)?;
        }

        if last_tick.elapsed() >= tick_rate {
            let input = kb.intents.take_frame_input();
            let report = step::step(&mut session.grid, input)?;
            session.scene.apply(report.effects());
            session.report(&report);
            if let (Some(sfx), Some(cue)) = (sound, ui::sound::cue_for(&report)) {
                sfx.play(cue);
            }
            session.tick_message();
            last_tick = Instant::now();
        }

        session.scene.advance(last_frame.elapsed());
        last_frame = Instant::now();

        let hud = Hud {
            pack_name: stack.name(),
            level_names: &level_names,
            doors_remaining: session.grid.doors_remaining(),
            held: session.grid.held_key().and_then(|k| level_names.get(k.tag)).map(String::as_str),
            solved: session.grid.state() == SessionState::Solved,
            message: &session.message,
        };
        renderer.render(&session.scene, &hud)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}
