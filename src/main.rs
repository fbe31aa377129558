//! Ice Breaker: ice-fishing number puzzle in the terminal.

mod app;
mod audio;
mod events;
mod game;
mod grid;
mod highscores;
mod input;
mod logging;
mod scheduler;
mod selection;
mod target;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use highscores::{FileStore, ScoreLedger};
use std::path::PathBuf;
use std::time::Duration;

/// Options derived from CLI that affect game behaviour (board shape, timers, scoring identity).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub columns: usize,
    pub rows: usize,
    pub round_duration: Duration,
    /// Row-reveal period at level 1; later levels scale it down.
    pub reveal_interval: Duration,
    /// Gap between the first and second row when a round opens.
    pub opening_reveal_delay: Duration,
    /// How long matched tiles stay on screen before they are cleared.
    pub match_settle_delay: Duration,
    /// Clearing this level wins the game. `None` plays forever.
    pub max_level: Option<u32>,
    pub seed: Option<u64>,
    /// Name for the high score table; a random Norse name if unset.
    pub player_name: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            columns: grid::DEFAULT_COLUMNS,
            rows: grid::DEFAULT_ROWS,
            round_duration: Duration::from_secs(120),
            reveal_interval: Duration::from_secs(65),
            opening_reveal_delay: Duration::from_millis(500),
            match_settle_delay: Duration::from_millis(800),
            max_level: None,
            seed: None,
            player_name: None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        log::warn!("theme not loaded, using defaults: {}", err);
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = args.game_config();
    let ledger = if args.no_scores {
        log::info!("high scores kept in memory");
        ScoreLedger::in_memory()
    } else {
        let store = match &args.scores_file {
            Some(path) => FileStore::new(path.clone()),
            None => FileStore::from_env(),
        };
        log::info!("high scores at {}", store.path().display());
        ScoreLedger::load(Box::new(store))
    };
    let mut app = App::new(args, config, theme, ledger)?;
    app.run()?;
    Ok(())
}

/// Upper bound for the round clock and the reveal period (one day).
const MAX_TIMER_SECS: u64 = 86_400;
/// Upper bound for the short opening and settle delays.
const MAX_DELAY_MS: u64 = 60_000;

/// Ice-fishing number puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "icebreaker",
    version,
    about = "Ice-fishing number puzzle in the terminal. Pick fish whose values add up to the target to break the ice.",
    long_about = "Ice Breaker is a terminal number puzzle.\n\n\
        Rows of fish surface through the ice from the bottom up. Select tiles whose values sum \
        to the target shown in the sidebar; matched tiles are cleared and the rest settle down. \
        Clear every tile to reach the next level, where rows arrive faster. The round is lost \
        when the clock runs out.\n\n\
        CONTROLS:\n  Arrows/hjkl  Move cursor   Space/x  Select tile   Mouse  Select tile\n  \
        C/Backspace  Clear picks   Enter    Start / continue / play again\n  \
        P            Pause         R        Restart        Q / Esc  Quit"
)]
pub struct Args {
    /// Columns on the board. Fitted to the terminal width when not set.
    #[arg(
        long,
        value_name = "COLS",
        value_parser = RangedU64ValueParser::<usize>::new()
            .range((grid::MIN_COLUMNS as u64)..=(grid::MAX_COLUMNS as u64))
    )]
    pub columns: Option<usize>,

    /// Rows on the board.
    #[arg(
        long,
        default_value_t = grid::DEFAULT_ROWS,
        value_name = "ROWS",
        value_parser = RangedU64ValueParser::<usize>::new().range(2..=(grid::MAX_ROWS as u64))
    )]
    pub rows: usize,

    /// Round length in seconds.
    #[arg(
        long,
        default_value_t = 120,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMER_SECS)
    )]
    pub round_secs: u64,

    /// Seconds between row reveals at level 1.
    #[arg(
        long,
        default_value_t = 65,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_TIMER_SECS)
    )]
    pub reveal_interval_secs: u64,

    /// Delay before the second opening row, in ms.
    #[arg(
        long,
        default_value_t = 500,
        value_name = "MS",
        value_parser = clap::value_parser!(u64).range(0..=MAX_DELAY_MS)
    )]
    pub opening_delay_ms: u64,

    /// How long a match stays on screen before clearing, in ms. 0 clears instantly.
    #[arg(
        long,
        default_value_t = 800,
        value_name = "MS",
        value_parser = clap::value_parser!(u64).range(0..=MAX_DELAY_MS)
    )]
    pub match_delay_ms: u64,

    /// Clearing this level wins the game. Endless if not set.
    #[arg(long, value_name = "N")]
    pub max_level: Option<u32>,

    /// Seed for tiles, targets and names (reproducible games).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Name recorded in the high score table.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub player_name: Option<String>,

    /// High score file. Defaults to $ICEBREAKER_SCORES_PATH or ~/.config/icebreaker/highscores.json.
    #[arg(long, value_name = "FILE")]
    pub scores_file: Option<PathBuf>,

    /// Keep high scores for this session only; nothing is read or written.
    #[arg(long, conflicts_with = "scores_file")]
    pub no_scores: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable row and match animations.
    #[arg(long)]
    pub no_animation: bool,

    /// No terminal bell.
    #[arg(long)]
    pub mute: bool,

    /// Skip the start screen and begin immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Target render frames per second.
    #[arg(long, default_value_t = 30.0, value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs here (RUST_LOG filters, default info). Nothing is logged otherwise.
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            columns: self.columns.unwrap_or(grid::DEFAULT_COLUMNS),
            rows: self.rows,
            round_duration: Duration::from_secs(self.round_secs),
            reveal_interval: Duration::from_secs(self.reveal_interval_secs),
            opening_reveal_delay: Duration::from_millis(self.opening_delay_ms),
            match_settle_delay: Duration::from_millis(self.match_delay_ms),
            max_level: self.max_level,
            seed: self.seed,
            player_name: self.player_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
