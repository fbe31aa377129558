//! App: terminal init, main loop, key/mouse handling and game events.

use crate::audio::{self, AudioSink, Muted, TerminalBell};
use crate::events::GameEvent;
use crate::game::{Game, GameStatus};
use crate::grid::fit_column_count;
use crate::highscores::ScoreLedger;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::ui::{self, BOARD_MARGIN, Effects, TILE_SPAN};
use crate::{Args, GameConfig};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode, size,
};
use ratatui::DefaultTerminal;
use ratatui::layout::Rect;
use std::time::{Duration, Instant};

pub struct App {
    args: Args,
    theme: Theme,
    game: Game,
    /// Board cell under the keyboard cursor (column, row).
    cursor: (usize, usize),
    effects: Effects,
    audio: Box<dyn AudioSink>,
    /// Set by the last finished round.
    new_high_score: bool,
    last_frame: Instant,
    /// Terminal area of the last frame; mouse clicks are hit-tested against it.
    area: Rect,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme, ledger: ScoreLedger) -> Result<Self> {
        let audio: Box<dyn AudioSink> = if args.mute {
            Box::new(Muted)
        } else {
            Box::new(TerminalBell::new(std::io::stdout()))
        };
        let game = Game::new(config, ledger);
        let cursor = (0, game.max_row_count() - 1);
        Ok(Self {
            args,
            theme,
            game,
            cursor,
            effects: Effects::default(),
            audio,
            new_high_score: false,
            last_frame: Instant::now(),
            area: Rect::default(),
        })
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        with_restore(
            || {
                let mut stdout = std::io::stdout();
                execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
                let mut terminal =
                    DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

                let (term_cols, _) = size()?;
                self.fit_columns(term_cols);
                if self.args.no_menu {
                    self.game.start_game();
                }
                self.last_frame = Instant::now();

                self.run_loop(&mut terminal)
            },
            restore_terminal,
        )
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            self.game.advance(now.saturating_duration_since(self.last_frame));
            self.last_frame = now;
            self.handle_game_events(now);

            terminal.draw(|f| {
                self.area = f.area();
                ui::draw(
                    f,
                    &self.game,
                    &self.theme,
                    self.cursor,
                    &mut self.effects,
                    self.new_high_score,
                    self.args.no_animation,
                    now,
                )
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            if self.handle_action(key_to_action(key)) {
                                return Ok(());
                            }
                        }
                        Event::Mouse(mouse) => self.handle_mouse(mouse),
                        Event::Resize(cols, _) => self.fit_columns(cols),
                        _ => {}
                    }
                }
            }
        }
    }

    /// Apply one action. Returns true when the app should exit.
    fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Quit => return true,
            Action::Pause => self.game.toggle_pause(),
            Action::Restart => self.game.restart_game(),
            Action::Confirm => match self.game.status() {
                GameStatus::Waiting => self.game.start_game(),
                GameStatus::LevelUp => self.game.continue_to_next_level(),
                GameStatus::Won | GameStatus::Lost => self.game.play_again(),
                GameStatus::Playing => self.toggle_at_cursor(),
            },
            Action::Toggle => self.toggle_at_cursor(),
            Action::ClearSelection => self.game.clear_selection(),
            Action::MoveLeft => self.move_cursor(-1, 0),
            Action::MoveRight => self.move_cursor(1, 0),
            Action::MoveUp => self.move_cursor(0, -1),
            Action::MoveDown => self.move_cursor(0, 1),
            Action::None => {}
        }
        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        if let Some(cell) = ui::cell_at(self.area, self.game.grid(), mouse.column, mouse.row) {
            self.cursor = cell;
            self.toggle_at_cursor();
        }
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        if self.game.is_paused() {
            return;
        }
        let (col, row) = self.cursor;
        self.cursor = (col.saturating_add_signed(dx), row.saturating_add_signed(dy));
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let grid = self.game.grid();
        self.cursor.0 = self.cursor.0.min(grid.columns() - 1);
        self.cursor.1 = self.cursor.1.min(grid.rows() - 1);
    }

    fn toggle_at_cursor(&mut self) {
        let (col, row) = self.cursor;
        if let Some(index) = self.game.grid().visible_at(col, row) {
            self.game.toggle_tile(index);
        }
    }

    /// Size the board to the terminal unless `--columns` pinned it.
    fn fit_columns(&mut self, term_cols: u16) {
        if self.args.columns.is_some() {
            return;
        }
        let columns = fit_column_count(
            u32::from(term_cols),
            u32::from(TILE_SPAN),
            u32::from(BOARD_MARGIN),
        );
        self.game.set_columns(columns);
        self.clamp_cursor();
    }

    fn handle_game_events(&mut self, now: Instant) {
        for event in self.game.drain_events() {
            for &sound in event.sounds() {
                audio::play_or_log(self.audio.as_mut(), sound);
            }
            match event {
                GameEvent::RowRevealed { tiles, .. } => self.effects.row_revealed(&tiles, now),
                GameEvent::StatusChanged {
                    to: GameStatus::Waiting,
                    ..
                }
                | GameEvent::StatusChanged {
                    from: GameStatus::LevelUp,
                    ..
                } => {
                    self.effects.reset();
                    self.new_high_score = false;
                }
                GameEvent::RoundEnded { high_score, .. } => self.new_high_score = high_score,
                _ => {}
            }
        }
    }
}

/// Run `body`, then `restore` even if `body` failed. The body's error wins over the restore's.
fn with_restore<T>(
    body: impl FnOnce() -> Result<T>,
    restore: impl FnOnce() -> Result<()>,
) -> Result<T> {
    let result = body();
    let restored = restore();
    let value = result?;
    restored?;
    Ok(value)
}

fn restore_terminal() -> Result<()> {
    let left = execute!(std::io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
    disable_raw_mode()?;
    left?;
    Ok(())
}
