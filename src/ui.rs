//! Layout and drawing: ice board, sidebar, start screen, pause, level-up and game over.

use crate::game::{Game, GameStatus};
use crate::grid::Grid;
use crate::highscores::MAX_ENTRIES;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// One tile in terminal cells.
pub const TILE_WIDTH: u16 = 5;
pub const TILE_HEIGHT: u16 = 2;
const TILE_GAP: u16 = 1;
/// Horizontal distance between neighbouring tile origins.
pub const TILE_SPAN: u16 = TILE_WIDTH + TILE_GAP;

pub const SIDEBAR_WIDTH: u16 = 28;
/// Board border plus breathing room, on top of the sidebar.
pub const BOARD_MARGIN: u16 = SIDEBAR_WIDTH + 4;

/// Terminal-side state carried between frames.
#[derive(Default)]
pub struct Effects {
    /// Fade on tiles of a match that is settling.
    match_fade: Option<Effect>,
    last_process: Option<Instant>,
    /// When each tile started sliding in; it shows after its own animation delay.
    revealed_at: HashMap<usize, Instant>,
}

impl Effects {
    pub fn row_revealed(&mut self, tiles: &[usize], now: Instant) {
        for &i in tiles {
            self.revealed_at.insert(i, now);
        }
    }

    /// Forget effects tied to the old board.
    pub fn reset(&mut self) {
        self.match_fade = None;
        self.last_process = None;
        self.revealed_at.clear();
    }
}

/// Board outer size (with border) in terminal cells.
fn board_size(grid: &Grid) -> (u16, u16) {
    let cols = u16::try_from(grid.columns()).unwrap_or(u16::MAX);
    let rows = u16::try_from(grid.rows()).unwrap_or(u16::MAX);
    (
        cols.saturating_mul(TILE_SPAN).saturating_sub(TILE_GAP).saturating_add(2),
        rows.saturating_mul(TILE_HEIGHT).saturating_add(2),
    )
}

/// Board and sidebar rects, centred like the rest of the screens.
fn game_layout(area: Rect, grid: &Grid) -> (Rect, Rect) {
    let (bw, bh) = board_size(grid);
    let total_w = bw.saturating_add(SIDEBAR_WIDTH);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh.max(SIDEBAR_MIN_HEIGHT)),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);
    let board = Rect {
        height: bh.min(inner[0].height),
        ..inner[0]
    };
    (board, inner[1])
}

const SIDEBAR_MIN_HEIGHT: u16 = 20;

/// Board inner rect (tiles only, no border).
fn board_inner(area: Rect, grid: &Grid) -> Rect {
    let (board, _) = game_layout(area, grid);
    Rect {
        x: board.x + 1,
        y: board.y + 1,
        width: board.width.saturating_sub(2),
        height: board.height.saturating_sub(2),
    }
}

fn tile_rect(inner: Rect, col: usize, row: usize) -> Rect {
    let offset = |n: usize, step: u16| u16::try_from(n).unwrap_or(u16::MAX).saturating_mul(step);
    let x = inner.x.saturating_add(offset(col, TILE_SPAN));
    let y = inner.y.saturating_add(offset(row, TILE_HEIGHT));
    Rect {
        x,
        y,
        width: TILE_WIDTH.min((inner.x + inner.width).saturating_sub(x)),
        height: TILE_HEIGHT.min((inner.y + inner.height).saturating_sub(y)),
    }
}

/// Grid cell (column, row) under a terminal position, if it lands on a tile and not a gap.
pub fn cell_at(area: Rect, grid: &Grid, x: u16, y: u16) -> Option<(usize, usize)> {
    let inner = board_inner(area, grid);
    if !inner.contains(Position { x, y }) {
        return None;
    }
    let dx = x - inner.x;
    let dy = y - inner.y;
    if dx % TILE_SPAN >= TILE_WIDTH {
        return None;
    }
    let col = (dx / TILE_SPAN) as usize;
    let row = (dy / TILE_HEIGHT) as usize;
    (col < grid.columns() && row < grid.rows()).then_some((col, row))
}

/// Draw the board for every status, plus whichever overlay the status calls for.
pub fn draw(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    cursor: (usize, usize),
    effects: &mut Effects,
    new_high_score: bool,
    no_animation: bool,
    now: Instant,
) {
    let area = frame.area();
    frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), area);
    let (board, sidebar) = game_layout(area, game.grid());
    draw_board(frame, game, theme, board, cursor, effects, no_animation, now);
    draw_sidebar(frame, game, theme, sidebar);

    if no_animation || game.pending_match().is_none() {
        effects.match_fade = None;
        effects.last_process = None;
    } else {
        apply_match_effect(frame, game, theme, area, effects, now);
    }

    match game.status() {
        GameStatus::Waiting => draw_start(frame, game, theme, area),
        GameStatus::Playing if game.is_paused() => draw_pause_overlay(frame, theme, area),
        GameStatus::Playing => {}
        GameStatus::LevelUp => draw_level_up(frame, game, theme, area),
        GameStatus::Won | GameStatus::Lost => {
            draw_game_over(frame, game, theme, area, new_high_score)
        }
    }
}

fn draw_board(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    area: Rect,
    cursor: (usize, usize),
    effects: &Effects,
    no_animation: bool,
    now: Instant,
) {
    let title = format!(" Ice Breaker  Level {} ", game.level());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let grid = game.grid();
    let buf = frame.buffer_mut();
    // Ice everywhere first; hidden tiles can share a cell with a visible one after compaction.
    let ice = Style::default().fg(theme.div_line).bg(theme.bg);
    for col in 0..grid.columns() {
        for row in 0..grid.rows() {
            let rect = tile_rect(inner, col, row);
            for y in rect.y..rect.y + rect.height {
                buf.set_string(rect.x, y, "░".repeat(rect.width as usize), ice);
            }
        }
    }
    for (i, tile) in grid.tiles().iter().enumerate() {
        let rect = tile_rect(inner, tile.position.col, tile.position.row);
        let landed = no_animation
            || effects
                .revealed_at
                .get(&i)
                .is_none_or(|t| now.saturating_duration_since(*t) >= tile.animation_delay);
        if tile.hidden || !landed || rect.is_empty() {
            continue;
        }
        let face = theme.tile_color(tile.value);
        let style = if tile.selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.selected)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.bg).bg(face)
        };
        buf.set_string(rect.x, rect.y, " ><> ", style);
        if rect.height > 1 {
            buf.set_string(rect.x, rect.y + 1, format!("  {}  ", tile.value), style);
        }
    }

    if game.status() == GameStatus::Playing {
        let rect = tile_rect(inner, cursor.0, cursor.1);
        if !rect.is_empty() {
            let style = Style::default().fg(theme.title).add_modifier(Modifier::BOLD);
            let right = rect.x + rect.width.saturating_sub(1);
            for y in rect.y..rect.y + rect.height {
                buf[(rect.x, y)].set_symbol("[").set_style(style);
                buf[(right, y)].set_symbol("]").set_style(style);
            }
        }
    }
}

/// Buffer positions covered by the given tiles.
fn tile_buffer_positions(inner: Rect, grid: &Grid, tiles: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for tile in tiles.iter().filter_map(|&i| grid.tile(i)) {
        let rect = tile_rect(inner, tile.position.col, tile.position.row);
        for x in rect.x..rect.x + rect.width {
            for y in rect.y..rect.y + rect.height {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Fade matched tiles to the board colour over the settle delay.
fn apply_match_effect(
    frame: &mut Frame,
    game: &Game,
    theme: &Theme,
    area: Rect,
    effects: &mut Effects,
    now: Instant,
) {
    let inner = board_inner(area, game.grid());
    let delta = effects
        .last_process
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    effects.last_process = Some(now);

    if effects.match_fade.is_none() {
        let tiles = game.pending_match().unwrap_or_default();
        let fading = tile_buffer_positions(inner, game.grid(), tiles);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading.contains(&(pos.x, pos.y))
        }));
        let fade_ms = game.match_settle_delay().as_millis().min(u32::MAX as u128) as u32;
        let effect = fx::fade_to(theme.bg, theme.bg, (fade_ms, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        effects.match_fade = Some(effect);
    }

    if let Some(effect) = effects.match_fade.as_mut() {
        frame.render_effect(effect, inner, TfxDuration::from_millis(delta_ms));
    }
}

fn time_color(ratio: f64) -> Color {
    if ratio > 0.5 {
        Color::Green
    } else if ratio > 0.2 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn draw_sidebar(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Target + selection
            Constraint::Length(6), // Score, best, level, rows
            Constraint::Length(4), // Time gauge
            Constraint::Length(4), // Next row gauge
            Constraint::Min(0),    // Keys
        ])
        .split(area);

    // --- Target ---
    let target_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let target_inner = target_block.inner(chunks[0]);
    target_block.render(chunks[0], frame.buffer_mut());
    let selection = game.selection();
    let picked = if selection.is_empty() {
        Span::styled(selection.describe(), dim_style)
    } else {
        Span::styled(
            format!("{} = {}", selection.describe(), selection.total()),
            fg_style,
        )
    };
    let target_lines = vec![
        Line::from(vec![
            Span::styled("Target: ", title_style),
            Span::styled(
                game.target().to_string(),
                fg_style.add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(picked),
    ];
    Paragraph::new(target_lines).render(target_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let best = match &game.config().player_name {
        Some(name) => game.ledger().best_for(name),
        None => game.ledger().top_score(),
    }
    .max(game.score());
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats_lines = vec![
        stat("Score: ", game.score().to_string()),
        stat("Best:  ", best.to_string()),
        stat("Level: ", game.level().to_string()),
        stat(
            "Rows:  ",
            format!("{}/{}", game.current_row_count(), game.max_row_count()),
        ),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    // --- Time ---
    let time_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let time_inner = time_block.inner(chunks[2]);
    time_block.render(chunks[2], frame.buffer_mut());
    let time_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(time_inner);
    let secs = game.time_remaining();
    let time_ratio = (f64::from(secs) / f64::from(game.round_seconds().max(1))).clamp(0.0, 1.0);
    Paragraph::new(Line::from(vec![
        Span::styled("Time ", title_style),
        Span::styled(format!("{:02}:{:02}", secs / 60, secs % 60), fg_style),
    ]))
    .render(time_layout[0], frame.buffer_mut());
    Gauge::default()
        .ratio(time_ratio)
        .label("")
        .gauge_style(Style::default().fg(time_color(time_ratio)))
        .render(time_layout[1], frame.buffer_mut());

    // --- Next row ---
    let next_block = Block::default().borders(Borders::ALL).border_style(border_style);
    let next_inner = next_block.inner(chunks[3]);
    next_block.render(chunks[3], frame.buffer_mut());
    let next_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(next_inner);
    let all_out = game.current_row_count() >= game.max_row_count();
    let (label, ratio) = match game.next_reveal_in() {
        _ if all_out => ("all rows out".to_string(), 1.0),
        Some(left) if game.status() == GameStatus::Playing => {
            let period = game.reveal_interval().as_secs_f64().max(f64::EPSILON);
            (
                format!("{}s", left.as_secs()),
                (1.0 - left.as_secs_f64() / period).clamp(0.0, 1.0),
            )
        }
        _ => ("-".to_string(), 0.0),
    };
    Paragraph::new(Line::from(vec![
        Span::styled("Next row ", title_style),
        Span::styled(label, fg_style),
    ]))
    .render(next_layout[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio)
        .label("")
        .gauge_style(Style::default().fg(theme.ice))
        .render(next_layout[1], frame.buffer_mut());

    // --- Keys ---
    let keys = [
        "Arrows/hjkl  Move",
        "Space        Pick",
        "Mouse        Pick",
        "C            Clear",
        "P            Pause",
        "R            Restart",
        "Q            Quit",
    ];
    let key_lines: Vec<Line> = keys
        .iter()
        .map(|k| Line::from(Span::styled(*k, dim_style)))
        .collect();
    Paragraph::new(key_lines).render(
        Rect {
            x: chunks[4].x + 1,
            width: chunks[4].width.saturating_sub(1),
            ..chunks[4]
        },
        frame.buffer_mut(),
    );
}

/// Centred popup of the given size, cleared before drawing.
fn popup(frame: &mut Frame, area: Rect, width: u16, height: u16) -> Rect {
    let rect = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    };
    Clear.render(rect, frame.buffer_mut());
    rect
}

fn popup_block(theme: &Theme, title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(title, theme.title))
}

fn score_table(game: &Game, theme: &Theme) -> Vec<Line<'static>> {
    let ledger = game.ledger();
    if ledger.entry_at_rank(1).is_none() {
        return vec![Line::from(Span::styled(
            " No scores yet ",
            Style::default().fg(theme.inactive_fg),
        ))];
    }
    (1..=MAX_ENTRIES)
        .map_while(|rank| ledger.entry_at_rank(rank))
        .map(|r| {
            Line::from(Span::styled(
                format!("{:>2}. {:<22} {:>5}", r.rank, r.name, r.score),
                Style::default().fg(theme.main_fg),
            ))
        })
        .collect()
}

fn draw_start(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Ice Breaker ",
            Style::default()
                .fg(Color::Black)
                .bg(theme.ice)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Pick fish that add up to the target. ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            " Clear the ice before time runs out. ",
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(" High scores ", Style::default().fg(theme.title))),
    ];
    lines.extend(score_table(game, theme));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter: start    Q: quit ",
        Style::default().fg(theme.main_fg),
    )));
    let height = lines.len() as u16 + 2;
    let rect = popup(frame, area, 46, height);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, " Welcome "))
        .render(rect, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P: resume    Q: quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let rect = popup(frame, area, 28, 6);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, ""))
        .render(rect, frame.buffer_mut());
}

fn draw_level_up(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" Level {}! ", game.level()),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", game.score()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Rows now drop every {}s ", game.reveal_interval().as_secs()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Enter: continue ",
            Style::default().fg(theme.title),
        )),
    ];
    let rect = popup(frame, area, 34, 9);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, " Ice cleared "))
        .render(rect, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, game: &Game, theme: &Theme, area: Rect, new_high_score: bool) {
    let (title, title_bg) = match game.status() {
        GameStatus::Won => (" You broke all the ice! ", Color::Green),
        _ => (" Time's up! ", Color::Red),
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::White).bg(title_bg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {}   Level: {} ", game.score(), game.level()),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            " New high score! ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    lines.push(Line::from(""));
    lines.extend(score_table(game, theme));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Enter: play again   R: restart   Q: quit ",
        Style::default().fg(theme.main_fg),
    )));
    let height = lines.len() as u16 + 2;
    let rect = popup(frame, area, 48, height);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(popup_block(theme, " Game over "))
        .render(rect, frame.buffer_mut());
}
