//! Game session: round state machine, match resolution, row reveals, countdown, level-ups.
//!
//! One `Game` owns everything a round touches. Time only moves through `advance`, which runs
//! the scheduled countdown ticks, row reveals and deferred match applications in order.

use crate::GameConfig;
use crate::events::GameEvent;
use crate::grid::{Grid, MAX_COLUMNS, MAX_ROWS, MIN_COLUMNS};
use crate::highscores::{self, ScoreLedger};
use crate::scheduler::Scheduler;
use crate::selection::Selection;
use crate::target;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::time::Duration;

/// Countdown resolution.
const TICK: Duration = Duration::from_secs(1);

/// Reveal cadence multiplier at level 1, in ms per 1000.
const INITIAL_DROP_SPEED_MS: u64 = 1000;
/// Fastest cadence multiplier a level can reach.
const MIN_DROP_SPEED_MS: u64 = 200;
const DROP_SPEED_STEP_MS: u64 = 100;

/// Rows uncovered when a round or level opens.
const OPENING_ROWS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Grid built, clock not running yet.
    Waiting,
    Playing,
    Won,
    Lost,
    /// Board cleared; waiting for the player to continue.
    LevelUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    CountdownTick,
    RevealRow,
    /// Second row of the staggered opening.
    OpeningReveal,
    ApplyMatch { round: u64 },
}

#[derive(Debug)]
pub struct Game {
    config: GameConfig,
    grid: Grid,
    selection: Selection,
    target: u32,
    status: GameStatus,
    /// Whole seconds left in the round.
    time_remaining: u32,
    current_row_count: usize,
    level: u32,
    score: u32,
    drop_speed_ms: u64,
    paused: bool,
    /// Matched tiles waiting for the settle delay to pass.
    pending_match: Option<Vec<usize>>,
    /// Bumped on every grid rebuild; deferred work from older rounds is ignored.
    round: u64,
    scheduler: Scheduler<Task>,
    rng: SmallRng,
    ledger: ScoreLedger,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(mut config: GameConfig, ledger: ScoreLedger) -> Self {
        config.columns = config.columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        config.rows = config.rows.clamp(OPENING_ROWS, MAX_ROWS);
        let mut rng = config
            .seed
            .map(SmallRng::seed_from_u64)
            .unwrap_or_else(SmallRng::from_os_rng);
        let grid = Grid::new(config.columns, config.rows, &mut rng);
        let target = target::generate(grid.visible_values(), &mut rng);
        let time_remaining = round_seconds(&config);
        Self {
            config,
            grid,
            selection: Selection::new(),
            target,
            status: GameStatus::Waiting,
            time_remaining,
            current_row_count: 0,
            level: 1,
            score: 0,
            drop_speed_ms: INITIAL_DROP_SPEED_MS,
            paused: false,
            pending_match: None,
            round: 0,
            scheduler: Scheduler::new(),
            rng,
            ledger,
            events: Vec::new(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn round_seconds(&self) -> u32 {
        round_seconds(&self.config)
    }

    pub fn current_row_count(&self) -> usize {
        self.current_row_count
    }

    pub fn max_row_count(&self) -> usize {
        self.grid.rows()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn drop_speed_ms(&self) -> u64 {
        self.drop_speed_ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pending_match(&self) -> Option<&[usize]> {
        self.pending_match.as_deref()
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Row-reveal period for the current level.
    pub fn reveal_interval(&self) -> Duration {
        let base = self.config.reveal_interval;
        let speed = self.drop_speed_ms as u32;
        let full = INITIAL_DROP_SPEED_MS as u32;
        // Scaling never grows the period, so the coarse path cannot overflow.
        base.checked_mul(speed)
            .map(|d| d / full)
            .unwrap_or_else(|| (base / full).saturating_mul(speed))
    }

    pub fn next_reveal_in(&self) -> Option<Duration> {
        self.scheduler
            .time_until(|t| matches!(t, Task::RevealRow | Task::OpeningReveal))
    }

    pub fn match_settle_delay(&self) -> Duration {
        self.config.match_settle_delay
    }

    /// Everything that happened since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin the clock on a freshly prepared grid: one row now, a second shortly after.
    pub fn start_game(&mut self) {
        if self.status != GameStatus::Waiting {
            log::debug!("start ignored while {:?}", self.status);
            return;
        }
        self.score = 0;
        self.time_remaining = self.round_seconds();
        self.paused = false;
        self.set_status(GameStatus::Playing);
        self.start_timers();
        self.reveal_next_row();
        self.scheduler
            .once(self.config.opening_reveal_delay, Task::OpeningReveal);
        log::info!("round started: level {}, {}s", self.level, self.time_remaining);
    }

    /// Back to a fresh waiting grid at level 1. An unfinished round still counts as a score.
    pub fn restart_game(&mut self) {
        if self.status == GameStatus::Playing && self.score > 0 {
            let name = self.player_name();
            self.ledger.add(&name, self.score);
        }
        self.reset_to_waiting();
    }

    /// Fresh grid and straight into a new round.
    pub fn play_again(&mut self) {
        self.reset_to_waiting();
        self.start_game();
    }

    fn reset_to_waiting(&mut self) {
        self.level = 1;
        self.drop_speed_ms = INITIAL_DROP_SPEED_MS;
        self.score = 0;
        self.time_remaining = self.round_seconds();
        self.paused = false;
        self.prepare_round();
        self.set_status(GameStatus::Waiting);
    }

    pub fn pause(&mut self) {
        if self.status == GameStatus::Playing && !self.paused {
            self.paused = true;
            log::debug!("paused with {}s left", self.time_remaining);
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            log::debug!("resumed");
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Select or deselect a tile. Ignored outside play, while paused, and while a match settles.
    pub fn toggle_tile(&mut self, index: usize) {
        if self.status != GameStatus::Playing || self.paused || self.pending_match.is_some() {
            log::trace!("toggle {} ignored", index);
            return;
        }
        if !self.selection.toggle(&mut self.grid, index) {
            log::trace!("toggle {} ignored: hidden or out of range", index);
            return;
        }
        self.check_invariants();
        if self.selection.is_match(self.target) {
            self.resolve_match();
        }
    }

    pub fn clear_selection(&mut self) {
        if self.pending_match.is_some() {
            return;
        }
        self.selection.clear(&mut self.grid);
    }

    /// Let `dt` of game time pass. Nothing moves while paused.
    pub fn advance(&mut self, dt: Duration) {
        if self.paused {
            return;
        }
        let until = self.scheduler.now().saturating_add(dt);
        while let Some(task) = self.scheduler.pop_due(until) {
            self.run_task(task);
        }
        self.scheduler.advance_to(until);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::CountdownTick if self.status == GameStatus::Playing => self.countdown_tick(),
            Task::RevealRow | Task::OpeningReveal if self.status == GameStatus::Playing => {
                self.reveal_next_row();
            }
            Task::ApplyMatch { round } if round == self.round && self.status == GameStatus::Playing => {
                self.apply_match();
            }
            stale => log::debug!("dropping {:?} while {:?}", stale, self.status),
        }
    }

    fn countdown_tick(&mut self) {
        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.end_round(GameStatus::Lost);
        }
    }

    /// Uncover the next hidden row, bottom-up. No-op once every row is out.
    pub fn reveal_next_row(&mut self) {
        if self.current_row_count >= self.max_row_count() {
            return;
        }
        let row = self.max_row_count() - 1 - self.current_row_count;
        let tiles = self.grid.reveal_row(row);
        self.grid.compact();
        self.current_row_count += 1;
        log::debug!("revealed row {} ({} rows out)", row, self.current_row_count);
        self.events.push(GameEvent::RowRevealed { row, tiles });
    }

    fn resolve_match(&mut self) {
        let tiles = self.selection.indices().to_vec();
        let target = self.target;
        self.score += target;
        log::info!("matched {} with {} tiles, score {}", target, tiles.len(), self.score);
        self.events.push(GameEvent::MatchFound {
            tiles: tiles.clone(),
            target,
        });
        self.pending_match = Some(tiles);
        let delay = self.config.match_settle_delay;
        if delay.is_zero() {
            self.apply_match();
        } else {
            self.scheduler
                .once(delay, Task::ApplyMatch { round: self.round });
        }
    }

    /// Hide, clear selection, compact, new target, then check for a cleared board.
    fn apply_match(&mut self) {
        let Some(tiles) = self.pending_match.take() else {
            return;
        };
        self.grid.hide(&tiles);
        self.selection.clear(&mut self.grid);
        self.events.push(GameEvent::TilesCleared { tiles });
        let moved = self.grid.compact();
        self.events.push(GameEvent::TilesSettled { moved });
        self.regenerate_target();
        self.check_invariants();
        if self.grid.all_hidden() {
            self.start_level_up();
        }
    }

    fn start_level_up(&mut self) {
        if self.config.max_level.is_some_and(|max| self.level >= max) {
            self.end_round(GameStatus::Won);
            return;
        }
        self.set_status(GameStatus::LevelUp);
        self.scheduler
            .cancel_where(|t| matches!(t, Task::CountdownTick));
        self.level += 1;
        self.drop_speed_ms = INITIAL_DROP_SPEED_MS
            .saturating_sub(u64::from(self.level) * DROP_SPEED_STEP_MS)
            .max(MIN_DROP_SPEED_MS);
        log::info!("level {} ready, drop speed {}ms", self.level, self.drop_speed_ms);
        self.events.push(GameEvent::LevelUpReady {
            level: self.level,
            drop_speed_ms: self.drop_speed_ms,
        });
    }

    /// Fresh hidden grid for the new level with the bottom two rows already out.
    pub fn continue_to_next_level(&mut self) {
        if self.status != GameStatus::LevelUp {
            return;
        }
        self.prepare_round();
        self.time_remaining = self.round_seconds();
        self.set_status(GameStatus::Playing);
        self.start_timers();
        let rows = self.max_row_count();
        for offset in 0..OPENING_ROWS {
            let row = rows - 1 - offset;
            let tiles = self.grid.reveal_row(row);
            self.events.push(GameEvent::RowRevealed { row, tiles });
        }
        self.grid.compact();
        self.current_row_count = OPENING_ROWS;
        log::info!("level {} started", self.level);
    }

    fn end_round(&mut self, status: GameStatus) {
        let high_score = self.score > 0 && self.ledger.is_high_score(self.score);
        if self.score > 0 {
            let name = self.player_name();
            self.ledger.add(&name, self.score);
        }
        self.scheduler.cancel_all();
        self.pending_match = None;
        self.set_status(status);
        log::info!("round over ({:?}), score {}", status, self.score);
        self.events.push(GameEvent::RoundEnded {
            status,
            score: self.score,
            high_score,
        });
    }

    /// Use a new column count. Applied now if no round is under way, else at the next rebuild.
    pub fn set_columns(&mut self, columns: usize) {
        let columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        if columns == self.config.columns {
            return;
        }
        self.config.columns = columns;
        if self.status == GameStatus::Waiting {
            self.prepare_round();
        }
    }

    /// Cancel outstanding work and rebuild a hidden grid.
    fn prepare_round(&mut self) {
        self.round += 1;
        self.scheduler.cancel_all();
        if self.grid.columns() == self.config.columns {
            self.grid.reset(&mut self.rng);
        } else {
            self.grid = Grid::new(self.config.columns, self.config.rows, &mut self.rng);
        }
        self.selection.forget();
        self.pending_match = None;
        self.current_row_count = 0;
        self.regenerate_target();
    }

    fn start_timers(&mut self) {
        let interval = self.reveal_interval();
        self.scheduler.every(TICK, Task::CountdownTick);
        self.scheduler.every(interval, Task::RevealRow);
    }

    fn regenerate_target(&mut self) {
        self.target = target::generate(self.grid.visible_values(), &mut self.rng);
        self.events.push(GameEvent::TargetChanged(self.target));
    }

    fn set_status(&mut self, to: GameStatus) {
        let from = self.status;
        if from != to {
            self.status = to;
            log::debug!("status {:?} -> {:?}", from, to);
            self.events.push(GameEvent::StatusChanged { from, to });
        }
    }

    fn player_name(&mut self) -> String {
        match &self.config.player_name {
            Some(name) => name.clone(),
            None => highscores::random_name(&mut self.rng).to_string(),
        }
    }

    fn check_invariants(&self) {
        debug_assert_eq!(
            self.selection.total(),
            self.grid
                .tiles()
                .iter()
                .filter(|t| t.selected)
                .map(|t| u32::from(t.value))
                .sum::<u32>(),
            "selection total out of sync with selected tiles"
        );
        debug_assert!(
            self.grid.tiles().iter().all(|t| !(t.hidden && t.selected)),
            "hidden tile is selected"
        );
    }
}

fn round_seconds(config: &GameConfig) -> u32 {
    u32::try_from(config.round_duration.as_secs())
        .unwrap_or(u32::MAX)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::DEFAULT_ROWS;
    use rand::Rng;

    fn config() -> GameConfig {
        GameConfig {
            seed: Some(42),
            player_name: Some("Tester".into()),
            ..GameConfig::default()
        }
    }

    fn new_game(config: GameConfig) -> Game {
        Game::new(config, ScoreLedger::in_memory())
    }

    /// Started round with the opening rows out and the first tick not yet fired.
    fn playing() -> Game {
        let mut game = new_game(config());
        game.start_game();
        game.advance(Duration::from_millis(600));
        game
    }

    fn visible(game: &Game) -> Vec<usize> {
        (0..game.grid().len())
            .filter(|&i| game.grid().tile(i).is_some_and(|t| t.is_visible()))
            .collect()
    }

    /// Hide everything except `keep` tiles and refresh the target like a real match would.
    fn leave_only(game: &mut Game, keep: usize) -> Vec<usize> {
        let all = visible(game);
        let (kept, gone) = all.split_at(keep);
        game.grid.hide(gone);
        game.grid.compact();
        game.regenerate_target();
        kept.to_vec()
    }

    fn select_all(game: &mut Game, tiles: &[usize]) {
        for &i in tiles {
            game.toggle_tile(i);
        }
    }

    fn statuses(events: &[GameEvent]) -> Vec<GameStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                GameEvent::StatusChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn new_game_waits_with_hidden_board() {
        let game = new_game(config());
        assert_eq!(game.status(), GameStatus::Waiting);
        assert!(game.grid().all_hidden());
        assert_eq!(game.grid().len(), 80);
        assert_eq!(game.time_remaining(), 120);
        assert!((1..=16).contains(&game.target()));
        assert_eq!(game.level(), 1);
    }

    #[test]
    fn opening_reveals_two_rows_before_first_tick() {
        let mut game = new_game(config());
        game.start_game();
        assert_eq!(game.current_row_count(), 1);
        assert_eq!(visible(&game).len(), 10);

        game.advance(Duration::from_millis(600));
        assert_eq!(game.current_row_count(), 2);
        assert_eq!(game.time_remaining(), 120);
        for i in visible(&game) {
            assert!(i % DEFAULT_ROWS >= DEFAULT_ROWS - 2, "tile {i} is not in the bottom two rows");
        }

        game.advance(Duration::from_millis(400));
        assert_eq!(game.time_remaining(), 119);
    }

    #[test]
    fn input_is_ignored_before_the_round_starts() {
        let mut game = new_game(config());
        game.grid.reveal_row(7);
        game.toggle_tile(game.grid.index_of(0, 7));
        assert!(game.selection().is_empty());
    }

    #[test]
    fn rows_keep_dropping_on_the_cadence() {
        let mut game = playing();
        let drain = game.drain_events();
        assert_eq!(statuses(&drain), vec![GameStatus::Playing]);

        game.advance(Duration::from_secs(65));
        assert_eq!(game.current_row_count(), 3);
        // Never more rows than the grid has.
        game.time_remaining = 10_000;
        game.advance(Duration::from_secs(65 * 10));
        assert_eq!(game.current_row_count(), game.max_row_count());
    }

    #[test]
    fn countdown_expiry_loses_and_records_score() {
        let mut game = playing();
        game.score = 37;
        game.advance(Duration::from_secs(119));
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.time_remaining(), 1);

        game.advance(Duration::from_secs(1));
        assert_eq!(game.status(), GameStatus::Lost);
        assert_eq!(game.ledger().entries()[0].score, 37);
        assert_eq!(game.ledger().entries()[0].name, "Tester");
        let events = game.drain_events();
        assert!(events.contains(&GameEvent::RoundEnded {
            status: GameStatus::Lost,
            score: 37,
            high_score: true,
        }));

        // Timers are gone: nothing else happens.
        let rows = game.current_row_count();
        game.advance(Duration::from_secs(600));
        assert_eq!(game.current_row_count(), rows);
        assert_eq!(game.time_remaining(), 0);
    }

    #[test]
    fn losing_with_zero_score_records_nothing() {
        let mut game = playing();
        game.advance(Duration::from_secs(120));
        assert_eq!(game.status(), GameStatus::Lost);
        assert!(game.ledger().entries().is_empty());
    }

    #[test]
    fn match_scores_now_and_clears_after_settle_delay() {
        let mut game = playing();
        let tile = visible(&game)[0];
        game.target = u32::from(game.grid.tile(tile).unwrap().value);
        game.drain_events();

        game.toggle_tile(tile);
        assert_eq!(game.score(), game.target);
        assert_eq!(game.pending_match(), Some(&[tile][..]));
        assert!(game.grid().tile(tile).unwrap().is_visible());

        // Input is blocked while the match settles.
        let other = visible(&game)[1];
        game.toggle_tile(other);
        assert_eq!(game.selection().indices(), &[tile]);

        game.advance(Duration::from_millis(799));
        assert!(game.pending_match().is_some());
        game.advance(Duration::from_millis(1));
        assert!(game.grid().tile(tile).unwrap().hidden);
        assert!(game.selection().is_empty());
        assert!(game.pending_match().is_none());
        assert_eq!(visible(&game).len(), 19);

        let events = game.drain_events();
        let kinds: Vec<&str> = events
            .iter()
            .map(|e| match e {
                GameEvent::MatchFound { .. } => "match",
                GameEvent::TilesCleared { .. } => "cleared",
                GameEvent::TilesSettled { .. } => "settled",
                GameEvent::TargetChanged(_) => "target",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["match", "cleared", "settled", "target"]);
    }

    #[test]
    fn compaction_after_match_closes_the_gap() {
        let mut game = playing();
        let bottom = game.grid.index_of(3, 7);
        let above = game.grid.index_of(3, 6);
        game.target = u32::from(game.grid.tile(bottom).unwrap().value);
        game.toggle_tile(bottom);
        game.advance(Duration::from_millis(800));
        assert_eq!(game.grid().visible_at(3, 7), Some(above));
        assert_eq!(game.grid().visible_at(3, 6), None);
    }

    #[test]
    fn pending_match_is_dropped_by_restart() {
        let mut game = playing();
        let tile = visible(&game)[0];
        game.target = u32::from(game.grid.tile(tile).unwrap().value);
        game.toggle_tile(tile);
        let score = game.score();
        game.restart_game();
        assert_eq!(game.status(), GameStatus::Waiting);
        assert_eq!(game.ledger().entries()[0].score, score);
        assert_eq!(game.score(), 0);

        game.advance(Duration::from_secs(5));
        assert!(game.grid().all_hidden());
        assert!(game.pending_match().is_none());
        assert_eq!(game.time_remaining(), 120);
    }

    #[test]
    fn clearing_the_board_levels_up() {
        let mut game = playing();
        let kept = leave_only(&mut game, 3);
        let sum: u32 = kept
            .iter()
            .map(|&i| u32::from(game.grid.tile(i).unwrap().value))
            .sum();
        assert_eq!(game.target(), sum);
        game.drain_events();

        select_all(&mut game, &kept);
        game.advance(Duration::from_millis(800));
        assert!(game.grid().all_hidden());
        assert_eq!(game.status(), GameStatus::LevelUp);
        assert_eq!(game.level(), 2);
        assert_eq!(game.drop_speed_ms(), 800);
        assert!(game.drain_events().contains(&GameEvent::LevelUpReady {
            level: 2,
            drop_speed_ms: 800
        }));

        // Countdown is stopped and reveals do nothing during the banner.
        let time = game.time_remaining();
        game.advance(Duration::from_secs(200));
        assert_eq!(game.time_remaining(), time);
        assert!(game.grid().all_hidden());
    }

    #[test]
    fn seeded_endgame_target_is_the_remaining_sum() {
        let cfg = GameConfig {
            columns: 10,
            rows: 8,
            seed: Some(2024),
            ..config()
        };
        let mut game = new_game(cfg);
        game.start_game();
        game.advance(Duration::from_millis(500));
        let kept = leave_only(&mut game, 4);
        let sum: u32 = game.grid().visible_values().map(u32::from).sum();
        assert_eq!(game.target(), sum);

        select_all(&mut game, &kept);
        assert_eq!(game.selection().total(), game.target());
        game.advance(Duration::from_secs(1));
        assert!(game.grid().all_hidden());
        assert_eq!(game.status(), GameStatus::LevelUp);
    }

    #[test]
    fn next_level_opens_with_exactly_two_rows() {
        let mut game = playing();
        game.score = 10;
        let kept = leave_only(&mut game, 2);
        select_all(&mut game, &kept);
        game.advance(Duration::from_secs(1));
        assert_eq!(game.status(), GameStatus::LevelUp);

        game.continue_to_next_level();
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.current_row_count(), 2);
        assert_eq!(game.time_remaining(), 120);
        assert!(game.score() > 10);
        let shown = visible(&game);
        assert_eq!(shown.len(), 20);
        assert!(shown.iter().all(|i| i % DEFAULT_ROWS >= DEFAULT_ROWS - 2));

        // Clock is running again, and reveals come faster.
        game.advance(Duration::from_secs(1));
        assert_eq!(game.time_remaining(), 119);
        assert_eq!(game.reveal_interval(), Duration::from_secs(52));
        game.advance(Duration::from_secs(51));
        assert_eq!(game.current_row_count(), 3);
    }

    #[test]
    fn continue_is_ignored_outside_level_up() {
        let mut game = playing();
        let rows = game.current_row_count();
        game.continue_to_next_level();
        assert_eq!(game.current_row_count(), rows);
        assert_eq!(game.level(), 1);
    }

    #[test]
    fn drop_speed_bottoms_out() {
        let mut game = playing();
        game.level = 12;
        let kept = leave_only(&mut game, 1);
        select_all(&mut game, &kept);
        game.advance(Duration::from_secs(1));
        assert_eq!(game.level(), 13);
        assert_eq!(game.drop_speed_ms(), 200);
    }

    #[test]
    fn clearing_the_final_level_wins() {
        let mut game = new_game(GameConfig {
            max_level: Some(1),
            ..config()
        });
        game.start_game();
        game.advance(Duration::from_millis(500));
        let kept = leave_only(&mut game, 2);
        select_all(&mut game, &kept);
        game.advance(Duration::from_secs(1));
        assert_eq!(game.status(), GameStatus::Won);
        assert_eq!(game.ledger().entries().len(), 1);

        game.restart_game();
        assert_eq!(game.status(), GameStatus::Waiting);
        // Finished rounds are not recorded twice.
        assert_eq!(game.ledger().entries().len(), 1);
    }

    #[test]
    fn instant_settle_applies_inside_toggle() {
        let mut game = new_game(GameConfig {
            match_settle_delay: Duration::ZERO,
            ..config()
        });
        game.start_game();
        let tile = visible(&game)[0];
        game.target = u32::from(game.grid.tile(tile).unwrap().value);
        game.toggle_tile(tile);
        assert!(game.grid().tile(tile).unwrap().hidden);
        assert!(game.pending_match().is_none());
    }

    #[test]
    fn pause_freezes_everything() {
        let mut game = playing();
        game.pause();
        assert!(game.is_paused());
        game.advance(Duration::from_secs(30));
        assert_eq!(game.time_remaining(), 120);
        let tile = visible(&game)[0];
        game.toggle_tile(tile);
        assert!(game.selection().is_empty());

        game.resume();
        game.advance(Duration::from_secs(30));
        assert_eq!(game.time_remaining(), 90);
    }

    #[test]
    fn play_again_starts_a_fresh_round() {
        let mut game = playing();
        game.advance(Duration::from_secs(120));
        assert_eq!(game.status(), GameStatus::Lost);
        game.play_again();
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.level(), 1);
        assert_eq!(game.current_row_count(), 1);
        assert_eq!(game.time_remaining(), 120);
    }

    #[test]
    fn columns_change_only_between_rounds() {
        let mut game = new_game(config());
        game.set_columns(14);
        assert_eq!(game.grid().columns(), 14);
        game.set_columns(100);
        assert_eq!(game.grid().columns(), MAX_COLUMNS);

        game.start_game();
        game.set_columns(7);
        assert_eq!(game.grid().columns(), MAX_COLUMNS);
        game.restart_game();
        assert_eq!(game.grid().columns(), 7);
    }

    #[test]
    fn round_clock_beyond_u32_saturates() {
        let mut game = new_game(GameConfig {
            round_duration: Duration::from_secs(1 << 32),
            ..config()
        });
        assert_eq!(game.round_seconds(), u32::MAX);
        game.start_game();
        game.advance(Duration::from_secs(3));
        assert_eq!(game.status(), GameStatus::Playing);
        assert_eq!(game.time_remaining(), u32::MAX - 3);
    }

    #[test]
    fn huge_reveal_interval_scales_without_overflow() {
        let base = Duration::from_secs(u64::MAX / 100);
        let mut game = new_game(GameConfig {
            reveal_interval: base,
            ..config()
        });
        game.start_game();
        assert_eq!(game.reveal_interval(), base);
        game.advance(Duration::from_secs(5));
        assert_eq!(game.current_row_count(), OPENING_ROWS);
        assert!(game.next_reveal_in().is_some_and(|left| left > Duration::from_secs(1 << 40)));

        // Level scaling on the same base takes the coarse path.
        game.drop_speed_ms = 800;
        assert_eq!(game.reveal_interval(), base / 1000 * 800);
    }

    #[test]
    fn rows_are_capped() {
        let game = new_game(GameConfig {
            rows: 10_000,
            ..config()
        });
        assert_eq!(game.max_row_count(), MAX_ROWS);
    }

    #[test]
    fn selection_stays_consistent_through_random_play() {
        let mut game = new_game(GameConfig {
            round_duration: Duration::from_secs(600),
            reveal_interval: Duration::from_secs(5),
            ..config()
        });
        game.start_game();
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..5_000 {
            match game.status() {
                GameStatus::Playing => {
                    if rng.random_bool(0.8) {
                        let i = rng.random_range(0..game.grid().len() + 5);
                        game.toggle_tile(i);
                    } else {
                        game.advance(Duration::from_millis(rng.random_range(0..1500)));
                    }
                }
                GameStatus::LevelUp => game.continue_to_next_level(),
                _ => game.play_again(),
            }
            let flagged: u32 = game
                .grid()
                .tiles()
                .iter()
                .filter(|t| t.selected)
                .map(|t| u32::from(t.value))
                .sum();
            let listed: u32 = game.selection().values().iter().map(|&v| u32::from(v)).sum();
            assert_eq!(game.selection().total(), flagged);
            assert_eq!(game.selection().total(), listed);
            assert!(game.grid().tiles().iter().all(|t| !(t.hidden && t.selected)));
        }
    }
}
