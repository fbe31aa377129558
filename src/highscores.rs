//! Top-ten high score ledger, persisted as JSON (XDG config or ~/.config/icebreaker).

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Entries kept in the ledger.
pub const MAX_ENTRIES: usize = 10;

const FILENAME: &str = "highscores.json";

/// Names handed out to anonymous players.
const NORSE_NAMES: &[&str] = &[
    "Ragnar Frostbeard",
    "Astrid Icewalker",
    "Bjorn Ironside",
    "Freydis Snowheart",
    "Gunnar Stormborn",
    "Ingrid Wintermoon",
    "Leif Frostbane",
    "Sigrid Iceshield",
    "Erik Bloodaxe",
    "Helga Frostborn",
    "Olaf Icebreaker",
    "Thora Snowblade",
    "Magnus Coldsteel",
    "Brynhild Frostfire",
    "Thorin Iceforge",
    "Solveig Winterborn",
    "Hjalmar Frostclaw",
    "Ragnhild Snowstorm",
    "Ulf Iceheart",
    "Valdis Frostwind",
    "Rollo Icebreaker",
    "Gudrun Snowfall",
    "Sven Frostguard",
    "Erika Icewalker",
    "Ivar Boneless",
    "Lagertha Shieldmaiden",
    "Torstein Frostborn",
    "Ylva Iceborn",
];

pub fn random_name(rng: &mut impl Rng) -> &'static str {
    NORSE_NAMES.choose(rng).copied().unwrap_or("Anonymous")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedScore {
    /// 1-based.
    pub rank: usize,
    pub name: String,
    pub score: u32,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid high score file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Where the ledger lives between sessions.
pub trait ScoreStore {
    fn load(&self) -> Result<Vec<ScoreEntry>, StoreError>;
    fn save(&mut self, entries: &[ScoreEntry]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$ICEBREAKER_SCORES_PATH`, else `$XDG_CONFIG_HOME/icebreaker`, else `~/.config/icebreaker`.
    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os("ICEBREAKER_SCORES_PATH") {
            return Self::new(PathBuf::from(explicit));
        }
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|xdg| !xdg.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("icebreaker").join(FILENAME))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ScoreStore for FileStore {
    fn load(&self) -> Result<Vec<ScoreEntry>, StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save(&mut self, entries: &[ScoreEntry]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, text)?;
        Ok(())
    }
}

/// Keeps scores for the lifetime of the process only.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Vec<ScoreEntry>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn with_entries(entries: Vec<ScoreEntry>) -> Self {
        Self { entries }
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self) -> Result<Vec<ScoreEntry>, StoreError> {
        Ok(self.entries.clone())
    }

    fn save(&mut self, entries: &[ScoreEntry]) -> Result<(), StoreError> {
        self.entries = entries.to_vec();
        Ok(())
    }
}

pub struct ScoreLedger {
    entries: Vec<ScoreEntry>,
    store: Box<dyn ScoreStore>,
}

impl std::fmt::Debug for ScoreLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreLedger")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl ScoreLedger {
    /// Load from `store`; an unreadable store starts an empty ledger.
    pub fn load(store: Box<dyn ScoreStore>) -> Self {
        let mut entries = store.load().unwrap_or_else(|err| {
            log::warn!("could not load high scores, starting empty: {}", err);
            Vec::new()
        });
        entries.retain(|e| e.score > 0);
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_ENTRIES);
        Self { entries, store }
    }

    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::default()))
    }

    pub fn entries(&self) -> &[ScoreEntry] {
        &self.entries
    }

    /// Record a finished round. Non-positive scores are ignored. Returns true if it was kept.
    pub fn add(&mut self, name: &str, score: u32) -> bool {
        if score == 0 {
            return false;
        }
        // After every equal score, so ties keep insertion order.
        let pos = self
            .entries
            .iter()
            .position(|e| e.score < score)
            .unwrap_or(self.entries.len());
        if pos >= MAX_ENTRIES {
            return false;
        }
        self.entries.insert(
            pos,
            ScoreEntry {
                name: name.to_string(),
                score,
            },
        );
        self.entries.truncate(MAX_ENTRIES);
        if let Err(err) = self.store.save(&self.entries) {
            log::warn!("could not save high scores: {}", err);
        }
        true
    }

    /// Would `score` make it onto the board?
    pub fn is_high_score(&self, score: u32) -> bool {
        self.entries.len() < MAX_ENTRIES
            || self.entries.iter().map(|e| e.score).min().is_some_and(|min| score > min)
    }

    pub fn valid_scores(&self) -> Vec<RankedScore> {
        self.entries
            .iter()
            .filter(|e| e.score > 0)
            .enumerate()
            .map(|(i, e)| RankedScore {
                rank: i + 1,
                name: e.name.clone(),
                score: e.score,
            })
            .collect()
    }

    pub fn entry_at_rank(&self, rank: usize) -> Option<RankedScore> {
        if rank == 0 {
            return None;
        }
        self.valid_scores().into_iter().nth(rank - 1)
    }

    /// Best score recorded under `name` (case-insensitive), 0 if none.
    pub fn best_for(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .filter(|e| e.name.eq_ignore_ascii_case(name))
            .map(|e| e.score)
            .max()
            .unwrap_or(0)
    }

    pub fn top_score(&self) -> u32 {
        self.entries.first().map(|e| e.score).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Failing;

    impl ScoreStore for Failing {
        fn load(&self) -> Result<Vec<ScoreEntry>, StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }

        fn save(&mut self, _entries: &[ScoreEntry]) -> Result<(), StoreError> {
            Err(std::io::Error::other("disk on fire").into())
        }
    }

    /// Records what the ledger saved so tests can look at it afterwards.
    #[derive(Default, Clone)]
    struct Shared(Rc<RefCell<Vec<ScoreEntry>>>);

    impl ScoreStore for Shared {
        fn load(&self) -> Result<Vec<ScoreEntry>, StoreError> {
            Ok(self.0.borrow().clone())
        }

        fn save(&mut self, entries: &[ScoreEntry]) -> Result<(), StoreError> {
            *self.0.borrow_mut() = entries.to_vec();
            Ok(())
        }
    }

    fn scores(ledger: &ScoreLedger) -> Vec<u32> {
        ledger.entries().iter().map(|e| e.score).collect()
    }

    #[test]
    fn entries_are_ranked_descending() {
        let mut ledger = ScoreLedger::in_memory();
        for s in [50, 200, 75] {
            ledger.add("p", s);
        }
        assert_eq!(scores(&ledger), vec![200, 75, 50]);
        let ranked = ledger.valid_scores();
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].score, 50);
    }

    #[test]
    fn eleventh_low_score_is_dropped() {
        let mut ledger = ScoreLedger::in_memory();
        for s in (1..=10).map(|n| n * 10) {
            ledger.add("p", s);
        }
        let before = scores(&ledger);
        assert!(!ledger.is_high_score(5));
        assert!(!ledger.add("late", 5));
        assert_eq!(ledger.entries().len(), MAX_ENTRIES);
        assert_eq!(scores(&ledger), before);
    }

    #[test]
    fn zero_is_never_inserted() {
        let mut ledger = ScoreLedger::in_memory();
        assert!(!ledger.add("p", 0));
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add("first", 30);
        ledger.add("second", 30);
        ledger.add("top", 40);
        let names: Vec<&str> = ledger.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["top", "first", "second"]);
    }

    #[test]
    fn qualification_against_full_board() {
        let mut ledger = ScoreLedger::in_memory();
        assert!(ledger.is_high_score(1));
        for s in (1..=10).map(|n| n * 10) {
            ledger.add("p", s);
        }
        assert!(!ledger.is_high_score(10));
        assert!(ledger.is_high_score(11));
        assert!(ledger.add("new", 11));
        assert_eq!(ledger.entries().last().unwrap().score, 11);
    }

    #[test]
    fn rank_lookup_and_player_best() {
        let mut ledger = ScoreLedger::in_memory();
        ledger.add("Ulf Iceheart", 12);
        ledger.add("ulf iceheart", 30);
        ledger.add("Ylva Iceborn", 20);
        assert_eq!(ledger.entry_at_rank(2).unwrap().name, "Ylva Iceborn");
        assert!(ledger.entry_at_rank(0).is_none());
        assert!(ledger.entry_at_rank(4).is_none());
        assert_eq!(ledger.best_for("ULF ICEHEART"), 30);
        assert_eq!(ledger.best_for("nobody"), 0);
        assert_eq!(ledger.top_score(), 30);
    }

    #[test]
    fn store_failures_degrade_to_empty() {
        let mut ledger = ScoreLedger::load(Box::new(Failing));
        assert!(ledger.entries().is_empty());
        assert!(ledger.add("p", 9));
        assert_eq!(scores(&ledger), vec![9]);
    }

    #[test]
    fn every_insert_is_persisted() {
        let shared = Shared::default();
        let mut ledger = ScoreLedger::load(Box::new(shared.clone()));
        ledger.add("a", 10);
        ledger.add("b", 20);
        assert_eq!(shared.0.borrow().len(), 2);
        assert_eq!(shared.0.borrow()[0].score, 20);

        let reloaded = ScoreLedger::load(Box::new(shared));
        assert_eq!(scores(&reloaded), vec![20, 10]);
    }

    #[test]
    fn loading_sanitizes_foreign_files() {
        let mut raw: Vec<ScoreEntry> = (0..15)
            .map(|n| ScoreEntry { name: format!("p{n}"), score: n })
            .collect();
        raw.reverse();
        let ledger = ScoreLedger::load(Box::new(MemoryStore::with_entries(raw)));
        assert_eq!(ledger.entries().len(), MAX_ENTRIES);
        assert_eq!(ledger.entries()[0].score, 14);
        assert!(ledger.entries().iter().all(|e| e.score > 0));
    }

    #[test]
    fn file_store_round_trips_and_tolerates_missing_file() {
        let dir = std::env::temp_dir().join(format!("icebreaker-test-{}", std::process::id()));
        let mut store = FileStore::new(dir.join("nested").join(FILENAME));
        assert!(store.load().unwrap().is_empty());
        let entries = vec![ScoreEntry { name: "Leif Frostbane".into(), score: 42 }];
        store.save(&entries).unwrap();
        assert_eq!(store.load().unwrap(), entries);
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn random_names_come_from_the_list() {
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..20 {
            assert!(NORSE_NAMES.contains(&random_name(&mut rng)));
        }
    }
}
