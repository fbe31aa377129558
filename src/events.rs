//! Notifications the game session emits for the presentation layer.

use crate::game::GameStatus;

/// Sound cues. What they sound like is up to the `AudioSink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    /// Tiles landing after a compaction.
    Clunk,
    /// Ice breaking on a match.
    Break,
    /// Match confirmation.
    Ding,
    /// A new row sliding in.
    Whoosh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    StatusChanged { from: GameStatus, to: GameStatus },
    TargetChanged(u32),
    /// Selection summed to the target; tiles disappear once the settle delay has passed.
    MatchFound { tiles: Vec<usize>, target: u32 },
    TilesCleared { tiles: Vec<usize> },
    /// Tiles that moved during compaction after a match.
    TilesSettled { moved: Vec<usize> },
    RowRevealed { row: usize, tiles: Vec<usize> },
    LevelUpReady { level: u32, drop_speed_ms: u64 },
    RoundEnded { status: GameStatus, score: u32, high_score: bool },
}

impl GameEvent {
    pub fn sounds(&self) -> &'static [Sound] {
        match self {
            Self::MatchFound { .. } => &[Sound::Break, Sound::Ding],
            Self::RowRevealed { .. } => &[Sound::Whoosh],
            Self::TilesSettled { moved } if !moved.is_empty() => &[Sound::Clunk],
            _ => &[],
        }
    }
}
