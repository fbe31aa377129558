//! Sound output. Failures never reach the game; they are logged and dropped.

use crate::events::Sound;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait AudioSink {
    fn play(&mut self, sound: Sound) -> Result<(), AudioError>;
}

/// Plays `sound` and swallows any error.
pub fn play_or_log(sink: &mut dyn AudioSink, sound: Sound) {
    if let Err(err) = sink.play(sound) {
        log::warn!("could not play {:?}: {}", sound, err);
    }
}

/// Terminal bell on confirmation sounds; the rest are too frequent to beep for.
pub struct TerminalBell<W: Write> {
    out: W,
}

impl<W: Write> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> AudioSink for TerminalBell<W> {
    fn play(&mut self, sound: Sound) -> Result<(), AudioError> {
        if sound != Sound::Ding {
            log::trace!("sound {:?}", sound);
            return Ok(());
        }
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Muted;

impl AudioSink for Muted {
    fn play(&mut self, _sound: Sound) -> Result<(), AudioError> {
        Ok(())
    }
}
