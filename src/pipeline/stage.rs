//! Stage identities, per-stage timeouts and timing.

use crate::error::{Result, VoicebotError};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// One step of a conversational turn, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Recognition,
    ForwardTranslation,
    Generation,
    BackwardTranslation,
    Synthesis,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Recognition,
        Stage::ForwardTranslation,
        Stage::Generation,
        Stage::BackwardTranslation,
        Stage::Synthesis,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Recognition => "recognition",
            Stage::ForwardTranslation => "forward-translation",
            Stage::Generation => "generation",
            Stage::BackwardTranslation => "backward-translation",
            Stage::Synthesis => "synthesis",
        }
    }

    /// The failure variant this stage reports.
    pub fn failure(self, message: impl Into<String>) -> VoicebotError {
        match self {
            Stage::Recognition => VoicebotError::recognition(message),
            Stage::ForwardTranslation | Stage::BackwardTranslation => {
                VoicebotError::translation(message)
            }
            Stage::Generation => VoicebotError::generation(message),
            Stage::Synthesis => VoicebotError::synthesis(message),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Upper bound on each stage's wall time. `None` disables the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub recognition: Option<Duration>,
    pub translation: Option<Duration>,
    pub generation: Option<Duration>,
    pub synthesis: Option<Duration>,
}

impl StageTimeouts {
    /// No limits at all.
    pub fn unlimited() -> Self {
        Self {
            recognition: None,
            translation: None,
            generation: None,
            synthesis: None,
        }
    }

    pub fn for_stage(&self, stage: Stage) -> Option<Duration> {
        match stage {
            Stage::Recognition => self.recognition,
            Stage::ForwardTranslation | Stage::BackwardTranslation => self.translation,
            Stage::Generation => self.generation,
            Stage::Synthesis => self.synthesis,
        }
    }
}

impl Default for StageTimeouts {
    fn default() -> Self {
        let network = Some(Duration::from_secs(crate::defaults::NETWORK_TIMEOUT_SECS));
        Self {
            recognition: network,
            translation: network,
            generation: Some(Duration::from_secs(crate::defaults::GENERATION_TIMEOUT_SECS)),
            synthesis: network,
        }
    }
}

/// Run one stage, bounded by `limit`, and report how long it took.
///
/// An expired limit becomes the stage's own failure variant. The stage
/// future is dropped at that point; blocking work it spawned only stops if
/// it watches for the drop, as the T5 generator does between decode steps.
pub async fn run_stage<T, F>(stage: Stage, limit: Option<Duration>, work: F) -> Result<(T, Duration)>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let result = match limit {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => Err(stage.failure(format!(
                "{stage} timed out after {}",
                humantime::format_duration(limit)
            ))),
        },
        None => work.await,
    };
    let elapsed = start.elapsed();

    match &result {
        Ok(_) => debug!(stage = stage.name(), elapsed_ms = elapsed.as_millis() as u64, "stage done"),
        Err(e) => debug!(stage = stage.name(), elapsed_ms = elapsed.as_millis() as u64, error = %e, "stage failed"),
    }

    result.map(|value| (value, elapsed))
}

/// Wall time spent in each stage of one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnTiming {
    pub recognition: Duration,
    pub forward_translation: Duration,
    pub generation: Duration,
    pub backward_translation: Duration,
    pub synthesis: Duration,
}

impl TurnTiming {
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        let slot = match stage {
            Stage::Recognition => &mut self.recognition,
            Stage::ForwardTranslation => &mut self.forward_translation,
            Stage::Generation => &mut self.generation,
            Stage::BackwardTranslation => &mut self.backward_translation,
            Stage::Synthesis => &mut self.synthesis,
        };
        *slot = elapsed;
    }

    pub fn get(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Recognition => self.recognition,
            Stage::ForwardTranslation => self.forward_translation,
            Stage::Generation => self.generation,
            Stage::BackwardTranslation => self.backward_translation,
            Stage::Synthesis => self.synthesis,
        }
    }

    pub fn total(&self) -> Duration {
        Stage::ALL.iter().map(|stage| self.get(*stage)).sum()
    }

    /// Stage with the largest share of the turn.
    pub fn slowest(&self) -> Stage {
        Stage::ALL
            .iter()
            .copied()
            .max_by_key(|stage| self.get(*stage))
            .unwrap_or(Stage::Recognition)
    }
}
