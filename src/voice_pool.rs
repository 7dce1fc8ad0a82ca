// src/voice_pool.rs

use log::{debug, trace};

use crate::config::InteractionConfig;
use crate::event::Timestamp;
use crate::output::ToneOutput;
use crate::state::Pitch;
use crate::voice::{SourceId, Timbre, Voice, VoiceId, VoiceState};

/// Envelope timings used by the pool, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeTimes {
    pub attack_ms: f64,
    pub release_ms: f64,
    pub pluck_ms: f64,
    pub pluck_release_ms: f64,
}

impl From<&InteractionConfig> for EnvelopeTimes {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            attack_ms: config.node_attack_ms,
            release_ms: config.node_release_ms,
            pluck_ms: config.pluck_ms,
            pluck_release_ms: config.pluck_release_ms,
        }
    }
}

/// Allocates and manages a bounded set of voices.
///
/// Responsibilities:
/// - map sources to voices, at most one each
/// - advance envelope stages over time
/// - return slots once a release completes
///
/// Does NOT:
/// - synthesize anything
/// - queue or steal when full (a dropped tone is acceptable)
pub struct VoicePool {
    voices: Vec<Voice>,
    times: EnvelopeTimes,
}

impl VoicePool {
    pub fn new(max_voices: usize, times: EnvelopeTimes) -> Self {
        let voices = (0..max_voices).map(Voice::new).collect();
        Self { voices, times }
    }

    pub fn from_config(config: &InteractionConfig) -> Self {
        Self::new(config.max_voices, EnvelopeTimes::from(config))
    }

    /// Start (or keep) a voice for `source`.
    ///
    /// Returns the voice id, or `None` if the pool is exhausted.
    pub fn start(
        &mut self,
        source: SourceId,
        pitch: Pitch,
        timbre: Timbre,
        now: Timestamp,
        out: &mut dyn ToneOutput,
    ) -> Option<VoiceId> {
        let times = self.times;
        let first_stage = |timbre: Timbre| match timbre {
            Timbre::Sustained => now + times.attack_ms,
            Timbre::Pluck => now + times.pluck_ms,
        };

        if let Some(v) = self.find_mut(source) {
            match (v.state, timbre) {
                (VoiceState::Attacking | VoiceState::Sustaining, Timbre::Sustained) => {
                    trace!("Voice {} already sounding for {:?}", v.id, source);
                }
                // Re-trigger a pluck, or re-attack a voice that was fading out
                _ => {
                    v.attack(source, pitch, timbre, first_stage(timbre));
                    out.start_voice(source, pitch, timbre);
                }
            }
            return Some(v.id);
        }

        match self.voices.iter_mut().find(|v| !v.active) {
            Some(v) => {
                v.attack(source, pitch, timbre, first_stage(timbre));
                out.start_voice(source, pitch, timbre);
                Some(v.id)
            }
            None => {
                debug!("Voice pool full, dropping start for {:?}", source);
                None
            }
        }
    }

    /// Begin the release of the voice for `source`.
    ///
    /// No-op if there is no voice or it is already releasing.
    pub fn stop(&mut self, source: SourceId, now: Timestamp, out: &mut dyn ToneOutput) {
        let times = self.times;
        if let Some(v) = self.find_mut(source) {
            if v.state == VoiceState::Releasing {
                return;
            }
            let release = match v.timbre {
                Timbre::Sustained => times.release_ms,
                Timbre::Pluck => times.pluck_release_ms,
            };
            v.release(now + release);
            out.stop_voice(source);
        }
    }

    /// Advance envelope stages up to `now`.
    ///
    /// Finished attacks sustain, finished plucks release on their own,
    /// finished releases return their slot to the pool.
    pub fn advance(&mut self, now: Timestamp, out: &mut dyn ToneOutput) {
        let times = self.times;
        for v in self.voices.iter_mut().filter(|v| v.active) {
            if now < v.stage_ends_at {
                continue;
            }
            match (v.state, v.timbre) {
                (VoiceState::Attacking, Timbre::Sustained) => {
                    v.state = VoiceState::Sustaining;
                }
                (VoiceState::Attacking | VoiceState::Sustaining, Timbre::Pluck) => {
                    v.release(v.stage_ends_at + times.pluck_release_ms);
                    if let Some(source) = v.source {
                        out.stop_voice(source);
                    }
                    // The release may already be over too
                    if now >= v.stage_ends_at {
                        v.deactivate();
                    }
                }
                (VoiceState::Sustaining, Timbre::Sustained) => {}
                (VoiceState::Releasing, _) => {
                    trace!("Voice {} released", v.id);
                    v.deactivate();
                }
            }
        }
    }

    /// Release every voice (host teardown, focus loss).
    pub fn release_all(&mut self, now: Timestamp, out: &mut dyn ToneOutput) {
        let sources: Vec<SourceId> = self
            .voices
            .iter()
            .filter(|v| v.active)
            .filter_map(|v| v.source)
            .collect();
        for source in sources {
            self.stop(source, now, out);
        }
    }

    fn find_mut(&mut self, source: SourceId) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|v| v.active && v.source == Some(source))
    }

    fn find(&self, source: SourceId) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|v| v.active && v.source == Some(source))
    }

    /// Envelope stage of the voice for `source`, if one is allocated.
    pub fn state_of(&self, source: SourceId) -> Option<VoiceState> {
        self.find(source).map(|v| v.state)
    }

    /// Whether `source` has a voice that is not fading out.
    pub fn is_sounding(&self, source: SourceId) -> bool {
        matches!(
            self.state_of(source),
            Some(VoiceState::Attacking | VoiceState::Sustaining)
        )
    }

    /// Number of occupied slots (including releasing voices).
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Number of voices attacking or sustaining.
    pub fn sustaining_count(&self) -> usize {
        self.voices
            .iter()
            .filter(|v| v.active && v.state != VoiceState::Releasing)
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }
}
