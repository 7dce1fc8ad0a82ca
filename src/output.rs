// src/output.rs
//
// Output capabilities the core drives.
//
// The core never synthesizes sound or speech itself. It tells the host
// *when* a voice starts or stops, what the continuous navigation gain
// should be, and what to say. Hosts implement these traits over their
// platform APIs (Web Audio, speechSynthesis, ...).

use std::collections::VecDeque;

use crate::state::{NodeId, Pitch};
use crate::voice::{SourceId, Timbre};

/// Tone generation.
pub trait ToneOutput {
    /// Begin a voice for `source` (attack for sustained, pluck for percussive).
    fn start_voice(&mut self, source: SourceId, pitch: Pitch, timbre: Timbre);

    /// Begin the release of the voice for `source`.
    fn stop_voice(&mut self, source: SourceId);

    /// Set the continuous navigation tone's gain.
    ///
    /// `ramp_ms == 0.0` means apply immediately.
    fn set_continuous_gain(&mut self, gain: f32, ramp_ms: f64);
}

/// Speech synthesis.
///
/// Completion is reported back through `Engine::speech_finished`.
pub trait SpeechOutput {
    fn speak(&mut self, text: &str);
}

/// Purely cosmetic node feedback (radius growth, highlight).
pub trait HighlightOutput {
    fn set_highlight(&mut self, _node: NodeId, _active: bool) {}
}

/// Everything an engine needs from its host.
pub trait Output: ToneOutput + SpeechOutput + HighlightOutput {}

impl<T: ToneOutput + SpeechOutput + HighlightOutput> Output for T {}

/// A recorded output call.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartVoice {
        source: SourceId,
        pitch: Pitch,
        timbre: Timbre,
    },

    StopVoice { source: SourceId },

    SetContinuousGain { gain: f32, ramp_ms: f64 },

    Speak { text: String },

    Highlight { node: NodeId, active: bool },
}

/// Output that queues every call as an [`Effect`].
///
/// Hosts that cannot be called back synchronously (wasm, tests)
/// drain the queue after each event.
#[derive(Debug, Default)]
pub struct EffectLog {
    effects: VecDeque<Effect>,
}

impl EffectLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded effects, oldest first.
    pub fn effects(&self) -> &VecDeque<Effect> {
        &self.effects
    }

    /// Take all recorded effects.
    pub fn drain(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects).into()
    }

    /// Take the oldest recorded effect.
    pub fn pop_front(&mut self) -> Option<Effect> {
        self.effects.pop_front()
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Texts passed to `speak`, in order.
    pub fn spoken(&self) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::Speak { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn starts_of(&self, source: SourceId) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::StartVoice { source: s, .. } if *s == source))
            .count()
    }

    pub fn stops_of(&self, source: SourceId) -> usize {
        self.effects
            .iter()
            .filter(|e| matches!(e, Effect::StopVoice { source: s } if *s == source))
            .count()
    }

    /// Last continuous gain set, with its ramp.
    pub fn last_gain(&self) -> Option<(f32, f64)> {
        self.effects.iter().rev().find_map(|e| match e {
            Effect::SetContinuousGain { gain, ramp_ms } => Some((*gain, *ramp_ms)),
            _ => None,
        })
    }
}

impl ToneOutput for EffectLog {
    fn start_voice(&mut self, source: SourceId, pitch: Pitch, timbre: Timbre) {
        self.effects.push_back(Effect::StartVoice {
            source,
            pitch,
            timbre,
        });
    }

    fn stop_voice(&mut self, source: SourceId) {
        self.effects.push_back(Effect::StopVoice { source });
    }

    fn set_continuous_gain(&mut self, gain: f32, ramp_ms: f64) {
        self.effects.push_back(Effect::SetContinuousGain { gain, ramp_ms });
    }
}

impl SpeechOutput for EffectLog {
    fn speak(&mut self, text: &str) {
        self.effects.push_back(Effect::Speak {
            text: text.to_string(),
        });
    }
}

impl HighlightOutput for EffectLog {
    fn set_highlight(&mut self, node: NodeId, active: bool) {
        self.effects.push_back(Effect::Highlight { node, active });
    }
}
