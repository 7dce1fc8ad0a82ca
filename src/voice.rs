use crate::event::Timestamp;
use crate::state::{LinkId, NodeId, Pitch};

pub type VoiceId = usize;

/// What a voice is sounding for.
///
/// The pool keeps at most one voice per source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceId {
    Node(NodeId),
    Link(LinkId),
}

/// Voice character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timbre {
    /// Held for as long as the node is touched.
    Sustained,
    /// Fixed-duration percussive hit; re-triggerable.
    Pluck,
}

/// Envelope stage of an allocated voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Attacking,
    Sustaining,
    Releasing,
}

/// One slot in the voice pool.
///
/// Voices do NOT own synthesis state.
/// Synthesis lives in the host behind `ToneOutput`.
#[derive(Debug)]
pub struct Voice {
    pub id: VoiceId,
    pub active: bool,
    pub source: Option<SourceId>,
    pub pitch: Pitch,
    pub timbre: Timbre,
    pub state: VoiceState,
    /// When the current stage ends (attack done, pluck done, release done).
    pub stage_ends_at: Timestamp,
}

impl Voice {
    #[inline]
    pub fn new(id: VoiceId) -> Self {
        Self {
            id,
            active: false,
            source: None,
            pitch: 0.0,
            timbre: Timbre::Sustained,
            state: VoiceState::Attacking,
            stage_ends_at: 0.0,
        }
    }

    #[inline]
    pub fn attack(
        &mut self,
        source: SourceId,
        pitch: Pitch,
        timbre: Timbre,
        stage_ends_at: Timestamp,
    ) {
        self.active = true;
        self.source = Some(source);
        self.pitch = pitch;
        self.timbre = timbre;
        self.state = VoiceState::Attacking;
        self.stage_ends_at = stage_ends_at;
    }

    #[inline]
    pub fn release(&mut self, stage_ends_at: Timestamp) {
        self.state = VoiceState::Releasing;
        self.stage_ends_at = stage_ends_at;
    }

    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
        self.source = None;
    }
}
