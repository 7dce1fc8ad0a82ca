// src/lib.rs
//
// Library entry point: the interaction core of a touch-driven audio
// diagram. Hosts (browser via the `web` feature, or native shells)
// feed contact events in and implement the output traits.

pub mod compile;
pub mod config;
pub mod diagram;
pub mod engine;
pub mod event;
pub mod geometry;
pub mod gesture;
pub mod navigation;
pub mod output;
pub mod scheduler;
pub mod speech;
pub mod state;
pub mod tracker;
pub mod voice;
pub mod voice_pool;

#[cfg(feature = "web")]
pub mod wasm;

// Re-export key types for Rust consumers
pub use compile::{CompileResult, DiagramError, compile};
pub use config::{InteractionConfig, InvalidConfig};
pub use diagram::{Diagram, Link, Node};
pub use engine::{ContactRole, Engine};
pub use event::{Contact, ContactEvent, ContactId, Timestamp};
pub use geometry::Point;
pub use gesture::{GestureMode, GestureState};
pub use output::{Effect, EffectLog, HighlightOutput, Output, SpeechOutput, ToneOutput};
pub use state::{Announceable, DiagramDef, LinkDef, LinkId, NodeDef, NodeId, Pitch};
pub use voice::{SourceId, Timbre, VoiceState};
