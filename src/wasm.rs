//! WebAssembly bindings via wasm-bindgen for browser integration.
//!
//! This module is only compiled when the `web` feature is enabled.
//!
//! # Usage
//!
//! Build with wasm-pack:
//! ```bash
//! wasm-pack build --target web --features web
//! ```
//!
//! # JavaScript Example
//!
//! ```javascript
//! import init, { touchtone_init, TouchDiagram, EffectKind } from './touchtone.js';
//!
//! await init();
//! touchtone_init();
//!
//! const diagram = new TouchDiagram();
//! const a = diagram.add_node(100, 200, 50, 261.63);
//! diagram.add_text_value(a, "cat");
//! const b = diagram.add_node(300, 200, 50, 329.63);
//! diagram.add_number_value(b, 4);
//! diagram.add_link(a, b, 392);
//! diagram.build();
//!
//! canvas.onpointerdown = (e) => {
//!   diagram.contact_start(e.pointerId, e.offsetX, e.offsetY, e.timeStamp);
//!   drain();
//! };
//!
//! function drain() {
//!   let effect;
//!   while ((effect = diagram.poll_effect())) {
//!     if (effect.kind === EffectKind.Speak) speak(effect.text);
//!     // ...
//!   }
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::compile::compile;
use crate::config::InteractionConfig;
use crate::engine::Engine;
use crate::event::ContactEvent;
use crate::output::{Effect, EffectLog};
use crate::state::{Announceable, DiagramDef};
use crate::voice::{SourceId, Timbre};

// ═══════════════════════════════════════════════════════════════════════════
// Initialization
// ═══════════════════════════════════════════════════════════════════════════

/// Initialize the wasm module. Call this once before using any other functions.
/// Sets up panic hooks and console logging.
#[wasm_bindgen]
pub fn touchtone_init() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════════════════════════════════════

/// Interaction tuning exposed to JavaScript.
#[wasm_bindgen]
#[derive(Clone, Copy)]
pub struct TouchtoneConfig {
    /// Max distance (px) from a primary contact for a secondary.
    pub proximity_threshold: f32,
    /// Press duration (ms) separating a tap from a hold.
    pub hold_threshold_ms: f64,
    /// Extra hit radius (px) around every node.
    pub touch_margin: f32,
    /// Maximum number of simultaneous tones.
    pub max_voices: u32,
}

#[wasm_bindgen]
impl TouchtoneConfig {
    /// Create a new configuration with default values.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration with custom gesture thresholds.
    pub fn with_thresholds(proximity_threshold: f32, hold_threshold_ms: f64) -> Self {
        Self {
            proximity_threshold,
            hold_threshold_ms,
            ..Self::default()
        }
    }
}

impl Default for TouchtoneConfig {
    fn default() -> Self {
        let config = InteractionConfig::default();
        Self {
            proximity_threshold: config.proximity_threshold,
            hold_threshold_ms: config.hold_threshold_ms,
            touch_margin: config.touch_margin,
            max_voices: config.max_voices as u32,
        }
    }
}

impl From<TouchtoneConfig> for InteractionConfig {
    fn from(c: TouchtoneConfig) -> Self {
        let mut config = InteractionConfig::default()
            .with_thresholds(c.proximity_threshold, c.hold_threshold_ms)
            .with_max_voices(c.max_voices as usize);
        config.touch_margin = c.touch_margin;
        config
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Effects
// ═══════════════════════════════════════════════════════════════════════════

#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    StartVoice,
    StopVoice,
    SetContinuousGain,
    Speak,
    Highlight,
}

/// One output call for the page to perform.
///
/// Only the fields relevant to `kind` are meaningful.
#[wasm_bindgen]
#[derive(Clone, Debug)]
pub struct WasmEffect {
    pub kind: EffectKind,
    /// Voice source is a link (otherwise a node).
    pub source_is_link: bool,
    pub source_id: u32,
    pub pitch: f32,
    /// Percussive pluck rather than a sustained tone.
    pub pluck: bool,
    pub gain: f32,
    pub ramp_ms: f64,
    pub node: u32,
    pub active: bool,
    text: Option<String>,
}

#[wasm_bindgen]
impl WasmEffect {
    /// Text to speak, for `Speak` effects.
    #[wasm_bindgen(getter)]
    pub fn text(&self) -> Option<String> {
        self.text.clone()
    }
}

impl WasmEffect {
    fn blank(kind: EffectKind) -> Self {
        Self {
            kind,
            source_is_link: false,
            source_id: 0,
            pitch: 0.0,
            pluck: false,
            gain: 0.0,
            ramp_ms: 0.0,
            node: 0,
            active: false,
            text: None,
        }
    }

    fn with_source(mut self, source: SourceId) -> Self {
        match source {
            SourceId::Node(id) => self.source_id = id,
            SourceId::Link(id) => {
                self.source_is_link = true;
                self.source_id = id;
            }
        }
        self
    }
}

impl From<Effect> for WasmEffect {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::StartVoice {
                source,
                pitch,
                timbre,
            } => Self {
                pitch,
                pluck: timbre == Timbre::Pluck,
                ..Self::blank(EffectKind::StartVoice).with_source(source)
            },
            Effect::StopVoice { source } => Self::blank(EffectKind::StopVoice).with_source(source),
            Effect::SetContinuousGain { gain, ramp_ms } => Self {
                gain,
                ramp_ms,
                ..Self::blank(EffectKind::SetContinuousGain)
            },
            Effect::Speak { text } => Self {
                text: Some(text),
                ..Self::blank(EffectKind::Speak)
            },
            Effect::Highlight { node, active } => Self {
                node,
                active,
                ..Self::blank(EffectKind::Highlight)
            },
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Diagram
// ═══════════════════════════════════════════════════════════════════════════

/// A diagram being built, then interacted with.
///
/// Add nodes, values and links, call `build()`, then forward pointer
/// events and drain `poll_effect()` after each one.
#[wasm_bindgen]
pub struct TouchDiagram {
    def: DiagramDef,
    config: InteractionConfig,
    engine: Option<Engine<EffectLog>>,
}

#[wasm_bindgen]
impl TouchDiagram {
    /// Create an empty diagram with default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> TouchDiagram {
        Self::new_with_config(TouchtoneConfig::default())
    }

    /// Create an empty diagram with custom configuration.
    pub fn new_with_config(config: TouchtoneConfig) -> TouchDiagram {
        TouchDiagram {
            def: DiagramDef::new(),
            config: config.into(),
            engine: None,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────

    /// Add a node. Returns its ID.
    pub fn add_node(&mut self, x: f32, y: f32, radius: f32, pitch: f32) -> u32 {
        self.def.add_node((x, y), radius, pitch, Vec::new())
    }

    /// Append a text value to a node's announcement cycle.
    pub fn add_text_value(&mut self, node_id: u32, text: &str) -> bool {
        self.def.push_value(node_id, Announceable::from(text))
    }

    /// Append a numeric value to a node's announcement cycle.
    pub fn add_number_value(&mut self, node_id: u32, value: f64) -> bool {
        self.def.push_value(node_id, Announceable::Number(value))
    }

    /// Link two nodes. Returns the link ID.
    pub fn add_link(&mut self, node_a: u32, node_b: u32, pitch: f32) -> u32 {
        self.def.add_link(node_a, node_b, pitch)
    }

    /// Validate the definition and start the interaction engine.
    ///
    /// Returns false (and logs why) if the diagram or config is invalid.
    pub fn build(&mut self) -> bool {
        let diagram = match compile(&self.def) {
            Ok(diagram) => diagram,
            Err(e) => {
                log::error!("Error compiling diagram: {}", e);
                return false;
            }
        };
        match Engine::with_config(diagram, self.config, EffectLog::new()) {
            Ok(engine) => {
                self.engine = Some(engine);
                true
            }
            Err(e) => {
                log::error!("Invalid configuration: {}", e);
                false
            }
        }
    }

    pub fn is_built(&self) -> bool {
        self.engine.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Contacts
    // ─────────────────────────────────────────────────────────────────────

    pub fn contact_start(&mut self, contact_id: u32, x: f32, y: f32, timestamp: f64) {
        self.dispatch(ContactEvent::start(contact_id as u64, (x, y), timestamp));
    }

    pub fn contact_move(&mut self, contact_id: u32, x: f32, y: f32, timestamp: f64) {
        self.dispatch(ContactEvent::moved(contact_id as u64, (x, y), timestamp));
    }

    pub fn contact_end(&mut self, contact_id: u32, timestamp: f64) {
        self.dispatch(ContactEvent::end(contact_id as u64, timestamp));
    }

    pub fn contact_cancel(&mut self, contact_id: u32, timestamp: f64) {
        self.dispatch(ContactEvent::cancel(contact_id as u64, timestamp));
    }

    /// Advance time (call from requestAnimationFrame).
    pub fn tick(&mut self, timestamp: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.tick(timestamp);
        }
    }

    /// Drop all contacts and fade everything out (e.g. on blur).
    pub fn release_all(&mut self, timestamp: f64) {
        if let Some(engine) = self.engine.as_mut() {
            engine.release_all(timestamp);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Speech callbacks
    // ─────────────────────────────────────────────────────────────────────

    /// `SpeechSynthesisUtterance.onstart`
    pub fn speech_started(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.speech_started();
        }
    }

    /// `SpeechSynthesisUtterance.onend` / `onerror`
    pub fn speech_finished(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.speech_finished();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Effects & state
    // ─────────────────────────────────────────────────────────────────────

    /// Next queued effect, oldest first.
    pub fn poll_effect(&mut self) -> Option<WasmEffect> {
        self.engine
            .as_mut()
            .and_then(|e| e.output_mut().pop_front())
            .map(WasmEffect::from)
    }

    /// When to tick next to resolve a pending hold, if any.
    pub fn next_deadline(&self) -> Option<f64> {
        self.engine.as_ref().and_then(|e| e.next_deadline())
    }

    pub fn is_sound_playing(&self, node_id: u32) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|e| e.is_sound_playing(node_id))
    }

    pub fn cycle_index(&self, node_id: u32) -> u32 {
        self.engine
            .as_ref()
            .map_or(0, |e| e.cycle_index(node_id) as u32)
    }

    pub fn node_count(&self) -> u32 {
        self.def.nodes.len() as u32
    }

    pub fn get_active_voices(&self) -> u32 {
        self.engine
            .as_ref()
            .map_or(0, |e| e.voices().active_count() as u32)
    }
}

impl TouchDiagram {
    fn dispatch(&mut self, event: ContactEvent) {
        match self.engine.as_mut() {
            Some(engine) => engine.handle_contact_event(event),
            None => log::warn!("Contact event before build(): {:?}", event),
        }
    }
}

impl Default for TouchDiagram {
    fn default() -> Self {
        Self::new()
    }
}
