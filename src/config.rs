// src/config.rs
//
// Interaction thresholds and envelope timings.
//
// Every value the gesture and audio logic depends on lives here as a
// named default. Hosts override individual fields; nothing else in the
// crate hard-codes a threshold.

// Default interaction configuration
pub const DEFAULT_TOUCH_MARGIN: f32 = 40.0;
pub const DEFAULT_LINK_HIT_TOLERANCE: f32 = 4.0;
pub const DEFAULT_PROXIMITY_THRESHOLD: f32 = 150.0;
pub const DEFAULT_HOLD_THRESHOLD_MS: f64 = 300.0;
pub const DEFAULT_MAX_FEEDBACK_DISTANCE: f32 = 200.0;
pub const DEFAULT_MAX_VOICES: usize = 8;
pub const DEFAULT_NODE_ATTACK_MS: f64 = 10.0;
pub const DEFAULT_NODE_RELEASE_MS: f64 = 150.0;
pub const DEFAULT_PLUCK_MS: f64 = 250.0;
pub const DEFAULT_PLUCK_RELEASE_MS: f64 = 100.0;
pub const DEFAULT_NAVIGATION_FADE_IN_MS: f64 = 100.0;
pub const DEFAULT_NAVIGATION_FADE_OUT_MS: f64 = 500.0;
pub const DEFAULT_NAVIGATION_ENTRY_GAIN: f32 = 0.5;

/// Configuration for an interaction engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Extra radius added to every node for hit testing.
    pub touch_margin: f32,
    /// Half-width of a link's hit band.
    pub link_hit_tolerance: f32,
    /// Max distance from a primary contact for a new contact to count as secondary.
    pub proximity_threshold: f32,
    /// A secondary held longer than this enters navigation.
    pub hold_threshold_ms: f64,
    /// Distance to the nearest link at which navigation feedback reaches silence.
    pub max_feedback_distance: f32,
    /// Size of the voice pool.
    pub max_voices: usize,
    pub node_attack_ms: f64,
    pub node_release_ms: f64,
    /// Duration of a link pluck before it releases on its own.
    pub pluck_ms: f64,
    pub pluck_release_ms: f64,
    pub navigation_fade_in_ms: f64,
    pub navigation_fade_out_ms: f64,
    /// Continuous gain reached when navigation starts, before the first move.
    pub navigation_entry_gain: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            touch_margin: DEFAULT_TOUCH_MARGIN,
            link_hit_tolerance: DEFAULT_LINK_HIT_TOLERANCE,
            proximity_threshold: DEFAULT_PROXIMITY_THRESHOLD,
            hold_threshold_ms: DEFAULT_HOLD_THRESHOLD_MS,
            max_feedback_distance: DEFAULT_MAX_FEEDBACK_DISTANCE,
            max_voices: DEFAULT_MAX_VOICES,
            node_attack_ms: DEFAULT_NODE_ATTACK_MS,
            node_release_ms: DEFAULT_NODE_RELEASE_MS,
            pluck_ms: DEFAULT_PLUCK_MS,
            pluck_release_ms: DEFAULT_PLUCK_RELEASE_MS,
            navigation_fade_in_ms: DEFAULT_NAVIGATION_FADE_IN_MS,
            navigation_fade_out_ms: DEFAULT_NAVIGATION_FADE_OUT_MS,
            navigation_entry_gain: DEFAULT_NAVIGATION_ENTRY_GAIN,
        }
    }
}

/// A configuration field that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidConfig {
    pub field: &'static str,
    pub value: f64,
}

impl std::fmt::Display for InvalidConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid value {} for {}", self.value, self.field)
    }
}

impl std::error::Error for InvalidConfig {}

impl InteractionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the gesture thresholds, keeping everything else.
    pub fn with_thresholds(mut self, proximity_threshold: f32, hold_threshold_ms: f64) -> Self {
        self.proximity_threshold = proximity_threshold;
        self.hold_threshold_ms = hold_threshold_ms;
        self
    }

    pub fn with_max_voices(mut self, max_voices: usize) -> Self {
        self.max_voices = max_voices;
        self
    }

    /// Check that every distance and duration is usable.
    ///
    /// Margins and tolerances may be zero; thresholds must be positive.
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        let non_negative = [
            ("touch_margin", self.touch_margin as f64),
            ("link_hit_tolerance", self.link_hit_tolerance as f64),
            ("node_attack_ms", self.node_attack_ms),
            ("node_release_ms", self.node_release_ms),
            ("pluck_release_ms", self.pluck_release_ms),
            ("navigation_fade_in_ms", self.navigation_fade_in_ms),
            ("navigation_fade_out_ms", self.navigation_fade_out_ms),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(InvalidConfig { field, value });
            }
        }

        let positive = [
            ("proximity_threshold", self.proximity_threshold as f64),
            ("hold_threshold_ms", self.hold_threshold_ms),
            ("max_feedback_distance", self.max_feedback_distance as f64),
            ("pluck_ms", self.pluck_ms),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(InvalidConfig { field, value });
            }
        }

        if self.max_voices == 0 {
            return Err(InvalidConfig {
                field: "max_voices",
                value: 0.0,
            });
        }

        let gain = self.navigation_entry_gain as f64;
        if !(0.0..=1.0).contains(&gain) {
            return Err(InvalidConfig {
                field: "navigation_entry_gain",
                value: gain,
            });
        }

        Ok(())
    }
}
