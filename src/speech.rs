// src/speech.rs
//
// One utterance at a time. A request made while something is being
// spoken is dropped, not queued, so speech always follows the user's
// current gesture rather than a backlog.

use log::debug;

use crate::output::SpeechOutput;
use crate::state::Announceable;

/// Render a value the way it should be spoken.
///
/// Whole numbers drop their fractional part; lists are read as a
/// comma-separated series.
pub fn format_announceable(value: &Announceable) -> String {
    match value {
        Announceable::Text(text) => text.clone(),
        Announceable::Number(n) => n.to_string(),
        Announceable::List(items) => items
            .iter()
            .map(format_announceable)
            .collect::<Vec<_>>()
            .join(", "),
    }
}

/// Speech gate with a single in-flight flag.
#[derive(Debug, Default)]
pub struct Announcer {
    in_flight: bool,
    spoken: u64,
    dropped: u64,
}

impl Announcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak `text` unless an utterance is already in flight.
    ///
    /// Returns whether the utterance was handed to the output.
    pub fn announce(&mut self, text: &str, out: &mut dyn SpeechOutput) -> bool {
        if self.in_flight {
            self.dropped += 1;
            debug!("Speech busy, dropping \"{}\"", text);
            return false;
        }

        self.in_flight = true;
        self.spoken += 1;
        out.speak(text);
        true
    }

    /// Host notification: the platform began speaking.
    ///
    /// The flag is already set when `announce` hands the text over.
    pub fn utterance_started(&mut self) {
        self.in_flight = true;
    }

    /// Host notification: the platform finished (or abandoned) the utterance.
    pub fn utterance_finished(&mut self) {
        self.in_flight = false;
    }

    #[inline]
    pub fn is_speaking(&self) -> bool {
        self.in_flight
    }

    /// Utterances handed to the output so far.
    pub fn spoken_count(&self) -> u64 {
        self.spoken
    }

    /// Requests dropped because speech was busy.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::EffectLog;

    #[test]
    fn test_format_text_and_numbers() {
        assert_eq!(format_announceable(&Announceable::Text("cat".into())), "cat");
        assert_eq!(format_announceable(&Announceable::Number(3.0)), "3");
        assert_eq!(format_announceable(&Announceable::Number(2.5)), "2.5");
        assert_eq!(format_announceable(&Announceable::Number(-1.0)), "-1");
    }

    #[test]
    fn test_format_nested_list() {
        let value = Announceable::List(vec![
            Announceable::Text("low".into()),
            Announceable::List(vec![Announceable::Number(1.0), Announceable::Number(2.0)]),
        ]);
        assert_eq!(format_announceable(&value), "low, 1, 2");
    }

    #[test]
    fn test_overlapping_announcement_is_dropped() {
        let mut announcer = Announcer::new();
        let mut out = EffectLog::new();

        assert!(announcer.announce("first", &mut out));
        assert!(!announcer.announce("second", &mut out));
        assert_eq!(out.spoken(), vec!["first"]);
        assert_eq!(announcer.dropped_count(), 1);

        announcer.utterance_finished();
        assert!(announcer.announce("third", &mut out));
        assert_eq!(out.spoken(), vec!["first", "third"]);
        assert_eq!(announcer.spoken_count(), 2);
    }

    #[test]
    fn test_instances_are_independent() {
        let mut a = Announcer::new();
        let b = Announcer::new();
        let mut out = EffectLog::new();

        a.announce("hello", &mut out);
        assert!(a.is_speaking());
        assert!(!b.is_speaking());
    }
}
