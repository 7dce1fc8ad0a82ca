// src/main.rs
//
// Scripted sanity run: two linked nodes, one finger resting on the
// first while a second finger taps, holds and navigates. Every output
// call is printed as it happens.

use touchtone::{
    ContactEvent, DiagramDef, Engine, HighlightOutput, NodeId, Pitch, SourceId, SpeechOutput,
    Timbre, ToneOutput, compile,
};

/// ===============================
/// Console output
/// ===============================

struct ConsoleOutput;

impl ToneOutput for ConsoleOutput {
    fn start_voice(&mut self, source: SourceId, pitch: Pitch, timbre: Timbre) {
        println!("  start {:?} @ {:.2} Hz ({:?})", source, pitch, timbre);
    }

    fn stop_voice(&mut self, source: SourceId) {
        println!("  stop  {:?}", source);
    }

    fn set_continuous_gain(&mut self, gain: f32, ramp_ms: f64) {
        println!("  gain  {:.2} over {} ms", gain, ramp_ms);
    }
}

impl SpeechOutput for ConsoleOutput {
    fn speak(&mut self, text: &str) {
        println!("  say   \"{}\"", text);
    }
}

impl HighlightOutput for ConsoleOutput {
    fn set_highlight(&mut self, node: NodeId, active: bool) {
        println!("  node  {} {}", node, if active { "lit" } else { "dim" });
    }
}

/// ===============================
/// Main
/// ===============================

fn main() {
    // --------------------------------
    // Diagram
    // --------------------------------

    let mut def = DiagramDef::new();
    let a = def.add_node(
        (100.0, 200.0),
        50.0,
        261.63,
        vec!["cat".into(), "kitten".into(), "feline".into()],
    );
    let b = def.add_node(
        (300.0, 200.0),
        50.0,
        329.63,
        vec!["dog".into(), 4.into()],
    );
    def.add_link(a, b, 392.0);

    let diagram = match compile(&def) {
        Ok(diagram) => diagram,
        Err(e) => {
            eprintln!("Invalid diagram: {}", e);
            return;
        }
    };

    let mut engine = Engine::new(diagram, ConsoleOutput);

    // --------------------------------
    // Script
    // --------------------------------

    let script = [
        ("rest finger on A", ContactEvent::start(1, (100.0, 200.0), 0.0)),
        ("tap beside it", ContactEvent::start(2, (150.0, 210.0), 500.0)),
        ("lift tap", ContactEvent::end(2, 580.0)),
        ("tap again", ContactEvent::start(3, (140.0, 180.0), 1500.0)),
        ("lift tap", ContactEvent::end(3, 1560.0)),
        ("press and hold", ContactEvent::start(4, (150.0, 200.0), 2500.0)),
        ("drift toward link", ContactEvent::moved(4, (200.0, 260.0), 2900.0)),
        ("onto link", ContactEvent::moved(4, (200.0, 202.0), 3000.0)),
        ("lift hold", ContactEvent::end(4, 3100.0)),
        ("swipe starts", ContactEvent::start(5, (240.0, 80.0), 3500.0)),
        ("swipe across link", ContactEvent::moved(5, (245.0, 300.0), 3516.0)),
        ("swipe ends", ContactEvent::end(5, 3532.0)),
        ("lift A", ContactEvent::end(1, 4000.0)),
    ];

    println!("Starting touchtone demo...");

    for (label, event) in script {
        println!("--- {} @ {} ms ---", label, event.timestamp());
        engine.handle_contact_event(event);
        // The console "speaks" instantly
        engine.speech_finished();
    }

    engine.tick(5000.0);

    println!(
        "Demo completed ({} voices still allocated).",
        engine.voices().active_count()
    );
}
