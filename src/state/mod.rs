// src/state/mod.rs
//
// Declarative state layer for the host shell.
//
// This module contains the *described* diagram: what nodes and links
// exist and what they sound like. The host edits these freely; they
// are compiled into a runtime `Diagram` before touch handling starts.
//
// Key principles:
// - Plain data, no interaction state
// - IDs are stable for the lifetime of a compiled diagram
// - Validation happens once, in `compile`

mod diagram_def;

pub use diagram_def::*;
