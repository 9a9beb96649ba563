//! Converter from StepMania-style chart notation into the MÚSECA engine's event model.
//!
//! The source notation describes a scrolling grid that is wider than what the
//! target engine understands: a foot pedal plus three 5-lane channel groups, where
//! the two outer groups encode left/right spin gestures layered over the primary
//! tap/hold group. This crate parses that notation, resolves absolute timing from
//! a piecewise tempo timeline, and reconciles the wide layout down to the engine's
//! pedal + five lanes, merging simultaneous multi-channel events into the composite
//! vocabulary the engine expects (directional and non-directional spins, sustained
//! "storm" objects, section gates).
//!
//! The pipeline is strictly staged:
//!
//! Raw text == [`chart::lex`] ==> note sections == [`chart::extract`] ==> occurrences
//! == [`chart::reconcile`] ==> events == [`chart::assemble`] ==> [`chart::assemble::DifficultyChart`]
//!
//! [`chart::convert_chart`] runs the whole thing in one step. Recoverable chart
//! authoring mistakes never abort a conversion; they are collected as
//! [`chart::ChartWarning`] values and returned alongside the output, in the same
//! way structural problems in a measure grid abort only the difficulty they occur
//! in.
//!
//! Out of scope by design: audio transcoding (see the [`audio`] contract),
//! database document serialization, packaging, and any artwork handling.

pub mod audio;
pub mod chart;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
