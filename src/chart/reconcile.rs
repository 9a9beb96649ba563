//! The lane reconciler: collapses the wide source layout onto the target
//! layout, one instant at a time.
//!
//! Occurrences sharing a beat are processed as one instant. Within an instant
//! every target lane is handled independently; only its own three channels
//! (primary, left-spin, right-spin) interact, and the pedal has no channel
//! grouping at all. Each lane carries two independent state axes for the
//! duration of one difficulty pass:
//!
//! - hold/storm: `Idle` → `Holding` (primary hold) or `Storming` (spin-channel
//!   hold, ended by a mine on any of the three channels);
//! - large gesture: at most one open sustained spin whose landing arrives as an
//!   explicit end symbol, possibly from a different source lane than its start.
//!
//! Chart authoring mistakes (an end without a start, a mine outside a storm)
//! never abort the pass; they are recorded as [`ReconcileWarning`]s and the
//! offending symbol is dropped. When several symbols legitimately contend for
//! one lane and instant, every decided event is emitted in canonical
//! source-lane order (pedal/primary before left-spin before right-spin) and
//! interpretation is left to the consuming engine.

use itertools::Itertools;
use thiserror::Error;

use super::extract::Occurrence;
use super::model::{
    EventKind, OutputEvent, OutputLane, SourceLane, SpinDirection, Symbol, TargetLane,
};
use super::span::{Spanned, SpannedExt};
use super::timing::BeatPos;

/// A chart authoring mistake found while reconciling lanes. Never fatal.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReconcileWarning {
    /// A hold end arrived on a lane with no hold open.
    #[error("hold end without a matching start on {lane}")]
    IllegalHoldEndWithoutStart {
        /// The lane the end arrived on.
        lane: OutputLane,
    },
    /// A mine arrived on a lane with no storm active.
    #[error("mine outside a storm on {lane}")]
    IllegalMineWithoutStorm {
        /// The lane the mine arrived on.
        lane: TargetLane,
    },
    /// A large-gesture end with no open start, or a new start over an open
    /// one (the stale gesture is force-closed, first start wins).
    #[error("unmatched large spin gesture on {lane}")]
    UnmatchedLargeGesture {
        /// The affected lane.
        lane: TargetLane,
    },
    /// The pedal only understands hold starts and ends.
    #[error("symbol {symbol:?} is not playable on the pedal")]
    UnsupportedPedalSymbol {
        /// The symbol that was dropped.
        symbol: Symbol,
    },
    /// A hold was still open when the chart ended.
    #[error("hold on {lane} is missing its end marker")]
    UnclosedHold {
        /// The lane the hold was left open on.
        lane: OutputLane,
    },
}

/// Result of one difficulty's reconciliation pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconcileOutput {
    /// Composite target events, ordered by beat, pedal before lanes within an
    /// instant.
    pub events: Vec<OutputEvent>,
    /// Diagnostics collected along the way.
    pub reconcile_warnings: Vec<Spanned<ReconcileWarning>>,
}

/// Hold/storm axis of one lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum HoldState {
    #[default]
    Idle,
    Holding,
    Storming,
}

/// Runtime state of one target lane, owned by the pass.
#[derive(Debug, Clone, Copy, Default)]
struct LaneRuntime {
    hold: HoldState,
    /// Span of the open hold's start, for the end-of-chart diagnostic.
    hold_from: Option<(usize, usize)>,
    /// Whether a large gesture is waiting for its landing.
    large_open: bool,
}

/// One grid cell observed at the current instant.
#[derive(Debug, Clone, Copy)]
struct Cell {
    symbol: Symbol,
    span: (usize, usize),
}

/// The three channel cells of one target lane at one instant.
#[derive(Debug, Clone, Copy, Default)]
struct LaneCells {
    primary: Option<Cell>,
    left: Option<Cell>,
    right: Option<Cell>,
}

/// What a spin channel contributes after gates, mines and ignored hold ends
/// are taken out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpinInput {
    Tap,
    Hold,
}

/// Runs the state machine over one difficulty's occurrence stream.
///
/// The input must be ordered by beat then source-lane index, which is what
/// [`super::extract::extract`] produces.
#[must_use]
pub fn reconcile(occurrences: &[Occurrence]) -> ReconcileOutput {
    let mut events = Vec::new();
    let mut warnings = Vec::new();
    let mut lanes = [LaneRuntime::default(); TargetLane::COUNT];
    let mut pedal = LaneRuntime::default();

    let instants = occurrences.iter().chunk_by(|occurrence| occurrence.beat);
    for (beat, group) in &instants {
        let mut time = 0.0;
        let mut pedal_cell = None;
        let mut cells = [LaneCells::default(); TargetLane::COUNT];
        for occurrence in group {
            time = occurrence.time;
            let cell = Cell {
                symbol: occurrence.symbol,
                span: occurrence.span,
            };
            match occurrence.lane {
                SourceLane::Pedal => pedal_cell = Some(cell),
                SourceLane::Primary(lane) => cells[lane.index()].primary = Some(cell),
                SourceLane::SpinLeft(lane) => cells[lane.index()].left = Some(cell),
                SourceLane::SpinRight(lane) => cells[lane.index()].right = Some(cell),
            }
        }

        if let Some(cell) = pedal_cell {
            step_pedal(&mut pedal, cell, beat, time, &mut events, &mut warnings);
        }
        for lane in TargetLane::all() {
            step_lane(
                lane,
                &mut lanes[lane.index()],
                cells[lane.index()],
                beat,
                time,
                &mut events,
                &mut warnings,
            );
        }
    }

    // Holds left open are an authoring mistake; storms and large gestures left
    // open are tolerated.
    for lane in TargetLane::all() {
        let runtime = lanes[lane.index()];
        if runtime.hold == HoldState::Holding {
            warnings.push(
                ReconcileWarning::UnclosedHold {
                    lane: OutputLane::Lane(lane),
                }
                .with_span_pair(runtime.hold_from.unwrap_or_default()),
            );
        }
    }
    if pedal.hold == HoldState::Holding {
        warnings.push(
            ReconcileWarning::UnclosedHold {
                lane: OutputLane::Pedal,
            }
            .with_span_pair(pedal.hold_from.unwrap_or_default()),
        );
    }

    ReconcileOutput {
        events,
        reconcile_warnings: warnings,
    }
}

/// The pedal accepts hold starts and ends only.
fn step_pedal(
    runtime: &mut LaneRuntime,
    cell: Cell,
    beat: BeatPos,
    time: f64,
    events: &mut Vec<OutputEvent>,
    warnings: &mut Vec<Spanned<ReconcileWarning>>,
) {
    let emit = |events: &mut Vec<OutputEvent>, kind| {
        events.push(OutputEvent {
            beat,
            time,
            lane: OutputLane::Pedal,
            kind,
        });
    };
    match cell.symbol {
        Symbol::HoldStart => {
            emit(events, EventKind::HoldStart);
            if runtime.hold == HoldState::Idle {
                runtime.hold = HoldState::Holding;
                runtime.hold_from = Some(cell.span);
            }
        }
        Symbol::HoldEnd => {
            if runtime.hold == HoldState::Holding {
                runtime.hold = HoldState::Idle;
                runtime.hold_from = None;
                emit(events, EventKind::HoldEnd);
            } else {
                warnings.push(
                    ReconcileWarning::IllegalHoldEndWithoutStart {
                        lane: OutputLane::Pedal,
                    }
                    .with_span_pair(cell.span),
                );
            }
        }
        Symbol::Gate => emit(events, EventKind::Gate),
        symbol => warnings.push(
            ReconcileWarning::UnsupportedPedalSymbol { symbol }.with_span_pair(cell.span),
        ),
    }
}

fn step_lane(
    lane: TargetLane,
    runtime: &mut LaneRuntime,
    cells: LaneCells,
    beat: BeatPos,
    time: f64,
    events: &mut Vec<OutputEvent>,
    warnings: &mut Vec<Spanned<ReconcileWarning>>,
) {
    let primary_rank = SourceLane::Primary(lane).flat_index();
    let left_rank = SourceLane::SpinLeft(lane).flat_index();
    let right_rank = SourceLane::SpinRight(lane).flat_index();

    // (source rank, event) pairs; sorted by rank before emission so contending
    // events come out in source-lane order.
    let mut decided: Vec<(usize, EventKind)> = Vec::new();

    let mut primary = cells.primary;
    let mut left = cells.left;
    let mut right = cells.right;

    // Gates pass through without touching lane state.
    for (cell, rank) in [
        (&mut primary, primary_rank),
        (&mut left, left_rank),
        (&mut right, right_rank),
    ] {
        if cell.map(|c| c.symbol) == Some(Symbol::Gate) {
            decided.push((rank, EventKind::Gate));
            *cell = None;
        }
    }

    // A mine on any of the three channels closes an active storm. Once one
    // mine decided the instant, further mines on this lane carry no meaning
    // and are consumed without another look.
    let first_mine = [
        (&mut primary, primary_rank),
        (&mut left, left_rank),
        (&mut right, right_rank),
    ]
    .into_iter()
    .filter(|(cell, _)| cell.map(|c| c.symbol) == Some(Symbol::Mine))
    .map(|(cell, rank)| (cell.take().map_or((0, 0), |c| c.span), rank))
    .reduce(|first, _rest| first);
    if let Some((span, rank)) = first_mine {
        if runtime.hold == HoldState::Storming {
            runtime.hold = HoldState::Idle;
            decided.push((rank, EventKind::StormEnd));
        } else {
            warnings
                .push(ReconcileWarning::IllegalMineWithoutStorm { lane }.with_span_pair(span));
        }
    }

    // Primary channel: taps and holds, plus the composite spin symbols of the
    // six-column dialect.
    if let Some(cell) = primary {
        match cell.symbol {
            Symbol::Tap => decided.push((primary_rank, EventKind::Tap)),
            Symbol::HoldStart => {
                decided.push((primary_rank, EventKind::HoldStart));
                if runtime.hold == HoldState::Idle {
                    runtime.hold = HoldState::Holding;
                    runtime.hold_from = Some(cell.span);
                }
            }
            Symbol::HoldEnd => {
                if runtime.hold == HoldState::Holding {
                    runtime.hold = HoldState::Idle;
                    runtime.hold_from = None;
                    decided.push((primary_rank, EventKind::HoldEnd));
                } else {
                    warnings.push(
                        ReconcileWarning::IllegalHoldEndWithoutStart {
                            lane: OutputLane::Lane(lane),
                        }
                        .with_span_pair(cell.span),
                    );
                }
            }
            Symbol::Spin(direction) => decided.push((primary_rank, EventKind::Spin(direction))),
            Symbol::LargeSpinStart(direction) => {
                if runtime.large_open {
                    // First start wins: force-close the stale gesture here.
                    decided.push((primary_rank, EventKind::StormEnd));
                    warnings.push(
                        ReconcileWarning::UnmatchedLargeGesture { lane }
                            .with_span_pair(cell.span),
                    );
                }
                runtime.large_open = true;
                decided.push((primary_rank, EventKind::StormStart(direction)));
            }
            Symbol::LargeSpinEnd => {
                if runtime.large_open {
                    runtime.large_open = false;
                    decided.push((primary_rank, EventKind::StormEnd));
                } else {
                    warnings.push(
                        ReconcileWarning::UnmatchedLargeGesture { lane }
                            .with_span_pair(cell.span),
                    );
                }
            }
            Symbol::None | Symbol::Mine | Symbol::Gate => {}
        }
    }

    // Spin channels: only taps and hold starts mean anything here. Hold ends
    // in spin channels carry no semantics and are dropped by policy; so is
    // anything a dialect could never place here.
    let left_input = spin_input(left);
    let right_input = spin_input(right);
    let mut storm = |decided: &mut Vec<(usize, EventKind)>, rank, direction| {
        decided.push((rank, EventKind::StormStart(direction)));
        if runtime.hold == HoldState::Idle {
            runtime.hold = HoldState::Storming;
        }
    };
    match (left_input, right_input) {
        // A hold start paired with anything on the other side reads as a
        // non-directional storm.
        (Some(SpinInput::Hold), Some(_)) | (Some(_), Some(SpinInput::Hold)) => {
            storm(&mut decided, left_rank, SpinDirection::Neutral);
        }
        (Some(SpinInput::Hold), None) => storm(&mut decided, left_rank, SpinDirection::Left),
        (None, Some(SpinInput::Hold)) => storm(&mut decided, right_rank, SpinDirection::Right),
        (Some(SpinInput::Tap), Some(SpinInput::Tap)) => {
            decided.push((left_rank, EventKind::Spin(SpinDirection::Neutral)));
        }
        (Some(SpinInput::Tap), None) => {
            decided.push((left_rank, EventKind::Spin(SpinDirection::Left)));
        }
        (None, Some(SpinInput::Tap)) => {
            decided.push((right_rank, EventKind::Spin(SpinDirection::Right)));
        }
        (None, None) => {}
    }

    decided.sort_by_key(|&(rank, _)| rank);
    events.extend(decided.into_iter().map(|(_, kind)| OutputEvent {
        beat,
        time,
        lane: OutputLane::Lane(lane),
        kind,
    }));
}

fn spin_input(cell: Option<Cell>) -> Option<SpinInput> {
    match cell?.symbol {
        Symbol::Tap => Some(SpinInput::Tap),
        Symbol::HoldStart => Some(SpinInput::Hold),
        _ => None,
    }
}
