//! Event extraction: normalized measure grids into a time-ordered stream of
//! per-lane symbol occurrences.

use super::model::{Measure, SourceLane, Symbol};
use super::timing::{BeatPos, TempoTimeline};

/// One non-empty grid cell, placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Occurrence {
    /// Exact grid position.
    pub beat: BeatPos,
    /// Absolute time in seconds, sync offset included.
    pub time: f64,
    /// The source lane the symbol sits on.
    pub lane: SourceLane,
    /// The symbol itself, never [`Symbol::None`].
    pub symbol: Symbol,
    /// Byte span of the row the symbol came from.
    pub span: (usize, usize),
}

/// Flattens measures into occurrences ordered by beat, then by canonical
/// source-lane index. The ordering falls out of the walk itself; no sort is
/// needed.
#[must_use]
pub fn extract(
    measures: &[Measure],
    timeline: &TempoTimeline,
    offset_seconds: f64,
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();
    for (measure_index, measure) in measures.iter().enumerate() {
        let subdivision = measure.rows.len();
        for (row_index, row) in measure.rows.iter().enumerate() {
            let beat = BeatPos::measure_row(measure_index, row_index, subdivision);
            let time = offset_seconds + timeline.time_at(beat);
            for (flat, &symbol) in row.symbols.iter().enumerate() {
                if symbol == Symbol::None {
                    continue;
                }
                let Some(lane) = SourceLane::from_flat_index(flat) else {
                    continue;
                };
                occurrences.push(Occurrence {
                    beat,
                    time,
                    lane,
                    symbol,
                    span: row.span,
                });
            }
        }
    }
    occurrences
}
