//! Final assembly of one difficulty: metadata validation, section gates,
//! measure markers, and the canonical event ordering.

use thiserror::Error;

use super::ConvertError;
use super::lex::NoteSection;
use super::model::{
    ChartMetadata, Difficulty, EventKind, GateLabel, OutputEvent, OutputLane,
};
use super::span::{Spanned, SpannedExt};
use super::timing::{BEATS_PER_MEASURE, BeatPos};

/// Bounds of the difficulty meter accepted by the target engine.
pub const METER_RANGE: std::ops::RangeInclusive<i64> = 1..=15;

/// The gate labels a complete chart carries, in the order they must appear.
pub const GATE_LABEL_ORDER: [&str; 6] = [
    "GRAFICA_1_START",
    "GRAFICA_1_END",
    "GRAFICA_2_START",
    "GRAFICA_2_END",
    "GRAFICA_3_START",
    "GRAFICA_3_END",
];

/// Prefix identifying a gate label among the chart's labels.
pub const GATE_LABEL_PREFIX: &str = "GRAFICA_";

/// A problem with the chart-level section labels. Never fatal.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AssembleWarning {
    /// A gate label appeared out of pair order.
    #[error("gate label `{found}` out of order, expected `{expected}`")]
    MisorderedGateLabel {
        /// The label that was found.
        found: String,
        /// The label that should have been there.
        expected: String,
    },
    /// Fewer gate labels than a complete chart carries.
    #[error("found {found} gate labels, a complete chart carries {}", GATE_LABEL_ORDER.len())]
    MissingGateLabels {
        /// How many gate labels were present.
        found: usize,
    },
    /// More gate labels than a complete chart carries.
    #[error("surplus gate label `{label}`")]
    SurplusGateLabel {
        /// The extra label.
        label: String,
    },
}

/// One fully converted difficulty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyChart {
    /// The difficulty tier.
    pub difficulty: Difficulty,
    /// Chart author ("effected by").
    pub author: String,
    /// Difficulty meter, within [`METER_RANGE`].
    pub meter: u8,
    /// All events, ordered by beat, then section/pedal/lane precedence.
    pub events: Vec<OutputEvent>,
}

/// Result of assembling one difficulty.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AssembleOutput {
    /// The finished difficulty.
    pub chart: DifficultyChart,
    /// Label problems found on the way.
    pub assemble_warnings: Vec<Spanned<AssembleWarning>>,
}

/// Per-difficulty line of the summary handed to the database writer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultySummary {
    /// The difficulty tier.
    pub difficulty: Difficulty,
    /// Chart author ("effected by").
    pub author: String,
    /// Difficulty meter.
    pub meter: u8,
}

/// The chart summary an external database writer serializes, keyed by a song
/// identifier the caller supplies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartSummary {
    /// Song title.
    pub title: String,
    /// Transliterated title.
    pub title_translit: String,
    /// Artist name.
    pub artist: String,
    /// Transliterated artist name.
    pub artist_translit: String,
    /// Illustration credit.
    pub credit: String,
    /// Slowest tempo on the timeline.
    pub bpm_min: f64,
    /// Fastest tempo on the timeline.
    pub bpm_max: f64,
    /// Converted difficulties in tier order.
    pub difficulties: Vec<DifficultySummary>,
}

/// Validates a section's difficulty tag and meter.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidDifficultyName`] for a tag outside the
/// supported set and [`ConvertError::InvalidMeter`] for a meter that is not an
/// integer within [`METER_RANGE`].
pub fn section_difficulty(section: &NoteSection<'_>) -> Result<(Difficulty, u8), ConvertError> {
    let difficulty = Difficulty::parse_tag(section.difficulty_tag.content())?;
    let meter = section
        .meter
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|meter| METER_RANGE.contains(meter))
        .ok_or_else(|| ConvertError::InvalidMeter {
            difficulty,
            meter: section.meter.trim().to_owned(),
        })?;
    Ok((difficulty, meter as u8))
}

/// Assembles one difficulty from its reconciled events.
///
/// Adds the chart-level gate events and the per-measure markers, then orders
/// everything by beat with the section/pedal/lane tie precedence. The sort is
/// stable, so events a lane decided within one instant keep their order.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidDifficultyName`] or
/// [`ConvertError::InvalidMeter`] when the section metadata is out of range.
pub fn assemble(
    section: &NoteSection<'_>,
    measure_count: usize,
    reconciled: Vec<OutputEvent>,
    metadata: &ChartMetadata,
) -> Result<AssembleOutput, ConvertError> {
    let (difficulty, meter) = section_difficulty(section)?;

    let mut events = reconciled;
    let mut warnings = Vec::new();
    events.extend(gate_events(metadata, &mut warnings));
    events.extend(marker_events(measure_count, metadata));
    events.sort_by(|a, b| a.beat.cmp(&b.beat).then(a.lane.cmp(&b.lane)));

    Ok(AssembleOutput {
        chart: DifficultyChart {
            difficulty,
            author: section.author.to_owned(),
            meter,
            events,
        },
        assemble_warnings: warnings,
    })
}

/// Gate events from the chart labels, pair order checked.
fn gate_events(
    metadata: &ChartMetadata,
    warnings: &mut Vec<Spanned<AssembleWarning>>,
) -> Vec<OutputEvent> {
    let gates: Vec<&GateLabel> = metadata
        .labels
        .iter()
        .filter(|label| label.name.starts_with(GATE_LABEL_PREFIX))
        .collect();

    for (index, label) in gates.iter().enumerate() {
        match GATE_LABEL_ORDER.get(index) {
            Some(&expected) if label.name != expected => warnings.push(
                AssembleWarning::MisorderedGateLabel {
                    found: label.name.clone(),
                    expected: expected.to_owned(),
                }
                .with_span_pair(label.span),
            ),
            Some(_) => {}
            None => warnings.push(
                AssembleWarning::SurplusGateLabel {
                    label: label.name.clone(),
                }
                .with_span_pair(label.span),
            ),
        }
    }
    if gates.len() < GATE_LABEL_ORDER.len() {
        warnings.push(
            AssembleWarning::MissingGateLabels { found: gates.len() }.with_span_pair(
                gates.last().map_or((0, 0), |label| label.span),
            ),
        );
    }

    gates
        .into_iter()
        .map(|label| OutputEvent {
            beat: label.beat,
            time: metadata.offset + metadata.timeline.time_at(label.beat),
            lane: OutputLane::Section,
            kind: EventKind::Gate,
        })
        .collect()
}

/// A measure marker at every measure start plus quarter-beat markers between.
fn marker_events(measure_count: usize, metadata: &ChartMetadata) -> Vec<OutputEvent> {
    let mut events = Vec::with_capacity(measure_count * BEATS_PER_MEASURE as usize);
    for measure in 0..measure_count {
        for beat_in_measure in 0..BEATS_PER_MEASURE {
            let beat = BeatPos::from_beats(measure as i64 * BEATS_PER_MEASURE + beat_in_measure);
            events.push(OutputEvent {
                beat,
                time: metadata.offset + metadata.timeline.time_at(beat),
                lane: OutputLane::Section,
                kind: if beat_in_measure == 0 {
                    EventKind::MeasureMarker
                } else {
                    EventKind::BeatMarker
                },
            });
        }
    }
    events
}

/// Builds the database-writer summary from the successfully converted
/// difficulties, in tier order.
#[must_use]
pub fn summarize(metadata: &ChartMetadata, charts: &[&DifficultyChart]) -> ChartSummary {
    let mut difficulties: Vec<DifficultySummary> = charts
        .iter()
        .map(|chart| DifficultySummary {
            difficulty: chart.difficulty,
            author: chart.author.clone(),
            meter: chart.meter,
        })
        .collect();
    difficulties.sort_by_key(|summary| summary.difficulty);
    ChartSummary {
        title: metadata.title.clone(),
        title_translit: metadata.title_translit.clone(),
        artist: metadata.artist.clone(),
        artist_translit: metadata.artist_translit.clone(),
        credit: metadata.credit.clone(),
        bpm_min: metadata.timeline.min_bpm(),
        bpm_max: metadata.timeline.max_bpm(),
        difficulties,
    }
}
