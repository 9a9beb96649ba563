//! The lane, symbol, event, and metadata model shared by every pipeline stage.
//!
//! Both notation dialects are normalized into this model at the parser boundary;
//! everything downstream of [`crate::chart::lex`] is dialect-agnostic.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ConvertError;
use super::timing::{BeatPos, TempoTimeline};

/// Number of source lanes in the canonical wide layout: pedal, five primary
/// lanes, five left-spin lanes, five right-spin lanes.
pub const SOURCE_LANE_COUNT: usize = 16;

/// Width of one lane group in the six-column dialect (five lanes plus pedal).
pub const SIX_COLUMN_WIDTH: usize = 6;

/// Rotation direction of a spin gesture. `Neutral` is the non-directional spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpinDirection {
    /// Non-directional.
    Neutral,
    /// Counter-clockwise.
    Left,
    /// Clockwise.
    Right,
}

impl std::fmt::Display for SpinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neutral => write!(f, "neutral"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// One cell of the note grid.
///
/// The wide dialect only produces `None`, `Tap`, `HoldStart`, `HoldEnd`, `Mine`
/// and `Gate`; the six-column dialect additionally writes the composite spin
/// symbols directly. Illegal lane/symbol pairings are not rejected here; the
/// reconciler decides what they mean, or records a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol {
    /// Empty cell.
    None,
    /// A momentary note.
    Tap,
    /// Start of a sustained note.
    HoldStart,
    /// End of a sustained note.
    HoldEnd,
    /// A mine; ends a storm object when one is active on the lane.
    Mine,
    /// A momentary spin gesture.
    Spin(SpinDirection),
    /// Start of a large (sustained) spin gesture.
    LargeSpinStart(SpinDirection),
    /// Landing of a large spin gesture.
    LargeSpinEnd,
    /// Section gate marker.
    Gate,
}

/// One of the five numbered lanes of the target layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetLane(u8);

impl TargetLane {
    /// How many numbered lanes the target layout has.
    pub const COUNT: usize = 5;

    /// Lane from a 0-based index, `None` when out of range.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        (index < Self::COUNT).then(|| Self(index as u8))
    }

    /// 0-based index of this lane.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// All lanes in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Self)
    }
}

impl std::fmt::Display for TargetLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "lane {}", self.0 + 1)
    }
}

/// A lane of the canonical wide source layout.
///
/// The three channel groups are positionally aligned: `Primary(k)`,
/// `SpinLeft(k)` and `SpinRight(k)` all feed [`TargetLane`] `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceLane {
    /// The foot pedal; holds only, no channel grouping.
    Pedal,
    /// Tap/hold channel of a target lane.
    Primary(TargetLane),
    /// Left-spin channel of a target lane.
    SpinLeft(TargetLane),
    /// Right-spin channel of a target lane.
    SpinRight(TargetLane),
}

impl SourceLane {
    /// Flat column index in the canonical wide layout, used as the
    /// deterministic intra-instant processing and emission order.
    #[must_use]
    pub const fn flat_index(self) -> usize {
        match self {
            Self::Pedal => 0,
            Self::Primary(lane) => 1 + lane.index(),
            Self::SpinLeft(lane) => 1 + TargetLane::COUNT + lane.index(),
            Self::SpinRight(lane) => 1 + 2 * TargetLane::COUNT + lane.index(),
        }
    }

    /// Lane from a flat column index, `None` when out of range.
    #[must_use]
    pub fn from_flat_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Pedal),
            _ => {
                let group = (index - 1) / TargetLane::COUNT;
                let lane = TargetLane::from_index((index - 1) % TargetLane::COUNT)?;
                match group {
                    0 => Some(Self::Primary(lane)),
                    1 => Some(Self::SpinLeft(lane)),
                    2 => Some(Self::SpinRight(lane)),
                    _ => None,
                }
            }
        }
    }

    /// The output lane this source lane feeds.
    #[must_use]
    pub const fn target(self) -> OutputLane {
        match self {
            Self::Pedal => OutputLane::Pedal,
            Self::Primary(lane) | Self::SpinLeft(lane) | Self::SpinRight(lane) => {
                OutputLane::Lane(lane)
            }
        }
    }
}

impl std::fmt::Display for SourceLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pedal => write!(f, "pedal"),
            Self::Primary(lane) => write!(f, "{lane}"),
            Self::SpinLeft(lane) => write!(f, "{lane} (left-spin channel)"),
            Self::SpinRight(lane) => write!(f, "{lane} (right-spin channel)"),
        }
    }
}

/// Where an output event lives in the target layout.
///
/// The derived order is the tie-breaking precedence for simultaneous events:
/// section-wide markers, then the pedal, then the numbered lanes ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OutputLane {
    /// Not tied to a lane: gates and measure/beat markers.
    Section,
    /// The foot pedal.
    Pedal,
    /// A numbered lane.
    Lane(TargetLane),
}

impl std::fmt::Display for OutputLane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Section => write!(f, "section"),
            Self::Pedal => write!(f, "pedal"),
            Self::Lane(lane) => write!(f, "{lane}"),
        }
    }
}

/// The target engine's event vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// A momentary note.
    Tap,
    /// Start of a sustained note.
    HoldStart,
    /// End of a sustained note.
    HoldEnd,
    /// A momentary spin gesture.
    Spin(SpinDirection),
    /// Start of a storm object. Unlike a hold, a storm does not block other
    /// events on its lane while active.
    StormStart(SpinDirection),
    /// End of a storm object.
    StormEnd,
    /// Section gate toggle.
    Gate,
    /// Start-of-measure marker.
    MeasureMarker,
    /// Quarter-beat marker inside a measure.
    BeatMarker,
}

/// One event of the converted chart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputEvent {
    /// Exact grid position the event came from.
    pub beat: BeatPos,
    /// Absolute time in seconds, sync offset included.
    pub time: f64,
    /// Target lane.
    pub lane: OutputLane,
    /// What happens.
    pub kind: EventKind,
}

/// One parsed measure: a variable number of equally spaced rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measure {
    /// Rows in grid order. A measure with no rows is 4 beats of silence.
    pub rows: Vec<Row>,
}

/// One row of the note grid, normalized to the canonical wide layout.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    /// One symbol per canonical source lane, indexed by
    /// [`SourceLane::flat_index`].
    pub symbols: [Symbol; SOURCE_LANE_COUNT],
    /// Byte span of the row in the chart source.
    pub span: (usize, usize),
}

/// A difficulty tier of the target engine.
///
/// The notation uses either these names directly or the `easy`/`medium`/`hard`
/// aliases; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Difficulty {
    /// The introductory tier (`novice` or `easy`).
    Novice,
    /// The middle tier (`advanced` or `medium`).
    Advanced,
    /// The top tier (`exhaust` or `hard`).
    Exhaust,
}

impl Difficulty {
    /// Resolves a section's difficulty tag, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::InvalidDifficultyName`] for tags outside the
    /// supported set.
    pub fn parse_tag(tag: &str) -> Result<Self, ConvertError> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "novice" | "easy" => Ok(Self::Novice),
            "advanced" | "medium" => Ok(Self::Advanced),
            "exhaust" | "hard" => Ok(Self::Exhaust),
            _ => Err(ConvertError::InvalidDifficultyName(tag.trim().to_owned())),
        }
    }

    /// The canonical tier name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Novice => "novice",
            Self::Advanced => "advanced",
            Self::Exhaust => "exhaust",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The preview clip window handed to the external audio pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PreviewWindow {
    /// Clip start in seconds into the music file.
    pub start: f64,
    /// Clip length in seconds.
    pub length: f64,
}

/// A named beat marker from the `#LABELS` header tag.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateLabel {
    /// Beat the label sits at.
    pub beat: BeatPos,
    /// Label text, e.g. `GRAFICA_1_START`.
    pub name: String,
    /// Byte span of the label entry in the chart source.
    pub span: (usize, usize),
}

/// Header metadata of a chart, shared by all of its difficulties.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChartMetadata {
    /// Song title, full Unicode.
    pub title: String,
    /// Transliterated title.
    pub title_translit: String,
    /// Artist name, full Unicode.
    pub artist: String,
    /// Transliterated artist name.
    pub artist_translit: String,
    /// Illustration credit.
    pub credit: String,
    /// Path of the companion music file, consumed by the external audio
    /// pipeline only.
    pub music: Option<PathBuf>,
    /// Preview clip window, when a sample start was given.
    pub preview: Option<PreviewWindow>,
    /// Sync offset in seconds added to every event time.
    pub offset: f64,
    /// The tempo map.
    pub timeline: TempoTimeline,
    /// Section gate labels, sorted by beat.
    pub labels: Vec<GateLabel>,
    /// Unrecognized header tags, kept verbatim.
    pub extra: BTreeMap<String, String>,
}
