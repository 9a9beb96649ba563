//! The chart conversion pipeline.
//!
//! Raw text == [`lex`] ==> note sections == [`extract`] ==> occurrences ==
//! [`reconcile`] ==> events == [`assemble`] ==> [`assemble::DifficultyChart`]
//!
//! [`convert_chart`] runs every stage. The stages are also public so callers
//! can stop at an intermediate representation, e.g. to inspect the occurrence
//! stream of a single difficulty.
//!
//! Policies, in short:
//!
//! - Structural problems ([`ConvertError`]) abort the difficulty they belong
//!   to; only a broken header (the tempo timeline) aborts the whole chart.
//! - Authoring mistakes become [`ChartWarning`]s and never abort anything.
//! - Difficulty passes share nothing but the read-only metadata, and run in
//!   parallel.

pub mod assemble;
pub mod extract;
pub mod lex;
pub mod model;
pub mod prelude;
pub mod reconcile;
pub mod span;
pub mod timing;

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use self::assemble::{AssembleOutput, AssembleWarning, ChartSummary, DifficultyChart};
use self::lex::{LexOutput, LexWarning, NoteSection};
use self::model::{ChartMetadata, Difficulty};
use self::reconcile::{ReconcileOutput, ReconcileWarning};
use self::span::Spanned;

/// A structural problem that aborts conversion of a difficulty (or, for tempo
/// data, of the whole chart).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConvertError {
    /// The tempo breakpoints are unusable: missing, not starting at beat 0,
    /// not strictly increasing, or carrying a non-positive bpm.
    #[error("invalid tempo data: {0}")]
    InvalidTempoData(String),
    /// A row of the named measure fits no notation dialect.
    #[error("malformed grid in measure {measure}: {message}")]
    MalformedGrid {
        /// 0-based index of the measure the row belongs to.
        measure: usize,
        /// What was wrong with the row.
        message: String,
    },
    /// A difficulty meter outside the accepted range.
    #[error("meter `{meter}` for {difficulty} must be an integer in 1..=15")]
    InvalidMeter {
        /// The difficulty whose meter was rejected.
        difficulty: Difficulty,
        /// The raw meter value.
        meter: String,
    },
    /// A difficulty tag outside the supported set.
    #[error("difficulty tag `{0}` is not supported")]
    InvalidDifficultyName(String),
}

/// Any recoverable problem found during conversion.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChartWarning {
    /// From the grid parser.
    #[error("warn: lex: {0}")]
    Lex(#[from] Spanned<LexWarning>),
    /// From the lane reconciler.
    #[error("warn: reconcile: {0}")]
    Reconcile(#[from] Spanned<ReconcileWarning>),
    /// From the assembler.
    #[error("warn: assemble: {0}")]
    Assemble(#[from] Spanned<AssembleWarning>),
}

/// Outcome of one note section's conversion pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyOutcome {
    /// The section's raw difficulty tag.
    pub tag: String,
    /// The converted difficulty, or the structural error that stopped it.
    /// A failure here never affects sibling difficulties.
    pub result: Result<DifficultyChart, ConvertError>,
}

/// A fully converted chart.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvertedChart {
    /// Header metadata, tempo timeline included.
    pub metadata: ChartMetadata,
    /// The summary handed to the external database writer.
    pub summary: ChartSummary,
    /// Per-section outcomes, in source order.
    pub difficulties: Vec<DifficultyOutcome>,
}

/// Result of [`convert_chart`]: the chart plus every warning collected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[must_use]
pub struct ConvertOutput {
    /// The converted chart.
    pub chart: ConvertedChart,
    /// Warnings from all stages and difficulties.
    pub warnings: Vec<ChartWarning>,
}

/// Converts a chart text document in one step.
///
/// The difficulty passes are mutually independent and run on the rayon thread
/// pool; their outcomes and warnings are merged back in source order, so the
/// output is deterministic.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidTempoData`] when the header's tempo timeline
/// is unusable; every other structural error is scoped to its difficulty and
/// reported in [`ConvertedChart::difficulties`].
pub fn convert_chart(source: &str) -> Result<ConvertOutput, ConvertError> {
    let LexOutput {
        metadata,
        sections,
        lex_warnings,
    } = lex::parse(source)?;
    debug!(
        title = %metadata.title,
        sections = sections.len(),
        lex_warnings = lex_warnings.len(),
        "chart header parsed"
    );

    let mut warnings: Vec<ChartWarning> = lex_warnings.into_iter().map(Into::into).collect();

    let outcomes: Vec<(DifficultyOutcome, Vec<ChartWarning>)> = sections
        .par_iter()
        .map(|section| convert_section(section, &metadata))
        .collect();

    let mut difficulties = Vec::with_capacity(outcomes.len());
    for (outcome, section_warnings) in outcomes {
        warnings.extend(section_warnings);
        difficulties.push(outcome);
    }

    let converted: Vec<&DifficultyChart> = difficulties
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok())
        .collect();
    let summary = assemble::summarize(&metadata, &converted);
    debug!(
        converted = converted.len(),
        failed = difficulties.len() - converted.len(),
        warnings = warnings.len(),
        "chart conversion finished"
    );

    Ok(ConvertOutput {
        chart: ConvertedChart {
            metadata,
            summary,
            difficulties,
        },
        warnings,
    })
}

/// Runs the per-difficulty pipeline over one note section.
#[must_use]
pub fn convert_section(
    section: &NoteSection<'_>,
    metadata: &ChartMetadata,
) -> (DifficultyOutcome, Vec<ChartWarning>) {
    let tag = section.difficulty_tag.content().to_string();
    let mut warnings = Vec::new();
    let result = convert_section_inner(section, metadata, &mut warnings);
    (DifficultyOutcome { tag, result }, warnings)
}

fn convert_section_inner(
    section: &NoteSection<'_>,
    metadata: &ChartMetadata,
    warnings: &mut Vec<ChartWarning>,
) -> Result<DifficultyChart, ConvertError> {
    // Validate the section metadata before spending time on its grid.
    let (difficulty, _) = assemble::section_difficulty(section)?;

    let grid = lex::parse_measures(section)?;
    warnings.extend(grid.lex_warnings.into_iter().map(ChartWarning::from));

    let occurrences = extract::extract(&grid.measures, &metadata.timeline, metadata.offset);
    let ReconcileOutput {
        events,
        reconcile_warnings,
    } = reconcile::reconcile(&occurrences);
    warnings.extend(reconcile_warnings.into_iter().map(ChartWarning::from));

    let AssembleOutput {
        chart,
        assemble_warnings,
    } = assemble::assemble(section, grid.measures.len(), events, metadata)?;
    warnings.extend(assemble_warnings.into_iter().map(ChartWarning::from));

    debug!(
        %difficulty,
        occurrences = occurrences.len(),
        events = chart.events.len(),
        "difficulty converted"
    );
    Ok(chart)
}
