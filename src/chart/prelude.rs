//! Prelude module for the chart pipeline.
//!
//! Re-exports every public type of the pipeline for convenient access:
//! `use museca_rs::chart::prelude::*;`.

pub use crate::audio::AudioPipeline;
#[cfg(feature = "diagnostics")]
pub use crate::diagnostics::{SimpleSource, ToAriadne, emit_chart_warnings};

pub use super::{
    ChartWarning, ConvertError, ConvertOutput, ConvertedChart, DifficultyOutcome, convert_chart,
    convert_section,
    assemble::{
        AssembleOutput, AssembleWarning, ChartSummary, DifficultyChart, DifficultySummary,
        GATE_LABEL_ORDER, GATE_LABEL_PREFIX, METER_RANGE, assemble, section_difficulty, summarize,
    },
    extract::{Occurrence, extract},
    lex::{GridOutput, LexOutput, LexWarning, NoteSection, cursor::Cursor, parse, parse_measures},
    model::{
        ChartMetadata, Difficulty, EventKind, GateLabel, Measure, OutputEvent, OutputLane,
        PreviewWindow, Row, SIX_COLUMN_WIDTH, SOURCE_LANE_COUNT, SourceLane, SpinDirection,
        Symbol, TargetLane,
    },
    reconcile::{ReconcileOutput, ReconcileWarning, reconcile},
    span::{Spanned, SpannedExt},
    timing::{BEATS_PER_MEASURE, BeatPos, TempoBreakpoint, TempoTimeline},
};
