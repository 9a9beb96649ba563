//! Fancy diagnostics support using `ariadne`.
//!
//! Every warning of the pipeline carries the byte span of the chart text it
//! came from (via [`crate::chart::span::Spanned`]); this module turns them
//! into `ariadne::Report`s, letting ariadne derive row/column positions for
//! display.
//!
//! ```no_run
//! use museca_rs::chart::convert_chart;
//! use museca_rs::diagnostics::emit_chart_warnings;
//!
//! let source = std::fs::read_to_string("song.ssc").unwrap();
//! let output = convert_chart(&source).unwrap();
//! emit_chart_warnings("song.ssc", &source, &output.warnings);
//! ```

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::chart::ChartWarning;
use crate::chart::assemble::AssembleWarning;
use crate::chart::lex::LexWarning;
use crate::chart::reconcile::ReconcileWarning;
use crate::chart::span::Spanned;

/// Simple source container holding a file name and the chart text.
pub struct SimpleSource<'a> {
    name: &'a str,
    text: &'a str,
}

impl<'a> SimpleSource<'a> {
    /// Creates a new source container.
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }

    /// The chart text.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// The file name shown in reports.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }
}

/// Conversion of positioned warnings into `ariadne::Report`.
pub trait ToAriadne {
    /// Builds a report against `src`.
    fn to_report<'a>(&self, src: &SimpleSource<'a>)
    -> Report<'a, (String, std::ops::Range<usize>)>;
}

fn spanned_report<'a, T: std::fmt::Display>(
    warning: &Spanned<T>,
    src: &SimpleSource<'a>,
    stage: &str,
    color: Color,
) -> Report<'a, (String, std::ops::Range<usize>)> {
    let filename = src.name().to_string();
    Report::build(ReportKind::Warning, (filename.clone(), warning.span()))
        .with_message(format!("{stage}: {}", warning.content()))
        .with_label(Label::new((filename, warning.span())).with_color(color))
        .finish()
}

impl ToAriadne for Spanned<LexWarning> {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        spanned_report(self, src, "lex", Color::Yellow)
    }
}

impl ToAriadne for Spanned<ReconcileWarning> {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        spanned_report(self, src, "reconcile", Color::Blue)
    }
}

impl ToAriadne for Spanned<AssembleWarning> {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        spanned_report(self, src, "assemble", Color::Magenta)
    }
}

impl ToAriadne for ChartWarning {
    fn to_report<'a>(
        &self,
        src: &SimpleSource<'a>,
    ) -> Report<'a, (String, std::ops::Range<usize>)> {
        match self {
            Self::Lex(warning) => warning.to_report(src),
            Self::Reconcile(warning) => warning.to_report(src),
            Self::Assemble(warning) => warning.to_report(src),
        }
    }
}

/// Renders every warning of a conversion against the chart text.
pub fn emit_chart_warnings<'a>(
    name: &'a str,
    source: &'a str,
    warnings: impl IntoIterator<Item = &'a ChartWarning>,
) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for warning in warnings {
        let report = warning.to_report(&simple);
        let _ = report.print((name.to_string(), ariadne_source.clone()));
    }
}
