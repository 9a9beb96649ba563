//! Grid parser: header tags, note sections, and measure grids.
//!
//! Raw text == [`parse`] ==> [`NoteSection`]s (in [`LexOutput`]) == [`parse_measures`] ==>
//! [`Measure`]s (in [`GridOutput`])
//!
//! Two notation dialects exist for the note grid and are normalized here into
//! the canonical wide lane model, so everything downstream is dialect-agnostic:
//!
//! - the *wide* dialect writes each row as 16 contiguous columns (pedal, five
//!   primary lanes, five left-spin lanes, five right-spin lanes);
//! - the *six-column* dialect writes each row as whitespace-separated groups of
//!   6 columns (five lanes plus pedal last), with additional groups on the same
//!   line describing simultaneous events, and encodes spins as dedicated symbol
//!   characters instead of spin-channel columns.

pub mod cursor;

use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use self::cursor::Cursor;
use super::ConvertError;
use super::model::{
    ChartMetadata, GateLabel, Measure, PreviewWindow, Row, SIX_COLUMN_WIDTH, SOURCE_LANE_COUNT,
    SpinDirection, Symbol,
};
use super::span::{Spanned, SpannedExt};
use super::timing::{BeatPos, TempoBreakpoint, TempoTimeline};

/// A recoverable oddity found while reading the chart text.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LexWarning {
    /// A grid cell held a character outside the dialect's symbol set; it reads
    /// as an empty cell.
    #[error("unknown note symbol `{symbol}`")]
    UnknownSymbol {
        /// The offending character.
        symbol: char,
    },
    /// A `beat=value` list entry could not be split or parsed; it is skipped.
    #[error("malformed `{tag}` entry `{entry}`, expected `beat=value`")]
    MalformedListEntry {
        /// The list tag the entry belongs to.
        tag: String,
        /// The entry text.
        entry: String,
    },
    /// A numeric header tag did not parse; its default is used.
    #[error("value of tag `{tag}` is not a number")]
    MalformedTagValue {
        /// The tag name.
        tag: String,
    },
    /// A note section carried no difficulty tag and was dropped.
    #[error("note section is missing its difficulty metadata and was skipped")]
    MissingSectionMetadata,
    /// Two note sections declared the same difficulty; the later one wins.
    #[error("duplicate note section for difficulty `{tag}`, the later one wins")]
    DuplicateDifficultySection {
        /// The duplicated difficulty tag.
        tag: String,
    },
    /// A header tag ran to the end of the file without its `;`.
    #[error("tag `{tag}` is not terminated by `;`")]
    UnterminatedTag {
        /// The tag name.
        tag: String,
    },
    /// A note section ran to the end of the file without its `;`.
    #[error("note section is not terminated by `;`")]
    UnterminatedSection,
    /// A `;` appeared outside any section.
    #[error("stray section terminator")]
    StraySectionEnd,
    /// A preview start was given without a length; 10 seconds is assumed.
    #[error("no preview length given, assuming 10 seconds")]
    DefaultedPreviewLength,
}

/// One raw note section: difficulty metadata plus unparsed grid lines.
///
/// The grid lines are kept raw here so a structural problem in one section's
/// grid ([`parse_measures`]) cannot take down sibling difficulties.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NoteSection<'a> {
    /// Play style tag, informational.
    pub style: &'a str,
    /// Chart author ("effected by").
    pub author: &'a str,
    /// Raw difficulty tag; validated by the assembler.
    pub difficulty_tag: Spanned<&'a str>,
    /// Raw meter value; validated by the assembler.
    pub meter: &'a str,
    /// Raw grid lines, measure separators included.
    pub rows: Vec<Spanned<&'a str>>,
}

/// Result of lexing a chart: header metadata, raw note sections, warnings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LexOutput<'a> {
    /// Header metadata, tempo timeline included.
    pub metadata: ChartMetadata,
    /// Note sections in source order, at most one per difficulty tag.
    pub sections: Vec<NoteSection<'a>>,
    /// Warnings collected along the way.
    pub lex_warnings: Vec<Spanned<LexWarning>>,
}

/// Splits the chart text into header metadata and raw note sections.
///
/// # Errors
///
/// Returns [`ConvertError::InvalidTempoData`] when the `#BPMS` tag is missing,
/// its first breakpoint is not at beat 0, its beats do not strictly increase,
/// or a bpm is not positive and finite. Everything else is a warning.
pub fn parse(source: &str) -> Result<LexOutput<'_>, ConvertError> {
    let mut cursor = Cursor::new(source);
    let mut warnings = Vec::new();
    let mut tags: BTreeMap<String, Vec<Spanned<&str>>> = BTreeMap::new();
    let mut sections: Vec<NoteSection<'_>> = Vec::new();

    while let Some((span, line)) = cursor.next_line() {
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if line == "#NOTEDATA:;" {
            if let Some(section) = read_notedata_section(&mut cursor, &mut warnings) {
                push_section(&mut sections, section, &mut warnings);
            }
            continue;
        }
        if line == "#NOTES:" {
            if let Some(section) = read_legacy_section(&mut cursor, &mut warnings) {
                push_section(&mut sections, section, &mut warnings);
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix('#') {
            if let Some((key, first_value)) = rest.split_once(':') {
                let key = key.trim().to_ascii_lowercase();
                let fragments = read_tag_fragments(
                    &mut cursor,
                    &key,
                    subspanned(span.start, line, first_value),
                    &mut warnings,
                );
                // Duplicate tags: the later definition wins.
                tags.insert(key, fragments);
            }
            continue;
        }
        if line == ";" {
            warnings.push(LexWarning::StraySectionEnd.with_span(span));
        }
        // Anything else outside a section is garbage we care nothing about.
    }

    let metadata = build_metadata(tags, &mut warnings)?;
    Ok(LexOutput {
        metadata,
        sections,
        lex_warnings: warnings,
    })
}

/// Wraps a subslice of `line` (which starts at byte `line_start`) in its span.
fn subspanned<'a>(line_start: usize, line: &'a str, part: &'a str) -> Spanned<&'a str> {
    let offset = part.as_ptr() as usize - line.as_ptr() as usize;
    part.with_span(line_start + offset..line_start + offset + part.len())
}

/// Accumulates a tag's value fragments until one ends with `;`.
fn read_tag_fragments<'a>(
    cursor: &mut Cursor<'a>,
    key: &str,
    first: Spanned<&'a str>,
    warnings: &mut Vec<Spanned<LexWarning>>,
) -> Vec<Spanned<&'a str>> {
    let mut fragments = Vec::new();
    let mut push = |fragment: Spanned<&'a str>| -> bool {
        match fragment.content().strip_suffix(';') {
            Some(stripped) => {
                fragments.push(Spanned::new(stripped, fragment.start(), fragment.end() - 1));
                true
            }
            None => {
                fragments.push(fragment);
                false
            }
        }
    };
    if push(first) {
        return fragments;
    }
    loop {
        let Some((span, line)) = cursor.next_line() else {
            warnings.push(
                LexWarning::UnterminatedTag {
                    tag: key.to_owned(),
                }
                .with_span(fragments.last().map_or(0..0, Spanned::span)),
            );
            return fragments;
        };
        if push(line.with_span(span)) {
            return fragments;
        }
    }
}

/// Extracts the value of a `#TAG:value;` line, `None` when the line is not
/// that tag.
fn single_tag_value<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(tag)?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.strip_suffix(';').unwrap_or(rest).trim())
}

/// Reads one block-structured note section (everything after `#NOTEDATA:;`).
fn read_notedata_section<'a>(
    cursor: &mut Cursor<'a>,
    warnings: &mut Vec<Spanned<LexWarning>>,
) -> Option<NoteSection<'a>> {
    let mut style = "";
    let mut author = "";
    let mut difficulty: Option<Spanned<&'a str>> = None;
    let mut meter = "";
    let mut rows = Vec::new();
    let mut in_notes = false;
    let mut terminated = false;
    let mut last_span = 0..0;

    while let Some((span, line)) = cursor.next_line() {
        last_span = span.clone();
        if in_notes {
            if line == ";" {
                terminated = true;
                break;
            }
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            rows.push(line.with_span(span));
            continue;
        }
        if line == "#NOTES:" {
            in_notes = true;
        } else if line == ";" {
            // Section closed before any notes appeared.
            terminated = true;
            break;
        } else if let Some(value) = single_tag_value(line, "#STEPSTYPE") {
            style = value;
        } else if let Some(value) = single_tag_value(line, "#DIFFICULTY") {
            difficulty = Some(subspanned(span.start, line, value));
        } else if let Some(value) = single_tag_value(line, "#METER") {
            meter = value;
        } else if let Some(value) = single_tag_value(line, "#CREDIT") {
            author = value;
        }
    }

    if !terminated {
        warnings.push(LexWarning::UnterminatedSection.with_span(last_span.clone()));
    }
    let Some(difficulty_tag) = difficulty else {
        warnings.push(LexWarning::MissingSectionMetadata.with_span(last_span));
        return None;
    };
    Some(NoteSection {
        style,
        author,
        difficulty_tag,
        meter,
        rows,
    })
}

/// Reads one legacy note section: four indented `value:` metadata lines
/// (style, author, difficulty, rating) followed by grid lines.
fn read_legacy_section<'a>(
    cursor: &mut Cursor<'a>,
    warnings: &mut Vec<Spanned<LexWarning>>,
) -> Option<NoteSection<'a>> {
    let mut meta: Vec<Spanned<&'a str>> = Vec::new();
    let mut rows = Vec::new();
    let mut terminated = false;
    let mut last_span = 0..0;

    while let Some((span, line)) = cursor.next_line() {
        last_span = span.clone();
        if line == ";" {
            terminated = true;
            break;
        }
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        if let Some(value) = line.strip_suffix(':') {
            if meta.len() < 4 {
                meta.push(subspanned(span.start, line, value.trim_end()));
            }
            // Extra metadata lines (groove radar values) carry nothing we use.
            continue;
        }
        rows.push(line.with_span(span));
    }

    if !terminated {
        warnings.push(LexWarning::UnterminatedSection.with_span(last_span.clone()));
    }
    let Ok([style, author, difficulty_tag, meter]) = <[Spanned<&str>; 4]>::try_from(meta) else {
        warnings.push(LexWarning::MissingSectionMetadata.with_span(last_span));
        return None;
    };
    Some(NoteSection {
        style: style.into_content(),
        author: author.into_content(),
        difficulty_tag,
        meter: meter.into_content(),
        rows,
    })
}

/// Appends a section, replacing an earlier one with the same difficulty tag.
fn push_section<'a>(
    sections: &mut Vec<NoteSection<'a>>,
    section: NoteSection<'a>,
    warnings: &mut Vec<Spanned<LexWarning>>,
) {
    let replaced = sections.iter_mut().find(|existing| {
        existing
            .difficulty_tag
            .content()
            .eq_ignore_ascii_case(section.difficulty_tag.content())
    });
    match replaced {
        Some(existing) => {
            warnings.push(
                LexWarning::DuplicateDifficultySection {
                    tag: section.difficulty_tag.content().to_ascii_lowercase(),
                }
                .with_span(section.difficulty_tag.span()),
            );
            *existing = section;
        }
        None => sections.push(section),
    }
}

/// Iterates the comma-separated entries of a tag fragment with their spans.
fn entries_with_spans<'a>(
    fragment: &Spanned<&'a str>,
) -> impl Iterator<Item = (std::ops::Range<usize>, &'a str)> {
    let base = fragment.start();
    let text = *fragment.content();
    text.split(',').scan(0_usize, move |offset, entry| {
        let start = base + *offset;
        *offset += entry.len() + 1;
        Some((start..start + entry.len(), entry))
    })
}

fn build_metadata(
    mut tags: BTreeMap<String, Vec<Spanned<&str>>>,
    warnings: &mut Vec<Spanned<LexWarning>>,
) -> Result<ChartMetadata, ConvertError> {
    fn joined(fragments: &[Spanned<&str>]) -> String {
        fragments
            .iter()
            .map(|fragment| *fragment.content())
            .collect::<String>()
            .trim()
            .to_owned()
    }

    fn take_text(tags: &mut BTreeMap<String, Vec<Spanned<&str>>>, key: &str) -> String {
        tags.remove(key).as_deref().map(joined).unwrap_or_default()
    }

    fn take_number(
        tags: &mut BTreeMap<String, Vec<Spanned<&str>>>,
        key: &str,
        warnings: &mut Vec<Spanned<LexWarning>>,
    ) -> Option<f64> {
        let fragments = tags.remove(key)?;
        let text = joined(&fragments);
        if text.is_empty() {
            return None;
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(value),
            _ => {
                warnings.push(
                    LexWarning::MalformedTagValue {
                        tag: key.to_owned(),
                    }
                    .with_span(fragments.first().map_or(0..0, Spanned::span)),
                );
                None
            }
        }
    }

    let title = take_text(&mut tags, "title");
    let title_translit = take_text(&mut tags, "titletranslit");
    let artist = take_text(&mut tags, "artist");
    let artist_translit = take_text(&mut tags, "artisttranslit");
    let credit = take_text(&mut tags, "credit");
    let music = Some(take_text(&mut tags, "music"))
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    let offset = take_number(&mut tags, "offset", warnings).unwrap_or(0.0);
    let sample_start = take_number(&mut tags, "samplestart", warnings);
    let sample_length = take_number(&mut tags, "samplelength", warnings);
    let preview = sample_start.map(|start| {
        let length = sample_length.unwrap_or_else(|| {
            warnings.push(LexWarning::DefaultedPreviewLength.with_span(0..0));
            10.0
        });
        PreviewWindow { start, length }
    });

    let mut breakpoints = Vec::new();
    for fragment in tags.remove("bpms").unwrap_or_default() {
        for (span, entry) in entries_with_spans(&fragment) {
            if entry.trim().is_empty() {
                continue;
            }
            let parsed = entry.split_once('=').and_then(|(beat, bpm)| {
                Some((BeatPos::parse_decimal(beat)?, bpm.trim().parse::<f64>().ok()?))
            });
            match parsed {
                Some((beat, bpm)) => breakpoints.push(TempoBreakpoint { beat, bpm }),
                None => warnings.push(
                    LexWarning::MalformedListEntry {
                        tag: "bpms".to_owned(),
                        entry: entry.trim().to_owned(),
                    }
                    .with_span(span),
                ),
            }
        }
    }
    breakpoints.sort_by(|a, b| a.beat.cmp(&b.beat));
    let timeline = TempoTimeline::new(breakpoints)?;

    let mut labels = Vec::new();
    for fragment in tags.remove("labels").unwrap_or_default() {
        for (span, entry) in entries_with_spans(&fragment) {
            if entry.trim().is_empty() {
                continue;
            }
            let parsed = entry
                .split_once('=')
                .and_then(|(beat, name)| Some((BeatPos::parse_decimal(beat)?, name.trim())))
                .filter(|(_, name)| !name.is_empty());
            match parsed {
                Some((beat, name)) => labels.push(GateLabel {
                    beat,
                    name: name.to_owned(),
                    span: (span.start, span.end),
                }),
                None => warnings.push(
                    LexWarning::MalformedListEntry {
                        tag: "labels".to_owned(),
                        entry: entry.trim().to_owned(),
                    }
                    .with_span(span),
                ),
            }
        }
    }
    labels.sort_by(|a, b| a.beat.cmp(&b.beat));

    let extra = tags
        .into_iter()
        .map(|(key, fragments)| (key, joined(&fragments)))
        .collect();

    Ok(ChartMetadata {
        title,
        title_translit,
        artist,
        artist_translit,
        credit,
        music,
        preview,
        offset,
        timeline,
        labels,
        extra,
    })
}

/// Which notation dialect a row was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Wide,
    SixColumn,
}

/// Result of parsing one section's grid lines.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridOutput {
    /// Measures in chart order.
    pub measures: Vec<Measure>,
    /// Warnings collected along the way.
    pub lex_warnings: Vec<Spanned<LexWarning>>,
}

/// Parses one section's raw grid lines into measures of normalized rows.
///
/// # Errors
///
/// Returns [`ConvertError::MalformedGrid`] naming the measure index when a row
/// matches neither dialect, or when rows of one measure mix dialects.
pub fn parse_measures(section: &NoteSection<'_>) -> Result<GridOutput, ConvertError> {
    let mut measures = Vec::new();
    let mut warnings = Vec::new();
    let mut rows = Vec::new();
    let mut dialect = None;

    for line in &section.rows {
        let text = *line.content();
        if text.starts_with(',') {
            measures.push(Measure {
                rows: std::mem::take(&mut rows),
            });
            dialect = None;
            continue;
        }
        let (row, row_dialect) = parse_row(text, line.span(), measures.len(), &mut warnings)?;
        if let Some(expected) = dialect {
            if expected != row_dialect {
                return Err(ConvertError::MalformedGrid {
                    measure: measures.len(),
                    message: "rows of one measure mix notation dialects".into(),
                });
            }
        } else {
            dialect = Some(row_dialect);
        }
        rows.push(row);
    }
    // A trailing measure without its separator still counts.
    if !rows.is_empty() {
        measures.push(Measure { rows });
    }
    Ok(GridOutput {
        measures,
        lex_warnings: warnings,
    })
}

fn parse_row(
    text: &str,
    span: std::ops::Range<usize>,
    measure: usize,
    warnings: &mut Vec<Spanned<LexWarning>>,
) -> Result<(Row, Dialect), ConvertError> {
    let groups = whitespace_groups(text, span.start);
    let mut symbols = [Symbol::None; SOURCE_LANE_COUNT];

    let mut read = |ch: char, at: usize, table: fn(char) -> Option<Symbol>| {
        table(ch).unwrap_or_else(|| {
            warnings.push(
                LexWarning::UnknownSymbol { symbol: ch }.with_span(at..at + ch.len_utf8()),
            );
            Symbol::None
        })
    };

    if let [(start, group)] = groups[..]
        && group.chars().count() == SOURCE_LANE_COUNT
    {
        for (slot, (offset, ch)) in group.char_indices().enumerate() {
            symbols[slot] = read(ch, start + offset, wide_symbol);
        }
        return Ok((
            Row {
                symbols,
                span: (span.start, span.end),
            },
            Dialect::Wide,
        ));
    }

    if !groups.is_empty()
        && groups
            .iter()
            .all(|(_, group)| group.chars().count() == SIX_COLUMN_WIDTH)
    {
        for &(start, group) in &groups {
            for (column, (offset, ch)) in group.char_indices().enumerate() {
                // The pedal is written last in this dialect but lives first in
                // the canonical layout.
                let slot = if column == SIX_COLUMN_WIDTH - 1 {
                    0
                } else {
                    column + 1
                };
                let symbol = read(ch, start + offset, six_column_symbol);
                if symbol != Symbol::None {
                    symbols[slot] = symbol;
                }
            }
        }
        return Ok((
            Row {
                symbols,
                span: (span.start, span.end),
            },
            Dialect::SixColumn,
        ));
    }

    Err(ConvertError::MalformedGrid {
        measure,
        message: format!(
            "row `{text}` is neither {SOURCE_LANE_COUNT} contiguous columns nor \
             whitespace-separated groups of {SIX_COLUMN_WIDTH}"
        ),
    })
}

/// Non-whitespace runs of `text` with their absolute byte offsets.
fn whitespace_groups(text: &str, base: usize) -> Vec<(usize, &str)> {
    let mut groups = Vec::new();
    let mut run_start: Option<usize> = None;
    for (offset, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = run_start.take() {
                groups.push((base + start, &text[start..offset]));
            }
        } else if run_start.is_none() {
            run_start = Some(offset);
        }
    }
    if let Some(start) = run_start {
        groups.push((base + start, &text[start..]));
    }
    groups
}

fn wide_symbol(ch: char) -> Option<Symbol> {
    Some(match ch {
        '0' => Symbol::None,
        '1' => Symbol::Tap,
        '2' => Symbol::HoldStart,
        '3' => Symbol::HoldEnd,
        'M' => Symbol::Mine,
        'G' => Symbol::Gate,
        _ => return None,
    })
}

fn six_column_symbol(ch: char) -> Option<Symbol> {
    Some(match ch {
        '0' => Symbol::None,
        '1' => Symbol::Tap,
        '2' => Symbol::HoldStart,
        '3' => Symbol::HoldEnd,
        'M' => Symbol::Mine,
        'G' => Symbol::Gate,
        's' => Symbol::Spin(SpinDirection::Neutral),
        'l' => Symbol::Spin(SpinDirection::Left),
        'r' => Symbol::Spin(SpinDirection::Right),
        'S' => Symbol::LargeSpinStart(SpinDirection::Neutral),
        'L' => Symbol::LargeSpinStart(SpinDirection::Left),
        'R' => Symbol::LargeSpinStart(SpinDirection::Right),
        'T' => Symbol::LargeSpinEnd,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const HEADER: &str = "#TITLE:Test Song;\n#ARTIST:誰か;\n#OFFSET:0.5;\n#BPMS:0.000=120.000;\n";

    #[test]
    fn header_tags_parse_with_last_wins() {
        let source = format!("{HEADER}#TITLE:Overridden;\n#WHATEVER:kept;\n");
        let LexOutput { metadata, .. } = parse(&source).expect("valid header");
        assert_eq!(metadata.title, "Overridden");
        assert_eq!(metadata.artist, "誰か");
        assert!((metadata.offset - 0.5).abs() < f64::EPSILON);
        assert_eq!(metadata.extra.get("whatever").map(String::as_str), Some("kept"));
    }

    #[test]
    fn multi_line_bpms_and_labels() {
        let source = "#BPMS:0.000=170.000,\n8.000=85.000;\n#LABELS:0.000=GRAFICA_1_START,\n4.000=GRAFICA_1_END;\n";
        let LexOutput { metadata, .. } = parse(source).expect("valid header");
        assert_eq!(metadata.timeline.breakpoints().len(), 2);
        assert!((metadata.timeline.bpm_at(BeatPos::from_beats(9)) - 85.0).abs() < f64::EPSILON);
        assert_eq!(metadata.labels.len(), 2);
        assert_eq!(metadata.labels[0].name, "GRAFICA_1_START");
        assert_eq!(metadata.labels[1].beat, BeatPos::from_beats(4));
    }

    #[test]
    fn missing_bpms_is_fatal() {
        assert!(matches!(
            parse("#TITLE:x;\n"),
            Err(ConvertError::InvalidTempoData(_))
        ));
    }

    #[test]
    fn block_structured_section_is_read() {
        let source = format!(
            "{HEADER}#NOTEDATA:;\n#STEPSTYPE:museca;\n#DIFFICULTY:easy;\n#METER:5;\n#CREDIT:someone;\n#NOTES:\n0100000000000000\n,\n;\n"
        );
        let LexOutput { sections, .. } = parse(&source).expect("valid chart");
        assert_eq!(sections.len(), 1);
        assert_eq!(*sections[0].difficulty_tag.content(), "easy");
        assert_eq!(sections[0].meter, "5");
        assert_eq!(sections[0].author, "someone");
        assert_eq!(sections[0].rows.len(), 2);
    }

    #[test]
    fn legacy_section_is_read() {
        let source = format!(
            "{HEADER}#NOTES:\n    museca-single:\n    someone:\n    novice:\n    7:\n  100000\n  ,\n;\n"
        );
        let LexOutput { sections, .. } = parse(&source).expect("valid chart");
        assert_eq!(sections.len(), 1);
        assert_eq!(*sections[0].difficulty_tag.content(), "novice");
        assert_eq!(sections[0].meter, "7");
        assert_eq!(sections[0].author, "someone");
    }

    #[test]
    fn duplicate_difficulty_section_replaces_and_warns() {
        let source = format!(
            "{HEADER}#NOTEDATA:;\n#DIFFICULTY:easy;\n#METER:1;\n#NOTES:\n,\n;\n#NOTEDATA:;\n#DIFFICULTY:easy;\n#METER:9;\n#NOTES:\n,\n;\n"
        );
        let LexOutput {
            sections,
            lex_warnings,
            ..
        } = parse(&source).expect("valid chart");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].meter, "9");
        assert!(lex_warnings.iter().any(|warning| matches!(
            warning.content(),
            LexWarning::DuplicateDifficultySection { tag } if tag == "easy"
        )));
    }

    fn section_of(rows: &[&'static str]) -> NoteSection<'static> {
        NoteSection {
            style: "museca",
            author: "",
            difficulty_tag: Spanned::new("easy", 0, 4),
            meter: "5",
            rows: rows
                .iter()
                .map(|row| Spanned::new(*row, 0, row.len()))
                .collect(),
        }
    }

    #[test]
    fn wide_rows_normalize_in_place() {
        let output =
            parse_measures(&section_of(&["2100000000000000", ","])).expect("valid grid");
        assert_eq!(output.measures.len(), 1);
        let row = &output.measures[0].rows[0];
        assert_eq!(row.symbols[0], Symbol::HoldStart);
        assert_eq!(row.symbols[1], Symbol::Tap);
        assert!(row.symbols[2..].iter().all(|&s| s == Symbol::None));
    }

    #[test]
    fn six_column_rows_normalize_with_pedal_last() {
        let output = parse_measures(&section_of(&["100002 0l0000", ","])).expect("valid grid");
        let row = &output.measures[0].rows[0];
        // Column 5 is the pedal, stored first in the canonical layout.
        assert_eq!(row.symbols[0], Symbol::HoldStart);
        assert_eq!(row.symbols[1], Symbol::Tap);
        // The second simultaneous-event group lands in the same row.
        assert_eq!(row.symbols[2], Symbol::Spin(SpinDirection::Left));
    }

    #[test]
    fn unknown_symbols_warn_and_read_as_empty() {
        let output = parse_measures(&section_of(&["X00000", ","])).expect("valid grid");
        assert_eq!(output.measures[0].rows[0].symbols[1], Symbol::None);
        assert!(matches!(
            output.lex_warnings[0].content(),
            LexWarning::UnknownSymbol { symbol: 'X' }
        ));
    }

    #[test]
    fn malformed_rows_name_the_measure() {
        let result = parse_measures(&section_of(&["100000", ",", "10000", ","]));
        assert!(
            matches!(result, Err(ConvertError::MalformedGrid { measure: 1, .. })),
            "got {result:?}"
        );
    }

    #[test]
    fn mixed_dialects_within_a_measure_fail() {
        let result = parse_measures(&section_of(&["100000", "1000000000000000", ","]));
        assert!(matches!(
            result,
            Err(ConvertError::MalformedGrid { measure: 0, .. })
        ));
    }

    #[test]
    fn trailing_measure_without_separator_is_flushed() {
        let output = parse_measures(&section_of(&["100000"])).expect("valid grid");
        assert_eq!(output.measures.len(), 1);
    }
}
