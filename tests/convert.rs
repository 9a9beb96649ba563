//! End-to-end conversion of wide-dialect charts.

use museca_rs::chart::prelude::*;
use pretty_assertions::assert_eq;

const GATE_LABELS: &str = "#LABELS:0.000=GRAFICA_1_START,4.000=GRAFICA_1_END,\
8.000=GRAFICA_2_START,12.000=GRAFICA_2_END,16.000=GRAFICA_3_START,20.000=GRAFICA_3_END;\n";

fn header_120() -> String {
    format!(
        "#TITLE:Neon Cascade;\n\
         #TITLETRANSLIT:neon kasukeedo;\n\
         #ARTIST:誰か;\n\
         #ARTISTTRANSLIT:Dareka;\n\
         #MUSIC:neon.ogg;\n\
         #SAMPLESTART:31.5;\n\
         #SAMPLELENGTH:12.0;\n\
         #OFFSET:0.0;\n\
         #BPMS:0.000=120.000;\n\
         {GATE_LABELS}"
    )
}

fn section(difficulty: &str, meter: &str, rows: &str) -> String {
    format!(
        "#NOTEDATA:;\n\
         #STEPSTYPE:museca;\n\
         #DIFFICULTY:{difficulty};\n\
         #METER:{meter};\n\
         #CREDIT:someone;\n\
         #NOTES:\n\
         {rows};\n"
    )
}

fn note_events(chart: &DifficultyChart) -> Vec<&OutputEvent> {
    chart
        .events
        .iter()
        .filter(|event| event.lane != OutputLane::Section)
        .collect()
}

fn only_chart(output: &ConvertOutput) -> &DifficultyChart {
    assert_eq!(output.chart.difficulties.len(), 1);
    output.chart.difficulties[0]
        .result
        .as_ref()
        .expect("difficulty converts")
}

#[test]
fn metadata_resolves_with_unicode_and_preview() {
    let source = format!(
        "{}{}",
        header_120(),
        section("easy", "5", "0000000000000000\n,\n")
    );
    let output = convert_chart(&source).expect("chart converts");
    let metadata = &output.chart.metadata;
    assert_eq!(metadata.title, "Neon Cascade");
    assert_eq!(metadata.artist, "誰か");
    assert_eq!(metadata.artist_translit, "Dareka");
    assert_eq!(
        metadata.music.as_deref(),
        Some(std::path::Path::new("neon.ogg"))
    );
    let preview = metadata.preview.expect("preview window present");
    assert!((preview.start - 31.5).abs() < 1e-9);
    assert!((preview.length - 12.0).abs() < 1e-9);

    let summary = &output.chart.summary;
    assert_eq!(summary.title_translit, "neon kasukeedo");
    assert!((summary.bpm_min - 120.0).abs() < f64::EPSILON);
    assert!((summary.bpm_max - 120.0).abs() < f64::EPSILON);
    assert_eq!(
        summary.difficulties,
        vec![DifficultySummary {
            difficulty: Difficulty::Novice,
            author: "someone".to_owned(),
            meter: 5,
        }]
    );
}

#[test]
fn four_rows_at_120_bpm_land_on_half_seconds() {
    let rows = "0100000000000000\n\
                0100000000000000\n\
                0100000000000000\n\
                0100000000000000\n\
                ,\n";
    let source = format!("{}{}", header_120(), section("easy", "5", rows));
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let taps: Vec<&OutputEvent> = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::Tap)
        .collect();
    assert_eq!(taps.len(), 4);
    for (tap, expected) in taps.iter().zip([0.0, 0.5, 1.0, 1.5]) {
        assert!((tap.time - expected).abs() < 1e-9, "{} != {expected}", tap.time);
    }
}

#[test]
fn conversion_is_deterministic() {
    let rows = "2100000000000000\n\
                0000001000010000\n\
                0000000000000000\n\
                30000000000000M0\n\
                ,\n";
    let source = format!("{}{}", header_120(), section("hard", "14", rows));
    let first = convert_chart(&source).expect("chart converts");
    let second = convert_chart(&source).expect("chart converts");
    assert_eq!(first, second);
}

#[test]
fn hold_without_end_converts_without_an_end_event() {
    // Hold start on the third of four rows: beat 2, one second in.
    let rows = "0000000000000000\n\
                0000000000000000\n\
                0200000000000000\n\
                0000000000000000\n\
                ,\n";
    let source = format!("{}{}", header_120(), section("easy", "5", rows));
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let starts: Vec<&OutputEvent> = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::HoldStart)
        .collect();
    assert_eq!(starts.len(), 1);
    assert!((starts[0].time - 1.0).abs() < 1e-9);
    assert!(
        chart
            .events
            .iter()
            .all(|event| event.kind != EventKind::HoldEnd)
    );
    assert!(output.warnings.iter().any(|warning| matches!(
        warning,
        ChartWarning::Reconcile(spanned)
            if matches!(spanned.content(), ReconcileWarning::UnclosedHold { .. })
    )));
}

#[test]
fn simultaneous_spin_taps_merge() {
    // Lane 1's left and right spin channels tap on the same row.
    let rows = "0000001000010000\n\
                0000000000000000\n\
                ,\n";
    let source = format!("{}{}", header_120(), section("easy", "5", rows));
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let spins: Vec<&OutputEvent> = chart
        .events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Spin(_)))
        .collect();
    assert_eq!(spins.len(), 1);
    assert_eq!(spins[0].kind, EventKind::Spin(SpinDirection::Neutral));
    assert!((spins[0].time - 0.0).abs() < 1e-9);
}

#[test]
fn spin_channel_hold_storms_until_the_mine() {
    // Measure 1: left-spin hold on lane 1 at beat 4 (2.0s), then a mine in the
    // primary channel at beat 6 (3.0s).
    let measure_1 = "0000000000000000\n".repeat(4);
    let measure_2 = "0000002000000000\n\
                     0000000000000000\n\
                     0M00000000000000\n\
                     0000000000000000\n";
    let rows = format!("{measure_1},\n{measure_2},\n");
    let source = format!("{}{}", header_120(), section("easy", "5", &rows));
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);

    let notes = note_events(chart);
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].kind, EventKind::StormStart(SpinDirection::Left));
    assert!((notes[0].time - 2.0).abs() < 1e-9);
    assert_eq!(notes[1].kind, EventKind::StormEnd);
    assert!((notes[1].time - 3.0).abs() < 1e-9);
    // The lane never went through a hold.
    assert!(output.warnings.iter().all(|warning| !matches!(
        warning,
        ChartWarning::Reconcile(spanned)
            if matches!(
                spanned.content(),
                ReconcileWarning::IllegalHoldEndWithoutStart { .. }
                    | ReconcileWarning::UnclosedHold { .. }
            )
    )));
}

#[test]
fn a_malformed_difficulty_leaves_siblings_intact() {
    let good_rows = "0100000000000000\n,\n";
    let bad_rows = "010000000000000\n,\n";
    let source = format!(
        "{}{}{}",
        header_120(),
        section("easy", "5", good_rows),
        section("medium", "9", bad_rows)
    );
    let output = convert_chart(&source).expect("chart converts");
    assert_eq!(output.chart.difficulties.len(), 2);

    let easy = &output.chart.difficulties[0];
    assert!(easy.result.is_ok(), "easy failed: {:?}", easy.result);

    let medium = &output.chart.difficulties[1];
    assert!(matches!(
        medium.result,
        Err(ConvertError::MalformedGrid { measure: 0, .. })
    ));

    // Only the surviving difficulty reaches the summary.
    assert_eq!(output.chart.summary.difficulties.len(), 1);
    assert_eq!(
        output.chart.summary.difficulties[0].difficulty,
        Difficulty::Novice
    );
}

#[test]
fn out_of_range_meter_fails_only_its_difficulty() {
    let rows = "0100000000000000\n,\n";
    let source = format!(
        "{}{}{}",
        header_120(),
        section("easy", "5", rows),
        section("hard", "99", rows)
    );
    let output = convert_chart(&source).expect("chart converts");
    assert!(output.chart.difficulties[0].result.is_ok());
    assert!(matches!(
        output.chart.difficulties[1].result,
        Err(ConvertError::InvalidMeter { .. })
    ));
}

#[test]
fn unsupported_difficulty_tag_is_rejected() {
    let rows = "0100000000000000\n,\n";
    let source = format!("{}{}", header_120(), section("ultimate", "5", rows));
    let output = convert_chart(&source).expect("chart converts");
    assert_eq!(
        output.chart.difficulties[0].result,
        Err(ConvertError::InvalidDifficultyName("ultimate".to_owned()))
    );
}

#[test]
fn gate_labels_become_section_gates() {
    let source = format!(
        "{}{}",
        header_120(),
        section("easy", "5", "0000000000000000\n,\n")
    );
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let gates: Vec<&OutputEvent> = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::Gate)
        .collect();
    assert_eq!(gates.len(), 6);
    assert!(gates.iter().all(|gate| gate.lane == OutputLane::Section));
    // At 120 bpm the second label (beat 4) sits two seconds in.
    assert!((gates[1].time - 2.0).abs() < 1e-9);
    assert!(
        output
            .warnings
            .iter()
            .all(|warning| !matches!(warning, ChartWarning::Assemble(_)))
    );
}

#[test]
fn markers_follow_the_measure_grid() {
    let rows = "0000000000000000\n,\n0000000000000000\n,\n";
    let source = format!("{}{}", header_120(), section("easy", "5", rows));
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let measure_markers = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::MeasureMarker)
        .count();
    let beat_markers = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::BeatMarker)
        .count();
    assert_eq!(measure_markers, 2);
    assert_eq!(beat_markers, 6);
}

#[test]
fn tempo_change_shifts_later_measures() {
    // 120 bpm for the first measure (2.0s), 60 bpm afterwards.
    let source = format!(
        "#TITLE:x;\n#BPMS:0.000=120.000,4.000=60.000;\n{}",
        section(
            "easy",
            "5",
            "0000000000000000\n,\n0100000000000000\n0100000000000000\n,\n"
        )
    );
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let taps: Vec<&OutputEvent> = chart
        .events
        .iter()
        .filter(|event| event.kind == EventKind::Tap)
        .collect();
    assert!((taps[0].time - 2.0).abs() < 1e-9);
    assert!((taps[1].time - 4.0).abs() < 1e-9);
}

#[test]
fn negative_offset_shifts_event_times() {
    let source = format!(
        "#TITLE:x;\n#OFFSET:-0.25;\n#BPMS:0.000=120.000;\n{}",
        section("easy", "5", "0100000000000000\n,\n")
    );
    let output = convert_chart(&source).expect("chart converts");
    let chart = only_chart(&output);
    let tap = chart
        .events
        .iter()
        .find(|event| event.kind == EventKind::Tap)
        .expect("tap present");
    assert!((tap.time + 0.25).abs() < 1e-9);
}

#[test]
fn missing_tempo_data_fails_the_whole_chart() {
    let source = section("easy", "5", "0100000000000000\n,\n");
    assert!(matches!(
        convert_chart(&source),
        Err(ConvertError::InvalidTempoData(_))
    ));
}
