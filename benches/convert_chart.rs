//! Benchmark for full chart conversion.

use criterion::{Criterion, Throughput};
use museca_rs::chart::convert_chart;

/// Builds a synthetic wide-dialect chart with `measures` sixteenth-note
/// measures across three difficulties.
fn synthetic_chart(measures: usize) -> String {
    let mut source = String::from(
        "#TITLE:Synthetic;\n#ARTIST:bench;\n#OFFSET:0.0;\n#BPMS:0.000=150.000,64.000=75.000;\n\
         #LABELS:0.000=GRAFICA_1_START,16.000=GRAFICA_1_END,32.000=GRAFICA_2_START,\
         48.000=GRAFICA_2_END,64.000=GRAFICA_3_START,80.000=GRAFICA_3_END;\n",
    );
    for difficulty in ["easy", "medium", "hard"] {
        source.push_str("#NOTEDATA:;\n#STEPSTYPE:museca;\n");
        source.push_str(&format!("#DIFFICULTY:{difficulty};\n#METER:10;\n#CREDIT:bench;\n"));
        source.push_str("#NOTES:\n");
        for measure in 0..measures {
            for row in 0..16 {
                let mut line = ['0'; 16];
                match (measure + row) % 4 {
                    0 => line[1 + row % 5] = '1',
                    1 => line[6 + row % 5] = '1',
                    2 => line[11 + row % 5] = '1',
                    _ => {}
                }
                source.extend(line);
                source.push('\n');
            }
            source.push_str(",\n");
        }
        source.push_str(";\n");
    }
    source
}

fn bench_convert_chart(c: &mut Criterion) {
    let mut group = c.benchmark_group("convert_chart");

    for measures in [16, 64, 256] {
        let source = synthetic_chart(measures);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(format!("{measures}_measures"), |b| {
            b.iter(|| convert_chart(std::hint::black_box(&source)));
        });
    }

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default();
    bench_convert_chart(&mut criterion);
}
