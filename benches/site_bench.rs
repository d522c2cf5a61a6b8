//! Per-site processing benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use popsnp::genomics::{
    BaseObservation, GenotypeCaller, PileupColumn, SampleSet, SiteProcessor, SiteThresholds,
};
use popsnp::SnpConfig;

fn column(position: u32, samples: usize, depth: usize) -> PileupColumn {
    let mut column = PileupColumn::new(position);
    for sample in 0..samples {
        for read in 0..depth {
            column.observations.push(BaseObservation {
                sample,
                base: if sample % 3 == 0 { b'G' } else { b'A' },
                quality: 20 + (read % 20) as u8,
                mapq: 60,
                is_reverse: read % 2 == 1,
            });
        }
    }
    column
}

fn benchmark_site_processing(c: &mut Criterion) {
    let samples = SampleSet::from_assignments(
        (0..16).map(|idx| (format!("s{idx}"), if idx < 8 { "east" } else { "west" })),
    )
    .expect("samples");
    let columns: Vec<PileupColumn> = (0..1000).map(|pos| column(pos, 16, 12)).collect();

    c.bench_function("process_1000_sites_16_samples", |b| {
        b.iter(|| {
            let thresholds = SiteThresholds::from(&SnpConfig::default());
            let mut sites = SiteProcessor::new(GenotypeCaller::default(), thresholds, &samples);
            let mut window = sites.open_window("chr1", 0..1000).expect("window");
            for column in &columns {
                black_box(window.process_site(&mut sites, column, b'A').expect("site"));
            }
            black_box(window.matrix().segsites())
        });
    });
}

criterion_group!(benches, benchmark_site_processing);
criterion_main!(benches);
