#[path = "common/mod.rs"]
mod common;
use common::{assert_snapshot, reads_at, reference_with, two_population_samples, CountingModel};
use popsnp::genomics::{InMemoryPileup, OutputFormat, PopulationSnpCaller};
use popsnp::SnpConfig;

fn render(output: OutputFormat, outgroup: Option<&str>) -> String {
    let mut reads = Vec::new();
    // 141: east carries G, west is reference A.
    reads.extend(reads_at(140, 0, b'G', 4, 60));
    reads.extend(reads_at(140, 1, b'G', 4, 60));
    reads.extend(reads_at(140, 2, b'A', 4, 60));
    reads.extend(reads_at(140, 3, b'A', 3, 50));
    // 151: s2 and s3 carry T over reference C.
    reads.extend(reads_at(150, 0, b'C', 5, 60));
    reads.extend(reads_at(150, 1, b'T', 3, 60));
    reads.extend(reads_at(150, 2, b'T', 4, 60));
    reads.extend(reads_at(150, 3, b'C', 4, 60));
    // 161: monomorphic.
    for sample in 0..4 {
        reads.extend(reads_at(160, sample, b'G', 4, 60));
    }

    let reference = reference_with(&[(140, b'A'), (150, b'C'), (160, b'G')]);
    let mut pileup = InMemoryPileup::new(reads);
    let config = SnpConfig {
        output,
        outgroup: outgroup.map(str::to_string),
        ..SnpConfig::default()
    };
    let mut caller = PopulationSnpCaller::with_model(config, two_population_samples(), CountingModel)
        .expect("caller initialises");

    let mut out = Vec::new();
    let summary = caller
        .run(&mut pileup, &reference, "chr1", 100..200, &mut out)
        .expect("run succeeds");
    assert_eq!(summary.segregating_sites, 2);
    assert_eq!(summary.sites_covered, 3);
    String::from_utf8(out).expect("utf-8 output")
}

#[test]
fn tabular_output_matches_golden() {
    assert_snapshot("output/tabular.txt", &render(OutputFormat::Tabular, None));
}

#[test]
fn frequency_output_matches_golden() {
    assert_snapshot("output/frequency.txt", &render(OutputFormat::Frequency, None));
}

#[test]
fn frequency_output_is_polarized_by_outgroup() {
    assert_snapshot(
        "output/frequency_outgroup.txt",
        &render(OutputFormat::Frequency, Some("s1")),
    );
}

#[test]
fn ms_output_matches_golden() {
    assert_snapshot("output/ms.txt", &render(OutputFormat::Ms, None));
}

#[test]
fn ms_output_is_polarized_by_outgroup() {
    assert_snapshot("output/ms_outgroup.txt", &render(OutputFormat::Ms, Some("s1")));
}
