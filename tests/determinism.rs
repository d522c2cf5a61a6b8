#[path = "common/mod.rs"]
mod common;
use std::collections::HashSet;

use blake3::hash;
use common::{reads_at, reference_with, two_population_samples};
use popsnp::genomics::{InMemoryPileup, OutputFormat, PopulationSnpCaller};
use popsnp::SnpConfig;

#[test]
fn population_snp_caller_is_deterministic() {
    let mut reads = Vec::new();
    for (position, bases) in [(120, b"GGAA"), (133, b"TCTC"), (171, b"AAAC")] {
        for (sample, &base) in bases.iter().enumerate() {
            reads.extend(reads_at(position, sample, base, 5, 55));
        }
    }
    let reference = reference_with(&[(133, b'C')]);

    let mut fingerprints = HashSet::new();
    for output in [OutputFormat::Tabular, OutputFormat::Frequency, OutputFormat::Ms] {
        let mut per_format = HashSet::new();
        for _ in 0..5 {
            let config = SnpConfig {
                output,
                outgroup: Some("s4".to_string()),
                window_size: Some(1),
                ..SnpConfig::default()
            };
            let mut caller = PopulationSnpCaller::new(config, two_population_samples())
                .expect("caller initialises");
            let mut pileup = InMemoryPileup::new(reads.clone());
            let mut out = Vec::new();
            caller
                .run(&mut pileup, &reference, "chr1", 0..300, &mut out)
                .expect("run succeeds");
            per_format.insert(hash(&out));
        }
        assert_eq!(per_format.len(), 1, "{output:?} output diverged across runs");
        fingerprints.extend(per_format);
    }

    assert_eq!(fingerprints.len(), 3, "formats should render differently");
}
