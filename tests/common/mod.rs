#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use popsnp::genomics::{
    base_index, AlignedRead, BaseEvidence, ConsensusCall, ErrorModel, InMemoryReference,
    SampleSet,
};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("POPSNP_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set POPSNP_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Majority-vote model with quality `10 * supporting reads`, so expected
/// output can be worked out by hand.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountingModel;

impl ErrorModel for CountingModel {
    fn call(&self, evidence: &mut [BaseEvidence]) -> Option<ConsensusCall> {
        let mut counts = [0u16; 4];
        for item in evidence.iter() {
            if let Some(idx) = base_index(item.base) {
                counts[idx] += 1;
            }
        }
        let (best, count) = counts
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
        if *count == 0 {
            return None;
        }
        Some(ConsensusCall {
            base: 1 << best,
            quality: count * 10,
            heterozygous: false,
        })
    }
}

/// `count` single-base reads of `base` at `position` for `sample`.
pub fn reads_at(position: u32, sample: usize, base: u8, count: usize, mapq: u8) -> Vec<AlignedRead> {
    (0..count)
        .map(|_| AlignedRead::ungapped("chr1", position, mapq, sample, &[base], 30))
        .collect()
}

/// Four samples: `s1`, `s2` in `east`, `s3`, `s4` in `west`.
pub fn two_population_samples() -> SampleSet {
    SampleSet::from_assignments([("s1", "east"), ("s2", "east"), ("s3", "west"), ("s4", "west")])
        .expect("valid samples")
}

/// 300 bp of `A` on `chr1` with the given substitutions (0-based).
pub fn reference_with(bases: &[(usize, u8)]) -> InMemoryReference {
    let mut sequence = vec![b'A'; 300];
    for &(position, base) in bases {
        sequence[position] = base;
    }
    InMemoryReference::new().with_contig("chr1", &sequence)
}
