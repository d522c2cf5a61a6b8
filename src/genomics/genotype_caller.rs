use crate::genomics::error_model::{BaseEvidence, DependencyErrorModel, ErrorModel};
use crate::genomics::types::{encode_base, is_unambiguous};
use crate::genomics::{PackedCall, PileupColumn};

/// Offset between Illumina 1.3+ and Sanger quality encodings.
const ILLUMINA_OFFSET: u8 = 31;

/// Read-level filters applied before evidence reaches the error model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFilters {
    /// Minimum mapping quality of a contributing read.
    pub min_map_quality: u8,
    /// Minimum base quality of a contributing base.
    pub min_base_quality: u8,
    /// Base qualities use the Illumina 1.3+ offset.
    pub illumina_qualities: bool,
}

impl Default for CallFilters {
    fn default() -> Self {
        Self {
            min_map_quality: 13,
            min_base_quality: 13,
            illumina_qualities: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SampleAccumulator {
    evidence: Vec<BaseEvidence>,
    mapq_sq_sum: u64,
}

impl SampleAccumulator {
    fn clear(&mut self) {
        self.evidence.clear();
        self.mapq_sq_sum = 0;
    }

    fn rms_mapq(&self) -> u16 {
        if self.evidence.is_empty() {
            return 0;
        }
        let mean = self.mapq_sq_sum as f64 / self.evidence.len() as f64;
        mean.sqrt().round() as u16
    }
}

/// Reduces a pileup column to one [`PackedCall`] per sample.
#[derive(Debug, Clone)]
pub struct GenotypeCaller<M = DependencyErrorModel> {
    model: M,
    filters: CallFilters,
    samples: Vec<SampleAccumulator>,
}

impl<M: ErrorModel> GenotypeCaller<M> {
    /// Create a caller over `model`.
    pub fn new(model: M, filters: CallFilters) -> Self {
        Self {
            model,
            filters,
            samples: Vec::new(),
        }
    }

    /// Active read filters.
    pub fn filters(&self) -> &CallFilters {
        &self.filters
    }

    /// Call every sample at `column`. `reference` is the 4-bit code of the
    /// reference base; the result always has `num_samples` entries.
    pub fn call_column(
        &mut self,
        column: &PileupColumn,
        reference: u8,
        num_samples: usize,
    ) -> Vec<PackedCall> {
        if self.samples.len() < num_samples {
            self.samples.resize_with(num_samples, SampleAccumulator::default);
        }
        for sample in &mut self.samples[..num_samples] {
            sample.clear();
        }

        for observation in &column.observations {
            if observation.sample >= num_samples
                || observation.mapq < self.filters.min_map_quality
            {
                continue;
            }
            let quality = if self.filters.illumina_qualities {
                observation.quality.saturating_sub(ILLUMINA_OFFSET)
            } else {
                observation.quality
            };
            if quality < self.filters.min_base_quality {
                continue;
            }
            let base = encode_base(observation.base);
            if !is_unambiguous(base) {
                continue;
            }
            let sample = &mut self.samples[observation.sample];
            sample.evidence.push(BaseEvidence {
                base,
                quality,
                is_reverse: observation.is_reverse,
            });
            sample.mapq_sq_sum += u64::from(observation.mapq) * u64::from(observation.mapq);
        }

        let model = &self.model;
        self.samples[..num_samples]
            .iter_mut()
            .map(|sample| {
                let depth = u16::try_from(sample.evidence.len()).unwrap_or(u16::MAX);
                let rms = sample.rms_mapq();
                match model.call(&mut sample.evidence) {
                    Some(call) => {
                        let mut flags = 0;
                        if call.base != reference {
                            flags |= PackedCall::VARIANT;
                        }
                        if call.heterozygous {
                            flags |= PackedCall::HETEROZYGOUS;
                        }
                        PackedCall::new(rms, call.quality, depth, call.base, flags)
                    }
                    None => PackedCall::NO_CALL,
                }
            })
            .collect()
    }
}

impl Default for GenotypeCaller<DependencyErrorModel> {
    fn default() -> Self {
        Self::new(DependencyErrorModel::default(), CallFilters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::BaseObservation;

    fn column(observations: &[(usize, u8, u8, u8)]) -> PileupColumn {
        PileupColumn {
            position: 10,
            observations: observations
                .iter()
                .enumerate()
                .map(|(idx, &(sample, base, quality, mapq))| BaseObservation {
                    sample,
                    base,
                    quality,
                    mapq,
                    is_reverse: idx % 2 == 1,
                })
                .collect(),
        }
    }

    #[test]
    fn calls_variant_per_sample() {
        let mut caller = GenotypeCaller::default();
        let mut reads: Vec<(usize, u8, u8, u8)> = vec![(0, b'G', 30, 60); 6];
        reads.extend(vec![(1, b'A', 30, 40); 6]);
        let calls = caller.call_column(&column(&reads), encode_base(b'A'), 3);

        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].base(), encode_base(b'G'));
        assert!(calls[0].is_variant());
        assert_eq!(calls[0].depth(), 6);
        assert_eq!(calls[0].rms_mapq(), 60);
        assert!(calls[0].snp_quality() >= 25);

        assert_eq!(calls[1].base(), encode_base(b'A'));
        assert!(!calls[1].is_variant());
        assert_eq!(calls[1].rms_mapq(), 40);

        assert!(calls[2].is_no_call());
    }

    #[test]
    fn filtered_reads_do_not_count_towards_depth() {
        let mut caller = GenotypeCaller::default();
        let reads = [
            (0, b'C', 30, 60),
            (0, b'C', 30, 5),  // low mapping quality
            (0, b'C', 5, 60),  // low base quality
            (0, b'N', 30, 60), // ambiguous base
            (7, b'C', 30, 60), // unknown sample
        ];
        let calls = caller.call_column(&column(&reads), encode_base(b'C'), 1);
        assert_eq!(calls[0].depth(), 1);
    }

    #[test]
    fn rms_mapping_quality_is_rounded() {
        let mut caller = GenotypeCaller::default();
        let reads = [(0, b'T', 30, 20), (0, b'T', 30, 40)];
        let calls = caller.call_column(&column(&reads), encode_base(b'T'), 1);
        // sqrt((400 + 1600) / 2) = 31.62
        assert_eq!(calls[0].rms_mapq(), 32);
    }

    #[test]
    fn illumina_offset_is_removed_before_filtering() {
        let filters = CallFilters {
            illumina_qualities: true,
            ..CallFilters::default()
        };
        let mut caller = GenotypeCaller::new(DependencyErrorModel::default(), filters);
        let reads = [(0, b'A', 40, 60), (0, b'A', 61, 60)];
        let calls = caller.call_column(&column(&reads), encode_base(b'A'), 1);
        assert_eq!(calls[0].depth(), 1);
    }
}
