//! Genotype likelihood models that turn base evidence into a consensus call.

use crate::genomics::types::base_index;

/// Default correlation between errors of repeated observations.
pub const DEFAULT_DEPCORR: f64 = 0.17;
/// Default prior probability of a heterozygous genotype.
pub const DEFAULT_HET_PRIOR: f64 = 0.001;

const MAX_QUALITY: u8 = 63;
const ETA: f64 = 0.03;
const MAX_ERROR: f64 = 0.75;
const BASE_CODES: [u8; 4] = [1, 2, 4, 8];

/// The ten unordered diploid genotypes over A, C, G, T.
const GENOTYPES: [(usize, usize); 10] = [
    (0, 0),
    (0, 1),
    (0, 2),
    (0, 3),
    (1, 1),
    (1, 2),
    (1, 3),
    (2, 2),
    (2, 3),
    (3, 3),
];

/// Base evidence contributed by one read to one sample's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseEvidence {
    /// 4-bit base code (one of A, C, G, T).
    pub base: u8,
    /// Base quality (Phred).
    pub quality: u8,
    /// Strand of the contributing read.
    pub is_reverse: bool,
}

/// Consensus genotype call for one sample at one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusCall {
    /// 4-bit code of the called genotype; heterozygotes carry two bits.
    pub base: u8,
    /// Phred-scaled confidence of the call.
    pub quality: u16,
    /// Whether the called genotype is heterozygous.
    pub heterozygous: bool,
}

/// Reduces a sample's base evidence to a consensus call.
pub trait ErrorModel {
    /// Call a genotype from `evidence`; the slice may be reordered. Returns
    /// `None` when the evidence carries no usable bases.
    fn call(&self, evidence: &mut [BaseEvidence]) -> Option<ConsensusCall>;
}

/// Diploid genotype likelihood model with dependent-error correction.
///
/// Repeated observations of the same base on the same strand are not
/// independent; the k-th repeat has its quality scaled by
/// `fk[k] = (1 - depcorr)^k * (1 - eta) + eta`.
#[derive(Debug, Clone)]
pub struct DependencyErrorModel {
    fk: [f64; 256],
    het_penalty: f64,
}

impl DependencyErrorModel {
    /// Create a model with the given error correlation and heterozygote prior.
    pub fn new(depcorr: f64, het_prior: f64) -> Self {
        let mut fk = [1.0; 256];
        for (n, value) in fk.iter_mut().enumerate().skip(1) {
            *value = (1.0 - depcorr).powi(n as i32) * (1.0 - ETA) + ETA;
        }
        let het_penalty = if het_prior > 0.0 {
            -10.0 * het_prior.log10()
        } else {
            0.0
        };
        Self { fk, het_penalty }
    }

    /// Default correlation with a caller-supplied heterozygote prior.
    pub fn with_het_prior(het_prior: f64) -> Self {
        Self::new(DEFAULT_DEPCORR, het_prior)
    }

    /// Phred-scaled penalty applied to heterozygous genotypes.
    pub fn het_penalty(&self) -> f64 {
        self.het_penalty
    }

    fn genotype_scores(&self, evidence: &mut [BaseEvidence]) -> Option<[f64; 10]> {
        evidence.sort_by(|a, b| b.quality.cmp(&a.quality));

        let mut repeats = [[0usize; 2]; 4];
        let mut scores = [0.0f64; 10];
        let mut used = 0usize;

        for item in evidence.iter() {
            let Some(observed) = base_index(item.base) else {
                continue;
            };
            let strand = usize::from(item.is_reverse);
            let k = repeats[observed][strand].min(255);
            repeats[observed][strand] += 1;

            let quality = f64::from(item.quality.min(MAX_QUALITY)) * self.fk[k];
            let error = 10f64.powf(-quality / 10.0).min(MAX_ERROR);
            let p_match = 1.0 - error;
            let p_mismatch = error / 3.0;

            for (score, &(a, b)) in scores.iter_mut().zip(GENOTYPES.iter()) {
                let pa = if observed == a { p_match } else { p_mismatch };
                let pb = if observed == b { p_match } else { p_mismatch };
                *score -= 10.0 * (0.5 * (pa + pb)).log10();
            }
            used += 1;
        }

        if used == 0 {
            return None;
        }

        for (score, &(a, b)) in scores.iter_mut().zip(GENOTYPES.iter()) {
            if a != b {
                *score += self.het_penalty;
            }
        }
        Some(scores)
    }
}

impl Default for DependencyErrorModel {
    fn default() -> Self {
        Self::new(DEFAULT_DEPCORR, DEFAULT_HET_PRIOR)
    }
}

impl ErrorModel for DependencyErrorModel {
    fn call(&self, evidence: &mut [BaseEvidence]) -> Option<ConsensusCall> {
        let scores = self.genotype_scores(evidence)?;

        let mut best = 0usize;
        for (idx, score) in scores.iter().enumerate() {
            if *score < scores[best] {
                best = idx;
            }
        }
        let second = scores
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != best)
            .map(|(_, score)| *score)
            .fold(f64::INFINITY, f64::min);

        let (a, b) = GENOTYPES[best];
        let quality = (second - scores[best]).round().clamp(0.0, f64::from(u16::MAX)) as u16;

        Some(ConsensusCall {
            base: BASE_CODES[a] | BASE_CODES[b],
            quality,
            heterozygous: a != b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(bases: &[(u8, u8)]) -> Vec<BaseEvidence> {
        bases
            .iter()
            .enumerate()
            .map(|(idx, &(base, quality))| BaseEvidence {
                base,
                quality,
                is_reverse: idx % 2 == 1,
            })
            .collect()
    }

    #[test]
    fn homozygous_evidence_yields_confident_call() {
        let model = DependencyErrorModel::default();
        let mut reads = evidence(&[(4, 30); 6]);
        let call = model.call(&mut reads).expect("call expected");
        assert_eq!(call.base, 4);
        assert!(!call.heterozygous);
        assert!(call.quality >= 25, "quality {}", call.quality);
    }

    #[test]
    fn balanced_evidence_yields_heterozygote() {
        let model = DependencyErrorModel::default();
        let mut reads = evidence(&[(1, 35), (4, 35), (1, 35), (4, 35), (1, 35), (4, 35), (1, 35), (4, 35)]);
        let call = model.call(&mut reads).expect("call expected");
        assert!(call.heterozygous);
        assert_eq!(call.base, 1 | 4);
    }

    #[test]
    fn dependency_correction_discounts_repeats() {
        let model = DependencyErrorModel::default();
        assert_eq!(model.fk[0], 1.0);
        assert!(model.fk[1] < model.fk[0]);
        assert!(model.fk[255] >= ETA);
    }

    #[test]
    fn ambiguous_only_evidence_yields_no_call() {
        let model = DependencyErrorModel::default();
        let mut reads = evidence(&[(15, 30), (15, 30)]);
        assert_eq!(model.call(&mut reads), None);
        assert_eq!(model.call(&mut []), None);
    }
}
