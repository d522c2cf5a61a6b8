//! Per-site decisions: heterozygote resolution, segregation, sample quality
//! and population coverage.
//!
//! All per-sample and per-population sets are `u64` bitmasks where bit `i`
//! stands for sample (or population) `i`.

use crate::genomics::{PackedCall, Population};

/// Samples carrying a variant call at one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SiteType(u64);

impl SiteType {
    /// Wrap a raw sample mask.
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw sample mask.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Whether `sample` carries the variant.
    pub fn contains(self, sample: usize) -> bool {
        sample < 64 && self.0 & (1 << sample) != 0
    }

    /// Number of variant samples.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

/// Collapse heterozygous and low-confidence calls to a single allele.
///
/// A variant call below `min_snp_quality` becomes a reference call with no
/// flags. A heterozygous call that passes keeps its non-reference allele
/// (the lowest one when neither allele is the reference).
pub fn resolve_heterozygotes(calls: &mut [PackedCall], reference: u8, min_snp_quality: u16) {
    for call in calls.iter_mut() {
        if !call.is_variant() {
            continue;
        }
        if call.snp_quality() < min_snp_quality {
            *call = call.with_base(reference).with_flags(0);
        } else if call.is_heterozygous() {
            let alt = call.base() & !reference;
            let allele = alt & alt.wrapping_neg();
            *call = call.with_base(allele).with_flags(PackedCall::VARIANT);
        }
    }
}

/// Number of samples whose call differs from `reference` with at least
/// `min_snp_quality`. Zero means the site is monomorphic.
pub fn segregating_frequency(calls: &[PackedCall], reference: u8, min_snp_quality: u16) -> usize {
    calls
        .iter()
        .filter(|call| {
            call.is_variant() && call.base() != reference && call.snp_quality() >= min_snp_quality
        })
        .count()
}

/// Samples with adequate mapping quality and depth in `[min_depth, max_depth]`.
pub fn quality_filter(calls: &[PackedCall], min_rms: u16, min_depth: u16, max_depth: u16) -> u64 {
    calls
        .iter()
        .take(64)
        .enumerate()
        .filter(|(_, call)| {
            call.rms_mapq() >= min_rms && (min_depth..=max_depth).contains(&call.depth())
        })
        .fold(0u64, |mask, (idx, _)| mask | (1 << idx))
}

/// Samples whose resolved call carries the variant flag.
pub fn classify_site_type(calls: &[PackedCall]) -> SiteType {
    let bits = calls
        .iter()
        .take(64)
        .enumerate()
        .filter(|(_, call)| call.is_variant())
        .fold(0u64, |mask, (idx, _)| mask | (1 << idx));
    SiteType(bits)
}

/// Covered samples a population of `pop_size` needs: `floor(f * n + 0.4999)`.
pub fn required_coverage(fraction: f64, pop_size: usize) -> usize {
    (fraction * pop_size as f64 + 0.4999).floor() as usize
}

/// Coverage outcome of one site across all populations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PopulationCoverage {
    /// Populations meeting the required coverage.
    pub mask: u64,
    /// Covered samples per population, in population order.
    pub covered: Vec<u32>,
}

impl PopulationCoverage {
    /// Whether any population met its coverage requirement.
    pub fn any(&self) -> bool {
        self.mask != 0
    }
}

/// Intersect the covered-sample mask with each population.
pub fn population_coverage(
    covered_samples: u64,
    populations: &[Population],
    min_fraction: f64,
) -> PopulationCoverage {
    let mut coverage = PopulationCoverage {
        mask: 0,
        covered: Vec::with_capacity(populations.len()),
    };
    for (idx, population) in populations.iter().enumerate() {
        let count = (covered_samples & population.mask).count_ones();
        if count as usize >= required_coverage(min_fraction, population.size) {
            coverage.mask |= 1 << idx;
        }
        coverage.covered.push(count);
    }
    coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const A: u8 = 1;
    const C: u8 = 2;
    const G: u8 = 4;

    fn call(base: u8, snpq: u16, depth: u16, flags: u8) -> PackedCall {
        PackedCall::new(40, snpq, depth, base, flags)
    }

    #[test_case(1.0, 3 => 3)]
    #[test_case(0.5, 3 => 1)]
    #[test_case(0.5, 4 => 2)]
    #[test_case(0.0, 5 => 0)]
    #[test_case(0.75, 2 => 1)]
    fn required_coverage_rounds_with_fixed_bias(fraction: f64, size: usize) -> usize {
        required_coverage(fraction, size)
    }

    #[test_case(3 => true; "depth at minimum")]
    #[test_case(2 => false; "depth below minimum")]
    #[test_case(255 => true; "depth at maximum")]
    #[test_case(256 => false; "depth above maximum")]
    fn quality_filter_bounds_are_inclusive(depth: u16) -> bool {
        quality_filter(&[call(A, 30, depth, 0)], 25, 3, 255) == 1
    }

    #[test]
    fn site_type_marks_variant_samples() {
        let calls = [
            call(A, 40, 10, 0),
            call(G, 40, 10, PackedCall::VARIANT),
            call(A, 40, 10, 0),
            call(G, 40, 10, PackedCall::VARIANT),
        ];
        let site_type = classify_site_type(&calls);
        assert_eq!(site_type.bits(), 0b1010);
        assert!(site_type.contains(3));
        assert!(!site_type.contains(0));
        assert_eq!(segregating_frequency(&calls, A, 25), 2);
    }

    #[test]
    fn low_quality_variants_do_not_segregate() {
        let calls = [call(G, 10, 10, PackedCall::VARIANT), call(A, 40, 10, 0)];
        assert_eq!(segregating_frequency(&calls, A, 25), 0);
    }

    #[test]
    fn resolver_clears_low_quality_variants() {
        let mut calls = [call(G, 10, 10, PackedCall::VARIANT)];
        resolve_heterozygotes(&mut calls, A, 25);
        assert_eq!(calls[0].base(), A);
        assert!(!calls[0].is_variant());
        assert_eq!(calls[0].depth(), 10);
    }

    #[test]
    fn resolver_keeps_alternate_allele_of_confident_heterozygote() {
        let het = PackedCall::VARIANT | PackedCall::HETEROZYGOUS;
        let mut calls = [call(A | G, 40, 10, het), call(C | G, 40, 10, het)];
        resolve_heterozygotes(&mut calls, A, 25);
        assert_eq!(calls[0].base(), G);
        assert!(calls[0].is_variant());
        assert!(!calls[0].is_heterozygous());
        assert_eq!(calls[1].base(), C);
    }

    #[test]
    fn population_coverage_counts_members() {
        let populations = vec![
            Population::new("east", 0b0011),
            Population::new("west", 0b1100),
        ];
        let coverage = population_coverage(0b0111, &populations, 1.0);
        assert_eq!(coverage.mask, 0b01);
        assert_eq!(coverage.covered, vec![2, 1]);
        assert!(coverage.any());

        let relaxed = population_coverage(0b0111, &populations, 0.5);
        assert_eq!(relaxed.mask, 0b11);
    }
}
