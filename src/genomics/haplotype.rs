use bitvec::prelude::*;

use crate::genomics::{PackedCall, SiteType};
use crate::{PopSnpError, Result};

/// Site-level attributes of one segregating site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct SiteRow {
    /// Genomic coordinate (0-based).
    pub position: u32,
    /// 4-bit reference base code.
    pub reference: u8,
    /// Ordinal of the site among covered sites of the window.
    pub ordinal: u64,
    /// Samples carrying the variant.
    pub site_type: SiteType,
    /// Samples passing the quality filter.
    pub covered_samples: u64,
    /// Populations meeting the coverage requirement.
    pub covered_populations: u64,
}

/// Per-sample columns of the matrix, one entry per segregating site.
#[derive(Debug, Clone)]
pub struct SampleTrack {
    bases: Vec<u8>,
    rms: Vec<u16>,
    snp_quality: Vec<u16>,
    depth: Vec<u16>,
    variants: BitVec<u64, Lsb0>,
}

impl SampleTrack {
    fn with_capacity(capacity: usize) -> Result<Self> {
        let mut words: Vec<u64> = reserve(capacity.div_ceil(64))?;
        words.resize(words.capacity(), 0);
        let mut variants = BitVec::from_vec(words);
        variants.clear();
        Ok(Self {
            bases: reserve(capacity)?,
            rms: reserve(capacity)?,
            snp_quality: reserve(capacity)?,
            depth: reserve(capacity)?,
            variants,
        })
    }

    fn push(&mut self, call: PackedCall) {
        self.bases.push(call.base());
        self.rms.push(call.rms_mapq());
        self.snp_quality.push(call.snp_quality());
        self.depth.push(call.depth());
        self.variants.push(call.is_variant());
    }

    fn clear(&mut self) {
        self.bases.clear();
        self.rms.clear();
        self.snp_quality.clear();
        self.depth.clear();
        self.variants.clear();
    }

    /// 4-bit base codes.
    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    /// RMS mapping qualities.
    pub fn rms(&self) -> &[u16] {
        &self.rms
    }

    /// SNP qualities.
    pub fn snp_quality(&self) -> &[u16] {
        &self.snp_quality
    }

    /// Read depths.
    pub fn depth(&self) -> &[u16] {
        &self.depth
    }

    /// Variant indicator bits.
    pub fn variants(&self) -> &BitSlice<u64, Lsb0> {
        &self.variants
    }
}

fn reserve<T>(capacity: usize) -> Result<Vec<T>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(capacity)
        .map_err(|_| PopSnpError::Allocation(capacity))?;
    Ok(values)
}

/// Column store of the segregating sites of one window.
///
/// Capacity is fixed when the matrix is created; the window length in bases
/// bounds the number of segregating sites.
#[derive(Debug, Clone)]
pub struct HaplotypeMatrix {
    capacity: usize,
    num_populations: usize,
    rows: Vec<SiteRow>,
    population_covered: Vec<u32>,
    samples: Vec<SampleTrack>,
}

impl HaplotypeMatrix {
    /// Pre-size storage for `capacity` sites.
    pub fn new(capacity: usize, num_samples: usize, num_populations: usize) -> Result<Self> {
        let pop_slots = capacity
            .checked_mul(num_populations)
            .ok_or(PopSnpError::Allocation(usize::MAX))?;
        let samples = (0..num_samples)
            .map(|_| SampleTrack::with_capacity(capacity))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            capacity,
            num_populations,
            rows: reserve(capacity)?,
            population_covered: reserve(pop_slots)?,
            samples,
        })
    }

    /// Append a segregating site and return its index.
    pub fn push(
        &mut self,
        row: SiteRow,
        population_covered: &[u32],
        calls: &[PackedCall],
    ) -> Result<usize> {
        if self.rows.len() >= self.capacity {
            return Err(PopSnpError::MatrixFull(self.capacity));
        }
        debug_assert_eq!(population_covered.len(), self.num_populations);
        debug_assert_eq!(calls.len(), self.samples.len());

        let index = self.rows.len();
        self.rows.push(row);
        self.population_covered.extend(
            (0..self.num_populations).map(|pop| population_covered.get(pop).copied().unwrap_or(0)),
        );
        for (idx, track) in self.samples.iter_mut().enumerate() {
            track.push(calls.get(idx).copied().unwrap_or(PackedCall::NO_CALL));
        }
        Ok(index)
    }

    /// Drop every row, keeping the allocation.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.population_covered.clear();
        for track in &mut self.samples {
            track.clear();
        }
    }

    /// Number of segregating sites stored.
    pub fn segsites(&self) -> usize {
        self.rows.len()
    }

    /// Maximum number of sites.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples.
    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    /// Number of populations.
    pub fn num_populations(&self) -> usize {
        self.num_populations
    }

    /// Site attributes in insertion order.
    pub fn rows(&self) -> &[SiteRow] {
        &self.rows
    }

    /// Columns of `sample`.
    pub fn sample(&self, sample: usize) -> &SampleTrack {
        &self.samples[sample]
    }

    /// Covered samples of `population` at site `site`.
    pub fn population_covered(&self, site: usize, population: usize) -> u32 {
        self.population_covered[site * self.num_populations + population]
    }

    /// Whether `sample` carries the variant at site `site`.
    pub fn is_variant(&self, site: usize, sample: usize) -> bool {
        self.samples[sample].variants[site]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: u32, site_type: u64) -> SiteRow {
        SiteRow {
            position,
            reference: 1,
            ordinal: u64::from(position),
            site_type: SiteType::from_bits(site_type),
            covered_samples: 0b11,
            covered_populations: 0b1,
        }
    }

    #[test]
    fn stores_columns_per_sample() {
        let mut matrix = HaplotypeMatrix::new(100, 2, 1).expect("allocation");
        let calls = [
            PackedCall::new(60, 45, 12, 4, PackedCall::VARIANT),
            PackedCall::new(50, 30, 8, 1, 0),
        ];
        assert_eq!(matrix.push(row(10, 0b01), &[2], &calls).unwrap(), 0);
        assert_eq!(matrix.push(row(20, 0b01), &[2], &calls).unwrap(), 1);

        assert_eq!(matrix.segsites(), 2);
        assert_eq!(matrix.sample(0).bases(), &[4, 4]);
        assert_eq!(matrix.sample(1).depth(), &[8, 8]);
        assert_eq!(matrix.sample(0).rms(), &[60, 60]);
        assert!(matrix.is_variant(1, 0));
        assert!(!matrix.is_variant(1, 1));
        assert_eq!(matrix.population_covered(1, 0), 2);
        assert_eq!(matrix.rows()[1].position, 20);
    }

    #[test]
    fn variant_bits_span_multiple_words() {
        let mut matrix = HaplotypeMatrix::new(130, 1, 1).expect("allocation");
        for site in 0..130u32 {
            let flags = if site % 3 == 0 { PackedCall::VARIANT } else { 0 };
            let call = PackedCall::new(40, 40, 5, 4, flags);
            matrix.push(row(site, u64::from(flags)), &[1], &[call]).unwrap();
        }
        let bits = matrix.sample(0).variants();
        assert_eq!(bits.len(), 130);
        assert_eq!(bits.count_ones(), 44);
        assert!(bits[129]);
        assert!(!bits[128]);
    }

    #[test]
    fn pushing_past_capacity_fails() {
        let mut matrix = HaplotypeMatrix::new(1, 1, 1).expect("allocation");
        let call = [PackedCall::NO_CALL];
        matrix.push(row(0, 0), &[0], &call).unwrap();
        let err = matrix.push(row(1, 0), &[0], &call).unwrap_err();
        assert!(matches!(err, PopSnpError::MatrixFull(1)));

        matrix.clear();
        assert_eq!(matrix.segsites(), 0);
        assert!(matrix.push(row(1, 0), &[0], &call).is_ok());
    }
}
