use std::ops::Range;
use std::sync::Arc;

use tracing::trace;

use crate::genomics::classifier::{
    classify_site_type, population_coverage, quality_filter, resolve_heterozygotes,
    segregating_frequency,
};
use crate::genomics::error_model::{DependencyErrorModel, ErrorModel};
use crate::genomics::types::{encode_base, is_unambiguous};
use crate::genomics::{
    GenotypeCaller, HaplotypeMatrix, PileupColumn, Population, SampleSet, SiteRow,
};
use crate::{PopSnpError, Result, SnpConfig};

/// Thresholds applied to the per-sample calls at each site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteThresholds {
    /// Minimum read depth of a covered sample.
    pub min_depth: u16,
    /// Maximum read depth of a covered sample.
    pub max_depth: u16,
    /// Minimum RMS mapping quality of a covered sample.
    pub min_rms_quality: u16,
    /// Minimum SNP quality of a variant call.
    pub min_snp_quality: u16,
    /// Fraction of a population that must be covered.
    pub min_pop_fraction: f64,
    /// Keep heterozygous calls instead of resolving them.
    pub report_heterozygotes: bool,
}

impl From<&SnpConfig> for SiteThresholds {
    fn from(config: &SnpConfig) -> Self {
        Self {
            min_depth: config.min_depth,
            max_depth: config.max_depth,
            min_rms_quality: config.min_rms_quality,
            min_snp_quality: config.min_snp_quality,
            min_pop_fraction: config.min_pop_fraction,
            report_heterozygotes: config.report_heterozygotes(),
        }
    }
}

/// What happened to one pileup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteOutcome {
    /// Column lies outside the window.
    OutsideWindow,
    /// Reference base is not one of A, C, G, T.
    AmbiguousReference,
    /// No population met its coverage requirement.
    Uncovered,
    /// Covered, but no sample carries a confident variant.
    Monomorphic,
    /// Stored as row `index` of the haplotype matrix.
    Segregating {
        /// Row in the window's haplotype matrix.
        index: usize,
        /// Number of confident variant samples.
        frequency: usize,
    },
}

/// State of one window: bounds, counters and the haplotype matrix.
#[derive(Debug)]
pub struct WindowContext {
    contig: Arc<str>,
    start: u32,
    end: u32,
    matrix: HaplotypeMatrix,
    sites_visited: u64,
    sites_covered: u64,
}

impl WindowContext {
    /// Allocate a window over `region` of `contig`; a reversed range is an
    /// error.
    pub fn new(
        contig: impl Into<Arc<str>>,
        region: Range<u32>,
        num_samples: usize,
        num_populations: usize,
    ) -> Result<Self> {
        let contig: Arc<str> = contig.into();
        if region.end < region.start {
            return Err(PopSnpError::Region(format!(
                "{contig}:{}-{} ends before it starts",
                u64::from(region.start) + 1,
                region.end
            )));
        }
        let capacity = region.len();
        Ok(Self {
            contig,
            start: region.start,
            end: region.end,
            matrix: HaplotypeMatrix::new(capacity, num_samples, num_populations)?,
            sites_visited: 0,
            sites_covered: 0,
        })
    }

    /// Feed one column through `sites` and record the outcome.
    pub fn process_site<M: ErrorModel>(
        &mut self,
        sites: &mut SiteProcessor<M>,
        column: &PileupColumn,
        reference_base: u8,
    ) -> Result<SiteOutcome> {
        sites.process(self, column, reference_base)
    }

    /// Contig name.
    pub fn contig(&self) -> &str {
        &self.contig
    }

    /// First coordinate (0-based).
    pub fn start(&self) -> u32 {
        self.start
    }

    /// End coordinate (0-based, exclusive).
    pub fn end(&self) -> u32 {
        self.end
    }

    /// Window length in bases.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Returns `true` for a zero-length window.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `position` lies inside the window.
    pub fn contains(&self, position: u32) -> bool {
        (self.start..self.end).contains(&position)
    }

    /// Segregating sites collected so far.
    pub fn matrix(&self) -> &HaplotypeMatrix {
        &self.matrix
    }

    /// In-window columns seen.
    pub fn sites_visited(&self) -> u64 {
        self.sites_visited
    }

    /// In-window columns where at least one population was covered.
    pub fn sites_covered(&self) -> u64 {
        self.sites_covered
    }
}

/// Turns pileup columns into haplotype matrix rows.
#[derive(Debug, Clone)]
pub struct SiteProcessor<M = DependencyErrorModel> {
    caller: GenotypeCaller<M>,
    thresholds: SiteThresholds,
    populations: Vec<Population>,
    num_samples: usize,
}

impl<M: ErrorModel> SiteProcessor<M> {
    /// Processor for the samples and populations of `samples`.
    pub fn new(caller: GenotypeCaller<M>, thresholds: SiteThresholds, samples: &SampleSet) -> Self {
        Self {
            caller,
            thresholds,
            populations: samples.populations().to_vec(),
            num_samples: samples.len(),
        }
    }

    /// Allocate a window sized for this processor's samples.
    pub fn open_window(
        &self,
        contig: impl Into<Arc<str>>,
        region: Range<u32>,
    ) -> Result<WindowContext> {
        WindowContext::new(contig, region, self.num_samples, self.populations.len())
    }

    /// Active thresholds.
    pub fn thresholds(&self) -> &SiteThresholds {
        &self.thresholds
    }

    /// Classify `column`; `reference_base` is ASCII.
    pub fn process(
        &mut self,
        window: &mut WindowContext,
        column: &PileupColumn,
        reference_base: u8,
    ) -> Result<SiteOutcome> {
        if !window.contains(column.position) {
            return Ok(SiteOutcome::OutsideWindow);
        }
        window.sites_visited += 1;

        let reference = encode_base(reference_base);
        if !is_unambiguous(reference) {
            return Ok(SiteOutcome::AmbiguousReference);
        }

        let thresholds = self.thresholds;
        let mut calls = self.caller.call_column(column, reference, self.num_samples);
        if !thresholds.report_heterozygotes {
            resolve_heterozygotes(&mut calls, reference, thresholds.min_snp_quality);
        }

        let covered_samples = quality_filter(
            &calls,
            thresholds.min_rms_quality,
            thresholds.min_depth,
            thresholds.max_depth,
        );
        let coverage = population_coverage(
            covered_samples,
            &self.populations,
            thresholds.min_pop_fraction,
        );
        if !coverage.any() {
            return Ok(SiteOutcome::Uncovered);
        }
        let ordinal = window.sites_covered;
        window.sites_covered += 1;

        let frequency = segregating_frequency(&calls, reference, thresholds.min_snp_quality);
        if frequency == 0 {
            return Ok(SiteOutcome::Monomorphic);
        }

        let row = SiteRow {
            position: column.position,
            reference,
            ordinal,
            site_type: classify_site_type(&calls),
            covered_samples,
            covered_populations: coverage.mask,
        };
        let index = window.matrix.push(row, &coverage.covered, &calls)?;
        trace!(position = column.position, frequency, "segregating site");
        Ok(SiteOutcome::Segregating { index, frequency })
    }
}
