//! # Population SNP calling from read pileups
//!
//! `popsnp` walks the pileup of a multi-sample alignment file window by
//! window and reports segregating sites across predefined populations.
//!
//! ## Pipeline
//!
//! 1. **Genotype calling**: each sample's reads at a column are reduced to a
//!    packed call (RMS mapping quality, SNP quality, depth, base, flags)
//! 2. **Heterozygote resolution**: low-confidence variants revert to the
//!    reference; confident heterozygotes keep their alternate allele
//! 3. **Classification**: quality-filtered samples decide population
//!    coverage; confident variants decide segregation
//! 4. **Accumulation**: segregating sites are stored in a per-window
//!    haplotype matrix
//! 5. **Rendering**: tabular, population frequency or `ms` output
//!
//! The [`tags`] module carries a standalone codec for the typed auxiliary
//! fields stored after the fixed part of an alignment record.
//!
//! ## Usage Example
//!
//! ```ignore
//! use popsnp::genomics::{InMemoryPileup, InMemoryReference, PopulationSnpCaller, SampleSet};
//! use popsnp::SnpConfig;
//!
//! let samples = SampleSet::from_assignments([("ind1", "north"), ("ind2", "south")])?;
//! let mut caller = PopulationSnpCaller::new(SnpConfig::default(), samples)?;
//! let summary = caller.run(&mut pileup, &reference, "chr1", 0..10_000, &mut std::io::stdout())?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics; // Calling, classification, accumulation and output
pub mod tags; // Auxiliary tag codec

pub use genomics::{OutputFormat, PackedCall, PopulationSnpCaller, SampleSet, SiteType};
pub use tags::{ReadRecord, TagError, TagType, TagValue};

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = PopSnpError> = std::result::Result<T, E>;

/// Errors raised while configuring or running a calling job.
#[derive(Error, Debug)]
pub enum PopSnpError {
    /// Invalid option value or combination.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Region string that cannot be parsed or resolves to nothing.
    #[error("invalid region: {0}")]
    Region(String),

    /// Contig absent from the alignment header or reference.
    #[error("unknown contig '{0}'")]
    UnknownContig(String),

    /// More samples than a site mask can hold.
    #[error("{0} samples exceed the limit of 64")]
    TooManySamples(usize),

    /// More populations than a coverage mask can hold.
    #[error("{0} populations exceed the limit of 64")]
    TooManyPopulations(usize),

    /// Outgroup names no known sample.
    #[error("outgroup sample '{0}' is not among the read group samples")]
    UnknownOutgroup(String),

    /// Window storage could not be reserved.
    #[error("failed to allocate window storage for {0} sites")]
    Allocation(usize),

    /// Haplotype matrix already holds its capacity of sites.
    #[error("haplotype matrix is full ({0} sites)")]
    MatrixFull(usize),

    /// Error reported by htslib.
    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),

    /// I/O failure while reading input or writing output.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed auxiliary tag data.
    #[error(transparent)]
    Tag(#[from] TagError),
}

/// Options of a calling run.
#[derive(Debug, Clone, PartialEq)]
pub struct SnpConfig {
    /// Minimum read depth of a covered sample.
    pub min_depth: u16,
    /// Maximum read depth of a covered sample.
    pub max_depth: u16,
    /// Minimum RMS mapping quality of a covered sample.
    pub min_rms_quality: u16,
    /// Minimum SNP quality of a variant call.
    pub min_snp_quality: u16,
    /// Minimum mapping quality of a contributing read.
    pub min_map_quality: u8,
    /// Minimum base quality of a contributing base.
    pub min_base_quality: u8,
    /// Report layout.
    pub output: OutputFormat,
    /// Heterozygote prior; setting it also turns on heterozygote reporting.
    pub het_prior: Option<f64>,
    /// Sample used to polarize alleles.
    pub outgroup: Option<String>,
    /// Fraction of each population that must be covered.
    pub min_pop_fraction: f64,
    /// Window size in kilobases; `None` treats the region as one window.
    pub window_size: Option<u32>,
    /// Base qualities use the Illumina 1.3+ offset.
    pub illumina_qualities: bool,
}

impl Default for SnpConfig {
    fn default() -> Self {
        Self {
            min_depth: 3,
            max_depth: 255,
            min_rms_quality: 25,
            min_snp_quality: 25,
            min_map_quality: 13,
            min_base_quality: 13,
            output: OutputFormat::Tabular,
            het_prior: None,
            outgroup: None,
            min_pop_fraction: 1.0,
            window_size: None,
            illumina_qualities: false,
        }
    }
}

impl SnpConfig {
    /// Whether heterozygous calls are reported rather than resolved.
    pub fn report_heterozygotes(&self) -> bool {
        self.het_prior.is_some()
    }

    /// Check option values and combinations.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_pop_fraction) {
            return Err(PopSnpError::Config(format!(
                "minimum population fraction {} is outside [0, 1]",
                self.min_pop_fraction
            )));
        }
        if self.min_depth > self.max_depth {
            return Err(PopSnpError::Config(format!(
                "minimum depth {} exceeds maximum depth {}",
                self.min_depth, self.max_depth
            )));
        }
        if self.window_size == Some(0) {
            return Err(PopSnpError::Config("window size must be positive".to_string()));
        }
        if let Some(prior) = self.het_prior {
            if !(prior > 0.0 && prior < 1.0) {
                return Err(PopSnpError::Config(format!(
                    "heterozygote prior {prior} is outside (0, 1)"
                )));
            }
        }
        Ok(())
    }
}
