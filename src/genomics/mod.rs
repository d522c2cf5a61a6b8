//! Population SNP calling over read pileups.
//!
//! Per-site flow: a [`PileupColumn`] goes through the [`GenotypeCaller`] to
//! give one [`PackedCall`] per sample; the [`classifier`] resolves
//! heterozygotes, filters samples and decides coverage and segregation; a
//! [`WindowContext`] collects segregating sites into a [`HaplotypeMatrix`]
//! which an [`OutputFormat`] renders once the window is done.

pub mod classifier;
pub mod error_model;
mod genotype_caller;
mod haplotype;
pub mod io;
mod output;
mod packed_call;
mod pileup;
pub mod region;
mod samples;
mod snp_caller;
mod types;
mod window;

pub use classifier::{PopulationCoverage, SiteType};
pub use error_model::{BaseEvidence, ConsensusCall, DependencyErrorModel, ErrorModel};
pub use genotype_caller::{CallFilters, GenotypeCaller};
pub use haplotype::{HaplotypeMatrix, SampleTrack, SiteRow};
pub use io::{BamPileupSource, FastaReference};
pub use output::{render_to_string, write_ms_header, OutputFormat, RenderContext, MS_SEED};
pub use packed_call::PackedCall;
pub use pileup::{
    BaseObservation, InMemoryPileup, InMemoryReference, PileupColumn, PileupSource,
    ReferenceSource,
};
pub use region::{tile_windows, Region};
pub use samples::{Population, SampleSet, DEFAULT_POPULATION, MAX_MEMBERS};
pub use snp_caller::{PopulationSnpCaller, RunSummary};
pub use types::{
    base_index, decode_base, encode_base, is_unambiguous, AlignedRead, CigarOp, CigarOpKind,
    NT16_ALPHABET, NT16_N,
};
pub use window::{SiteOutcome, SiteProcessor, SiteThresholds, WindowContext};
