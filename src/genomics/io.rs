//! rust-htslib backed pileup and reference sources.

use std::collections::HashMap;
use std::ops::Range;
use std::path::Path;

use rust_htslib::bam::record::Aux;
use rust_htslib::bam::{self, Read};
use rust_htslib::faidx;
use tracing::debug;

use crate::genomics::{BaseObservation, PileupColumn, PileupSource, ReferenceSource, SampleSet};
use crate::{PopSnpError, Result};

/// Default cap on reads per pileup column.
pub const DEFAULT_MAX_PILEUP_DEPTH: u32 = 8000;

/// Pileup columns from an indexed BAM file.
///
/// Reads are assigned to samples through their `RG:Z` tag; reads without a
/// known read group are skipped.
pub struct BamPileupSource {
    reader: bam::IndexedReader,
    read_groups: HashMap<String, usize>,
    max_depth: u32,
}

impl std::fmt::Debug for BamPileupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BamPileupSource")
            .field("read_groups", &self.read_groups.len())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl BamPileupSource {
    /// Open `path`; the index is looked up next to it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = bam::IndexedReader::from_path(path.as_ref())?;
        Ok(Self {
            reader,
            read_groups: HashMap::new(),
            max_depth: DEFAULT_MAX_PILEUP_DEPTH,
        })
    }

    /// SAM header text of the file.
    pub fn header_text(&self) -> String {
        String::from_utf8_lossy(self.reader.header().as_bytes()).into_owned()
    }

    /// Length of `contig` as declared in the header.
    pub fn contig_length(&self, contig: &str) -> Result<u32> {
        let header = self.reader.header();
        header
            .tid(contig.as_bytes())
            .and_then(|tid| header.target_len(tid))
            .and_then(|len| u32::try_from(len).ok())
            .ok_or_else(|| PopSnpError::UnknownContig(contig.to_string()))
    }

    /// Map read groups onto the samples of `samples`.
    pub fn set_samples(&mut self, samples: &SampleSet) {
        self.read_groups = samples.read_groups().clone();
    }

    /// Cap the number of reads per column.
    pub fn set_max_depth(&mut self, max_depth: u32) {
        self.max_depth = max_depth;
    }
}

impl PileupSource for BamPileupSource {
    fn visit_columns(
        &mut self,
        contig: &str,
        region: Range<u32>,
        visitor: &mut dyn FnMut(&PileupColumn) -> Result<()>,
    ) -> Result<()> {
        let tid = self
            .reader
            .header()
            .tid(contig.as_bytes())
            .ok_or_else(|| PopSnpError::UnknownContig(contig.to_string()))?;
        self.reader
            .fetch((tid, i64::from(region.start), i64::from(region.end)))?;

        let mut pileups = self.reader.pileup();
        pileups.set_max_depth(self.max_depth);

        let mut column = PileupColumn::default();
        let mut unassigned = 0usize;
        for pileup in pileups {
            let pileup = pileup?;
            let position = pileup.pos();
            if !region.contains(&position) {
                continue;
            }
            column.reset(position);

            for alignment in pileup.alignments() {
                if alignment.is_del() || alignment.is_refskip() {
                    continue;
                }
                let Some(qpos) = alignment.qpos() else {
                    continue;
                };
                let record = alignment.record();
                if record.is_unmapped()
                    || record.is_secondary()
                    || record.is_quality_check_failed()
                    || record.is_duplicate()
                {
                    continue;
                }
                let sample = match record.aux(b"RG") {
                    Ok(Aux::String(id)) => self.read_groups.get(id).copied(),
                    _ => None,
                };
                let Some(sample) = sample else {
                    unassigned += 1;
                    continue;
                };
                column.observations.push(BaseObservation {
                    sample,
                    base: record.seq()[qpos],
                    quality: record.qual()[qpos],
                    mapq: record.mapq(),
                    is_reverse: record.is_reverse(),
                });
            }

            if !column.observations.is_empty() {
                visitor(&column)?;
            }
        }

        if unassigned > 0 {
            debug!(contig, unassigned, "skipped bases from reads without a known read group");
        }
        Ok(())
    }
}

/// Reference bases from an indexed FASTA file.
pub struct FastaReference {
    reader: faidx::Reader,
}

impl std::fmt::Debug for FastaReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastaReference").finish_non_exhaustive()
    }
}

impl FastaReference {
    /// Open `path`; the `.fai` index is looked up next to it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            reader: faidx::Reader::from_path(path.as_ref())?,
        })
    }

    /// Length of `contig`.
    pub fn contig_length(&self, contig: &str) -> Result<u32> {
        // htslib reports a missing sequence as -1.
        u32::try_from(self.reader.fetch_seq_len(contig))
            .map_err(|_| PopSnpError::UnknownContig(contig.to_string()))
    }
}

impl ReferenceSource for FastaReference {
    fn fetch(&self, contig: &str, region: Range<u32>) -> Result<Vec<u8>> {
        let length = self.contig_length(contig)?;
        let end = region.end.min(length);
        if region.start >= end {
            return Ok(Vec::new());
        }
        let bases = self
            .reader
            .fetch_seq(contig, region.start as usize, end as usize - 1)?;
        Ok(bases.iter().map(u8::to_ascii_uppercase).collect())
    }
}

/// Read SAM header text that replaces the alignment file's own header.
pub fn read_header_override<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
