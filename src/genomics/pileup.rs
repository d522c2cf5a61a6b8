use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use crate::genomics::AlignedRead;
use crate::{PopSnpError, Result};

/// One read's contribution to a pileup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseObservation {
    /// Index of the sample the read belongs to.
    pub sample: usize,
    /// Called base (ASCII).
    pub base: u8,
    /// Base quality (Phred).
    pub quality: u8,
    /// Mapping quality of the containing read.
    pub mapq: u8,
    /// Whether the read maps to the reverse strand.
    pub is_reverse: bool,
}

/// Every read observation overlapping one reference coordinate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PileupColumn {
    /// Genomic coordinate (0-based).
    pub position: u32,
    /// Observations in pileup order.
    pub observations: Vec<BaseObservation>,
}

impl PileupColumn {
    /// Empty column at `position`.
    pub fn new(position: u32) -> Self {
        Self {
            position,
            observations: Vec::new(),
        }
    }

    /// Clear observations and move the column to `position`, keeping the
    /// allocation.
    pub fn reset(&mut self, position: u32) {
        self.position = position;
        self.observations.clear();
    }

    /// Number of observations.
    pub fn depth(&self) -> usize {
        self.observations.len()
    }
}

/// Producer of pileup columns for a genomic interval.
///
/// Implementations must hand columns to `visitor` in increasing coordinate
/// order, once per covered coordinate, and stop at the first visitor error.
pub trait PileupSource {
    /// Visit each covered column of `contig` within `region` (0-based,
    /// half-open).
    fn visit_columns(
        &mut self,
        contig: &str,
        region: Range<u32>,
        visitor: &mut dyn FnMut(&PileupColumn) -> Result<()>,
    ) -> Result<()>;
}

/// Provider of reference bases.
pub trait ReferenceSource {
    /// Uppercase ASCII bases of `contig` over `region` (0-based, half-open).
    /// May return fewer bases than requested near the contig end.
    fn fetch(&self, contig: &str, region: Range<u32>) -> Result<Vec<u8>>;
}

/// Pileup source backed by reads held in memory.
#[derive(Debug, Clone)]
pub struct InMemoryPileup {
    reads: Arc<[AlignedRead]>,
}

impl InMemoryPileup {
    /// Build a source over `reads`.
    pub fn new(reads: Vec<AlignedRead>) -> Self {
        Self {
            reads: Arc::from(reads.into_boxed_slice()),
        }
    }

    fn build_columns(&self, contig: &str, region: &Range<u32>) -> Vec<PileupColumn> {
        if region.start >= region.end {
            return Vec::new();
        }

        let window_len = (region.end - region.start) as usize;
        let mut columns: Vec<PileupColumn> = (0..window_len)
            .map(|offset| PileupColumn::new(region.start + offset as u32))
            .collect();

        for read in self.reads.iter().filter(|read| read.chrom.as_ref() == contig) {
            let read_start = read.pos;
            let read_end = read.end();

            if read_end <= region.start || read_start >= region.end {
                continue;
            }

            let overlap_start = region.start.max(read_start);
            let overlap_end = region.end.min(read_end);

            for ref_pos in overlap_start..overlap_end {
                let Some(offset) = read.offset_at(ref_pos) else {
                    continue;
                };
                if let Some(base) = read.base_at(offset) {
                    let quality = read.quality_at(offset).unwrap_or(30);
                    columns[(ref_pos - region.start) as usize]
                        .observations
                        .push(BaseObservation {
                            sample: read.sample,
                            base,
                            quality,
                            mapq: read.mapq,
                            is_reverse: read.is_reverse,
                        });
                }
            }
        }

        columns.retain(|column| !column.observations.is_empty());
        columns
    }
}

impl PileupSource for InMemoryPileup {
    fn visit_columns(
        &mut self,
        contig: &str,
        region: Range<u32>,
        visitor: &mut dyn FnMut(&PileupColumn) -> Result<()>,
    ) -> Result<()> {
        for column in self.build_columns(contig, &region) {
            visitor(&column)?;
        }
        Ok(())
    }
}

/// Reference source backed by in-memory contig sequences.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReference {
    contigs: HashMap<String, Arc<[u8]>>,
}

impl InMemoryReference {
    /// Empty reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a contig.
    pub fn with_contig(mut self, name: impl Into<String>, sequence: &[u8]) -> Self {
        let upper: Vec<u8> = sequence.iter().map(u8::to_ascii_uppercase).collect();
        self.contigs.insert(name.into(), Arc::from(upper.into_boxed_slice()));
        self
    }

    /// Length of `contig`, if present.
    pub fn contig_length(&self, contig: &str) -> Option<u32> {
        self.contigs.get(contig).map(|seq| seq.len() as u32)
    }
}

impl ReferenceSource for InMemoryReference {
    fn fetch(&self, contig: &str, region: Range<u32>) -> Result<Vec<u8>> {
        let sequence = self
            .contigs
            .get(contig)
            .ok_or_else(|| PopSnpError::UnknownContig(contig.to_string()))?;
        let start = (region.start as usize).min(sequence.len());
        let end = (region.end as usize).min(sequence.len());
        Ok(sequence[start..end.max(start)].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{CigarOp, CigarOpKind};

    fn collect(source: &mut InMemoryPileup, region: Range<u32>) -> Vec<PileupColumn> {
        let mut columns = Vec::new();
        source
            .visit_columns("chr1", region, &mut |column| {
                columns.push(column.clone());
                Ok(())
            })
            .expect("pileup should succeed");
        columns
    }

    #[test]
    fn in_memory_pileup_groups_observations_by_position() {
        let reads = vec![
            AlignedRead::ungapped("chr1", 100, 60, 0, b"ACGT", 30),
            AlignedRead::ungapped("chr1", 101, 50, 1, b"CGTA", 25),
            AlignedRead::ungapped("chr2", 100, 60, 0, b"TTTT", 30),
        ];
        let mut source = InMemoryPileup::new(reads);
        let columns = collect(&mut source, 100..110);

        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].position, 100);
        assert_eq!(columns[0].depth(), 1);
        assert_eq!(columns[1].depth(), 2);
        assert_eq!(columns[1].observations[1].sample, 1);
        assert_eq!(columns[1].observations[1].mapq, 50);
        assert_eq!(columns[4].position, 104);
    }

    #[test]
    fn deletions_do_not_contribute_observations() {
        let read = AlignedRead::new(
            "chr1",
            10,
            60,
            0,
            vec![
                CigarOp::new(CigarOpKind::Match, 2),
                CigarOp::new(CigarOpKind::Deletion, 1),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"ACGT".to_vec(),
            vec![30; 4],
            true,
        );
        let mut source = InMemoryPileup::new(vec![read]);
        let positions: Vec<u32> = collect(&mut source, 0..20)
            .iter()
            .map(|column| column.position)
            .collect();
        assert_eq!(positions, vec![10, 11, 13, 14]);
    }

    #[test]
    fn in_memory_reference_clamps_to_contig_end() {
        let reference = InMemoryReference::new().with_contig("chr1", b"acgtacgt");
        assert_eq!(reference.fetch("chr1", 2..5).unwrap(), b"GTA".to_vec());
        assert_eq!(reference.fetch("chr1", 6..12).unwrap(), b"GT".to_vec());
        assert!(reference.fetch("chrX", 0..1).is_err());
    }
}
