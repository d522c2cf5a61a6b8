use std::sync::Arc;

/// Decoding table for 4-bit nucleotide codes.
pub const NT16_ALPHABET: &[u8; 16] = b"=ACMGRSVTWYHKDBN";
/// Code used for an unknown or fully ambiguous base.
pub const NT16_N: u8 = 15;

/// Encode an ASCII base (IUPAC codes included) as a 4-bit code.
///
/// A=1, C=2, G=4, T=8; ambiguity codes are the bitwise OR of the bases they
/// stand for. Unrecognised bytes map to `N`.
pub fn encode_base(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'=' => 0,
        b'A' => 1,
        b'C' => 2,
        b'M' => 3,
        b'G' => 4,
        b'R' => 5,
        b'S' => 6,
        b'V' => 7,
        b'T' | b'U' => 8,
        b'W' => 9,
        b'Y' => 10,
        b'H' => 11,
        b'K' => 12,
        b'D' => 13,
        b'B' => 14,
        _ => NT16_N,
    }
}

/// Decode a 4-bit code back to its ASCII base.
pub fn decode_base(code: u8) -> u8 {
    NT16_ALPHABET[(code & 0x0f) as usize]
}

/// Whether `code` names exactly one of A, C, G, T.
pub fn is_unambiguous(code: u8) -> bool {
    matches!(code, 1 | 2 | 4 | 8)
}

/// Index (0..4) of an unambiguous base code, in A, C, G, T order.
pub fn base_index(code: u8) -> Option<usize> {
    match code {
        1 => Some(0),
        2 => Some(1),
        4 => Some(2),
        8 => Some(3),
        _ => None,
    }
}

/// Simple CIGAR operation kinds describing how a read aligns to the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    /// Consuming match/mismatch.
    Match,
    /// Insertion relative to the reference.
    Insertion,
    /// Deletion relative to the reference.
    Deletion,
    /// Skipped reference region (spliced alignment).
    Skip,
    /// Soft clipping (sequence present in read only).
    SoftClip,
    /// Hard clipping (trimmed sequence not present in read).
    HardClip,
}

impl CigarOpKind {
    fn consumes_read(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match | CigarOpKind::Insertion | CigarOpKind::SoftClip
        )
    }

    fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOpKind::Match | CigarOpKind::Deletion | CigarOpKind::Skip
        )
    }
}

/// CIGAR operation with length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    /// Operation kind.
    pub kind: CigarOpKind,
    /// Number of bases affected by the operation.
    pub len: u32,
}

impl CigarOp {
    /// Construct a new CIGAR operation.
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Aligned read with sequence, quality and sample information.
#[derive(Debug, Clone)]
pub struct AlignedRead {
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 0-based leftmost reference coordinate.
    pub pos: u32,
    /// Mapping quality (Phred-scaled).
    pub mapq: u8,
    /// Index of the sample the read belongs to.
    pub sample: usize,
    /// CIGAR describing the alignment.
    pub cigar: Vec<CigarOp>,
    /// Read sequence stored as uppercase ASCII.
    pub sequence: Arc<[u8]>,
    /// Per-base quality scores in Phred space.
    pub qualities: Arc<[u8]>,
    /// Whether the read maps to the reverse complement strand.
    pub is_reverse: bool,
}

impl AlignedRead {
    /// Construct a new aligned read wrapper.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chrom: impl Into<Arc<str>>,
        pos: u32,
        mapq: u8,
        sample: usize,
        cigar: Vec<CigarOp>,
        sequence: impl Into<Arc<[u8]>>,
        qualities: impl Into<Arc<[u8]>>,
        is_reverse: bool,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            mapq,
            sample,
            cigar,
            sequence: sequence.into(),
            qualities: qualities.into(),
            is_reverse,
        }
    }

    /// Ungapped read: a single match operation covering the whole sequence.
    pub fn ungapped(
        chrom: impl Into<Arc<str>>,
        pos: u32,
        mapq: u8,
        sample: usize,
        sequence: &[u8],
        quality: u8,
    ) -> Self {
        Self::new(
            chrom,
            pos,
            mapq,
            sample,
            vec![CigarOp::new(CigarOpKind::Match, sequence.len() as u32)],
            sequence.to_vec(),
            vec![quality; sequence.len()],
            false,
        )
    }

    /// Read length inferred from the sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` when the read carries no bases.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// End position (half-open) on the reference.
    pub fn end(&self) -> u32 {
        let span: u32 = self
            .cigar
            .iter()
            .filter(|op| op.kind.consumes_reference())
            .map(|op| op.len)
            .sum();
        self.pos + span
    }

    /// Read offset aligned to reference position `ref_pos`, if a base of the
    /// read sits there (deletions and skips yield `None`).
    pub fn offset_at(&self, ref_pos: u32) -> Option<usize> {
        if ref_pos < self.pos {
            return None;
        }
        let mut ref_cursor = self.pos;
        let mut read_cursor = 0usize;
        for op in &self.cigar {
            let consumes_ref = op.kind.consumes_reference();
            let consumes_read = op.kind.consumes_read();
            if consumes_ref && ref_pos < ref_cursor + op.len {
                return consumes_read.then(|| read_cursor + (ref_pos - ref_cursor) as usize);
            }
            if consumes_ref {
                ref_cursor += op.len;
            }
            if consumes_read {
                read_cursor += op.len as usize;
            }
        }
        None
    }

    /// Base at the provided read offset.
    pub fn base_at(&self, offset: usize) -> Option<u8> {
        self.sequence.get(offset).copied()
    }

    /// Quality score at the provided read offset.
    pub fn quality_at(&self, offset: usize) -> Option<u8> {
        self.qualities.get(offset).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nucleotide_codes_round_trip() {
        for &base in NT16_ALPHABET.iter() {
            assert_eq!(decode_base(encode_base(base)), base);
        }
        assert_eq!(encode_base(b'g'), 4);
        assert_eq!(encode_base(b'?'), NT16_N);
        assert_eq!(encode_base(b'A') | encode_base(b'G'), encode_base(b'R'));
    }

    #[test]
    fn offsets_follow_cigar() {
        let read = AlignedRead::new(
            "chr1",
            100,
            60,
            0,
            vec![
                CigarOp::new(CigarOpKind::SoftClip, 2),
                CigarOp::new(CigarOpKind::Match, 3),
                CigarOp::new(CigarOpKind::Deletion, 2),
                CigarOp::new(CigarOpKind::Insertion, 1),
                CigarOp::new(CigarOpKind::Match, 2),
            ],
            b"NNACGTCA".to_vec(),
            vec![30; 8],
            false,
        );
        assert_eq!(read.end(), 107);
        assert_eq!(read.offset_at(99), None);
        assert_eq!(read.offset_at(100), Some(2));
        assert_eq!(read.offset_at(102), Some(4));
        assert_eq!(read.offset_at(103), None);
        assert_eq!(read.offset_at(105), Some(6));
        assert_eq!(read.offset_at(106), Some(7));
        assert_eq!(read.offset_at(107), None);
    }
}
