//! Fixed-layout per-sample call record.
//!
//! ```text
//! bits 63..48  RMS mapping quality
//! bits 47..32  SNP (call) quality
//! bits 31..16  read depth
//! bits 15..8   4-bit base code of the call
//! bits  7..0   flags (bit 0 = variant, bit 1 = heterozygous)
//! ```

const RMS_SHIFT: u32 = 48;
const SNP_QUALITY_SHIFT: u32 = 32;
const DEPTH_SHIFT: u32 = 16;
const BASE_SHIFT: u32 = 8;

/// One sample's call at one site, packed into a single `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct PackedCall(u64);

impl PackedCall {
    /// Flag: the call differs from the reference allele.
    pub const VARIANT: u8 = 0x01;
    /// Flag: the call is heterozygous.
    pub const HETEROZYGOUS: u8 = 0x02;
    /// Sentinel for a sample without reads at the site.
    pub const NO_CALL: PackedCall = PackedCall(0);

    /// Pack the four fields.
    pub fn new(rms_mapq: u16, snp_quality: u16, depth: u16, base: u8, flags: u8) -> Self {
        Self(
            (u64::from(rms_mapq) << RMS_SHIFT)
                | (u64::from(snp_quality) << SNP_QUALITY_SHIFT)
                | (u64::from(depth) << DEPTH_SHIFT)
                | (u64::from(base) << BASE_SHIFT)
                | u64::from(flags),
        )
    }

    /// Wrap raw bits.
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Root-mean-square mapping quality of the sample's reads.
    pub fn rms_mapq(self) -> u16 {
        (self.0 >> RMS_SHIFT) as u16
    }

    /// Call quality.
    pub fn snp_quality(self) -> u16 {
        (self.0 >> SNP_QUALITY_SHIFT) as u16
    }

    /// Reads supporting the call.
    pub fn depth(self) -> u16 {
        (self.0 >> DEPTH_SHIFT) as u16
    }

    /// 4-bit base code of the call.
    pub fn base(self) -> u8 {
        (self.0 >> BASE_SHIFT) as u8
    }

    /// Flag byte.
    pub fn flags(self) -> u8 {
        self.0 as u8
    }

    /// Variant flag.
    pub fn is_variant(self) -> bool {
        self.flags() & Self::VARIANT != 0
    }

    /// Heterozygous flag.
    pub fn is_heterozygous(self) -> bool {
        self.flags() & Self::HETEROZYGOUS != 0
    }

    /// Whether this is the no-call sentinel.
    pub fn is_no_call(self) -> bool {
        self.0 == 0
    }

    /// Copy with the base code replaced.
    pub fn with_base(self, base: u8) -> Self {
        Self((self.0 & !(0xff << BASE_SHIFT)) | (u64::from(base) << BASE_SHIFT))
    }

    /// Copy with the flag byte replaced.
    pub fn with_flags(self, flags: u8) -> Self {
        Self((self.0 & !0xff) | u64::from(flags))
    }
}
