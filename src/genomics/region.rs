//! Region strings and window tiling.

use std::fmt;
use std::ops::Range;

use crate::{PopSnpError, Result};

/// Target region as written on the command line.
///
/// Accepts `contig`, `contig:start` and `contig:start-end` with 1-based,
/// inclusive coordinates; commas inside numbers are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Contig name.
    pub contig: String,
    /// 1-based first base, if given.
    pub start: Option<u64>,
    /// 1-based last base, if given.
    pub end: Option<u64>,
}

impl Region {
    /// Parse a region string without knowledge of the contig names.
    ///
    /// The text after the last `:` is always read as the coordinate span, so
    /// a contig whose name contains `:` needs [`Region::parse_with_contigs`].
    pub fn parse(text: &str) -> Result<Self> {
        Self::parse_with_contigs(text, |_| false)
    }

    /// Parse a region string, taking the whole text as a contig name when
    /// `is_contig` accepts it.
    pub fn parse_with_contigs(text: &str, is_contig: impl Fn(&str) -> bool) -> Result<Self> {
        let text = text.trim();
        if !text.is_empty() && is_contig(text) {
            return Ok(Self {
                contig: text.to_string(),
                start: None,
                end: None,
            });
        }
        let bad = || PopSnpError::Region(text.to_string());

        let (contig, span) = match text.rsplit_once(':') {
            Some((contig, span)) => (contig, Some(span)),
            None => (text, None),
        };
        if contig.is_empty() {
            return Err(bad());
        }

        let (start, end) = match span {
            None => (None, None),
            Some(span) => {
                let (start, end) = match span.split_once('-') {
                    Some((start, end)) => (start, Some(end)),
                    None => (span, None),
                };
                let start = parse_coordinate(start).ok_or_else(bad)?;
                let end = match end {
                    Some(end) => Some(parse_coordinate(end).ok_or_else(bad)?),
                    None => None,
                };
                (Some(start), end)
            }
        };

        if start == Some(0) || matches!((start, end), (Some(s), Some(e)) if e < s) {
            return Err(bad());
        }

        Ok(Self {
            contig: contig.to_string(),
            start,
            end,
        })
    }

    /// 0-based half-open range clamped to a contig of `contig_length` bases.
    pub fn resolve(&self, contig_length: u32) -> Result<Range<u32>> {
        let length = u64::from(contig_length);
        let start = self.start.map_or(0, |start| start - 1).min(length);
        let end = self.end.unwrap_or(length).min(length);
        if start >= end {
            return Err(PopSnpError::Region(format!(
                "{self} is empty on a contig of {contig_length} bases"
            )));
        }
        Ok(start as u32..end as u32)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contig)?;
        if let Some(start) = self.start {
            write!(f, ":{start}")?;
            if let Some(end) = self.end {
                write!(f, "-{end}")?;
            }
        }
        Ok(())
    }
}

fn parse_coordinate(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Split `region` into windows of `window_size` bases; the last window stops
/// at the region end. `None` yields the whole region as one window.
pub fn tile_windows(region: Range<u32>, window_size: Option<u32>) -> Vec<Range<u32>> {
    let Some(size) = window_size.filter(|size| *size > 0) else {
        return vec![region];
    };
    let mut windows = Vec::with_capacity(region.len().div_ceil(size as usize));
    let mut start = region.start;
    while start < region.end {
        let end = start.saturating_add(size).min(region.end);
        windows.push(start..end);
        start = end;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("chr1" => (None, None))]
    #[test_case("chr1:100" => (Some(100), None))]
    #[test_case("chr1:1,000-2,000" => (Some(1000), Some(2000)))]
    #[test_case("HLA:A*01:01:5-9" => (Some(5), Some(9)))]
    fn parses_region_forms(text: &str) -> (Option<u64>, Option<u64>) {
        let region = Region::parse(text).expect("valid region");
        (region.start, region.end)
    }

    #[test]
    fn known_contig_with_colons_is_taken_whole() {
        let known = |name: &str| name == "HLA-A*01:01:01";

        let whole = Region::parse_with_contigs("HLA-A*01:01:01", known).unwrap();
        assert_eq!(whole.contig, "HLA-A*01:01:01");
        assert_eq!((whole.start, whole.end), (None, None));

        let spanned = Region::parse_with_contigs("HLA-A*01:01:01:5-9", known).unwrap();
        assert_eq!(spanned.contig, "HLA-A*01:01:01");
        assert_eq!((spanned.start, spanned.end), (Some(5), Some(9)));

        let unknown = Region::parse("HLA-A*01:01:01").unwrap();
        assert_eq!(unknown.contig, "HLA-A*01:01");
        assert_eq!(unknown.start, Some(1));
    }

    #[test_case(""; "empty")]
    #[test_case(":10-20"; "no contig")]
    #[test_case("chr1:abc"; "non numeric")]
    #[test_case("chr1:0-10"; "zero start")]
    #[test_case("chr1:20-10"; "reversed")]
    #[test_case("chr1:10-"; "missing end")]
    fn rejects_malformed_regions(text: &str) {
        assert!(matches!(Region::parse(text), Err(PopSnpError::Region(_))));
    }

    #[test]
    fn resolves_to_half_open_and_clamps() {
        let region = Region::parse("chr1:101-200").unwrap();
        assert_eq!(region.resolve(1000).unwrap(), 100..200);
        assert_eq!(region.resolve(150).unwrap(), 100..150);
        assert!(region.resolve(50).is_err());
        assert_eq!(Region::parse("chr1").unwrap().resolve(42).unwrap(), 0..42);
    }

    #[test]
    fn windows_tile_the_region() {
        assert_eq!(tile_windows(0..2500, Some(1000)), vec![0..1000, 1000..2000, 2000..2500]);
        assert_eq!(tile_windows(100..200, Some(1000)), vec![100..200]);
        assert_eq!(tile_windows(100..200, None), vec![100..200]);
    }
}
