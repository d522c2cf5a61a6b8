use std::io::Write;

use crate::genomics::types::decode_base;
use crate::genomics::{SampleSet, SiteRow, WindowContext};
use crate::{PopSnpError, Result};

/// Seed line written under the MS header.
pub const MS_SEED: &str = "1350154902";

/// Report layout, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum OutputFormat {
    /// One line per site with every sample's call.
    #[default]
    Tabular,
    /// One line per site with per-population allele counts.
    Frequency,
    /// Binary haplotype matrix in `ms` simulator layout.
    Ms,
}

impl OutputFormat {
    /// Parse the numeric code used on the command line (0, 1 or 2).
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Self::Tabular),
            1 => Ok(Self::Frequency),
            2 => Ok(Self::Ms),
            other => Err(PopSnpError::Config(format!(
                "output format {other} is not one of 0, 1, 2"
            ))),
        }
    }

    /// Numeric code of the format.
    pub fn code(self) -> u8 {
        match self {
            Self::Tabular => 0,
            Self::Frequency => 1,
            Self::Ms => 2,
        }
    }

    /// Write the once-per-run preamble. Only the MS layout has one.
    pub fn write_header<W: Write>(
        self,
        writer: &mut W,
        samples: &SampleSet,
        num_windows: usize,
    ) -> Result<()> {
        if self == Self::Ms {
            write_ms_header(writer, samples, num_windows)?;
        }
        Ok(())
    }

    /// Render the segregating sites of `window`.
    pub fn render<W: Write>(
        self,
        writer: &mut W,
        window: &WindowContext,
        context: &RenderContext<'_>,
    ) -> Result<()> {
        match self {
            Self::Tabular => write_tabular(writer, window),
            Self::Frequency => write_frequency(writer, window, context),
            Self::Ms => write_ms(writer, window, context),
        }
    }
}

/// Run-wide information the renderers need besides the window itself.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Samples and populations of the run.
    pub samples: &'a SampleSet,
    /// Index of the outgroup sample used to polarize alleles.
    pub outgroup: Option<usize>,
}

impl<'a> RenderContext<'a> {
    /// Context without polarization.
    pub fn new(samples: &'a SampleSet) -> Self {
        Self {
            samples,
            outgroup: None,
        }
    }

    /// Polarize against `outgroup`.
    pub fn with_outgroup(mut self, outgroup: Option<usize>) -> Self {
        self.outgroup = outgroup;
        self
    }

    /// Whether alleles at `row` are reported relative to the outgroup's
    /// variant allele.
    pub fn flips(&self, row: &SiteRow) -> bool {
        self.outgroup
            .map_or(false, |outgroup| row.site_type.contains(outgroup))
    }
}

/// Write `ms <n> <windows> -t 5.0[ -I <npops> <sizes>...]`, the seed line and
/// a blank line.
pub fn write_ms_header<W: Write>(
    writer: &mut W,
    samples: &SampleSet,
    num_windows: usize,
) -> Result<()> {
    write!(writer, "ms {} {} -t 5.0", samples.len(), num_windows)?;
    let populations = samples.populations();
    if populations.len() > 1 {
        write!(writer, " -I {}", populations.len())?;
        for population in populations {
            write!(writer, " {}", population.size)?;
        }
    }
    writeln!(writer)?;
    writeln!(writer, "{MS_SEED}")?;
    writeln!(writer)?;
    Ok(())
}

fn write_tabular<W: Write>(writer: &mut W, window: &WindowContext) -> Result<()> {
    let matrix = window.matrix();
    for (site, row) in matrix.rows().iter().enumerate() {
        write!(
            writer,
            "{}\t{}\t{}",
            window.contig(),
            row.position + 1,
            decode_base(row.reference) as char
        )?;
        for sample in 0..matrix.num_samples() {
            let track = matrix.sample(sample);
            write!(
                writer,
                "\t{}\t{}\t{}\t{}",
                decode_base(track.bases()[site]) as char,
                track.snp_quality()[site],
                track.rms()[site],
                track.depth()[site]
            )?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_frequency<W: Write>(
    writer: &mut W,
    window: &WindowContext,
    context: &RenderContext<'_>,
) -> Result<()> {
    let matrix = window.matrix();
    let populations = context.samples.populations();
    for (site, row) in matrix.rows().iter().enumerate() {
        write!(writer, "{}\t{}", window.contig(), row.position + 1)?;
        let flip = context.flips(row);
        for (pop, population) in populations.iter().enumerate() {
            let covered = matrix.population_covered(site, pop);
            let variants =
                (row.site_type.bits() & row.covered_samples & population.mask).count_ones();
            let count = if flip {
                covered.saturating_sub(variants)
            } else {
                variants
            };
            write!(writer, "\t{count}\t{covered}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn write_ms<W: Write>(
    writer: &mut W,
    window: &WindowContext,
    context: &RenderContext<'_>,
) -> Result<()> {
    let matrix = window.matrix();
    let span = f64::from(window.len().max(1));

    writeln!(writer, "//")?;
    writeln!(writer, "segsites: {}", matrix.segsites())?;
    write!(writer, "positions:")?;
    for row in matrix.rows() {
        let relative = f64::from(row.position - window.start()) / span;
        write!(writer, " {relative:.8}")?;
    }
    writeln!(writer)?;

    let flips: Vec<bool> = matrix.rows().iter().map(|row| context.flips(row)).collect();
    let mut line = String::with_capacity(matrix.segsites() + 1);
    for sample in 0..matrix.num_samples() {
        line.clear();
        let bits = matrix.sample(sample).variants();
        for (bit, flip) in bits.iter().by_vals().zip(&flips) {
            line.push(if bit != *flip { '1' } else { '0' });
        }
        writeln!(writer, "{line}")?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Render one window into a string (useful for tests and snapshots).
pub fn render_to_string(
    format: OutputFormat,
    window: &WindowContext,
    context: &RenderContext<'_>,
) -> Result<String> {
    let mut buffer = Vec::new();
    format.render(&mut buffer, window, context)?;
    String::from_utf8(buffer)
        .map_err(|_| PopSnpError::Config("rendered output is not valid UTF-8".to_string()))
}
