use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use popsnp::genomics::{
    io::read_header_override, BamPileupSource, FastaReference, OutputFormat,
    PopulationSnpCaller, Region, SampleSet,
};
use popsnp::SnpConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "popsnp", about = "Population genetics SNP calling from BAM pileups")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call segregating sites across samples and populations.
    Snp(SnpArgs),
}

#[derive(Args, Debug)]
struct SnpArgs {
    /// Indexed, coordinate-sorted BAM file.
    bam: PathBuf,
    /// Target region (`chr`, `chr:start` or `chr:start-end`, 1-based).
    region: String,
    /// Indexed reference FASTA.
    #[arg(short = 'f', long = "reference")]
    reference: PathBuf,
    /// SAM header file replacing the BAM header's read groups.
    #[arg(long = "header")]
    header: Option<PathBuf>,
    /// Minimum read depth of a covered sample.
    #[arg(short = 'm', long = "min-depth", default_value_t = 3)]
    min_depth: u16,
    /// Maximum read depth of a covered sample.
    #[arg(short = 'x', long = "max-depth", default_value_t = 255)]
    max_depth: u16,
    /// Minimum RMS mapping quality of a covered sample.
    #[arg(short = 'q', long = "min-rms", default_value_t = 25)]
    min_rms: u16,
    /// Minimum SNP quality of a variant call.
    #[arg(short = 's', long = "min-snpq", default_value_t = 25)]
    min_snpq: u16,
    /// Minimum mapping quality of a contributing read.
    #[arg(short = 'a', long = "min-mapq", default_value_t = 13)]
    min_mapq: u8,
    /// Minimum base quality of a contributing base.
    #[arg(short = 'b', long = "min-baseq", default_value_t = 13)]
    min_baseq: u8,
    /// Output format: 0 tabular, 1 population frequency, 2 ms.
    #[arg(short = 'o', long = "output", default_value_t = 0)]
    output: u8,
    /// Report heterozygotes, using this heterozygote prior.
    #[arg(short = 'z', long = "het-prior")]
    het_prior: Option<f64>,
    /// Outgroup sample used to polarize alleles.
    #[arg(short = 'p', long = "outgroup")]
    outgroup: Option<String>,
    /// Minimum fraction of each population that must be covered.
    #[arg(short = 'n', long = "min-pop", default_value_t = 1.0)]
    min_pop: f64,
    /// Window size in kilobases.
    #[arg(short = 'w', long = "window")]
    window: Option<u32>,
    /// Base qualities use the Illumina 1.3+ encoding.
    #[arg(short = 'i', long = "illumina")]
    illumina: bool,
}

impl SnpArgs {
    fn config(&self) -> Result<SnpConfig> {
        let config = SnpConfig {
            min_depth: self.min_depth,
            max_depth: self.max_depth,
            min_rms_quality: self.min_rms,
            min_snp_quality: self.min_snpq,
            min_map_quality: self.min_mapq,
            min_base_quality: self.min_baseq,
            output: OutputFormat::from_code(self.output)?,
            het_prior: self.het_prior,
            outgroup: self.outgroup.clone(),
            min_pop_fraction: self.min_pop,
            window_size: self.window,
            illumina_qualities: self.illumina,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Snp(args) => run_snp(args)?,
    }
    Ok(())
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    if !path.is_file() {
        bail!("{what} {} does not exist", path.display());
    }
    Ok(())
}

fn run_snp(args: SnpArgs) -> Result<()> {
    let config = args.config().context("invalid options")?;

    require_file(&args.bam, "alignment file")?;
    require_file(&args.reference, "reference file")?;
    if let Some(header) = &args.header {
        require_file(header, "header file")?;
    }

    let mut pileup = BamPileupSource::open(&args.bam)
        .with_context(|| format!("failed to open {}", args.bam.display()))?;
    let reference = FastaReference::open(&args.reference)
        .with_context(|| format!("failed to open {}", args.reference.display()))?;

    let header_text = match &args.header {
        Some(path) => read_header_override(path)
            .with_context(|| format!("failed to read header {}", path.display()))?,
        None => pileup.header_text(),
    };
    let samples = SampleSet::from_header_text(&header_text).context("failed to load samples")?;
    pileup.set_samples(&samples);
    info!(
        samples = samples.len(),
        populations = samples.populations().len(),
        "loaded read groups"
    );

    let region =
        Region::parse_with_contigs(&args.region, |name| pileup.contig_length(name).is_ok())
            .with_context(|| format!("bad region string '{}'", args.region))?;
    let contig_length = pileup
        .contig_length(&region.contig)
        .with_context(|| format!("region {region} names an unknown contig"))?;
    let range = region.resolve(contig_length)?;

    let mut caller = PopulationSnpCaller::new(config, samples)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = caller
        .run(&mut pileup, &reference, &region.contig, range, &mut out)
        .with_context(|| format!("failed to call region {region}"))?;

    info!(
        windows = summary.windows,
        segregating = summary.segregating_sites,
        covered = summary.sites_covered,
        "finished"
    );
    Ok(())
}
