use std::io::Write;
use std::ops::Range;

use tracing::{debug, info, warn};

use crate::genomics::error_model::{DependencyErrorModel, ErrorModel, DEFAULT_HET_PRIOR};
use crate::genomics::region::tile_windows;
use crate::genomics::{
    CallFilters, GenotypeCaller, PileupSource, ReferenceSource, RenderContext, SampleSet,
    SiteProcessor, SiteThresholds, WindowContext,
};
use crate::{PopSnpError, Result, SnpConfig};

/// Totals over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct RunSummary {
    /// Windows processed.
    pub windows: usize,
    /// In-window pileup columns seen.
    pub sites_visited: u64,
    /// Columns where at least one population was covered.
    pub sites_covered: u64,
    /// Segregating sites reported.
    pub segregating_sites: u64,
}

/// Drives windows of a region through site processing and rendering.
#[derive(Debug)]
pub struct PopulationSnpCaller<M = DependencyErrorModel> {
    config: SnpConfig,
    samples: SampleSet,
    outgroup: Option<usize>,
    sites: SiteProcessor<M>,
}

impl PopulationSnpCaller<DependencyErrorModel> {
    /// Caller with the default error model and the configured heterozygote
    /// prior.
    pub fn new(config: SnpConfig, samples: SampleSet) -> Result<Self> {
        let model =
            DependencyErrorModel::with_het_prior(config.het_prior.unwrap_or(DEFAULT_HET_PRIOR));
        Self::with_model(config, samples, model)
    }
}

impl<M: ErrorModel> PopulationSnpCaller<M> {
    /// Caller with a custom error model.
    pub fn with_model(config: SnpConfig, samples: SampleSet, model: M) -> Result<Self> {
        config.validate()?;
        if samples.is_empty() {
            return Err(PopSnpError::Config("no samples to call".to_string()));
        }
        let outgroup = match &config.outgroup {
            Some(name) => Some(
                samples
                    .index_of(name)
                    .ok_or_else(|| PopSnpError::UnknownOutgroup(name.clone()))?,
            ),
            None => None,
        };

        let filters = CallFilters {
            min_map_quality: config.min_map_quality,
            min_base_quality: config.min_base_quality,
            illumina_qualities: config.illumina_qualities,
        };
        let sites = SiteProcessor::new(
            GenotypeCaller::new(model, filters),
            SiteThresholds::from(&config),
            &samples,
        );
        Ok(Self {
            config,
            samples,
            outgroup,
            sites,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &SnpConfig {
        &self.config
    }

    /// Samples of the run.
    pub fn samples(&self) -> &SampleSet {
        &self.samples
    }

    /// Index of the outgroup sample.
    pub fn outgroup(&self) -> Option<usize> {
        self.outgroup
    }

    /// Windows `region` is split into under the configured window size.
    pub fn windows(&self, region: Range<u32>) -> Vec<Range<u32>> {
        let size = self
            .config
            .window_size
            .map(|kb| kb.saturating_mul(1000));
        tile_windows(region, size)
    }

    /// Call every window of `region` on `contig` and render it to `out`.
    pub fn run<P, R, W>(
        &mut self,
        pileup: &mut P,
        reference: &R,
        contig: &str,
        region: Range<u32>,
        out: &mut W,
    ) -> Result<RunSummary>
    where
        P: PileupSource + ?Sized,
        R: ReferenceSource + ?Sized,
        W: Write,
    {
        let windows = self.windows(region);
        let format = self.config.output;
        format.write_header(out, &self.samples, windows.len())?;

        let mut summary = RunSummary::default();
        for window in windows {
            info!(contig, start = window.start, end = window.end, "processing window");
            let context = self.call_window(pileup, reference, contig, window)?;

            let render = RenderContext::new(&self.samples).with_outgroup(self.outgroup);
            format.render(out, &context, &render)?;

            let segsites = context.matrix().segsites();
            debug!(
                contig,
                start = context.start(),
                visited = context.sites_visited(),
                covered = context.sites_covered(),
                segsites,
                "window finished"
            );
            summary.windows += 1;
            summary.sites_visited += context.sites_visited();
            summary.sites_covered += context.sites_covered();
            summary.segregating_sites += segsites as u64;
        }
        out.flush()?;
        debug!(?summary, "run finished");
        Ok(summary)
    }

    /// Process the columns of one window.
    pub fn call_window<P, R>(
        &mut self,
        pileup: &mut P,
        reference: &R,
        contig: &str,
        window: Range<u32>,
    ) -> Result<WindowContext>
    where
        P: PileupSource + ?Sized,
        R: ReferenceSource + ?Sized,
    {
        let bases = reference.fetch(contig, window.clone())?;
        if bases.len() < window.len() {
            warn!(
                contig,
                requested = window.len(),
                fetched = bases.len(),
                "reference shorter than window; missing bases are treated as N"
            );
        }

        let mut context = self.sites.open_window(contig, window.clone())?;
        let sites = &mut self.sites;
        pileup.visit_columns(contig, window.clone(), &mut |column| {
            let base = column
                .position
                .checked_sub(window.start)
                .and_then(|offset| bases.get(offset as usize).copied())
                .unwrap_or(b'N');
            context.process_site(sites, column, base)?;
            Ok(())
        })?;
        Ok(context)
    }
}
