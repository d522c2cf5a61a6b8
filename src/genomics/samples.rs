use std::collections::HashMap;

use crate::{PopSnpError, Result};

/// Largest number of samples or populations a `u64` mask can hold.
pub const MAX_MEMBERS: usize = 64;

/// Population assigned to samples whose read group has no `PO` field.
pub const DEFAULT_POPULATION: &str = "default";

/// Named group of samples.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Population {
    /// Population name.
    pub name: String,
    /// Member samples (bit `i` = sample `i`).
    pub mask: u64,
    /// Number of members.
    pub size: usize,
}

impl Population {
    /// Population over the samples in `mask`.
    pub fn new(name: impl Into<String>, mask: u64) -> Self {
        Self {
            name: name.into(),
            mask,
            size: mask.count_ones() as usize,
        }
    }
}

/// Samples, their populations, and the read groups that map onto them.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    names: Vec<String>,
    populations: Vec<Population>,
    read_groups: HashMap<String, usize>,
}

impl SampleSet {
    /// Build from `(sample, population)` pairs. Each sample also becomes a
    /// read group of the same name. Repeated samples keep their first
    /// population.
    pub fn from_assignments<I, S, P>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<String>,
    {
        let mut set = Self::default();
        for (sample, population) in assignments {
            let sample = sample.into();
            let idx = set.add_sample(&sample, &population.into())?;
            set.read_groups.insert(sample, idx);
        }
        Ok(set)
    }

    /// Build from the `@RG` lines of SAM header text (`ID`, `SM`, `PO`).
    pub fn from_header_text(text: &str) -> Result<Self> {
        let mut set = Self::default();
        for line in text.lines().filter(|line| line.starts_with("@RG")) {
            let mut id = None;
            let mut sample = None;
            let mut population = None;
            for field in line.split('\t').skip(1) {
                if let Some(value) = field.strip_prefix("ID:") {
                    id = Some(value);
                } else if let Some(value) = field.strip_prefix("SM:") {
                    sample = Some(value);
                } else if let Some(value) = field.strip_prefix("PO:") {
                    population = Some(value);
                }
            }
            let Some(id) = id else {
                return Err(PopSnpError::Config(format!(
                    "read group without ID in header line '{line}'"
                )));
            };
            let sample = sample.unwrap_or(id);
            let idx = set.add_sample(sample, population.unwrap_or(DEFAULT_POPULATION))?;
            set.read_groups.insert(id.to_string(), idx);
        }
        if set.names.is_empty() {
            return Err(PopSnpError::Config(
                "header declares no @RG read groups".to_string(),
            ));
        }
        Ok(set)
    }

    fn add_sample(&mut self, sample: &str, population: &str) -> Result<usize> {
        if let Some(idx) = self.index_of(sample) {
            return Ok(idx);
        }
        let idx = self.names.len();
        if idx >= MAX_MEMBERS {
            return Err(PopSnpError::TooManySamples(idx + 1));
        }
        self.names.push(sample.to_string());

        match self.populations.iter_mut().find(|pop| pop.name == population) {
            Some(pop) => {
                pop.mask |= 1 << idx;
                pop.size += 1;
            }
            None => {
                if self.populations.len() >= MAX_MEMBERS {
                    return Err(PopSnpError::TooManyPopulations(self.populations.len() + 1));
                }
                self.populations.push(Population::new(population, 1 << idx));
            }
        }
        Ok(idx)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` when no samples are known.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sample names in index order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Index of the sample called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Sample that read group `id` belongs to.
    pub fn sample_for_read_group(&self, id: &str) -> Option<usize> {
        self.read_groups.get(id).copied()
    }

    /// Read group to sample index map.
    pub fn read_groups(&self) -> &HashMap<String, usize> {
        &self.read_groups
    }

    /// Populations in first-appearance order.
    pub fn populations(&self) -> &[Population] {
        &self.populations
    }
}
