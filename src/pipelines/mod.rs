//! Per-location preprocessing pipelines.
//!
//! Each location publishes its data differently, so each gets its own
//! [`Pipeline`] that maps raw exports into a [`PopulationTable`] and a list of
//! facilities. Writing the two output files is shared.

pub mod chicago;
pub mod santa_clara;

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

use crate::output::{write_facilities, write_population};
use crate::records::{FacilityRecord, PopulationTable};

pub use chicago::Chicago;
pub use santa_clara::SantaClara;

/// Everything a pipeline extracted from its sources in one run.
#[derive(Debug, Default)]
pub struct Extract {
    pub population: PopulationTable,
    pub facilities: Vec<FacilityRecord>,
}

/// Supported data source locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Chicago,
    SantaClara,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Chicago => write!(f, "chicago"),
            Location::SantaClara => write!(f, "santa_clara"),
        }
    }
}

pub trait Pipeline {
    fn location(&self) -> Location;

    /// Reads every source file and builds the in-memory records.
    fn collect(&self) -> Result<Extract>;

    /// Runs the pipeline and writes the population and facility outputs.
    #[tracing::instrument(skip(self), fields(location = %self.location()))]
    fn process(&self, population_output: &Path, facility_output: &Path) -> Result<()> {
        info!("Starting pipeline");

        let extract = self
            .collect()
            .with_context(|| format!("{} pipeline failed", self.location()))?;
        if extract.population.is_empty() {
            warn!("No regions found in the primary source");
        }

        let regions = write_population(population_output, extract.population.iter())?;
        let facilities = write_facilities(facility_output, &extract.facilities)?;

        info!(regions, facilities, "Pipeline finished");
        Ok(())
    }
}
