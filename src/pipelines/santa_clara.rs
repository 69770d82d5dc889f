//! Santa Clara: census-tract keyed geography, vaccination and ADI exports.
//!
//! Tract ids are 11-digit GEOIDs (state, county, tract). They are compared as
//! integers, so a GEOID whose leading state zero was dropped by a spreadsheet
//! still matches. Block group GEOIDs append one digit to their tract.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{Extract, Location, Pipeline};
use crate::config::SantaClaraConfig;
use crate::records::{AdiTallies, Admission, PopulationTable};
use crate::source::{KeyColumn, Layout, SourceFile, optional_count};

pub struct SantaClara {
    config: SantaClaraConfig,
}

impl SantaClara {
    pub fn new(config: SantaClaraConfig) -> Self {
        Self { config }
    }

    fn read_tracts(&self, table: &mut PopulationTable) -> Result<()> {
        let cols = &self.config.columns;
        let path = self.config.data_dir.join(&self.config.tracts_file);

        let summary = SourceFile::open(&path, Layout::Headed)?.for_each_row(
            KeyColumn::Named(&cols.tract_id),
            |row| {
                let tract = row.required_int(row.named(&cols.tract_id)?, "tract id")?;
                let lat = row.required_float(row.named(&cols.latitude)?, "latitude")?;
                let lon = row.required_float(row.named(&cols.longitude)?, "longitude")?;
                let pop = row.required_int(row.named(&cols.population)?, "population")?;
                table.observe(tract, (lat, lon), pop);
                Ok(())
            },
        )?;

        info!(
            path = %path.display(),
            rows = summary.data_rows,
            skipped_rows = summary.skipped_rows,
            tracts = table.len(),
            "Read census tracts"
        );
        Ok(())
    }

    fn read_vaccinations(&self, table: &mut PopulationTable) -> Result<()> {
        let cols = &self.config.columns;
        let path = self.config.data_dir.join(&self.config.vaccinations_file);
        let policy = self.config.unknown_codes;
        let mut skipped = 0usize;

        let summary = SourceFile::open(&path, Layout::Headed)?.for_each_row(
            KeyColumn::Named(&cols.vaccination_tract),
            |row| {
                let tract = row.required_int(row.named(&cols.vaccination_tract)?, "tract id")?;
                let admission = table.admit(tract, policy).with_context(|| row.location())?;
                if admission == Admission::Skipped {
                    debug!(tract, line = row.line(), "Skipping vaccinations for unknown tract");
                    skipped += 1;
                    return Ok(());
                }
                match optional_count(row.named(&cols.vaccinated)?) {
                    Some(count) => table.add_vaccinations(tract, count),
                    None => debug!(line = row.line(), "Skipping non-numeric vaccination count"),
                }
                Ok(())
            },
        )?;

        info!(
            path = %path.display(),
            rows = summary.data_rows,
            skipped_rows = summary.skipped_rows,
            unknown_skipped = skipped,
            "Read vaccinations"
        );
        Ok(())
    }

    fn read_adi(&self, table: &mut PopulationTable) -> Result<()> {
        let cols = &self.config.columns;
        let path = self.config.data_dir.join(&self.config.adi_file);
        let mut tallies = AdiTallies::new();

        let summary = SourceFile::open(&path, Layout::Headed)?.for_each_row(
            KeyColumn::Named(&cols.block_group),
            |row| {
                let block_group: u64 =
                    row.required_int(row.named(&cols.block_group)?, "block group id")?;
                let tract = block_group / 10;
                if !table.contains(tract) {
                    return Ok(());
                }
                if let Some(rank) = optional_count(row.named(&cols.adi)?) {
                    tallies.add(tract, rank);
                }
                Ok(())
            },
        )?;

        table.apply_adi(&tallies);
        info!(
            path = %path.display(),
            rows = summary.data_rows,
            skipped_rows = summary.skipped_rows,
            "Read ADI rankings"
        );
        Ok(())
    }
}

impl Pipeline for SantaClara {
    fn location(&self) -> Location {
        Location::SantaClara
    }

    fn collect(&self) -> Result<Extract> {
        let mut population = PopulationTable::new();

        self.read_tracts(&mut population)?;
        self.read_vaccinations(&mut population)?;
        self.read_adi(&mut population)?;

        Ok(Extract {
            population,
            facilities: Vec::new(),
        })
    }
}
