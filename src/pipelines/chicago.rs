//! Chicago: ZIP-code keyed case, vaccination and ADI exports.

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::{Extract, Location, Pipeline};
use crate::config::ChicagoConfig;
use crate::geometry::point_to_coords;
use crate::records::{AdiTallies, Admission, PopulationTable};
use crate::source::{KeyColumn, Layout, SourceFile, optional_count};

/// Column positions within the Chicago exports.
mod columns {
    /// Cases, tests and deaths by ZIP code.
    pub mod cases {
        pub const ZIP: usize = 0;
        pub const POPULATION: usize = 18;
        // the geometry is the last column of each row
    }

    /// Vaccinations by ZIP code.
    pub mod vaccinations {
        pub const ZIP: usize = 0;
        pub const DOSES: usize = 4;
    }

    /// ADI by 9-digit ZIP code.
    pub mod adi {
        pub const ZIP9: usize = 0;
        pub const RANK: usize = 4;
    }
}

const ZIP_DIGITS: usize = 5;

pub struct Chicago {
    config: ChicagoConfig,
}

impl Chicago {
    pub fn new(config: ChicagoConfig) -> Self {
        Self { config }
    }

    fn read_cases(&self, table: &mut PopulationTable) -> Result<()> {
        use columns::cases;

        let path = self.config.data_dir.join(&self.config.cases_file);
        let summary = SourceFile::open(&path, Layout::Positional)?.for_each_row(
            KeyColumn::Index(cases::ZIP),
            |row| {
                let zip = row.required_int(row.get(cases::ZIP)?, "ZIP code")?;
                let coords = point_to_coords(row.last()?)
                    .with_context(|| row.location())?;
                let pop = row.required_int(row.get(cases::POPULATION)?, "population")?;
                table.observe(zip, coords, pop);
                Ok(())
            },
        )?;

        info!(
            path = %path.display(),
            rows = summary.data_rows,
            skipped_rows = summary.skipped_rows,
            zip_codes = table.len(),
            "Read case counts"
        );
        Ok(())
    }

    fn read_vaccinations(&self, table: &mut PopulationTable) -> Result<()> {
        use columns::vaccinations;

        let path = self.config.data_dir.join(&self.config.vaccinations_file);
        let policy = self.config.unknown_codes;
        let mut skipped = 0usize;

        let summary = SourceFile::open(&path, Layout::Positional)?.for_each_row(
            KeyColumn::Index(vaccinations::ZIP),
            |row| {
                let zip = row.required_int(row.get(vaccinations::ZIP)?, "ZIP code")?;
                let admission = table.admit(zip, policy).with_context(|| row.location())?;
                if admission == Admission::Skipped {
                    debug!(zip, line = row.line(), "Skipping vaccinations for unknown ZIP code");
                    skipped += 1;
                    return Ok(());
                }
                match optional_count(row.get(vaccinations::DOSES)?) {
                    Some(doses) => table.add_vaccinations(zip, doses),
                    None => debug!(line = row.line(), "Skipping non-numeric dose count"),
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
        use columns::adi;

        let path = self.config.data_dir.join(&self.config.adi_file);
        let mut tallies = AdiTallies::new();

        let summary = SourceFile::open(&path, Layout::Positional)?.for_each_row(
            KeyColumn::Index(adi::ZIP9),
            |row| {
                let zip9 = row.get(adi::ZIP9)?;
                let prefix = zip9.get(..ZIP_DIGITS).unwrap_or(zip9);
                let zip = row.required_int(prefix, "ZIP code")?;
                if !table.contains(zip) {
                    return Ok(());
                }
                if let Some(rank) = optional_count(row.get(adi::RANK)?) {
                    tallies.add(zip, rank);
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

impl Pipeline for Chicago {
    fn location(&self) -> Location {
        Location::Chicago
    }

    fn collect(&self) -> Result<Extract> {
        let mut population = PopulationTable::new();

        self.read_cases(&mut population)?;
        self.read_vaccinations(&mut population)?;
        self.read_adi(&mut population)?;

        let locations = self.config.data_dir.join(&self.config.locations_file);
        debug!(
            path = %locations.display(),
            exists = locations.exists(),
            "Facility listing is not extracted"
        );

        Ok(Extract {
            population,
            facilities: Vec::new(),
        })
    }
}
