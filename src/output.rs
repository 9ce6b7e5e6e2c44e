use crate::stats::{Category, FsFrTable, PairCorrelationTable};
use anyhow::{Context, Result};
use csv::Writer;
use egt_common::{CellRecord, Population, RunConfig};
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const POPULATIONS_FILE: &str = "populations.csv";
pub const COORDS_FILE: &str = "coords.csv";
pub const PAIR_CORRELATIONS_FILE: &str = "pair_correlations.csv";
pub const FS_FR_FILE: &str = "fs_fr.csv";

/// CSV sinks for one experiment. A sink exists only when its cadence is non-zero.
///
/// Rows from every scenario go to the same files, distinguished by the
/// `model` column.
pub struct ExperimentWriters {
    populations: Option<Writer<File>>,
    coords: Option<Writer<File>>,
    pair_correlations: Option<Writer<File>>,
    fs_fr: Option<Writer<File>>,
    volumetric: bool,
}

fn open(dir: &Path, name: &str, header: &[&str]) -> Result<Writer<File>> {
    let path: PathBuf = dir.join(name);
    let mut writer =
        Writer::from_path(&path).with_context(|| format!("Failed to create output file '{}'", path.display()))?;
    writer.write_record(header)?;
    debug!("Writing {}", path.display());
    Ok(writer)
}

impl ExperimentWriters {
    /// Creates the output directory and the files enabled by `run`.
    pub fn create(dir: &Path, run: &RunConfig, dimension: u8) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        let volumetric = dimension == 3;

        let populations = match run.write_pop_every {
            0 => None,
            _ => Some(open(dir, POPULATIONS_FILE, &["model", "time", "sensitive", "resistant"])?),
        };
        let coords = match run.write_coords_every {
            0 => None,
            _ if volumetric => Some(open(dir, COORDS_FILE, &["model", "time", "type", "x", "y", "z"])?),
            _ => Some(open(dir, COORDS_FILE, &["model", "time", "type", "x", "y"])?),
        };
        let pair_correlations = match run.write_pc_every {
            0 => None,
            _ => Some(open(
                dir,
                PAIR_CORRELATIONS_FILE,
                &["model", "time", "pair", "measure", "distance", "count"],
            )?),
        };
        let fs_fr = match run.write_fs_every {
            0 => None,
            _ => Some(open(
                dir,
                FS_FR_FILE,
                &["model", "time", "measure", "radius", "frequency", "reproduced", "total"],
            )?),
        };
        Ok(ExperimentWriters { populations, coords, pair_correlations, fs_fr, volumetric })
    }

    pub fn population(&mut self, model: &str, time: u64, pop: Population) -> Result<()> {
        if let Some(w) = self.populations.as_mut() {
            w.write_record([model.to_string(), time.to_string(), pop.sensitive.to_string(), pop.resistant.to_string()])?;
        }
        Ok(())
    }

    /// One row per located cell; `type` is 0 for sensitive and 1 for resistant.
    pub fn coords(&mut self, model: &str, time: u64, records: &[CellRecord]) -> Result<()> {
        let Some(w) = self.coords.as_mut() else {
            return Ok(());
        };
        let time = time.to_string();
        for record in records {
            let Some(c) = record.coord else { continue };
            let kind = record.phenotype.index().to_string();
            if self.volumetric {
                w.write_record([model.to_string(), time.clone(), kind, c.x.to_string(), c.y.to_string(), c.z.to_string()])?;
            } else {
                w.write_record([model.to_string(), time.clone(), kind, c.x.to_string(), c.y.to_string()])?;
            }
        }
        Ok(())
    }

    pub fn pair_correlation(&mut self, model: &str, time: u64, table: &PairCorrelationTable) -> Result<()> {
        let Some(w) = self.pair_correlations.as_mut() else {
            return Ok(());
        };
        let time = time.to_string();
        let measure = table.measure();
        for (distance, counts) in &table.rows {
            let distance = distance.to_string();
            for category in Category::ALL {
                w.write_record([
                    model.to_string(),
                    time.clone(),
                    category.label().to_string(),
                    measure.clone(),
                    distance.clone(),
                    counts.get(category).to_string(),
                ])?;
            }
        }
        Ok(())
    }

    pub fn fs_fr(&mut self, model: &str, time: u64, table: &FsFrTable) -> Result<()> {
        let Some(w) = self.fs_fr.as_mut() else {
            return Ok(());
        };
        let time = time.to_string();
        for (measure, radius, frequency, bin) in table.rows() {
            w.write_record([
                model.to_string(),
                time.clone(),
                measure.to_string(),
                radius.to_string(),
                format!("{frequency:.2}"),
                bin.reproduced.to_string(),
                bin.total.to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        for w in [&mut self.populations, &mut self.coords, &mut self.pair_correlations, &mut self.fs_fr]
            .into_iter()
            .flatten()
        {
            w.flush().context("Failed to flush CSV output")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egt_common::{Coord, Phenotype};

    fn run(pop: u64, coords: u64) -> RunConfig {
        RunConfig {
            num_ticks: 10,
            seed: 0,
            write_pop_every: pop,
            write_coords_every: coords,
            write_pc_every: 0,
            write_fs_every: 0,
            fs_max_radius: 5,
        }
    }

    #[test]
    fn disabled_outputs_create_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = ExperimentWriters::create(dir.path(), &run(1, 0), 2).unwrap();
        out.coords("nodrug", 1, &[]).unwrap();
        out.flush().unwrap();
        assert!(dir.path().join(POPULATIONS_FILE).exists());
        assert!(!dir.path().join(COORDS_FILE).exists());
        assert!(!dir.path().join(FS_FR_FILE).exists());
    }

    #[test]
    fn coords_rows_carry_type_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = ExperimentWriters::create(dir.path(), &run(0, 1), 3).unwrap();
        let records = [
            CellRecord { phenotype: Phenotype::Resistant, coord: Some(Coord::new(1, 2, 3)) },
            CellRecord { phenotype: Phenotype::Sensitive, coord: Some(Coord::new(0, 0, 4)) },
        ];
        out.coords("adaptive", 5, &records).unwrap();
        out.flush().unwrap();
        let text = std::fs::read_to_string(dir.path().join(COORDS_FILE)).unwrap();
        assert_eq!(text, "model,time,type,x,y,z\nadaptive,5,1,1,2,3\nadaptive,5,0,0,0,4\n");
    }
}
