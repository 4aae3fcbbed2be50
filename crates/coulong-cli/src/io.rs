use crate::error::{CliError, Result};
use coulong::core::models::particles::ParticleStore;
use coulong::engine::error::EngineError;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize, Debug)]
struct ParticleRecord {
    x: f64,
    y: f64,
    z: f64,
    charge: f64,
    #[serde(rename = "type")]
    type_id: usize,
    #[serde(default)]
    ghost: bool,
}

#[derive(Deserialize, Debug)]
struct BondRecord {
    i: usize,
    j: usize,
}

#[derive(Serialize, Debug)]
struct ForceRecord {
    index: usize,
    fx: f64,
    fy: f64,
    fz: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<f64>,
}

fn parse_error(path: &Path, source: impl Into<anyhow::Error>) -> CliError {
    CliError::FileParsing {
        path: path.to_path_buf(),
        source: source.into(),
    }
}

/// Reads particles from CSV. Local rows must precede ghost rows.
pub fn read_particles(path: &Path) -> Result<ParticleStore> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| parse_error(path, e))?;

    let mut store = ParticleStore::new();
    for record in reader.deserialize::<ParticleRecord>() {
        let record = record.map_err(|e| parse_error(path, e))?;
        let position = Point3::new(record.x, record.y, record.z);
        if record.ghost {
            store.add_ghost(position, record.charge, record.type_id);
        } else {
            store
                .add_local(position, record.charge, record.type_id)
                .map_err(|e| CliError::Core(EngineError::from(e)))?;
        }
    }

    info!(
        nlocal = store.nlocal(),
        nghost = store.nghost(),
        "Loaded particles from {:?}.",
        path
    );
    Ok(store)
}

pub fn read_bonds(path: &Path) -> Result<Vec<(usize, usize)>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| parse_error(path, e))?;

    let bonds = reader
        .deserialize::<BondRecord>()
        .map(|record| {
            record
                .map(|b| (b.i, b.j))
                .map_err(|e| parse_error(path, e))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(count = bonds.len(), "Loaded bonds from {:?}.", path);
    Ok(bonds)
}

/// Writes one row per particle; the energy column appears only when `eatom` is non-empty.
pub fn write_forces(path: &Path, forces: &[Vector3<f64>], eatom: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| parse_error(path, e))?;
    for (index, f) in forces.iter().enumerate() {
        writer
            .serialize(ForceRecord {
                index,
                fx: f.x,
                fy: f.y,
                fz: f.z,
                energy: eatom.get(index).copied(),
            })
            .map_err(|e| parse_error(path, e))?;
    }
    writer.flush()?;
    debug!(rows = forces.len(), "Wrote forces to {:?}.", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn read_particles_splits_locals_and_ghosts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        fs::write(
            &path,
            "x,y,z,charge,type,ghost\n\
             0.0, 0.0, 0.0, -0.834, 0, false\n\
             0.9572, 0.0, 0.0, 0.417, 1, false\n\
             12.0, 0.0, 0.0, 0.417, 1, true\n",
        )
        .unwrap();

        let store = read_particles(&path).unwrap();
        assert_eq!(store.nlocal(), 2);
        assert_eq!(store.nghost(), 1);
        assert_eq!(store.charges(), &[-0.834, 0.417, 0.417]);
        assert_eq!(store.types(), &[0, 1, 1]);
        assert_eq!(store.positions()[1], Point3::new(0.9572, 0.0, 0.0));
    }

    #[test]
    fn ghost_column_is_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        fs::write(&path, "x,y,z,charge,type\n1,2,3,1.0,0\n").unwrap();

        let store = read_particles(&path).unwrap();
        assert_eq!(store.nlocal(), 1);
        assert_eq!(store.nghost(), 0);
    }

    #[test]
    fn local_after_ghost_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        fs::write(
            &path,
            "x,y,z,charge,type,ghost\n0,0,0,1,0,true\n1,0,0,1,0,false\n",
        )
        .unwrap();

        assert!(matches!(
            read_particles(&path),
            Err(CliError::Core(EngineError::Particles { .. }))
        ));
    }

    #[test]
    fn malformed_row_reports_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("particles.csv");
        fs::write(&path, "x,y,z,charge,type\n0,0,zero,1,0\n").unwrap();

        match read_particles(&path) {
            Err(CliError::FileParsing { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected a parsing error, got {:?}", other.map(|s| s.nall())),
        }
    }

    #[test]
    fn read_bonds_returns_index_pairs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bonds.csv");
        fs::write(&path, "i,j\n0,1\n0, 2\n").unwrap();

        assert_eq!(read_bonds(&path).unwrap(), vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn write_forces_includes_energy_only_when_present() {
        let dir = tempdir().unwrap();
        let forces = vec![Vector3::new(1.0, -2.0, 0.5), Vector3::zeros()];

        let plain = dir.path().join("plain.csv");
        write_forces(&plain, &forces, &[]).unwrap();
        let content = fs::read_to_string(&plain).unwrap();
        assert_eq!(content.lines().next(), Some("index,fx,fy,fz"));
        assert_eq!(content.lines().nth(1), Some("0,1.0,-2.0,0.5"));

        let with_energy = dir.path().join("energy.csv");
        write_forces(&with_energy, &forces, &[0.25, -0.25]).unwrap();
        let content = fs::read_to_string(&with_energy).unwrap();
        assert_eq!(content.lines().next(), Some("index,fx,fy,fz,energy"));
        assert_eq!(content.lines().count(), 3);
    }
}
