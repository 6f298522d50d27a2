//! Dump VSTS volume-statistics worlds as OBJ point clouds.
//!
//! Every occupied voxel becomes one `v X Y Z` line. `MainField` is large, so
//! it defaults to one file per unit.

mod dump_params;

use std::error::Error as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process::ExitCode;

use dump_params::{DumpParams, OutputMode};
use vsts::{Error, FileSource, Filesystem, Result, UnitVoxels, World, obj};

fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let params = dump_params::parse();
    match run(&params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            let mut source = e.source();
            while let Some(cause) = source {
                tracing::error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(params: &DumpParams) -> Result<()> {
    let world = World::open(
        Filesystem::new(),
        &params.romfs,
        &params.world,
        params.options.clone(),
    )?;
    fs::create_dir_all(&params.out_dir).map_err(|e| Error::io(&params.out_dir, e))?;

    if let Some(cell) = params.unit {
        let unit = world.decode_unit_local(cell.x, cell.z, params.unit_flag.as_deref())?;
        let path = params
            .out_dir
            .join(obj::unit_file_name(&params.world, cell.x, cell.z));
        write_obj(&path, std::slice::from_ref(&unit))?;
        return Ok(());
    }

    match params.output {
        OutputMode::PerUnit => dump_per_unit(&world, params),
        OutputMode::Aggregate => dump_aggregate(&world, params),
    }
}

fn dump_aggregate<S: FileSource>(world: &World<S>, params: &DumpParams) -> Result<()> {
    let path = params.out_dir.join(obj::world_file_name(&params.world));
    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let mut out = BufWriter::new(file);

    let summary = world.for_each_unit_in_order(|unit| {
        obj::write_positions(&mut out, &unit.positions)
            .map(|_| ())
            .map_err(|e| Error::io(&path, e))
    })?;
    out.flush().map_err(|e| Error::io(&path, e))?;

    if summary.skipped > 0 {
        tracing::warn!(skipped = summary.skipped, "Some units were skipped");
    }
    tracing::info!(path = %path.display(), voxels = summary.voxels, "Wrote OBJ");
    Ok(())
}

fn dump_per_unit<S: FileSource>(world: &World<S>, params: &DumpParams) -> Result<()> {
    let summary = world.for_each_unit(|unit| {
        let path = params
            .out_dir
            .join(obj::unit_file_name(&params.world, unit.x, unit.z));
        write_obj(&path, std::slice::from_ref(&unit))
    })?;
    if summary.skipped > 0 {
        tracing::warn!(skipped = summary.skipped, "Some units were skipped");
    }
    Ok(())
}

fn write_obj(path: &Path, units: &[UnitVoxels]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut out = BufWriter::new(file);
    let count = obj::write_units(&mut out, units)
        .and_then(|count| out.flush().map(|()| count))
        .map_err(|e| Error::io(path, e))?;
    tracing::info!(path = %path.display(), voxels = count, "Wrote OBJ");
    Ok(())
}
