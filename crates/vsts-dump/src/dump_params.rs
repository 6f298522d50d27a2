//! Command-line parameters for the dumper.

use std::path::PathBuf;

use clap::Parser;
use vsts::layout::{self, MAIN_FIELD};
use vsts::{ScanMode, WorldOptions};

/// How decoded units are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One `<world>_X{x}_Z{z}.obj` per unit.
    PerUnit,
    /// Every unit in one `<world>.obj`.
    Aggregate,
}

/// A unit grid cell given as `X,Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

/// Resolved parameters for one dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpParams {
    /// Root of the romfs dump.
    pub romfs: PathBuf,
    /// World to decode, e.g. `MainField` or `LargeDungeonWater`.
    pub world: String,
    /// Directory the OBJ files are written to.
    pub out_dir: PathBuf,
    pub output: OutputMode,
    /// Decode only this unit, placed at a local origin.
    pub unit: Option<Cell>,
    /// Override folder for the single unit.
    pub unit_flag: Option<String>,
    pub options: WorldOptions,
}

/// Parse `X,Z` into a grid cell.
fn parse_cell(s: &str) -> Result<Cell, String> {
    let (x, z) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Z, got '{s}'"))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid x: {e}"))?;
    let z = z
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid z: {e}"))?;
    if x < 0 || z < 0 {
        return Err(format!("cell out of range: {x},{z}"));
    }
    Ok(Cell { x, z })
}

#[derive(Parser, Debug)]
#[command(about = "Dump VSTS volume-statistics worlds as OBJ point clouds")]
struct CliArgs {
    /// Root of the romfs dump.
    romfs: PathBuf,

    /// World to decode. Defaults to MainField.
    #[arg(default_value = MAIN_FIELD)]
    world: String,

    /// Override folder to prefer over the world directory; repeatable, first
    /// match wins. MainField uses its story flags when none are given.
    #[arg(long = "flag", value_name = "FLAG")]
    flags: Vec<String>,

    /// Output directory. Defaults to `<WORLD>Out` for per-unit output and
    /// the current directory otherwise.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write one OBJ per unit (the default for MainField).
    #[arg(long, conflicts_with = "aggregate")]
    per_unit: bool,

    /// Write a single OBJ for the whole world.
    #[arg(long)]
    aggregate: bool,

    /// Decode only the unit at X,Z relative to its own corner.
    #[arg(long, value_name = "X,Z", value_parser = parse_cell)]
    unit: Option<Cell>,

    /// Skip units that fail to decode instead of stopping.
    #[arg(long)]
    lenient: bool,
}

impl From<CliArgs> for DumpParams {
    fn from(args: CliArgs) -> Self {
        let world = if args.world.is_empty() {
            MAIN_FIELD.to_owned()
        } else {
            args.world
        };
        let main_field = layout::is_main_field(&world);

        let output = if args.per_unit || (main_field && !args.aggregate) {
            OutputMode::PerUnit
        } else {
            OutputMode::Aggregate
        };

        let out_dir = args.out.unwrap_or_else(|| match (output, args.unit) {
            (OutputMode::PerUnit, None) => PathBuf::from(format!("{world}Out")),
            _ => PathBuf::from("."),
        });

        let unit_flag = args.unit.and(args.flags.first().cloned());
        let scan_mode = if args.lenient {
            ScanMode::Lenient
        } else {
            ScanMode::Strict
        };
        let options = if args.flags.is_empty() {
            WorldOptions::for_world(&world)
        } else {
            WorldOptions::new().with_flags(args.flags)
        }
        .with_scan_mode(scan_mode);

        Self {
            romfs: args.romfs,
            world,
            out_dir,
            output,
            unit: args.unit,
            unit_flag,
            options,
        }
    }
}

/// Parse dump parameters from the command line.
pub fn parse() -> DumpParams {
    CliArgs::parse().into()
}
