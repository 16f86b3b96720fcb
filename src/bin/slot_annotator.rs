//! slot_annotator - interactive parking slot region authoring
//!
//! Drives the [`RegionEditor`] state machine from stdin commands and prints
//! the editor state after every mutation; a GUI can drive the same editor
//! through the library instead. Resumes from an existing regions file so
//! slot numbering continues where the last session stopped.
//!
//! Commands:
//!   point <x> <y>   add a vertex to the in-progress polygon
//!   next            commit the polygon under the next auto code
//!   name <code>     commit the polygon under an explicit code
//!   reset           discard in-progress points
//!   undo            remove the most recently committed region
//!   save            persist all committed regions
//!   list            print committed regions
//!   quit            save and exit

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use lotwatch::editor::RegionEditor;
use lotwatch::error::LotError;
use lotwatch::geometry::Point;
use lotwatch::region::{JsonFileRegionStore, RegionStore};

#[derive(Parser, Debug)]
#[command(
    name = "slot_annotator",
    about = "Define parking slot regions for lotwatchd"
)]
struct Args {
    /// Parking lot reference image; points are bounds-checked against it.
    image: Option<PathBuf>,

    /// Region file to edit.
    #[arg(long, default_value = "parking_regions.json", env = "LOTWATCH_REGIONS_FILE")]
    regions_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let image_size = match &args.image {
        Some(path) => {
            let (width, height) = image::image_dimensions(path)
                .with_context(|| format!("read image dimensions from {}", path.display()))?;
            println!("image {}: {}x{}", path.display(), width, height);
            Some((width, height))
        }
        None => None,
    };

    let mut store = JsonFileRegionStore::new(&args.regions_file);
    let mut editor = match store.load() {
        Ok(regions) => {
            println!(
                "loaded {} existing regions from {}",
                regions.len(),
                args.regions_file.display()
            );
            RegionEditor::with_regions(regions)
        }
        Err(LotError::StoreMissing) => {
            println!("starting a new region file at {}", args.regions_file.display());
            RegionEditor::new()
        }
        Err(err) => return Err(err).context("load existing regions"),
    };

    print_help();
    print_state(&editor);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("read command")?;
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };

        match command {
            "point" | "p" => {
                let coords: Option<(i32, i32)> = parts
                    .next()
                    .and_then(|x| x.parse().ok())
                    .and_then(|x| parts.next().and_then(|y| y.parse().ok()).map(|y| (x, y)));
                let Some((x, y)) = coords else {
                    println!("usage: point <x> <y>");
                    continue;
                };
                if let Some((width, height)) = image_size {
                    if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
                        println!("warning: ({}, {}) is outside the {}x{} image", x, y, width, height);
                    }
                }
                editor.add_point(Point::new(x, y));
            }
            "next" | "n" => match editor.commit() {
                Ok(code) => println!("committed {}", code),
                Err(err) => println!("{}", err),
            },
            "name" => match parts.next() {
                Some(code) => match editor.commit_named(code) {
                    Ok(code) => println!("committed {}", code),
                    Err(err) => println!("{}", err),
                },
                None => println!("usage: name <code>"),
            },
            "reset" | "r" => {
                editor.reset_current();
                println!("cleared in-progress points");
            }
            "undo" | "u" => match editor.undo_last() {
                Ok(code) => println!("removed {}", code),
                Err(err) => println!("{}", err),
            },
            "save" | "s" => match editor.persist(&mut store) {
                Ok(()) => println!(
                    "saved {} regions to {}",
                    editor.committed().len(),
                    args.regions_file.display()
                ),
                Err(err) => println!("save failed: {}", err),
            },
            "list" | "l" => {
                for region in editor.committed() {
                    let points: Vec<String> = region
                        .points
                        .iter()
                        .map(|point| format!("({},{})", point.x, point.y))
                        .collect();
                    println!("  {}: {}", region.code, points.join(" "));
                }
            }
            "quit" | "q" => break,
            "help" | "h" => print_help(),
            other => println!("unknown command '{}'; try 'help'", other),
        }

        print_state(&editor);
        io::stdout().flush().ok();
    }

    // Final save, mirroring an explicit quit.
    editor
        .persist(&mut store)
        .context("save regions on exit")?;
    println!(
        "saved {} regions to {}",
        editor.committed().len(),
        args.regions_file.display()
    );
    Ok(())
}

fn print_state(editor: &RegionEditor) {
    println!(
        "[{} committed | {} in-progress points | next: {}]",
        editor.committed().len(),
        editor.current().len(),
        editor.next_code()
    );
}

fn print_help() {
    println!("commands: point <x> <y> | next | name <code> | reset | undo | save | list | quit");
}
