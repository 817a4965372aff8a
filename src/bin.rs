use clap::Parser;
use polycollide::scene::{report_collisions, InsertionMode, Scene};
use std::{path::PathBuf, process::ExitCode, time::Instant};

/// Report every colliding pair of shapes in a JSON scene
#[derive(Parser, Debug)]
#[command(name = "polycollide-cli", version)]
struct Cli {
    /// Scene description to load
    scene: PathBuf,

    /// Insert shapes one by one in file order instead of bulk insertion
    #[arg(long)]
    sequential: bool,

    /// Override the damping divisor of the separation vectors
    #[arg(long)]
    damping: Option<f64>,

    /// Print statistics about the index
    #[arg(long)]
    stats: bool,
}

pub fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut scene = match Scene::from_file(&cli.scene) {
        Ok(scene) => scene,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(damping) = cli.damping {
        if let Err(e) = scene.set_damping(damping) {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    }
    let mode = if cli.sequential {
        InsertionMode::Sequential
    } else {
        InsertionMode::Bulk
    };

    let start = Instant::now();
    let tree = match scene.build_tree(mode) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let indexed = start.elapsed();
    let collisions = report_collisions(&tree, &scene.detector());
    let detected = start.elapsed() - indexed;

    for collision in collisions.iter() {
        println!("{collision}");
    }
    if cli.stats {
        println!("Index: {}", tree.stats());
        println!(
            "Indexing took {:.3}ms, detection took {:.3}ms, {} collisions",
            indexed.as_secs_f64() * 1000.0,
            detected.as_secs_f64() * 1000.0,
            collisions.len()
        );
    }
    ExitCode::SUCCESS
}
