use std::{fs::File, io::BufWriter, time::Instant};

use anyhow::Context;
use image::Rgb;
use maze::{
    generate::MazeGenerator,
    render::{self, Palette},
    source::{build_grid, ImageFile},
    Walker,
};

use crate::config::Config;

/// Builds the maze, solves it and writes every requested output.
pub fn run(config: &Config) -> anyhow::Result<()> {
    let request = config.request();
    log::info!(
        "building maze with ratio {}, width {}, height {}",
        request.ratio,
        request.width,
        request.height
    );

    let mut grid = match &config.input {
        Some(path) => {
            log::info!("reading maze from {}", path.display());
            build_grid(&mut ImageFile::new(path), &request)?
        }
        None => {
            let seed = config.seed();
            log::info!("generating maze with seed {seed}");
            build_grid(&mut MazeGenerator::new(seed), &request)?
        }
    };
    if !config.quiet {
        println!("{grid}");
    }

    log::info!("solving maze");
    let started = Instant::now();
    let mut walker = Walker::new(&mut grid)?;
    if let Some(max_steps) = config.max_steps {
        walker = walker.with_max_steps(max_steps);
    }
    walker.solve().context("solving maze")?;
    log::info!("done in {:?} after {} steps", started.elapsed(), walker.steps());

    let solution = walker
        .solution()
        .context("walk stopped before reaching the exit")?;
    if !config.quiet {
        println!("{solution}");
    }

    if let Some(path) = &config.traces {
        log::info!("saving traces: {}", path.display());
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), solution.log())
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let palette = Palette::new(Rgb(config.wall), Rgb(config.path));
    let files = &config.files;

    log::info!("saving maze: {}", files.raw.display());
    render::write_image(&files.raw, &render::draw_grid(solution.grid(), &palette))?;

    log::info!("saving solved maze: {}", files.solved.display());
    render::write_image(&files.solved, &render::draw_solution(&solution, &palette))?;

    log::info!("saving solved animation maze: {}", files.animation.display());
    render::write_animation(
        &files.animation,
        render::animation_frames(&solution, &palette),
    )?;

    Ok(())
}
