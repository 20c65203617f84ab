use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::Context;
use clap::Parser;
use image::Rgb;
use maze::source::MazeRequest;
use serde::{Deserialize, Serialize};

/// Generate a maze, solve it and write the results as GIF images
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// JSON file with default settings, overridden by any flag given
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maze width in cells
    #[arg(long)]
    pub width: Option<u16>,

    /// Maze height in cells
    #[arg(long)]
    pub height: Option<u16>,

    /// Pixels per grid cell in the written images
    #[arg(long)]
    pub scale: Option<u16>,

    /// Wall colour as R,G,B
    #[arg(long, value_parser = parse_rgb)]
    pub wall: Option<[u8; 3]>,

    /// Path colour as R,G,B
    #[arg(long, value_parser = parse_rgb)]
    pub path: Option<[u8; 3]>,

    /// Seed for the maze generator, defaults to the current time
    #[arg(long)]
    pub seed: Option<u64>,

    /// Solve this image instead of generating a maze
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Where to write the unsolved maze
    #[arg(long)]
    pub raw: Option<PathBuf>,

    /// Where to write the solved maze
    #[arg(long)]
    pub solved: Option<PathBuf>,

    /// Where to write the animation of the walk
    #[arg(long)]
    pub animation: Option<PathBuf>,

    /// Also dump every trace of the walk as JSON
    #[arg(long)]
    pub traces: Option<PathBuf>,

    /// Give up after this many steps
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Don't print the maze and its solution
    #[arg(long)]
    pub quiet: bool,
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let channels = s
        .split(',')
        .map(|c| c.trim().parse::<u8>().map_err(|e| format!("{c:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    channels
        .try_into()
        .map_err(|c: Vec<u8>| format!("expected 3 channels, got {}", c.len()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    pub raw: PathBuf,
    pub solved: PathBuf,
    pub animation: PathBuf,
}

impl Default for Files {
    fn default() -> Self {
        let now = unix_now();
        Self {
            raw: format!("rmaze.{now}.gif").into(),
            solved: format!("smaze.{now}.gif").into(),
            animation: format!("amaze.{now}.gif").into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)] // missing fields fall back to their defaults
pub struct Config {
    pub width: u16,
    pub height: u16,
    pub scale: u16,
    pub wall: [u8; 3],
    pub path: [u8; 3],
    pub seed: Option<u64>,
    pub input: Option<PathBuf>,
    pub files: Files,
    pub traces: Option<PathBuf>,
    pub max_steps: Option<usize>,
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            scale: 1,
            wall: [0, 0, 0],
            path: [255, 255, 255],
            seed: None,
            input: None,
            files: Files::default(),
            traces: None,
            max_steps: None,
            quiet: false,
        }
    }
}

impl Config {
    /// Reads the config file named in `args`, if any, then applies the flags on top.
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.apply(args);
        Ok(config)
    }

    fn apply(&mut self, args: &Args) {
        fn set<T: Clone>(slot: &mut T, flag: &Option<T>) {
            if let Some(v) = flag {
                *slot = v.clone();
            }
        }

        set(&mut self.width, &args.width);
        set(&mut self.height, &args.height);
        set(&mut self.scale, &args.scale);
        set(&mut self.wall, &args.wall);
        set(&mut self.path, &args.path);
        set(&mut self.files.raw, &args.raw);
        set(&mut self.files.solved, &args.solved);
        set(&mut self.files.animation, &args.animation);
        if args.seed.is_some() {
            self.seed = args.seed;
        }
        if args.input.is_some() {
            self.input = args.input.clone();
        }
        if args.traces.is_some() {
            self.traces = args.traces.clone();
        }
        if args.max_steps.is_some() {
            self.max_steps = args.max_steps;
        }
        self.quiet |= args.quiet;
    }

    pub fn request(&self) -> MazeRequest {
        MazeRequest {
            height: self.height,
            width: self.width,
            ratio: self.scale,
            wall: Rgb(self.wall),
            path: Rgb(self.path),
        }
    }

    /// The configured seed, or the current time when none is set.
    pub fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(unix_now)
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_parse_rgb() {
        assert_eq!(parse_rgb("1,2,3"), Ok([1, 2, 3]));
        assert_eq!(parse_rgb(" 255, 0 ,9"), Ok([255, 0, 9]));
        assert!(parse_rgb("1,2").is_err());
        assert!(parse_rgb("1,2,3,4").is_err());
        assert!(parse_rgb("1,2,256").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "mazewalk", "--width", "30", "--wall", "9,9,9", "--quiet", "--raw", "a.gif",
        ]);
        assert_eq!(args.width, Some(30));
        assert_eq!(args.wall, Some([9, 9, 9]));
        assert!(args.quiet);
        assert_eq!(args.raw, Some(PathBuf::from("a.gif")));
        assert_eq!(args.height, None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::load(&Args::default()).unwrap();
        assert_eq!((config.width, config.height, config.scale), (10, 10, 1));
        assert!(config.files.raw.to_string_lossy().starts_with("rmaze."));
        assert!(config.files.animation.to_string_lossy().ends_with(".gif"));
    }

    #[test]
    fn test_precedence() {
        let path = std::env::temp_dir().join(format!("mazewalk-config-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{ "width": 25, "height": 12, "wall": [1, 2, 3], "files": { "raw": "from-file.gif" } }"#,
        )
        .unwrap();

        let args = Args {
            config: Some(path.clone()),
            height: Some(40),
            ..Args::default()
        };
        let config = Config::load(&args).unwrap();
        std::fs::remove_file(&path).unwrap();

        // the file beats the defaults, the flags beat the file
        assert_eq!(config.width, 25);
        assert_eq!(config.height, 40);
        assert_eq!(config.scale, 1);
        assert_eq!(config.wall, [1, 2, 3]);
        assert_eq!(config.files.raw, PathBuf::from("from-file.gif"));
        assert!(config.files.solved.to_string_lossy().starts_with("smaze."));
    }

    #[test]
    fn test_bad_config_file() {
        let args = Args {
            config: Some("does/not/exist.json".into()),
            ..Args::default()
        };
        let err = Config::load(&args).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.json"));
    }
}
