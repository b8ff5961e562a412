use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sceneconfig::{parse_antialias, parse_scrub, AntialiasSetting};
use scrolltrigger::Scrub;

use crate::paths::ENV_CONFIG;

#[derive(Parser, Debug)]
#[command(
    name = "scrollshade",
    author,
    version,
    about = "Full-window shader plane driven by scroll position",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Scene configuration file (TOML). Falls back to `<config dir>/scene.toml`.
    #[arg(long, short = 'c', global = true, value_name = "FILE", env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Override the initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,

    /// Anti-aliasing policy: `auto`, `off`, or an MSAA sample count (2, 4, 8, 16).
    #[arg(long, value_name = "MODE", value_parser = parse_antialias)]
    pub antialias: Option<AntialiasSetting>,

    /// Upper bound for the device pixel ratio.
    #[arg(long, value_name = "RATIO")]
    pub max_pixel_ratio: Option<f64>,

    /// Scrub mode: `linked`, seconds of lag (e.g. `0.5`), or a duration like `500ms`.
    #[arg(long, value_name = "SECONDS|linked", value_parser = parse_scrub)]
    pub scrub: Option<Scrub>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and print the resolved scroll plan.
    Check(CheckArgs),
    /// Print the configuration directory and default config path.
    Where,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Window size used to lay out sections (defaults to the configured size).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<WindowSize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<WindowSize, String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid size '{trimmed}'; expected WIDTHxHEIGHT"))
    };
    let size = WindowSize {
        width: parse(width)?,
        height: parse(height)?,
    };
    if size.width == 0 || size.height == 0 {
        return Err("window size must be non-zero".to_string());
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_window_sizes() {
        assert_eq!(
            parse_size("1280x720"),
            Ok(WindowSize {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(
            parse_size(" 800X600 "),
            Ok(WindowSize {
                width: 800,
                height: 600
            })
        );
        assert!(parse_size("0x600").is_err());
        assert!(parse_size("wide").is_err());
        assert!(parse_size("800x").is_err());
    }

    #[test]
    fn run_flags_parse_without_subcommand() {
        let cli = Cli::try_parse_from([
            "scrollshade",
            "--size",
            "640x480",
            "--antialias",
            "off",
            "--scrub",
            "linked",
            "--max-pixel-ratio",
            "1.5",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.antialias, Some(AntialiasSetting::Off));
        assert_eq!(cli.run.scrub, Some(Scrub::Linked));
        assert_eq!(cli.run.max_pixel_ratio, Some(1.5));
    }

    #[test]
    fn check_accepts_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scrollshade",
            "check",
            "--config",
            "scene.toml",
            "--size",
            "1000x500",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scene.toml")));
        match cli.command {
            Some(Command::Check(args)) => assert_eq!(
                args.size,
                Some(WindowSize {
                    width: 1000,
                    height: 500
                })
            ),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn scrub_accepts_durations() {
        let cli = Cli::try_parse_from(["scrollshade", "--scrub", "500ms"]).unwrap();
        assert_eq!(
            cli.run.scrub,
            Some(Scrub::Smoothed(Duration::from_millis(500)))
        );
    }
}
