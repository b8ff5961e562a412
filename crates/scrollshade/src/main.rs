mod check;
mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();
    let paths = AppPaths::discover()?;
    let config = cli.config.as_deref();

    match cli.command {
        Some(Command::Check(args)) => check::run_check(&paths, config, &args),
        Some(Command::Where) => run_where(&paths),
        None => run::run(&paths, config, cli.run),
    }
}

fn run_where(paths: &AppPaths) -> Result<()> {
    let default = paths.default_config_file();
    println!("Configuration directory: {}", paths.config_dir().display());
    println!(
        "Default scene config:    {} ({})",
        default.display(),
        if default.is_file() {
            "present"
        } else {
            "not found; built-in defaults apply"
        }
    );
    Ok(())
}
