use bom_reconcile::{cli, config, error, logging, menu, runner};
use clap::Parser;
use cli::Cli;
use config::Config;
use error::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load()?;
    config.apply_overrides(cli.data_dir, cli.output_dir);

    println!("🔩 bom-reconcile - BOM照合\n");
    let session = runner::Session::prepare(config)?;

    match cli.auto {
        Some(mode) => session.run(mode)?,
        None => menu::run_interactive(&session)?,
    }

    println!("✅ 完了");
    Ok(())
}
