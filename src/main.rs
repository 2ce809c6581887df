use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, warn};
use std::path::Path;
use version_bumper::{
    arguments::Arguments,
    bumper::{Bumper, parse_user_version},
    config::{BumperConfig, DEFAULT_CONFIG_FILE},
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Arguments::parse();
    pretty_env_logger::env_logger::builder()
        .filter_level(if args.verbose { LevelFilter::Debug } else { LevelFilter::Info })
        .format_timestamp(None)
        .init();

    let version = args.new_version.as_deref().map(parse_user_version).transpose()?;
    let bumper = Bumper::new(load_config(&args)?, args.dry_run);

    if args.latest {
        match bumper.latest_version().await? {
            Some(latest) => println!("{}", latest),
            None => warn!("No latest version found"),
        }
        return Ok(());
    }

    let version = bumper.release(version, args.increment).await?;
    println!("{}", version);
    Ok(())
}

/// Files given on the command line win over the configuration file.
fn load_config(args: &Arguments) -> Result<BumperConfig> {
    if args.has_file_overrides() {
        return Ok(BumperConfig::from_files(args.input.clone(), args.out.clone()));
    }

    let path = Path::new(&args.config);
    if !path.exists() && args.config == DEFAULT_CONFIG_FILE {
        debug!("No '{}' found, nothing configured", DEFAULT_CONFIG_FILE);
        return Ok(BumperConfig::default());
    }
    BumperConfig::load(path)
}
