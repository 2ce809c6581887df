use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, ValueEnum};

/// Version component raised when no explicit version is given.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default)]
pub enum Increment {
    #[default]
    Patch,
    Minor,
    Major,
}

#[derive(Debug, Parser)]
#[command(author, version, about, bin_name = "bump")]
pub struct Arguments {
    /// Configuration file describing the `in` and `out` files
    #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,
    /// File to read the latest version from, overrides the configuration file
    #[arg(long = "in", short = 'i')]
    pub input: Option<String>,
    /// File or glob pattern to write the new version to, may be repeated
    #[arg(long, short)]
    pub out: Vec<String>,
    #[arg(long, short)]
    pub dry_run: bool,
    #[arg(long, short)]
    pub verbose: bool,
    /// Print the latest version and exit
    #[arg(long, short)]
    pub latest: bool,
    #[arg(long, value_enum, ignore_case = true, default_value_t = Increment::Patch)]
    pub increment: Increment,
    pub new_version: Option<String>,
}

impl Arguments {
    /// Whether the files to work on were given on the command line.
    pub fn has_file_overrides(&self) -> bool {
        self.input.is_some() || !self.out.is_empty()
    }
}
