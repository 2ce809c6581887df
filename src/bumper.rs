use crate::arguments::Increment;
use crate::config::{BumperConfig, DEFAULT_PATH, FileTarget};
use crate::format::Format;
use crate::parsers::{
    BumperError, Parser, WriteRequest, html_parser::HtmlParser, ini_parser::IniParser,
    json_parser::JsonParser, parse_version, text_parser::TextParser, toml_parser::TomlParser,
    xml_parser::XmlParser, yaml_parser::YamlParser,
};
use crate::targets::{expand_targets, group_by_file};
use anyhow::{Result, anyhow};
use log::{debug, error, info, warn};
use semver::{BuildMetadata, Prerelease, Version};
use std::path::PathBuf;
use tokio::task::JoinSet;

/// Reads the latest version from the configured input and writes new versions to the outputs.
#[derive(Debug, Clone)]
pub struct Bumper {
    config: BumperConfig,
    dry_run: bool,
}

impl Bumper {
    pub fn new(config: BumperConfig, dry_run: bool) -> Self {
        Self { config, dry_run }
    }

    pub fn config(&self) -> &BumperConfig {
        &self.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The version stored in the `in` file, `None` when there is no input or no valid version in it.
    pub async fn latest_version(&self) -> Result<Option<Version>> {
        let Some(target) = self.config.input_target() else {
            debug!("No input file configured");
            return Ok(None);
        };
        tokio::task::spawn_blocking(move || read_target(&target)).await?
    }

    /// Writes `version` to every output file and returns the files that changed.
    ///
    /// Every file is processed even when another one fails. Outputs naming the same file are
    /// applied one after the other. `previous` scopes the substitution done by text and TOML files.
    pub async fn bump(&self, version: &Version, previous: Option<&Version>) -> Result<Vec<PathBuf>> {
        let groups = group_by_file(expand_targets(self.config.output_targets())?);
        if groups.is_empty() {
            warn!("No output files to update");
            return Ok(Vec::new());
        }

        let total = groups.len();
        let previous = previous.map(Version::to_string);
        let mut tasks = JoinSet::new();
        for (index, group) in groups.into_iter().enumerate() {
            let Some(file) = group.first().map(|target| target.file.clone()) else {
                continue;
            };
            let requests: Vec<(FileTarget, WriteRequest)> = group
                .into_iter()
                .map(|target| {
                    let request = WriteRequest::new(DEFAULT_PATH, format!("{}{}", target.version_prefix, version))
                        .with_paths(target.paths.clone())
                        .with_previous(previous.clone())
                        .consume_whole_file(target.consume_whole_file);
                    (target, request)
                })
                .collect();
            let dry_run = self.dry_run;
            tasks.spawn_blocking(move || {
                let result = write_group(&requests, dry_run);
                (index, file, result)
            });
        }

        let mut changed = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, file, Ok(true))) => changed.push((index, file)),
                Ok((_, _, Ok(false))) => {}
                Ok((index, file, Err(e))) => {
                    error!("Failed to update '{}': {:#}", file.display(), e);
                    failures.push((index, e));
                }
                Err(e) => {
                    error!("Update task did not complete: {}", e);
                    failures.push((usize::MAX, anyhow!(e)));
                }
            }
        }

        failures.sort_by_key(|(index, _)| *index);
        let failed = failures.len();
        if let Some((_, first)) = failures.into_iter().next() {
            return Err(first.context(BumperError::TargetsFailed { failed, total }));
        }

        changed.sort_by_key(|(index, _)| *index);
        Ok(changed.into_iter().map(|(_, file)| file).collect())
    }

    /// Reads the latest version, works out the next one and writes it to every output.
    ///
    /// `explicit` wins over `increment`. Without it the latest version must be known.
    pub async fn release(&self, explicit: Option<Version>, increment: Increment) -> Result<Version> {
        let latest = self.latest_version().await?;
        let version = match explicit {
            Some(version) => version,
            None => {
                let latest = latest
                    .as_ref()
                    .ok_or_else(|| anyhow!("No latest version found, a new version has to be given"))?;
                next_version(latest, increment)
            }
        };

        match &latest {
            Some(latest) => info!("Bumping version {} -> {}", latest, version),
            None => info!("Bumping version to {}", version),
        }
        let changed = self.bump(&version, latest.as_ref()).await?;
        info!("{} file(s) {}", changed.len(), if self.dry_run { "would change" } else { "changed" });
        Ok(version)
    }
}

/// Raises `increment` of `version`, resetting lower components and dropping pre-release and build data.
pub fn next_version(version: &Version, increment: Increment) -> Version {
    let mut next = version.clone();
    match increment {
        Increment::Patch => next.patch += 1,
        Increment::Minor => {
            next.minor += 1;
            next.patch = 0;
        }
        Increment::Major => {
            next.major += 1;
            next.minor = 0;
            next.patch = 0;
        }
    }
    next.pre = Prerelease::EMPTY;
    next.build = BuildMetadata::EMPTY;
    next
}

/// Parses a version given by a user, a leading `v` is accepted.
pub fn parse_user_version(raw: &str) -> Result<Version> {
    parse_version(raw).ok_or_else(|| anyhow!("'{}' is not a valid semantic version", raw))
}

fn read_target(target: &FileTarget) -> Result<Option<Version>> {
    let format = target.format();
    debug!("Reading '{}' as {} from '{}'", target.read_path(), format, target.file.display());
    match format {
        Format::Json => read_version::<JsonParser>(target),
        Format::Yaml => read_version::<YamlParser>(target),
        Format::Toml => read_version::<TomlParser>(target),
        Format::Ini => read_version::<IniParser>(target),
        Format::Xml => read_version::<XmlParser>(target),
        Format::Html => read_version::<HtmlParser>(target),
        Format::Text => read_version::<TextParser>(target),
    }
}

fn write_target(target: &FileTarget, request: &WriteRequest, dry_run: bool) -> Result<bool> {
    let format = target.format();
    debug!("Writing {:?} as {} to '{}'", target.paths, format, target.file.display());
    match format {
        Format::Json => apply_version::<JsonParser>(target, request, dry_run),
        Format::Yaml => apply_version::<YamlParser>(target, request, dry_run),
        Format::Toml => apply_version::<TomlParser>(target, request, dry_run),
        Format::Ini => apply_version::<IniParser>(target, request, dry_run),
        Format::Xml => apply_version::<XmlParser>(target, request, dry_run),
        Format::Html => apply_version::<HtmlParser>(target, request, dry_run),
        Format::Text => apply_version::<TextParser>(target, request, dry_run),
    }
}

/// Applies every request of one file in order, stopping at the first failure.
fn write_group(requests: &[(FileTarget, WriteRequest)], dry_run: bool) -> Result<bool> {
    let mut changed = false;
    for (target, request) in requests {
        changed |= write_target(target, request, dry_run)?;
    }
    Ok(changed)
}

fn read_version<P: Parser>(target: &FileTarget) -> Result<Option<Version>> {
    P::get_current_version(&target.file, target.read_path())
}

fn apply_version<P: Parser>(target: &FileTarget, request: &WriteRequest, dry_run: bool) -> Result<bool> {
    P::update_version(&target.file, request, dry_run)
}
