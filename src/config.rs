use crate::format::Format;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".bumper.toml";

/// Path read and written when a file descriptor names none.
pub const DEFAULT_PATH: &str = "version";

/// Where to read the current version from and which files to write the new one to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BumperConfig {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub input: Option<FileOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out: Option<OneOrMany<FileOption>>,
}

/// A value that may be given either on its own or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    // Lists are tried first, a struct can also be deserialized from a sequence.
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// A file given either by name alone or with its full set of options.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FileOption {
    File(String),
    Detailed(FileDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub file: String,

    /// Content type overriding the format implied by the file extension.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<OneOrMany<String>>,

    #[serde(alias = "version_prefix", default, skip_serializing_if = "Option::is_none")]
    pub version_prefix: Option<String>,

    #[serde(alias = "consume_whole_file", default)]
    pub consume_whole_file: bool,
}

/// A single file to read from or write to, with every option resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub file: PathBuf,
    pub declared_type: Option<String>,
    pub paths: Vec<String>,
    pub version_prefix: String,
    pub consume_whole_file: bool,
}

impl FileTarget {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            declared_type: None,
            paths: vec![DEFAULT_PATH.to_string()],
            version_prefix: String::new(),
            consume_whole_file: false,
        }
    }

    pub fn format(&self) -> Format {
        Format::resolve(&self.file, self.declared_type.as_deref())
    }

    /// The path used when reading, which is the first configured one.
    pub fn read_path(&self) -> &str {
        self.paths.first().map(String::as_str).unwrap_or(DEFAULT_PATH)
    }

    /// A copy of this target pointing at another file.
    pub fn with_file(&self, file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            ..self.clone()
        }
    }
}

impl From<FileOption> for FileTarget {
    fn from(option: FileOption) -> Self {
        match option {
            FileOption::File(file) => FileTarget::new(file),
            FileOption::Detailed(descriptor) => {
                let paths = descriptor
                    .path
                    .map(OneOrMany::into_vec)
                    .filter(|paths| !paths.is_empty())
                    .unwrap_or_else(|| vec![DEFAULT_PATH.to_string()]);
                FileTarget {
                    file: PathBuf::from(descriptor.file),
                    declared_type: descriptor.content_type,
                    paths,
                    version_prefix: descriptor.version_prefix.unwrap_or_default(),
                    consume_whole_file: descriptor.consume_whole_file,
                }
            }
        }
    }
}

impl BumperConfig {
    /// Loads a configuration file, as JSON when it has a `.json` extension and as TOML otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            toml::from_str(&contents).with_context(|| format!("Invalid config file {}", path.display()))
        }
    }

    /// Builds a configuration from bare file names.
    pub fn from_files(input: Option<String>, out: Vec<String>) -> Self {
        Self {
            input: input.map(FileOption::File),
            out: (!out.is_empty()).then(|| OneOrMany::Many(out.into_iter().map(FileOption::File).collect())),
        }
    }

    pub fn input_target(&self) -> Option<FileTarget> {
        self.input.clone().map(FileTarget::from)
    }

    /// Output targets in configuration order, glob patterns not yet expanded.
    pub fn output_targets(&self) -> Vec<FileTarget> {
        self.out
            .clone()
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(FileTarget::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_config() {
        let config: BumperConfig = toml::from_str(
            r#"
in = "package.json"

[[out]]
file = "Cargo.toml"
path = "package.version"

[[out]]
file = "manifest.json"
path = ["version", "deep.version"]
versionPrefix = "^"

[[out]]
file = "VERSION"
type = "text/plain"
consume_whole_file = true
"#,
        )
        .unwrap();

        let input = config.input_target().unwrap();
        assert_eq!(input.file, PathBuf::from("package.json"));
        assert_eq!(input.paths, vec!["version".to_string()]);
        assert_eq!(input.format(), Format::Json);

        let out = config.output_targets();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].paths, vec!["package.version".to_string()]);
        assert_eq!(out[0].format(), Format::Toml);
        assert_eq!(out[1].paths, vec!["version".to_string(), "deep.version".to_string()]);
        assert_eq!(out[1].version_prefix, "^");
        assert_eq!(out[2].format(), Format::Text);
        assert!(out[2].consume_whole_file);
    }

    #[test]
    fn test_parse_json_config_with_single_out() {
        let config: BumperConfig = serde_json::from_str(
            r#"{ "in": { "file": "VERSION", "type": "text/plain" }, "out": "README.md" }"#,
        )
        .unwrap();
        assert_eq!(config.input_target().unwrap().declared_type.as_deref(), Some("text/plain"));
        assert_eq!(config.output_targets(), vec![FileTarget::new("README.md")]);
    }

    #[test]
    fn test_parse_json_config_with_mixed_out() {
        let config: BumperConfig = serde_json::from_str(
            r#"{ "out": ["README.md", { "file": "pom.xml", "path": "project > version", "consumeWholeFile": false }] }"#,
        )
        .unwrap();
        let out = config.output_targets();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].read_path(), "project > version");
        assert_eq!(out[1].format(), Format::Xml);
    }

    #[test]
    fn test_empty_config() {
        let config: BumperConfig = toml::from_str("").unwrap();
        assert!(config.input_target().is_none());
        assert!(config.output_targets().is_empty());
    }

    #[test]
    fn test_from_files() {
        let config = BumperConfig::from_files(Some("VERSION".into()), vec!["a.json".into(), "b.txt".into()]);
        assert_eq!(config.input_target(), Some(FileTarget::new("VERSION")));
        assert_eq!(config.output_targets().len(), 2);
        assert!(BumperConfig::from_files(None, vec![]).out.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".bumper.toml");
        fs::write(&path, "out = [\"VERSION\"]\n").unwrap();
        let config = BumperConfig::load(&path).unwrap();
        assert_eq!(config.output_targets(), vec![FileTarget::new("VERSION")]);
        assert!(BumperConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_list_of_bare_files() {
        let config: BumperConfig = toml::from_str("out = [\"a.json\", \"b.txt\"]\n").unwrap();
        assert_eq!(
            config.output_targets(),
            vec![FileTarget::new("a.json"), FileTarget::new("b.txt")]
        );
    }
}
