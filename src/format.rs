use std::fmt;
use std::path::Path;

/// File formats the bumper knows how to read and write.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Format {
    Json,
    Yaml,
    Toml,
    Ini,
    Xml,
    Html,
    #[default]
    Text,
}

impl Format {
    /// Resolves the format of a file.
    ///
    /// A declared content type always wins over the file extension, so a caller can force
    /// plain text handling on a file whose extension does not describe its contents.
    /// Anything unrecognised resolves to [`Format::Text`].
    pub fn resolve(file: impl AsRef<Path>, declared_type: Option<&str>) -> Self {
        match declared_type {
            Some(content_type) => Self::from_content_type(content_type).unwrap_or_default(),
            None => file
                .as_ref()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Self::from_extension)
                .unwrap_or_default(),
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        // Parameters such as `; charset=utf-8` do not affect the format.
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        match essence.to_ascii_lowercase().as_str() {
            "application/json" => Some(Self::Json),
            "text/yaml" | "application/x-yaml" | "application/yaml" => Some(Self::Yaml),
            "application/toml" | "text/toml" => Some(Self::Toml),
            "text/x-properties" => Some(Self::Ini),
            "application/xml" | "text/xml" => Some(Self::Xml),
            "text/html" | "application/xhtml+xml" => Some(Self::Html),
            "text/plain" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            "ini" => Some(Self::Ini),
            "xml" => Some(Self::Xml),
            "html" | "xhtml" => Some(Self::Html),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Json => "JSON",
            Format::Yaml => "YAML",
            Format::Toml => "TOML",
            Format::Ini => "INI",
            Format::Xml => "XML",
            Format::Html => "HTML",
            Format::Text => "text",
        };
        f.write_str(name)
    }
}
