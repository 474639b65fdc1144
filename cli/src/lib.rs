use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use cleanup::CleanupConfig;
use regex::Regex;
use schemars::JsonSchema;
use segmentation::RembgConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use thumbnail::{Concept, PipelineOptions, RenderRequest};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Font files for the provider line and the title.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct FontConfig {
    pub regular: String,
    pub bold: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            regular: "Inter-Regular.ttf".to_string(),
            bold: "Inter-Bold.ttf".to_string(),
        }
    }
}

/// One thumbnail in a batch
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ThumbnailJob {
    pub image_url: String,
    pub game_title: String,
    pub provider: String,
    pub seed: Option<u64>,
    pub concept: Option<Concept>,
    /// File name inside the output directory; derived from title and provider when absent
    pub output: Option<String>,
}

impl ThumbnailJob {
    pub fn request(&self) -> RenderRequest {
        RenderRequest {
            image_url: self.image_url.clone(),
            game_title: self.game_title.clone(),
            provider: self.provider.clone(),
            seed: self.seed,
            concept: self.concept,
        }
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        let name = match &self.output {
            Some(name) => {
                let stem = name.strip_suffix(".png").unwrap_or(name);
                format!("{}.png", sanitize_filename(stem))
            }
            None => output_filename(&self.game_title, &self.provider),
        };
        output_dir.join(name)
    }
}

/// Batch configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ThumbnailJobFile {
    pub output_dir: String,
    #[serde(default = "default_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub fonts: FontConfig,
    #[serde(default)]
    pub pipeline: PipelineOptions,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub segmentation: RembgConfig,
    pub jobs: Vec<ThumbnailJob>,
}

fn default_concurrency() -> usize {
    10
}

impl ThumbnailJobFile {
    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CliError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(CliError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml(&self) -> Result<String, CliError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn to_json(&self) -> Result<String, CliError> {
        Ok(serde_json::to_string_pretty(&self)?)
    }
}

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").expect("valid regex"));

/// Filesystem-safe name: punctuation dropped, runs of spaces/dashes become `_`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name, "");
    let joined = SEPARATORS.replace_all(&cleaned, "_");
    joined.trim_matches('_').to_string()
}

/// `path` unchanged when it already ends in `.png`, otherwise with `.png` appended.
pub fn with_png_extension(path: &Path) -> PathBuf {
    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    if is_png {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(".png");
    PathBuf::from(name)
}

/// `{title}__{provider}.png`
pub fn output_filename(game_title: &str, provider: &str) -> String {
    format!("{}__{}.png", sanitize_filename(game_title), sanitize_filename(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Sweet Bonanza 1000!"), "Sweet_Bonanza_1000");
        assert_eq!(sanitize_filename("  Book of -- Dead  "), "Book_of_Dead");
        assert_eq!(sanitize_filename("MGS_RedRake"), "MGS_RedRake");
        assert_eq!(output_filename("15DragonCoins", "Booongo"), "15DragonCoins__Booongo.png");
    }

    #[test]
    fn test_job_file_from_toml_uses_defaults() {
        let file = ThumbnailJobFile::from_toml(
            r#"
            output_dir = "out"

            [[jobs]]
            image_url = "https://cdn.example.com/a.png"
            game_title = "VIPAutoRoulette"
            provider = "Evolution"
            concept = "v2"
            "#,
        )
        .expect("Should parse TOML");
        assert_eq!(file.max_concurrency, 10);
        assert_eq!(file.fonts, FontConfig::default());
        assert_eq!(file.pipeline, PipelineOptions::default());
        assert_eq!(file.jobs[0].concept, Some(Concept::V2));
        assert_eq!(
            file.jobs[0].output_path(Path::new("out")),
            PathBuf::from("out/VIPAutoRoulette__Evolution.png")
        );
    }

    #[test]
    fn test_explicit_output_is_sanitized() {
        let mut job = ThumbnailJob {
            image_url: "https://cdn.example.com/a.jpg".into(),
            game_title: "Book of Dead".into(),
            provider: "Play'n GO".into(),
            seed: None,
            concept: None,
            output: Some("my thumb".into()),
        };
        assert_eq!(job.output_path(Path::new("out")), PathBuf::from("out/my_thumb.png"));
        job.output = Some("custom.png".into());
        assert_eq!(job.output_path(Path::new("out")), PathBuf::from("out/custom.png"));
    }

    #[test]
    fn test_png_extension_appended_when_missing() {
        assert_eq!(with_png_extension(Path::new("out/thumb")), PathBuf::from("out/thumb.png"));
        assert_eq!(
            with_png_extension(Path::new("out/thumb.v2")),
            PathBuf::from("out/thumb.v2.png")
        );
        assert_eq!(with_png_extension(Path::new("thumb.PNG")), PathBuf::from("thumb.PNG"));
        assert_eq!(with_png_extension(Path::new("thumb.png")), PathBuf::from("thumb.png"));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let file = ThumbnailJobFile {
            output_dir: "thumbs".into(),
            max_concurrency: 2,
            fonts: FontConfig::default(),
            pipeline: PipelineOptions::default(),
            cleanup: CleanupConfig::default(),
            segmentation: RembgConfig::default(),
            jobs: vec![ThumbnailJob {
                image_url: "https://cdn.example.com/a.png".into(),
                game_title: "15DragonCoins".into(),
                provider: "Booongo".into(),
                seed: Some(1),
                concept: None,
                output: Some("custom.png".into()),
            }],
        };
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("jobs.json");
        fs::write(&path, file.to_json().expect("Should serialize")).expect("Should write");
        assert_eq!(ThumbnailJobFile::from_file(&path).expect("Should load"), file);
        assert!(matches!(
            ThumbnailJobFile::from_file(dir.path().join("jobs.yaml")),
            Err(CliError::UnsupportedFileFormat)
        ));
    }
}
