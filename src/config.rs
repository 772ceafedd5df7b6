//! Profile configuration.
//!
//! A profile is a TOML file describing one conversion run: where the photos
//! live, how placemarks are grouped into folders, whether a travel path and
//! folder polygons are drawn, and how each placemark's balloon is built.
//!
//! ## Profile Layout
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! dest = "photos.kml"          # Output KML file
//!
//! [source]
//! dir = "."
//! include = "*.{jpg,JPG,jpeg,JPEG}"
//! exclude = ""                 # "::"-separated path substrings
//! recursive = true
//! follow_links = false
//! include_null_coordinate = false
//! default_lat = 0.0
//! default_lon = 0.0
//!
//! [folder]
//! by = "dir"                   # none | dir | date | regex
//! date_pattern = "%Y-%m"
//! regex = ""
//! regex_default = "Other"
//! root_name = "Photos"
//! root_description = ""
//!
//! [path]
//! draw = false
//! draw_polygon = false
//! width = 2.0
//! split_by = "none"            # none | hour | day | week | month | year
//!
//! [placemark]
//! name_by = "file"             # none | file | date
//! ```
//!
//! Profiles are sparse: stock defaults are serialized to a TOML table and the
//! user's file is merged on top of it, so a profile only names the keys it
//! changes. Unknown keys are rejected to catch typos early.

use crate::types::format_date;
use chrono::NaiveDateTime;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Separator between entries of [`SourceConfig::exclude`].
pub const EXCLUDE_SEPARATOR: &str = "::";

/// Default name of the per-directory external description file.
pub const DEFAULT_DESCRIPTION_FILE: &str = "mapollage_descriptions.txt";

/// A complete, validated run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// Destination KML file.
    pub dest: PathBuf,
    pub source: SourceConfig,
    pub folder: FolderConfig,
    pub path: PathConfig,
    pub placemark: PlacemarkConfig,
    pub photo: PhotoRefConfig,
    pub description: DescriptionConfig,
    pub thumbnail: ThumbnailSettings,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            dest: PathBuf::from("photos.kml"),
            source: SourceConfig::default(),
            folder: FolderConfig::default(),
            path: PathConfig::default(),
            placemark: PlacemarkConfig::default(),
            photo: PhotoRefConfig::default(),
            description: DescriptionConfig::default(),
            thumbnail: ThumbnailSettings::default(),
        }
    }
}

impl Profile {
    /// Validate values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source.include.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source.include must not be empty".into(),
            ));
        }
        globset::Glob::new(&self.source.include).map_err(|e| {
            ConfigError::Validation(format!("source.include is not a valid glob: {e}"))
        })?;
        if !(-90.0..=90.0).contains(&self.source.default_lat) {
            return Err(ConfigError::Validation(
                "source.default_lat must be within -90..90".into(),
            ));
        }
        if !(-180.0..=180.0).contains(&self.source.default_lon) {
            return Err(ConfigError::Validation(
                "source.default_lon must be within -180..180".into(),
            ));
        }
        if self.folder.by == FoldersBy::Regex {
            regex::Regex::new(&self.folder.regex).map_err(|e| {
                ConfigError::Validation(format!("folder.regex is not a valid regex: {e}"))
            })?;
        }
        validate_date_pattern("folder.date_pattern", &self.folder.date_pattern)?;
        validate_date_pattern("placemark.date_pattern", &self.placemark.date_pattern)?;
        if self.path.width <= 0.0 {
            return Err(ConfigError::Validation(
                "path.width must be positive".into(),
            ));
        }
        if self.placemark.scale <= 0.0 || self.placemark.zoom <= 0.0 {
            return Err(ConfigError::Validation(
                "placemark.scale and placemark.zoom must be positive".into(),
            ));
        }
        if (self.photo.limit_width && self.photo.width_limit == 0)
            || (self.photo.limit_height && self.photo.height_limit == 0)
        {
            return Err(ConfigError::Validation(
                "enabled photo size limits must be non-zero".into(),
            ));
        }
        if parse_rgb(&self.thumbnail.border_color).is_none() {
            return Err(ConfigError::Validation(format!(
                "thumbnail.border_color must be a rrggbb hex colour: {}",
                self.thumbnail.border_color
            )));
        }
        if !(1..=100).contains(&self.thumbnail.quality) {
            return Err(ConfigError::Validation(
                "thumbnail.quality must be 1-100".into(),
            ));
        }
        Ok(())
    }

    /// Thumbnails are written when placemarks reference them.
    pub fn needs_thumbnails(&self) -> bool {
        self.photo.reference == Reference::Thumbnail || self.placemark.symbol_as_photo
    }
}

fn validate_date_pattern(key: &str, pattern: &str) -> Result<(), ConfigError> {
    let invalid = || {
        ConfigError::Validation(format!("{key} is not a valid strftime pattern: {pattern}"))
    };
    if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    // Photo timestamps carry no zone, so offset items fail at format time.
    format_date(&NaiveDateTime::default(), pattern).map_err(|_| invalid())?;
    Ok(())
}

/// Where photos are read from and which of them take part in the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Source directory, or a single photo.
    pub dir: PathBuf,
    /// Glob matched against file names, e.g. `*.{jpg,jpeg}`.
    pub include: String,
    /// `::`-separated substrings; any path containing one is skipped.
    pub exclude: String,
    pub recursive: bool,
    pub follow_links: bool,
    /// Emit placemarks at the default coordinate for photos without a fix.
    pub include_null_coordinate: bool,
    pub default_lat: f64,
    pub default_lon: f64,
}

impl SourceConfig {
    /// Non-empty exclude substrings.
    pub fn exclude_patterns(&self) -> Vec<&str> {
        self.exclude
            .split(EXCLUDE_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            include: "*.{jpg,JPG,jpeg,JPEG}".to_string(),
            exclude: String::new(),
            recursive: true,
            follow_links: false,
            include_null_coordinate: false,
            default_lat: 0.0,
            default_lon: 0.0,
        }
    }
}

/// Folder classification strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoldersBy {
    None,
    Dir,
    Date,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderConfig {
    pub by: FoldersBy,
    /// strftime pattern for [`FoldersBy::Date`]; `/` starts a sub-folder.
    pub date_pattern: String,
    pub regex: String,
    /// Folder key used when [`FolderConfig::regex`] does not match.
    pub regex_default: String,
    pub root_name: String,
    pub root_description: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            by: FoldersBy::Dir,
            date_pattern: "%Y-%m".to_string(),
            regex: String::new(),
            regex_default: "Other".to_string(),
            root_name: "Photos".to_string(),
            root_description: String::new(),
        }
    }
}

/// Time granularity used to split the travel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitBy {
    None,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathConfig {
    pub draw: bool,
    pub draw_polygon: bool,
    pub width: f64,
    pub split_by: SplitBy,
    /// KML `aabbggrr` color of path segments.
    pub color: String,
    pub gap_color: String,
    pub polygon_color: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            draw: false,
            draw_polygon: false,
            width: 2.0,
            split_by: SplitBy::None,
            color: "ff0000ff".to_string(),
            gap_color: "ff00ffff".to_string(),
            polygon_color: "4000ff00".to_string(),
        }
    }
}

/// What a photo placemark's label shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameBy {
    None,
    File,
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacemarkConfig {
    pub name_by: NameBy,
    pub date_pattern: String,
    /// Icon scale in the normal style.
    pub scale: f64,
    /// Highlight style scale multiplier.
    pub zoom: f64,
    /// Use the photo itself as the placemark icon.
    pub symbol_as_photo: bool,
    pub timestamp: bool,
}

impl Default for PlacemarkConfig {
    fn default() -> Self {
        Self {
            name_by: NameBy::File,
            date_pattern: "%Y-%m-%d %H:%M".to_string(),
            scale: 1.0,
            zoom: 2.0,
            symbol_as_photo: false,
            timestamp: true,
        }
    }
}

/// How a placemark refers to its photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reference {
    /// `file://` URI of the source photo.
    Absolute,
    /// Base URL joined with the path relative to the source root.
    AbsolutePath,
    /// Path relative to the KML file's directory.
    Relative,
    /// Generated thumbnail beside the KML file.
    Thumbnail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotoRefConfig {
    pub reference: Reference,
    pub base_url: String,
    pub width_limit: u32,
    pub limit_width: bool,
    pub height_limit: u32,
    pub limit_height: bool,
    pub force_lowercase_extension: bool,
}

impl Default for PhotoRefConfig {
    fn default() -> Self {
        Self {
            reference: Reference::Absolute,
            base_url: String::new(),
            width_limit: 400,
            limit_width: true,
            height_limit: 400,
            limit_height: false,
            force_lowercase_extension: false,
        }
    }
}

/// Source of a placemark's description template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionMode {
    None,
    Static,
    Custom,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptionConfig {
    pub mode: DescriptionMode,
    /// Used when an external file has no entry for a photo.
    pub default_mode: DescriptionMode,
    pub photo: bool,
    pub filename: bool,
    pub date: bool,
    pub coordinate: bool,
    pub altitude: bool,
    pub bearing: bool,
    pub custom: String,
    pub external_file: String,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            mode: DescriptionMode::Static,
            default_mode: DescriptionMode::Static,
            photo: true,
            filename: true,
            date: true,
            coordinate: true,
            altitude: false,
            bearing: false,
            custom: String::new(),
            external_file: DEFAULT_DESCRIPTION_FILE.to_string(),
        }
    }
}

/// Thumbnail rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailSettings {
    /// Border width in pixels.
    pub border: u32,
    /// Border color as `rrggbb`.
    pub border_color: String,
    pub quality: u8,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            border: 3,
            border_color: "ffffff".to_string(),
            quality: 85,
        }
    }
}

impl ThumbnailSettings {
    /// Parse [`ThumbnailSettings::border_color`], falling back to white.
    pub fn border_rgb(&self) -> [u8; 3] {
        parse_rgb(&self.border_color).unwrap_or([255, 255, 255])
    }
}

/// `rrggbb`, with an optional leading `#`.
fn parse_rgb(text: &str) -> Option<[u8; 3]> {
    let hex = text.strip_prefix('#').unwrap_or(text);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

// =============================================================================
// Profile loading, merging, and validation
// =============================================================================

/// Returns the stock default profile as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Profile::default())
        .map_err(|e| ConfigError::Validation(format!("default profile must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_profile(overlay: Option<toml::Value>) -> Result<Profile, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let profile: Profile = merged.try_into()?;
    profile.validate()?;
    Ok(profile)
}

/// Load a profile file. A missing file yields the stock defaults.
pub fn load_profile(path: &Path) -> Result<Profile, ConfigError> {
    if !path.exists() {
        return resolve_profile(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_profile(Some(value))
}

/// Returns a fully-commented stock profile with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_profile_toml() -> &'static str {
    r##"# Mapollage Profile
# =================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# Output KML file. Thumbnails go to "<name>-thumbnails/" beside it.
dest = "photos.kml"

# ---------------------------------------------------------------------------
# Source photos
# ---------------------------------------------------------------------------
[source]
# Directory to scan, or a single photo.
dir = "."
# Glob matched against file names.
include = "*.{jpg,JPG,jpeg,JPEG}"
# Paths containing any of these "::"-separated substrings are skipped.
exclude = ""
recursive = true
follow_links = false
# Place photos without a usable GPS fix at the default coordinate.
include_null_coordinate = false
default_lat = 0.0
default_lon = 0.0

# ---------------------------------------------------------------------------
# Folders
# ---------------------------------------------------------------------------
[folder]
# none | dir | date | regex
by = "dir"
# strftime pattern for by = "date". A "/" starts a sub-folder.
date_pattern = "%Y-%m"
# Matched against each photo's directory for by = "regex".
regex = ""
regex_default = "Other"
root_name = "Photos"
root_description = ""

# ---------------------------------------------------------------------------
# Travel path and folder polygons
# ---------------------------------------------------------------------------
[path]
draw = false
draw_polygon = false
width = 2.0
# none | hour | day | week | month | year
split_by = "none"
# KML colors are aabbggrr.
color = "ff0000ff"
gap_color = "ff00ffff"
polygon_color = "4000ff00"

# ---------------------------------------------------------------------------
# Placemarks
# ---------------------------------------------------------------------------
[placemark]
# none | file | date
name_by = "file"
date_pattern = "%Y-%m-%d %H:%M"
scale = 1.0
# Highlight icon scale multiplier.
zoom = 2.0
symbol_as_photo = false
timestamp = true

# ---------------------------------------------------------------------------
# Photo references
# ---------------------------------------------------------------------------
[photo]
# absolute | absolute_path | relative | thumbnail
reference = "absolute"
# Prefix for reference = "absolute_path".
base_url = ""
width_limit = 400
limit_width = true
height_limit = 400
limit_height = false
force_lowercase_extension = false

# ---------------------------------------------------------------------------
# Descriptions
# ---------------------------------------------------------------------------
[description]
# none | static | custom | external
mode = "static"
# Used when an external description file has no entry for a photo.
default_mode = "static"
# Segments of the static template.
photo = true
filename = true
date = true
coordinate = true
altitude = false
bearing = false
# Template for mode = "custom". Tokens: {photo} {filename} {date}
# {coordinate} {altitude} {bearing}
custom = ""
external_file = "mapollage_descriptions.txt"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnail]
border = 3
border_color = "ffffff"
quality = 85
"##
}
