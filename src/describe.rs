//! Placemark descriptions and photo references.
//!
//! A description is a template with placeholder tokens:
//!
//! | Token | Value |
//! |---|---|
//! | `{photo}` | `<img>` tag pointing at the photo reference, sized by the limits |
//! | `{filename}` | file name with extension |
//! | `{date}` | capture date, `%Y-%m-%d %H:%M:%S` |
//! | `{coordinate}` | `lat, lon` |
//! | `{altitude}` | GPS altitude in metres |
//! | `{bearing}` | GPS image direction in degrees |
//!
//! Location tokens render empty for photos without a real fix.
//!
//! The template comes from the description mode: the static template built
//! from the enabled segments, the custom template, or an external properties
//! file. External files are looked up per photo directory and in the source
//! root, keyed by file stem:
//!
//! ```text
//! directory[stem] → root[stem] → directory[default] → root[default] → default mode
//! ```

use crate::config::{DescriptionConfig, DescriptionMode, PhotoRefConfig, Reference};
use crate::metadata::PhotoRecord;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Key of the fallback entry in an external description file.
pub const DEFAULT_KEY: &str = "default";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wrap text in a CDATA section when it contains markup characters.
pub fn cdata_wrap(text: &str) -> String {
    if text.contains(['<', '>', '&']) {
        format!("<![CDATA[{text}]]>")
    } else {
        text.to_string()
    }
}

// =============================================================================
// Photo references
// =============================================================================

/// Name of the thumbnail directory created beside `dest`.
pub fn thumbnail_dir_name(dest: &Path) -> String {
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}-thumbnails")
}

/// File name of a thumbnail for a photo with checksum `crc`.
pub fn thumbnail_file_name(crc: u32) -> String {
    format!("{}.jpg", crate::style::checksum_hex(crc))
}

/// Where a photo reference points.
pub struct RefContext<'a> {
    pub source_root: &'a Path,
    /// Output KML file.
    pub dest: &'a Path,
}

/// Reference to `photo` as used in `<img>` tags and photo icons.
pub fn photo_href(config: &PhotoRefConfig, ctx: &RefContext, photo: &Path, crc: u32) -> String {
    let href = match config.reference {
        Reference::Absolute => file_uri(photo),
        Reference::AbsolutePath => {
            let relative = photo.strip_prefix(ctx.source_root).unwrap_or(photo);
            format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                slashed(relative)
            )
        }
        Reference::Relative => {
            let from = ctx.dest.parent().unwrap_or_else(|| Path::new(""));
            slashed(&relative_path(from, photo))
        }
        Reference::Thumbnail => format!(
            "{}/{}",
            thumbnail_dir_name(ctx.dest),
            thumbnail_file_name(crc)
        ),
    };
    if config.force_lowercase_extension {
        lowercase_extension(&href)
    } else {
        href
    }
}

fn slashed(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// `file://` URI with every path segment percent-encoded.
fn file_uri(path: &Path) -> String {
    let path = slashed(path)
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            if i == 0 && is_drive(segment) {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join("/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}

/// `C:` and the like.
fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn lowercase_extension(href: &str) -> String {
    let name_start = href.rfind('/').map_or(0, |i| i + 1);
    match href[name_start..].rfind('.') {
        Some(dot) => {
            let split = name_start + dot;
            format!("{}{}", &href[..split], href[split..].to_lowercase())
        }
        None => href.to_string(),
    }
}

/// Path from directory `from` to `to`, both absolute or both relative.
fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

// =============================================================================
// Templates
// =============================================================================

/// Values substituted into a template for one photo.
pub struct Tokens<'a> {
    pub record: &'a PhotoRecord,
    pub href: &'a str,
    /// Display size of the `<img>` tag.
    pub size: (u32, u32),
}

impl Tokens<'_> {
    fn photo(&self) -> String {
        format!(
            "<img src=\"{}\" width=\"{}\" height=\"{}\" />",
            self.href, self.size.0, self.size.1
        )
    }

    fn filename(&self) -> String {
        self.record
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn coordinate(&self) -> String {
        if self.record.has_location() {
            format!(
                "{}, {}",
                self.record.coordinate.lat, self.record.coordinate.lon
            )
        } else {
            String::new()
        }
    }

    fn located(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if self.record.has_location() => format!("{v:.1}"),
            _ => String::new(),
        }
    }
}

/// Replace every known token in `template`.
pub fn substitute(template: &str, tokens: &Tokens) -> String {
    template
        .replace("{photo}", &tokens.photo())
        .replace("{filename}", &tokens.filename())
        .replace("{date}", &tokens.record.date.format(DATE_FORMAT).to_string())
        .replace("{coordinate}", &tokens.coordinate())
        .replace("{altitude}", &tokens.located(tokens.record.altitude))
        .replace("{bearing}", &tokens.located(tokens.record.bearing))
}

/// Template holding only the enabled segments, one per line.
pub fn static_template(config: &DescriptionConfig) -> String {
    let segments = [
        (config.photo, "{photo}"),
        (config.filename, "{filename}"),
        (config.date, "{date}"),
        (config.coordinate, "{coordinate}"),
        (config.altitude, "{altitude}"),
        (config.bearing, "{bearing}"),
    ];
    segments
        .iter()
        .filter(|(enabled, _)| *enabled)
        .map(|(_, token)| *token)
        .collect::<Vec<_>>()
        .join("<br />")
}

// =============================================================================
// External description files
// =============================================================================

/// Parse a properties-style file: `key=value` or `key: value`, with `#` and
/// `!` comment lines. Later duplicates win.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split = line.find(['=', ':']);
        let (key, value) = match split {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    map
}

/// Builds descriptions, caching external description files per directory.
pub struct Describer<'a> {
    config: &'a DescriptionConfig,
    source_root: PathBuf,
    files: HashMap<PathBuf, HashMap<String, String>>,
}

impl<'a> Describer<'a> {
    pub fn new(config: &'a DescriptionConfig, source_root: &Path) -> Self {
        Self {
            config,
            source_root: source_root.to_path_buf(),
            files: HashMap::new(),
        }
    }

    /// Description for one photo, CDATA-wrapped where needed.
    /// `None` when descriptions are disabled.
    pub fn describe(&mut self, tokens: &Tokens) -> Option<String> {
        let template = match self.config.mode {
            DescriptionMode::External => match self.external_template(&tokens.record.path) {
                Some(text) => Some(text),
                None => self.template_for(self.config.default_mode),
            },
            mode => self.template_for(mode),
        }?;
        Some(cdata_wrap(&substitute(&template, tokens)))
    }

    fn template_for(&self, mode: DescriptionMode) -> Option<String> {
        match mode {
            DescriptionMode::None => None,
            DescriptionMode::Custom => Some(self.config.custom.clone()),
            // an external fallback that is itself external renders the static template
            DescriptionMode::Static | DescriptionMode::External => {
                Some(static_template(self.config))
            }
        }
    }

    fn external_template(&mut self, photo: &Path) -> Option<String> {
        let stem = photo.file_stem()?.to_string_lossy().into_owned();
        let dir = photo
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();
        let root = self.source_root.clone();

        let lookups = [(&dir, stem.as_str()), (&root, stem.as_str())];
        let defaults = [(&dir, DEFAULT_KEY), (&root, DEFAULT_KEY)];
        for (directory, key) in lookups.into_iter().chain(defaults) {
            if let Some(text) = self.properties(directory).get(key) {
                return Some(text.clone());
            }
        }
        None
    }

    fn properties(&mut self, dir: &Path) -> &HashMap<String, String> {
        let file = dir.join(&self.config.external_file);
        self.files.entry(dir.to_path_buf()).or_insert_with(|| {
            match std::fs::read_to_string(&file) {
                Ok(text) => parse_properties(&text),
                Err(e) => {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %file.display(), error = %e, "Unreadable description file");
                    }
                    HashMap::new()
                }
            }
        })
    }
}
