//! Folder classification.
//!
//! Maps each photo to the folder its placemark is filed under. A strategy
//! derives a *folder key* from the photo:
//!
//! | Strategy | Key |
//! |---|---|
//! | `dir` | parent directory relative to the source root |
//! | `date` | capture date formatted with the configured strftime pattern |
//! | `regex` | first regex match in the parent directory path, else the configured default |
//! | `none` | no key: the shared images folder |
//!
//! Keys are normalized to forward slashes and split on `/`; every level
//! becomes a nested folder under the images folder. Folders are created on
//! first use and cached by their cumulative path (`2020`, `2020/summer`), so
//! classifying the same key twice returns the same [`FolderId`].

use crate::config::{FolderConfig, FoldersBy};
use crate::kml::{Document, FolderId};
use crate::types::format_date;
use chrono::NaiveDateTime;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct FolderClassifier<'a> {
    config: &'a FolderConfig,
    source_root: PathBuf,
    images: FolderId,
    regex: Option<Regex>,
    cache: HashMap<String, FolderId>,
}

impl<'a> FolderClassifier<'a> {
    /// `images` is the folder every key is resolved under.
    pub fn new(
        config: &'a FolderConfig,
        source_root: &Path,
        images: FolderId,
    ) -> Result<Self, regex::Error> {
        let regex = match config.by {
            FoldersBy::Regex => Some(Regex::new(&config.regex)?),
            _ => None,
        };
        Ok(Self {
            config,
            source_root: source_root.to_path_buf(),
            images,
            regex,
            cache: HashMap::new(),
        })
    }

    /// The raw folder key for a photo, before normalization.
    pub fn folder_key(&self, file: &Path, date: &NaiveDateTime) -> Option<String> {
        let parent = file.parent().unwrap_or_else(|| Path::new(""));
        match self.config.by {
            FoldersBy::None => None,
            FoldersBy::Dir => {
                let relative = parent.strip_prefix(&self.source_root).unwrap_or(parent);
                Some(relative.to_string_lossy().into_owned())
            }
            FoldersBy::Date => match format_date(date, &self.config.date_pattern) {
                Ok(key) => Some(key),
                Err(_) => {
                    tracing::warn!(
                        pattern = %self.config.date_pattern,
                        "date pattern cannot format {}, using the images folder",
                        file.display()
                    );
                    None
                }
            },
            FoldersBy::Regex => {
                let haystack = normalize(&parent.to_string_lossy());
                let matched = self
                    .regex
                    .as_ref()
                    .and_then(|re| re.find(&haystack))
                    .map(|m| m.as_str().to_string());
                Some(matched.unwrap_or_else(|| self.config.regex_default.clone()))
            }
        }
    }

    /// Folder for a photo, creating intermediate folders on demand.
    pub fn classify(&mut self, doc: &mut Document, file: &Path, date: &NaiveDateTime) -> FolderId {
        match self.folder_key(file, date) {
            Some(key) => self.resolve(doc, &key),
            None => self.images,
        }
    }

    /// Folder for a key, creating and caching each level on first use.
    pub fn resolve(&mut self, doc: &mut Document, key: &str) -> FolderId {
        let mut parent = self.images;
        let mut cumulative = String::new();
        for level in normalize(key).split('/').filter(|l| !l.is_empty()) {
            if !cumulative.is_empty() {
                cumulative.push('/');
            }
            cumulative.push_str(level);
            parent = match self.cache.get(&cumulative) {
                Some(id) => *id,
                None => {
                    let id = doc.add_folder(parent, level);
                    self.cache.insert(cumulative.clone(), id);
                    id
                }
            };
        }
        parent
    }
}

fn normalize(key: &str) -> String {
    key.replace('\\', "/")
}
