/// Manifest records and their JSON round-trip
///
/// The manifest is an array of restaurant records. The organizer owns the
/// `name` and `images` fields; every other field a record carries (cuisine,
/// price, tags, ...) is display data for the frontend and passes through a
/// flattened map untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::OrganizeError;

/// One restaurant record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    /// Display name; trimmed before use as a folder name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Relative image paths, rewritten wholesale on every run.
    #[serde(default)]
    pub images: Vec<String>,
    /// Fields the organizer does not own, preserved as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Restaurant {
    /// The trimmed entity name, or `None` when absent or blank.
    pub fn folder_name(&self) -> Option<&str> {
        match &self.name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }
            None => None,
        }
    }
}

/// The manifest file and its parsed records.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    pub restaurants: Vec<Restaurant>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, OrganizeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| OrganizeError::ManifestRead {
            path: path.display().to_string(),
            source,
        })?;
        let restaurants =
            serde_json::from_str(&raw).map_err(|source| OrganizeError::ManifestParse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            restaurants,
        })
    }

    /// Verify that every record maps to a usable, unique folder name.
    ///
    /// A name with path separators (or a bare dot component) would nest its
    /// folder inside another one or escape the base directory entirely;
    /// names differing only in surrounding whitespace would silently share a
    /// folder and overwrite each other's image lists.
    pub fn check_folder_names(&self) -> Result<(), OrganizeError> {
        let mut seen: std::collections::BTreeMap<&str, &str> = std::collections::BTreeMap::new();
        for record in &self.restaurants {
            let folder = match record.folder_name() {
                Some(folder) => folder,
                None => continue,
            };
            if !is_plain_component(folder) {
                return Err(OrganizeError::UnusableFolderName {
                    name: folder.to_string(),
                });
            }
            let raw = record.name.as_deref().unwrap_or("");
            if let Some(first) = seen.insert(folder, raw) {
                return Err(OrganizeError::DuplicateFolder {
                    first: first.to_string(),
                    second: raw.to_string(),
                    folder: folder.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Rewrite the manifest in place.
    ///
    /// Pretty-printed JSON (2-space indent, non-ASCII kept literal) written
    /// to a sibling temp file and renamed over the original, so a crash
    /// mid-write never leaves a truncated manifest.
    pub fn save(&self) -> Result<(), OrganizeError> {
        let rendered = serde_json::to_string_pretty(&self.restaurants)
            .map_err(|source| OrganizeError::ManifestSerialize { source })?;

        let tmp_path = tmp_write_path(&self.path);
        let write_result = (|| -> Result<(), std::io::Error> {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(rendered.as_bytes())?;
            writer.flush()?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            Ok(())
        })();

        if let Err(source) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(OrganizeError::ManifestWrite {
                path: tmp_path.display().to_string(),
                source,
            });
        }

        fs::rename(&tmp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            OrganizeError::ManifestWrite {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        Ok(())
    }
}

/// True when the name stays a single path component.
fn is_plain_component(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}
