/// Pipeline orchestration
///
/// This module handles:
/// - Checking folder-name uniqueness across the manifest
/// - Synchronizing each entity folder (convert, rename)
/// - Relinking each record's image list from the folder contents
/// - Writing the updated manifest back in one pass

pub mod convert;
pub mod folder;
pub mod link;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::OrganizeError;
use crate::manifest::Manifest;

/// Inputs for one organizer run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub manifest_path: PathBuf,
    pub base_dir: PathBuf,
    pub conversions: BTreeMap<String, String>,
    pub dry_run: bool,
}

/// Progress notifications surfaced to the caller as they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    FolderCreated { path: PathBuf },
    FolderExists { path: PathBuf },
    Converted { from: String, to: String },
    Renamed { from: String, to: String },
    AlreadyCanonical { entity: String, file: String },
    EntityFailed { label: String, message: String },
}

/// Counters accumulated across the whole run.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub entities: usize,
    pub failed: usize,
    pub renamed: usize,
    pub converted: usize,
    pub skipped: usize,
}

/// Run the full pipeline: load, sync every entity, relink, save.
///
/// Per-entity failures are reported through `on_event` and counted in the
/// summary without stopping the run. Only manifest-level problems (unreadable
/// or unwritable manifest, duplicate folder names) abort with an error.
pub fn run(
    opts: &RunOptions,
    on_event: &mut dyn FnMut(SyncEvent),
) -> Result<RunSummary, OrganizeError> {
    let mut manifest = Manifest::load(&opts.manifest_path)?;
    manifest.check_folder_names()?;

    if !opts.dry_run {
        fs::create_dir_all(&opts.base_dir)?;
    }

    let mut summary = RunSummary {
        entities: manifest.restaurants.len(),
        ..Default::default()
    };

    for (index, record) in manifest.restaurants.iter_mut().enumerate() {
        let name = match record.folder_name() {
            Some(name) => name.to_string(),
            None => {
                let err = OrganizeError::MissingEntityName { index };
                warn!(index, "record skipped: no usable name");
                on_event(SyncEvent::EntityFailed {
                    label: format!("record {index}"),
                    message: err.to_string(),
                });
                summary.failed += 1;
                continue;
            }
        };

        let folder_path = opts.base_dir.join(&name);
        match folder::sync_folder(
            &folder_path,
            &name,
            &opts.conversions,
            opts.dry_run,
            &mut *on_event,
        ) {
            Ok(outcome) => {
                summary.renamed += outcome.renamed;
                summary.converted += outcome.converted;
                summary.skipped += outcome.skipped;
                record.images = link::image_refs(&folder_path, &name);
            }
            Err(err) => {
                warn!(entity = %name, error = %err, "entity failed, continuing with the next");
                on_event(SyncEvent::EntityFailed {
                    label: name.clone(),
                    message: err.to_string(),
                });
                summary.failed += 1;
            }
        }
    }

    if !opts.dry_run {
        manifest.save()?;
    }
    info!(
        entities = summary.entities,
        renamed = summary.renamed,
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed,
        "run complete"
    );

    Ok(summary)
}
