/// Folder synchronization
///
/// Brings one entity folder to canonical state. Files are processed in
/// sorted order with a running index counter that advances once per file. A
/// file whose name already starts with the entity name is left alone;
/// anything else is renamed to `{Name}_{index}{ext}`, probing the index
/// forward until the candidate name is free. Legacy formats are converted
/// before the naming decision.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::convert;
use super::SyncEvent;
use crate::error::OrganizeError;

/// Counters for one folder pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyncOutcome {
    pub renamed: usize,
    pub converted: usize,
    pub skipped: usize,
}

/// List the folder's regular files, minus dotfiles, sorted by name.
///
/// An absent folder lists as empty. Only direct children are considered.
pub fn list_files(folder: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| !name.starts_with('.'))
        .collect();
    files.sort();
    files
}

/// Smallest free canonical name at or after `counter`.
///
/// Advances `counter` to the index actually used; the caller bumps it once
/// more after consuming the name, so the next file starts probing past it.
pub fn next_free_name(
    name: &str,
    ext: &str,
    counter: &mut u32,
    taken: impl Fn(&str) -> bool,
) -> String {
    loop {
        let candidate = format!("{}_{}{}", name, counter, ext);
        if !taken(&candidate) {
            return candidate;
        }
        *counter += 1;
    }
}

/// Bring one entity folder to canonical state.
///
/// In a dry run every decision is still computed and reported, but nothing
/// on disk changes.
pub fn sync_folder(
    folder: &Path,
    name: &str,
    conversions: &BTreeMap<String, String>,
    dry_run: bool,
    on_event: &mut dyn FnMut(SyncEvent),
) -> Result<SyncOutcome, OrganizeError> {
    if folder.is_dir() {
        on_event(SyncEvent::FolderExists {
            path: folder.to_path_buf(),
        });
    } else {
        if !dry_run {
            fs::create_dir_all(folder)?;
        }
        info!(folder = %folder.display(), "created entity folder");
        on_event(SyncEvent::FolderCreated {
            path: folder.to_path_buf(),
        });
    }

    let files = list_files(folder);
    // Names the folder will hold, kept current across renames so dry runs
    // can probe without touching the filesystem.
    let mut present: BTreeSet<String> = files.iter().cloned().collect();
    let mut outcome = SyncOutcome::default();
    let mut counter: u32 = 1;

    for file in files {
        let mut current = file;
        let mut ext = extension_of(&current);

        if let Some(target_ext) = conversions.get(ext.trim_start_matches('.')) {
            let new_name = replace_extension(&current, target_ext);
            if dry_run {
                if present.contains(&new_name) {
                    return Err(OrganizeError::Io(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!(
                            "conversion target {} already exists",
                            folder.join(&new_name).display()
                        ),
                    )));
                }
            } else {
                convert::normalize_format(&folder.join(&current), target_ext)?;
            }
            present.remove(&current);
            present.insert(new_name.clone());
            outcome.converted += 1;
            on_event(SyncEvent::Converted {
                from: current.clone(),
                to: new_name.clone(),
            });
            current = new_name;
            ext = extension_of(&current);
        }

        if current.starts_with(name) {
            debug!(entity = name, file = %current, "already canonical, skipping");
            outcome.skipped += 1;
            on_event(SyncEvent::AlreadyCanonical {
                entity: name.to_string(),
                file: current,
            });
        } else {
            let target_name = {
                let taken = |cand: &str| present.contains(cand) || folder.join(cand).exists();
                next_free_name(name, &ext, &mut counter, taken)
            };
            if !dry_run {
                let from = folder.join(&current);
                let to = folder.join(&target_name);
                fs::rename(&from, &to).map_err(|source| OrganizeError::RenameFailed {
                    from: from.display().to_string(),
                    to: to.display().to_string(),
                    source,
                })?;
            }
            info!(entity = name, from = %current, to = %target_name, "renamed file");
            present.remove(&current);
            present.insert(target_name.clone());
            outcome.renamed += 1;
            on_event(SyncEvent::Renamed {
                from: current,
                to: target_name,
            });
        }
        counter += 1;
    }

    Ok(outcome)
}

/// Lowercased extension including the dot, or empty for extension-less names.
fn extension_of(name: &str) -> String {
    match Path::new(name).extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_lowercase()),
        None => String::new(),
    }
}

/// Swap the suffix after the last dot, or append one.
fn replace_extension(name: &str, new_ext: &str) -> String {
    match name.rfind('.') {
        Some(dot) => format!("{}.{}", &name[..dot], new_ext),
        None => format!("{}.{}", name, new_ext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_conversions() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn webp_to_jpg() -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("webp".to_string(), "jpg".to_string());
        map
    }

    fn run_sync(
        folder: &Path,
        name: &str,
        conversions: &BTreeMap<String, String>,
        dry_run: bool,
    ) -> (SyncOutcome, Vec<SyncEvent>) {
        let mut events = Vec::new();
        let outcome = sync_folder(folder, name, conversions, dry_run, &mut |e| events.push(e))
            .unwrap();
        (outcome, events)
    }

    fn folder_contents(folder: &Path) -> Vec<String> {
        list_files(folder)
    }

    #[test]
    fn test_missing_folder_is_created() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Trattoria Da Mario");

        let (_, events) = run_sync(&folder, "Trattoria Da Mario", &no_conversions(), false);

        assert!(folder.is_dir());
        assert!(matches!(events[0], SyncEvent::FolderCreated { .. }));
    }

    #[test]
    fn test_files_renamed_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("b.jpg"), b"x").unwrap();
        fs::write(folder.join("a.jpg"), b"x").unwrap();

        let (outcome, _) = run_sync(&folder, "Mario", &no_conversions(), false);

        assert_eq!(outcome.renamed, 2);
        assert_eq!(folder_contents(&folder), vec!["Mario_1.jpg", "Mario_2.jpg"]);
        // a.jpg sorted first, so it owns index 1
        assert_eq!(fs::read(folder.join("Mario_1.jpg")).unwrap(), b"x");
    }

    #[test]
    fn test_canonical_file_skipped_and_index_probed_past_it() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Trattoria Da Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("Trattoria Da Mario_2.jpg"), b"keep").unwrap();
        fs::write(folder.join("a.jpg"), b"new").unwrap();

        let (outcome, _) = run_sync(&folder, "Trattoria Da Mario", &no_conversions(), false);

        // The canonical file sorts first (uppercase T before lowercase a),
        // advances the counter to 2, and a.jpg probes past the taken index.
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.renamed, 1);
        assert_eq!(
            folder_contents(&folder),
            vec!["Trattoria Da Mario_2.jpg", "Trattoria Da Mario_3.jpg"]
        );
        assert_eq!(
            fs::read(folder.join("Trattoria Da Mario_2.jpg")).unwrap(),
            b"keep"
        );
    }

    #[test]
    fn test_legacy_file_converted_then_renamed() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Trattoria Da Mario");
        fs::create_dir_all(&folder).unwrap();
        image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]))
            .save(folder.join("photo.webp"))
            .unwrap();

        let (outcome, events) = run_sync(&folder, "Trattoria Da Mario", &webp_to_jpg(), false);

        assert_eq!(outcome.converted, 1);
        assert_eq!(outcome.renamed, 1);
        assert_eq!(folder_contents(&folder), vec!["Trattoria Da Mario_1.jpg"]);
        // Conversion is reported before the rename of the converted file
        let converted_at = events
            .iter()
            .position(|e| matches!(e, SyncEvent::Converted { .. }))
            .unwrap();
        let renamed_at = events
            .iter()
            .position(|e| matches!(e, SyncEvent::Renamed { .. }))
            .unwrap();
        assert!(converted_at < renamed_at);
    }

    #[test]
    fn test_second_pass_renames_nothing() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("one.jpg"), b"x").unwrap();
        fs::write(folder.join("two.png"), b"x").unwrap();

        let (first, _) = run_sync(&folder, "Mario", &no_conversions(), false);
        let after_first = folder_contents(&folder);
        let (second, _) = run_sync(&folder, "Mario", &no_conversions(), false);

        assert_eq!(first.renamed, 2);
        assert_eq!(second.renamed, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(folder_contents(&folder), after_first);
    }

    #[test]
    fn test_dry_run_reports_but_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a.jpg"), b"x").unwrap();

        let (outcome, events) = run_sync(&folder, "Mario", &no_conversions(), true);

        assert_eq!(outcome.renamed, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, SyncEvent::Renamed { .. })));
        assert_eq!(folder_contents(&folder), vec!["a.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_rename_failure_aborts_remaining_files() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("a.jpg"), b"x").unwrap();
        fs::write(folder.join("b.jpg"), b"x").unwrap();
        fs::set_permissions(&folder, fs::Permissions::from_mode(0o555)).unwrap();
        // Mode bits do not bind root; nothing to exercise when the folder
        // stays writable.
        if fs::write(folder.join(".writable"), b"").is_ok() {
            let _ = fs::remove_file(folder.join(".writable"));
            fs::set_permissions(&folder, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let mut events = Vec::new();
        let result = sync_folder(&folder, "Mario", &no_conversions(), false, &mut |e| {
            events.push(e)
        });
        fs::set_permissions(&folder, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(OrganizeError::RenameFailed { .. })));
        // The first rename fails and the rest of the folder is left alone
        assert_eq!(folder_contents(&folder), vec!["a.jpg", "b.jpg"]);
        assert!(!events.iter().any(|e| matches!(e, SyncEvent::Renamed { .. })));
    }

    #[test]
    fn test_dotfiles_are_invisible() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join(".DS_Store"), b"junk").unwrap();

        let (outcome, _) = run_sync(&folder, "Mario", &no_conversions(), false);

        assert_eq!(outcome.renamed, 0);
        assert_eq!(outcome.skipped, 0);
        assert!(folder.join(".DS_Store").exists());
    }

    #[test]
    fn test_extension_lowercased_in_new_name() {
        let dir = TempDir::new().unwrap();
        let folder = dir.path().join("Mario");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("B.JPG"), b"x").unwrap();

        run_sync(&folder, "Mario", &no_conversions(), false);

        assert_eq!(folder_contents(&folder), vec!["Mario_1.jpg"]);
    }

    #[test]
    fn test_next_free_name_probes_forward() {
        let taken_names = ["N_1.jpg", "N_2.jpg"];
        let mut counter = 1;

        let name = next_free_name("N", ".jpg", &mut counter, |cand| {
            taken_names.contains(&cand)
        });

        assert_eq!(name, "N_3.jpg");
        assert_eq!(counter, 3);
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension_of("photo.WEBP"), ".webp");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(replace_extension("photo.webp", "jpg"), "photo.jpg");
        assert_eq!(replace_extension("noext", "jpg"), "noext.jpg");
    }
}
