/// Manifest image linking
///
/// Projects an entity folder's contents into the relative references the
/// manifest carries. Pure read, no filesystem mutation.

use std::path::Path;

use super::folder;

/// Image formats downstream consumers accept.
pub const RECOGNIZED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Relative references for every recognized image in the entity's folder,
/// sorted by filename. An absent or empty folder yields an empty list.
pub fn image_refs(folder_path: &Path, name: &str) -> Vec<String> {
    folder::list_files(folder_path)
        .into_iter()
        .filter(|file| has_recognized_extension(file))
        .map(|file| format!("pic/{}/{}", name, file))
        .collect()
}

fn has_recognized_extension(file: &str) -> bool {
    match Path::new(file).extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            RECOGNIZED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}
