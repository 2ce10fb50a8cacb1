/// Legacy image conversion
///
/// Converts one legacy-format file into the canonical format next to the
/// original, then removes the original. The original is only deleted after
/// the new file has been written in full, so a failed decode or write never
/// loses data.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::OrganizeError;

/// Convert `path` to `target_ext` in the same directory.
///
/// Returns the path of the newly written file. Refuses to overwrite an
/// existing file at the target path.
pub fn normalize_format(path: &Path, target_ext: &str) -> Result<PathBuf, OrganizeError> {
    let img = image::open(path).map_err(|source| OrganizeError::UnreadableImage {
        path: path.display().to_string(),
        source,
    })?;

    let target = path.with_extension(target_ext);
    if target.exists() {
        return Err(OrganizeError::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("conversion target {} already exists", target.display()),
        )));
    }

    // JPEG has no alpha channel, so flatten to RGB before encoding.
    let save_result = if matches!(target_ext, "jpg" | "jpeg") {
        img.to_rgb8().save(&target)
    } else {
        img.save(&target)
    };
    if let Err(e) = save_result {
        let _ = fs::remove_file(&target);
        return Err(OrganizeError::Io(io::Error::other(format!(
            "failed to encode {}: {e}",
            target.display()
        ))));
    }

    fs::remove_file(path)?;
    info!(from = %path.display(), to = %target.display(), "converted legacy image");

    Ok(target)
}
