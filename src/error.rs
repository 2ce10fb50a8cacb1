/// Error taxonomy for the organizer pipeline
///
/// Per-entity errors (unreadable images, failed renames, missing names) are
/// caught at the orchestrator's per-entity boundary and reported without
/// stopping the run. Manifest I/O and duplicate folder names abort the run.

use std::io;

/// Everything that can go wrong while organizing folders and the manifest.
#[derive(Debug, thiserror::Error)]
pub enum OrganizeError {
    /// A file carries an image extension but cannot be decoded.
    #[error("cannot decode image {path}: {source}")]
    UnreadableImage {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// The filesystem rejected a rename.
    #[error("failed to rename {from} to {to}: {source}")]
    RenameFailed {
        from: String,
        to: String,
        #[source]
        source: io::Error,
    },

    /// A manifest record has no usable entity name (absent or blank).
    #[error("record {index} has no usable name")]
    MissingEntityName { index: usize },

    /// Two entity records normalize to the same folder name.
    #[error("records {first:?} and {second:?} both map to folder {folder:?}")]
    DuplicateFolder {
        first: String,
        second: String,
        folder: String,
    },

    /// An entity name whose folder would nest inside or escape the base
    /// directory.
    #[error("name {name:?} cannot be used as a folder name")]
    UnusableFolderName { name: String },

    /// The manifest file could not be read.
    #[error("failed to read manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The manifest file is not valid JSON.
    #[error("invalid json in manifest {path}: {source}")]
    ManifestParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The updated records could not be serialized.
    #[error("failed to serialize manifest: {source}")]
    ManifestSerialize {
        #[source]
        source: serde_json::Error,
    },

    /// The updated manifest could not be written back.
    #[error("failed to write manifest {path}: {source}")]
    ManifestWrite {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Any other filesystem failure (folder creation, listing, deletes).
    #[error(transparent)]
    Io(#[from] io::Error),
}
