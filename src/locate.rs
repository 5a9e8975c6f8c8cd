//! Location of on-disk binaries referenced by crash reports.
//!
//! Crash reports name binaries by the path they had on the device that
//! crashed (e.g., `/system/lib64/libfoo.so`). The unstripped
//! counterparts usually live somewhere below one or more local
//! directories ("prefixes"), possibly under a different path
//! altogether, in which case only the build ID can tie the two
//! together.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::elf::read_elf_build_id;
use crate::elf::BuildId;
use crate::log::debug;
use crate::log::trace;
use crate::Error;
use crate::ErrorKind;


/// The path prefix of APEX packages in AOSP builds.
const APEX_PREFIX: &str = "apex/com.android.";
/// The prefix the same APEX packages have in Google builds.
const APEX_GOOGLE_PREFIX: &str = "apex/com.google.android.";


/// A type mapping recorded binary paths to files on disk.
#[derive(Debug, Default)]
pub struct Locator {
    /// The directories to search, in order of preference.
    prefixes: Vec<PathBuf>,
    /// Build ID to path index, if built.
    index: HashMap<BuildId, PathBuf>,
}

impl Locator {
    /// Create a new [`Locator`] searching the provided prefixes, in
    /// order.
    pub fn new(prefixes: Vec<PathBuf>) -> Self {
        Self {
            prefixes,
            index: HashMap::new(),
        }
    }

    /// Retrieve the directories being searched.
    #[inline]
    pub fn prefixes(&self) -> &[PathBuf] {
        &self.prefixes
    }

    /// Retrieve the number of entries in the build ID index.
    #[inline]
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Register `path` as the binary having the given build ID.
    ///
    /// A previous entry for the same build ID gets replaced.
    pub fn insert(&mut self, build_id: BuildId, path: PathBuf) {
        if let Some(previous) = self.index.insert(build_id, path) {
            trace!("replaced index entry {}", previous.display());
        }
    }

    /// Index all ELF files below all prefixes by their build ID.
    ///
    /// Files that vanish while walking are skipped silently. Files that
    /// cannot be opened or mapped, as well as directories that cannot
    /// be read, are reported to `on_error` and skipped as well. Returns
    /// the number of binaries indexed.
    pub fn build_index<F>(&mut self, mut on_error: F) -> usize
    where
        F: FnMut(&Path, &Error),
    {
        let mut count = 0;
        for prefix in self.prefixes.clone() {
            for entry in WalkDir::new(&prefix) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().unwrap_or(&prefix).to_path_buf();
                        let err = Error::from(err);
                        if err.kind() != ErrorKind::NotFound {
                            on_error(&path, &err);
                        }
                        debug!("failed to walk {}: {err}; skipping", path.display());
                        continue
                    }
                };

                if !entry.file_type().is_file() {
                    continue
                }

                match read_elf_build_id(entry.path()) {
                    Ok(Some(build_id)) => {
                        let () = self.insert(build_id, entry.into_path());
                        count += 1;
                    }
                    Ok(None) => (),
                    Err(err) if err.kind() == ErrorKind::NotFound => (),
                    Err(err) => on_error(entry.path(), &err),
                }
            }
        }
        count
    }

    /// Find the file on disk that corresponds to the binary recorded as
    /// `name`, optionally identified by `build_id`.
    ///
    /// Strategies are tried in order and the first existing path wins:
    /// - a build ID index hit
    /// - `<prefix>/<name>`, and the Google APEX variant of it, for each
    ///   prefix
    /// - `<prefix>/<basename of name>`, for each prefix
    pub fn locate(&self, name: &str, build_id: Option<&BuildId>) -> Option<PathBuf> {
        let name = name.strip_prefix('/').unwrap_or(name);

        if let Some(path) = build_id.and_then(|build_id| self.index.get(build_id)) {
            return Some(path.clone())
        }

        for prefix in &self.prefixes {
            let path = prefix.join(name);
            if path.exists() {
                return Some(path)
            }

            if let Some(package) = name.strip_prefix(APEX_PREFIX) {
                let path = prefix.join(format!("{APEX_GOOGLE_PREFIX}{package}"));
                if path.exists() {
                    return Some(path)
                }
            }
        }

        // Try stripping all directory components as a last resort.
        let basename = Path::new(name).file_name()?;
        self.prefixes
            .iter()
            .map(|prefix| prefix.join(basename))
            .find(|path| path.exists())
    }
}
