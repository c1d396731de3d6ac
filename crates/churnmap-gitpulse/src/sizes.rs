//! On-disk file sizes as a complexity proxy.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use churnmap_core::{ChurnmapError, FileSizeSource, SizeConfig};

/// Measures code files under a directory, respecting `.gitignore`.
///
/// Files without an extension, or with an extension on the denylist, are
/// not measured. Keys are repo-relative paths with `/` separators, matching
/// the paths git reports.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use churnmap_core::{FileSizeSource, SizeConfig};
/// use churnmap_gitpulse::sizes::DiskSizes;
///
/// let sizes = DiskSizes::new(&SizeConfig::default()).sizes(Path::new(".")).unwrap();
/// for (path, bytes) in &sizes {
///     println!("{path}: {bytes}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DiskSizes {
    exclude_extensions: HashSet<String>,
}

impl DiskSizes {
    /// Create a size source skipping the extensions listed in `config`.
    pub fn new(config: &SizeConfig) -> Self {
        Self {
            exclude_extensions: config
                .exclude_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `path` counts as a code file.
    pub fn is_code_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => !self.exclude_extensions.contains(&ext.to_ascii_lowercase()),
            None => false,
        }
    }
}

impl FileSizeSource for DiskSizes {
    fn sizes(&self, root: &Path) -> Result<HashMap<String, u64>, ChurnmapError> {
        if !root.is_dir() {
            return Err(ChurnmapError::FileNotFound(root.to_path_buf()));
        }

        let walker = ignore::WalkBuilder::new(root).build();
        let mut sizes = HashMap::new();
        let mut skipped = 0usize;

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    log::debug!("walk error: {e}");
                    continue;
                }
            };

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_file() {
                continue;
            }

            let path = entry.path();
            if !self.is_code_file(path) {
                skipped += 1;
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("cannot stat {}: {e}", path.display());
                    continue;
                }
            };

            let relative = path.strip_prefix(root).unwrap_or(path);
            sizes.insert(to_repo_path(relative), metadata.len());
        }

        log::debug!(
            "measured {} code files under {} (skipped {skipped} non-code files)",
            sizes.len(),
            root.display()
        );
        Ok(sizes)
    }
}

fn to_repo_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
