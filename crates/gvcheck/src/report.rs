//! HTML report of failing raster comparisons.

use crate::error::{Error, Result};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Report directory holding `index.html` plus an `old_*`/`new_*`/`dif_*`
/// image triplet for every failing raster comparison.
#[derive(Debug)]
pub struct HtmlReport {
    dir: PathBuf,
}

impl HtmlReport {
    /// Creates the directory if needed and removes any entries left over
    /// from a previous run.
    pub fn prepare(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
            path: dir.display().to_string(),
            source,
        })?;
        let entries = fs::read_dir(dir).map_err(|source| Error::ClearDir {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| Error::ClearDir {
                path: dir.display().to_string(),
                source,
            })?;
            fs::remove_file(entry.path()).map_err(|source| Error::ClearDir {
                path: entry.path().display().to_string(),
                source,
            })?;
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the pixel-diff tool should write its difference image.
    pub fn diff_image_path(&self, outfile: &str) -> PathBuf {
        self.dir.join(format!("dif_{outfile}"))
    }

    /// Removes a difference image for an equivalent pair. Missing files are
    /// tolerated so a diff tool that writes nothing on success is fine.
    pub fn discard_diff(&self, outfile: &str) {
        let _ = fs::remove_file(self.diff_image_path(outfile));
    }

    /// Copies the reference and candidate images next to the difference image
    /// and appends their `<img>` triplet to `index.html`.
    pub fn record_mismatch(&self, outfile: &str, reference: &Path, candidate: &Path) -> Result<()> {
        let old = self.dir.join(format!("old_{outfile}"));
        fs::copy(reference, &old).map_err(|source| Error::CopyFile {
            from: reference.display().to_string(),
            to: old.display().to_string(),
            source,
        })?;
        let new = self.dir.join(format!("new_{outfile}"));
        fs::copy(candidate, &new).map_err(|source| Error::CopyFile {
            from: candidate.display().to_string(),
            to: new.display().to_string(),
            source,
        })?;

        let index = self.dir.join("index.html");
        let mut html = String::new();
        html.push_str("<p>\n");
        html.push_str(&format!(
            "<img src=\"old_{outfile}\" width=\"192\" height=\"192\">\n"
        ));
        html.push_str(&format!(
            "<img src=\"new_{outfile}\" width=\"192\" height=\"192\">\n"
        ));
        html.push_str(&format!(
            "<img src=\"dif_{outfile}\" width=\"192\" height=\"192\">\n"
        ));

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index)
            .map_err(|source| Error::WriteFile {
                path: index.display().to_string(),
                source,
            })?;
        file.write_all(html.as_bytes())
            .map_err(|source| Error::WriteFile {
                path: index.display().to_string(),
                source,
            })?;
        Ok(())
    }
}
