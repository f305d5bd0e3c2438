//! Format-aware output comparison.
//!
//! Dispatch is a closed enum resolved once from the base format token; each
//! family normalizes away its known legitimate instabilities (PostScript
//! prolog timestamps, SVG generator comments) before comparing.

use crate::error::{Error, Result};
use crate::report::HtmlReport;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

/// Comparison family, derived from the format token before any colon suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    PlainText,
    PostScript,
    Svg,
    Raster,
}

impl FormatFamily {
    pub fn from_format(format: &str) -> Self {
        match format.split(':').next().unwrap_or(format) {
            "ps" | "ps2" => Self::PostScript,
            "svg" => Self::Svg,
            "png" => Self::Raster,
            _ => Self::PlainText,
        }
    }
}

fn svg_comment_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^<!--.*-->$").expect("valid regex"))
}

fn ps_setup_end_regex() -> &'static regex::bytes::Regex {
    static RE: OnceLock<regex::bytes::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::bytes::Regex::new(r"^%%End.*Setup").expect("valid regex"))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| Error::ReadFile {
        path: path.display().to_string(),
        source,
    })
}

/// UTF-8 text comparison with leading/trailing whitespace trimmed.
pub fn text_equivalent(candidate: &Path, reference: &Path) -> Result<bool> {
    let a = read_text(candidate)?;
    let b = read_text(reference)?;
    Ok(a.trim() == b.trim())
}

/// SVG comparison: whole-line XML comments are blanked out on both sides
/// (leaving their line breaks in place), then the texts are compared trimmed.
pub fn svg_equivalent(candidate: &Path, reference: &Path) -> Result<bool> {
    let a = read_text(candidate)?;
    let b = read_text(reference)?;
    let re = svg_comment_line_regex();
    let a = re.replace_all(&a, "");
    let b = re.replace_all(&b, "");
    Ok(a.trim() == b.trim())
}

/// Everything after the first setup-section-end marker line (`%%End...Setup`).
/// The marker line itself is excluded; if no line matches, nothing remains.
fn after_setup(data: &[u8]) -> &[u8] {
    let re = ps_setup_end_regex();
    let mut pos = 0;
    while pos < data.len() {
        let end = data[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| pos + i + 1);
        if re.is_match(&data[pos..end]) {
            return &data[end..];
        }
        pos = end;
    }
    &[]
}

/// PostScript comparison. The prolog up to the setup-section end legitimately
/// differs (timestamps, command lines, paths); everything after must match
/// byte for byte. Files are Latin-1, so this works on raw bytes.
pub fn postscript_equivalent(candidate: &Path, reference: &Path) -> Result<bool> {
    let a = read_bytes(candidate)?;
    let b = read_bytes(reference)?;
    Ok(after_setup(&a) == after_setup(&b))
}

/// Raster comparison, delegated to the external pixel-diff tool: equivalence
/// is the tool exiting zero. On a difference the image triplet is recorded in
/// the HTML report; on equivalence the transient diff image is removed.
pub fn raster_equivalent(
    diffimg: &Path,
    candidate: &Path,
    reference: &Path,
    report: &HtmlReport,
    outfile: &str,
) -> Result<bool> {
    let diff_path = report.diff_image_path(outfile);
    let status = Command::new(diffimg)
        .arg(candidate)
        .arg(reference)
        .arg(&diff_path)
        .status()
        .map_err(|source| Error::Spawn {
            program: diffimg.display().to_string(),
            source,
        })?;

    if status.success() {
        report.discard_diff(outfile);
        Ok(true)
    } else {
        report.record_mismatch(outfile, reference, candidate)?;
        Ok(false)
    }
}
