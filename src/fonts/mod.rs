//! Font discovery for PDF export and chart text.
//!
//! genpdf needs a full TrueType family (regular, bold, italic, bold italic) and the chart
//! renderer needs the regular face.  Both come from the first directory that holds a complete
//! family, searched in this order:
//!
//! 1. `LCA_REPORT_FONTS_DIR` (Roboto file names),
//! 2. `assets/fonts` next to the running executable,
//! 3. `assets/fonts` in this crate's manifest directory,
//! 4. the system Liberation Sans directories (`LCA_REPORT_SYSTEM_FONTS_DIR` overrides them).
//!
//! Charts only need one face, so when no family resolves they also accept a single file:
//! `LCA_REPORT_CHART_FONT`, then a system `LiberationSans-Regular.ttf` or `DejaVuSans.ttf`.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};
use log::warn;

/// Name of the bundled font family.
pub const DEFAULT_FONT_FAMILY_NAME: &str = "Roboto";

/// Name of the system fallback family.
pub const SYSTEM_FONT_FAMILY_NAME: &str = "LiberationSans";

const FONTS_DIR_ENV: &str = "LCA_REPORT_FONTS_DIR";
const SYSTEM_FONTS_DIR_ENV: &str = "LCA_REPORT_SYSTEM_FONTS_DIR";
const CHART_FONT_ENV: &str = "LCA_REPORT_CHART_FONT";

const FONT_STYLES: &[&str] = &["Regular", "Bold", "Italic", "BoldItalic"];

const SYSTEM_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/liberation-sans",
    "/usr/share/fonts/liberation",
    "/usr/share/fonts/TTF",
];

const DEJAVU_FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
];

/// A directory holding a complete family together with the family's file-name prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSource {
    pub directory: PathBuf,
    pub family: &'static str,
}

impl FontSource {
    /// Path of the regular face.
    pub fn regular_path(&self) -> PathBuf {
        self.directory.join(format!("{}-Regular.ttf", self.family))
    }
}

fn env_path(var: &str) -> Option<PathBuf> {
    env::var_os(var).and_then(|value| {
        let path = PathBuf::from(value);
        if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        }
    })
}

/// Directory holding the crate's bundled fonts.
pub fn bundled_fonts_source_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts")
}

fn font_source_candidates() -> Vec<FontSource> {
    let mut bundled = Vec::new();

    if let Some(path) = env_path(FONTS_DIR_ENV) {
        bundled.push(path);
    }

    if let Ok(current_exe) = env::current_exe() {
        if let Some(bin_dir) = current_exe.parent() {
            bundled.push(bin_dir.join("assets/fonts"));
        }
    }

    bundled.push(bundled_fonts_source_dir());
    bundled.dedup();

    let system = match env_path(SYSTEM_FONTS_DIR_ENV) {
        Some(path) => vec![path],
        None => SYSTEM_FONT_DIRS.iter().map(PathBuf::from).collect(),
    };

    bundled
        .into_iter()
        .map(|directory| FontSource {
            directory,
            family: DEFAULT_FONT_FAMILY_NAME,
        })
        .chain(system.into_iter().map(|directory| FontSource {
            directory,
            family: SYSTEM_FONT_FAMILY_NAME,
        }))
        .collect()
}

fn missing_font_files(source: &FontSource) -> Vec<String> {
    FONT_STYLES
        .iter()
        .map(|style| format!("{}-{}.ttf", source.family, style))
        .filter(|name| !source.directory.join(name).is_file())
        .collect()
}

fn describe_attempt(source: &FontSource, directory: &Path) -> String {
    if !directory.is_dir() {
        return format!("{} (directory missing)", directory.display());
    }
    format!(
        "{} (missing files [{}])",
        directory.display(),
        missing_font_files(source).join(", ")
    )
}

/// Returns the first directory holding a complete family.
pub fn resolve_font_source() -> Result<FontSource, Error> {
    let mut attempts = Vec::new();

    for candidate in font_source_candidates() {
        if candidate.directory.is_dir() && missing_font_files(&candidate).is_empty() {
            return Ok(candidate);
        }
        attempts.push(describe_attempt(&candidate, &candidate.directory));
    }

    Err(Error::new(
        format!(
            "Unable to locate a TrueType font family. Checked: {}. Set {} to a directory with Roboto-*.ttf files.",
            attempts.join(", "),
            FONTS_DIR_ENV
        ),
        io::Error::new(io::ErrorKind::NotFound, "font directory not found"),
    ))
}

/// Loads the resolved font family for genpdf.
pub fn default_font_family() -> Result<FontFamily<FontData>, Error> {
    let source = resolve_font_source()?;
    if source.family != DEFAULT_FONT_FAMILY_NAME {
        warn!(
            "Bundled {} fonts unavailable; using {} from {}",
            DEFAULT_FONT_FAMILY_NAME,
            source.family,
            source.directory.display()
        );
    }

    fonts::from_files(&source.directory, source.family, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                source.family,
                source.directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

/// Single-face files usable for chart text, in preference order.
fn single_face_candidates() -> Vec<PathBuf> {
    let liberation = SYSTEM_FONT_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(format!("{SYSTEM_FONT_FAMILY_NAME}-Regular.ttf")));
    let dejavu = DEJAVU_FONT_DIRS
        .iter()
        .map(|dir| Path::new(dir).join("DejaVuSans.ttf"));

    env_path(CHART_FONT_ENV)
        .into_iter()
        .chain(liberation)
        .chain(dejavu)
        .collect()
}

/// Path of the face used for chart text.
///
/// Prefers the regular face of the resolved family, then the first single face on disk.
pub fn regular_font_path() -> Option<PathBuf> {
    if let Ok(source) = resolve_font_source() {
        return Some(source.regular_path());
    }
    single_face_candidates().into_iter().find(|path| path.is_file())
}

/// Bytes of the chart face, loaded once per process.
///
/// Returns `None` when no face is found or the file cannot be read.
pub fn regular_font_bytes() -> Option<&'static [u8]> {
    static REGULAR: OnceLock<Option<&'static [u8]>> = OnceLock::new();

    *REGULAR.get_or_init(|| {
        let path = regular_font_path()?;
        match fs::read(&path) {
            Ok(bytes) => Some(&*Box::leak(bytes.into_boxed_slice())),
            Err(err) => {
                warn!("Failed to read font file {}: {}", path.display(), err);
                None
            }
        }
    })
}

/// Indicates whether a complete font family is available.
pub fn default_fonts_available() -> bool {
    resolve_font_source().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_end_with_system_family() {
        let candidates = font_source_candidates();
        assert!(candidates
            .iter()
            .any(|source| source.directory == bundled_fonts_source_dir()));
        assert_eq!(
            candidates.last().map(|source| source.family),
            Some(SYSTEM_FONT_FAMILY_NAME)
        );
    }

    #[test]
    fn missing_files_are_reported_by_name() {
        let source = FontSource {
            directory: PathBuf::from("/__lca_report_missing_fonts__"),
            family: DEFAULT_FONT_FAMILY_NAME,
        };
        assert_eq!(
            missing_font_files(&source),
            [
                "Roboto-Regular.ttf",
                "Roboto-Bold.ttf",
                "Roboto-Italic.ttf",
                "Roboto-BoldItalic.ttf"
            ]
        );
        assert!(describe_attempt(&source, &source.directory).contains("directory missing"));
    }

    #[test]
    fn single_faces_cover_liberation_and_dejavu() {
        let candidates = single_face_candidates();
        assert!(candidates.contains(&PathBuf::from(
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf"
        )));
        assert!(candidates.contains(&PathBuf::from(
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
        )));
    }

    #[test]
    fn chart_face_found_without_a_full_family() {
        let installed = single_face_candidates().into_iter().any(|path| path.is_file());
        if !installed && !default_fonts_available() {
            eprintln!("Skipping chart_face_found_without_a_full_family: no system fonts found.");
            return;
        }
        assert!(regular_font_path().is_some_and(|path| path.is_file()));
        assert!(regular_font_bytes().is_some_and(|bytes| !bytes.is_empty()));
    }
}
