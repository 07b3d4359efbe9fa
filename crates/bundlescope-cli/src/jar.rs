//! Jar discovery and loading.
//!
//! Everything the engine deliberately does not do: walking input
//! directories, opening zip entries, and unfolding `META-INF/MANIFEST.MF`
//! into the attribute map of an [`ArchiveInput`].

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bundlescope_core::ArchiveInput;
use tracing::trace;
use walkdir::WalkDir;
use zip::ZipArchive;

const MANIFEST_ENTRY: &str = "META-INF/MANIFEST.MF";

/// All jar files under `input`, which may itself be a jar file. Results are
/// sorted for reproducible load order.
pub(crate) fn find_jars(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }

    let mut jars: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jar"))
        })
        .collect();
    jars.sort();
    jars
}

/// Read one jar into the engine's input form: manifest main attributes plus
/// every `.class` entry's bytes.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or is not a readable zip.
pub(crate) fn load_jar(path: &Path) -> Result<ArchiveInput> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut zip = ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable jar", path.display()))?;

    let mut metadata = BTreeMap::new();
    let mut classes = Vec::new();

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .with_context(|| format!("broken entry in {}", path.display()))?;
        let name = entry.name().to_string();

        if name == MANIFEST_ENTRY {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .with_context(|| format!("unreadable manifest in {}", path.display()))?;
            metadata = parse_manifest(&text);
        } else if name.ends_with(".class") {
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .with_context(|| format!("unreadable class {name} in {}", path.display()))?;
            classes.push((name, bytes));
        }
    }

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    trace!(jar = %file_name, classes = classes.len(), "read jar");

    Ok(ArchiveInput {
        file_name,
        metadata,
        classes,
    })
}

/// Parse a manifest's main attribute section.
///
/// Per the jar format, a line starting with a single space continues the
/// previous header value, and the main section ends at the first blank
/// line.
fn parse_manifest(text: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let mut current: Option<(String, String)> = None;

    for line in text.lines() {
        if line.is_empty() {
            break; // end of main section
        }
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((name, value)) = current.take() {
            attributes.insert(name, value);
        }
        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_string(), value.trim().to_string()));
        }
    }
    if let Some((name, value)) = current.take() {
        attributes.insert(name, value);
    }

    attributes
}
