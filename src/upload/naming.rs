//! Filename-derived names and content-upload parameters.

use serde::Serialize;

pub const DEFAULT_BUNDLE_NAME: &str = "untitled-upload";

// Longest suffixes first so ".tar.gz" wins over ".gz".
const ARCHIVE_EXTS: [&str; 8] = [
    ".tar.gz", ".tar.bz2", ".tbz2", ".tgz", ".zip", ".tar", ".gz", ".bz2",
];

pub fn archive_ext(file_name: &str) -> Option<&'static str> {
    ARCHIVE_EXTS.iter().copied().find(|ext| {
        file_name.len() > ext.len()
            && file_name
                .get(file_name.len() - ext.len()..)
                .map_or(false, |tail| tail.eq_ignore_ascii_case(ext))
    })
}

pub fn is_archive(file_name: &str) -> bool {
    archive_ext(file_name).is_some()
}

/// Bundle name derived from a file name: archive suffix stripped, invalid
/// characters replaced with `-`, and a leading `_` if the name would not
/// start with a letter or underscore.
pub fn default_bundle_name(file_name: &str) -> String {
    let stem = match archive_ext(file_name) {
        Some(ext) => &file_name[..file_name.len() - ext.len()],
        None => file_name,
    };

    let mut name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    if name.is_empty() {
        return DEFAULT_BUNDLE_NAME.to_string();
    }
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

/// Name the server stores the blob under: the derived bundle name, plus the
/// original archive suffix for archives.
pub fn upload_file_name(file_name: &str) -> String {
    match archive_ext(file_name) {
        Some(ext) => format!(
            "{}{}",
            default_bundle_name(file_name),
            &file_name[file_name.len() - ext.len()..]
        ),
        None => default_bundle_name(file_name),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentUploadParams {
    pub finalize: u8,
    pub filename: String,
    pub unpack: u8,
}

impl ContentUploadParams {
    pub fn for_file(file_name: &str) -> Self {
        Self {
            finalize: 1,
            filename: upload_file_name(file_name),
            unpack: u8::from(is_archive(file_name)),
        }
    }
}
