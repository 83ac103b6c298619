//! Entry-name helpers: deriving file names from locations, validating names,
//! and resolving name collisions within one bundle

use crate::error::{ArchiveError, Result};
use std::collections::HashSet;
use std::path::Path;

/// Name used when a location has no usable trailing path segment
pub const FALLBACK_FILE_NAME: &str = "download";

/// Maximum number of suffixes tried when resolving a name collision
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Derive a file name from a location's trailing path segment
///
/// URLs are parsed and the last non-empty path segment is percent-decoded. Strings
/// that are not URLs fall back to their text after the last `/`. The result is not
/// validated; pass it through [`validate_entry_name`].
///
/// # Examples
///
/// ```
/// use archive_bundler::utils::file_name_from_location;
///
/// assert_eq!(file_name_from_location("http://x/a.txt"), "a.txt");
/// assert_eq!(file_name_from_location("https://x/dir/report%202024.pdf?sig=abc"), "report 2024.pdf");
/// assert_eq!(file_name_from_location("https://example.com/"), "download");
/// ```
pub fn file_name_from_location(location: &str) -> String {
    if let Ok(parsed) = url::Url::parse(location) {
        if let Some(segments) = parsed.path_segments()
            && let Some(last) = segments.filter(|s| !s.is_empty()).next_back()
        {
            return match urlencoding::decode(last) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => last.to_string(),
            };
        }
        return FALLBACK_FILE_NAME.to_string();
    }

    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

/// Check that a name can be used as a single file name inside the scratch space
///
/// Rejects empty names, `.` and `..`, and anything with a path separator or NUL, so
/// that no entry can be written outside its scratch directory.
pub fn validate_entry_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name refers to a directory")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name.contains('\0') {
        Some("name contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ArchiveError::InvalidName {
            name: name.to_string(),
            reason,
        }
        .into()),
        None => Ok(()),
    }
}

/// Make names unique in order of appearance
///
/// The first occurrence keeps its name; later duplicates become `stem (1).ext`,
/// `stem (2).ext`, ... skipping any name already taken.
///
/// # Examples
///
/// ```
/// use archive_bundler::utils::dedupe_names;
///
/// let names = vec!["a.txt".to_string(), "a.txt".to_string(), "b".to_string(), "b".to_string()];
/// assert_eq!(dedupe_names(names), vec!["a.txt", "a (1).txt", "b", "b (1)"]);
/// ```
pub fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut result = Vec::with_capacity(names.len());

    for name in names {
        if taken.insert(name.clone()) {
            result.push(name);
            continue;
        }

        let path = Path::new(&name);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&name)
            .to_string();
        let extension = path.extension().and_then(|e| e.to_str());

        let mut unique = name.clone();
        for i in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = match extension {
                Some(ext) => format!("{} ({}).{}", stem, i, ext),
                None => format!("{} ({})", stem, i),
            };
            if !taken.contains(&candidate) {
                unique = candidate;
                break;
            }
        }

        taken.insert(unique.clone());
        result.push(unique);
    }

    result
}
