//! Common test utilities for archive-bundler integration tests

#![allow(dead_code)]

use archive_bundler::{Config, ScratchConfig};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Config whose scratch spaces live in a fresh temp directory
///
/// The returned `TempDir` must be kept alive for the duration of the test.
pub fn isolated_config() -> (Config, TempDir) {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = Config {
        scratch: ScratchConfig {
            root_dir: root.path().to_path_buf(),
            prefix: "tmp".to_string(),
        },
        ..Config::default()
    };
    (config, root)
}

/// Sorted (entry name, content) pairs of every file in a ZIP buffer
pub fn zip_files(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("bytes are not a ZIP archive");
    let mut files = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).expect("unreadable entry");
        if entry.is_dir() {
            continue;
        }
        let mut content = Vec::new();
        entry.read_to_end(&mut content).expect("unreadable content");
        files.push((entry.name().to_string(), content));
    }
    files.sort();
    files
}

/// Names of every entry (including directories) in a ZIP buffer
pub fn zip_names(bytes: &[u8]) -> Vec<String> {
    let archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("bytes are not a ZIP archive");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Assert that nothing is left below a scratch root
pub fn assert_no_scratch_left(root: &Path) {
    let leftovers: Vec<_> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .collect();
    assert!(
        leftovers.is_empty(),
        "scratch space not cleaned up: {:?}",
        leftovers
    );
}
