// SPDX-License-Identifier: Apache-2.0

//! Checks that every Rust source file in the crate starts with the SPDX
//! license header.

use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

fn has_spdx_identifier(file_path: &Path) -> bool {
    let file = fs::File::open(file_path).unwrap();
    let reader = io::BufReader::new(file);
    if let Some(Ok(first_line)) = reader.lines().next() {
        return first_line.starts_with("// SPDX-License-Identifier: Apache-2.0");
    }
    false
}

#[test]
fn all_source_files_carry_the_license_header() {
    let project_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut missing: Vec<PathBuf> = Vec::new();
    let mut worklist: Vec<PathBuf> = vec![project_dir.join("src"), project_dir.join("tests")];

    while let Some(dir) = worklist.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                worklist.push(path);
            } else if path.extension().is_some_and(|e| e == "rs") && !has_spdx_identifier(&path) {
                missing.push(path);
            }
        }
    }

    assert!(
        missing.is_empty(),
        "files missing the SPDX identifier: {:?}",
        missing
    );
}
