//! Embeds the test application table into the crate.
//!
//! Reads `test-applications.toml` (or the file named by
//! `FIXTURES_TEST_APPLICATIONS`) and writes `test_applications.rs` to
//! `OUT_DIR` as a static `(key, path)` slice. Relative paths are made
//! absolute against this crate's directory.

use std::env;
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

const DEFAULT_MANIFEST: &str = "test-applications.toml";
const MANIFEST_ENV: &str = "FIXTURES_TEST_APPLICATIONS";
const OUTPUT: &str = "test_applications.rs";
const APPLICATION_KEY_PREFIX: &str = "TestAssemblyApplication[";

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-env-changed={MANIFEST_ENV}");

    let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let manifest = match env::var(MANIFEST_ENV) {
        Ok(path) if !path.is_empty() => crate_dir.join(path),
        _ => crate_dir.join(DEFAULT_MANIFEST),
    };
    println!("cargo:rerun-if-changed={}", manifest.display());

    let contents = fs::read_to_string(&manifest)
        .map_err(|e| format!("cannot read {}: {e}", manifest.display()))?;
    let doc: toml::Table = toml::from_str(&contents)?;

    let mut entries = Vec::new();
    if let Some(metadata) = doc.get("metadata") {
        let table = metadata
            .as_table()
            .ok_or("`metadata` must be a table of key = \"path\" entries")?;
        for (key, value) in table {
            let value = value
                .as_str()
                .ok_or_else(|| format!("metadata value for `{key}` must be a string"))?;
            if !key.starts_with(APPLICATION_KEY_PREFIX) {
                entries.push((key.clone(), value.to_string()));
                continue;
            }
            let path = PathBuf::from(value);
            let path = if path.is_absolute() {
                path
            } else {
                crate_dir.join(path)
            };
            entries.push((key.clone(), path.display().to_string()));
        }
    }

    let mut out = String::from("pub(crate) static TEST_APPLICATION_METADATA: &[(&str, &str)] = &[\n");
    for (key, path) in &entries {
        writeln!(out, "    ({key:?}, {path:?}),")?;
    }
    out.push_str("];\n");

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    fs::write(out_dir.join(OUTPUT), out)?;

    Ok(())
}
