//! Build script for the storefront crate.
//!
//! Fingerprints the stylesheet so templates can link
//! `/static/css/main.css?v=<hash>` and browsers may cache it for a long time.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");
    println!("cargo:rerun-if-changed={}", css_path.display());

    let hash = match fs::read(&css_path) {
        Ok(content) => css_hash(&content),
        Err(e) => {
            println!("cargo:warning=Could not read main.css: {e}");
            String::new()
        }
    };

    println!("cargo:rustc-env=CSS_HASH={hash}");
}

/// First 8 hex characters of the SHA-256 digest.
fn css_hash(content: &[u8]) -> String {
    let digest = format!("{:x}", Sha256::digest(content));
    digest.chars().take(8).collect()
}
