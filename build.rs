//! Build script
//!
//! Stamps the binary with the time its sources were compiled and the cargo
//! profile used. Nothing is written to the source tree.

fn main() {
    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=Cargo.toml");

    let compiled_at = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=NUTRIEVAL_BUILD_TIMESTAMP={}", compiled_at);

    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=NUTRIEVAL_BUILD_PROFILE={}", profile);
}
