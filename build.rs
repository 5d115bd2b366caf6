//! Stamps the build date into `BUILD_DATE` for `--version` output.

fn main() {
    let stamp = chrono::Utc::now().format("%Y-%m-%d").to_string();
    println!("cargo:rustc-env=BUILD_DATE={stamp}");
    println!("cargo:rerun-if-changed=build.rs");
}
