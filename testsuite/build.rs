use std::env;
use std::fs;
use std::path::PathBuf;

/// Places the LM3S6965 `memory.x` where `cortex-m-rt`'s `link.x` looks for it.
fn main() {
    let out = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    fs::copy("memory.x", out.join("memory.x")).expect("memory.x next to build.rs");

    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}
