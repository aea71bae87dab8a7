//! Build script: embeds the git short hash for `voicebot --version`.

use std::process::Command;

fn main() {
    if let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        && output.status.success()
    {
        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=GIT_HASH={}", hash);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads/");

    if std::env::var_os("CARGO_FEATURE_WHISPER").is_some()
        && Command::new("cmake").arg("--version").output().is_err() {
        println!("cargo::warning=The `whisper` feature needs cmake to build whisper.cpp.");
        println!("cargo::warning=Install it with: sudo apt install cmake");
    }
}
