// DualToneDDS - Build Script
//
// Exports the startup parameters and version string as compile-time env.

use std::env;
use std::process::Command;

/// Startup parameters and their defaults (reference hardware values).
const PARAMS: [(&str, &str); 3] = [
    ("DDS_TICK_RATE_HZ", "62500"),
    ("DDS_CHANNEL_A_HZ", "700"),
    ("DDS_CHANNEL_B_HZ", "1900"),
];

fn main() {
    // ESP-IDF environment setup (MUST be first!)
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    // Get git version info
    let version = env!("CARGO_PKG_VERSION");
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=VERSION_STRING={}-g{}", version, git_hash);

    for (name, default) in PARAMS {
        let value = env::var(name).unwrap_or_else(|_| default.to_string());
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            panic!("{} must be a decimal integer, got {:?}", name, value);
        }
        println!("cargo:rustc-env={}={}", name, value);
        println!("cargo:rerun-if-env-changed={}", name);
    }

    // Rebuild if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
}
