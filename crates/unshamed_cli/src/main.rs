//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `unshamed_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("unshamed_core ping={}", unshamed_core::ping());
    println!("unshamed_core version={}", unshamed_core::core_version());
    println!(
        "unshamed_core schema_version={}",
        unshamed_core::db::migrations::latest_version()
    );
}
