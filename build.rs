use std::process::Command;

/// Trimmed stdout of a successful `git` invocation.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `0.3.1` on a release tag, `dev@<short hash>` elsewhere, `dev@unknown`
/// outside a checkout.
fn version_label() -> String {
    let release = git(&["describe", "--exact-match", "--tags", "HEAD"]).is_some();
    match (release, git(&["rev-parse", "--short", "HEAD"])) {
        (true, _) => std::env::var("CARGO_PKG_VERSION").unwrap_or_default(),
        (false, Some(hash)) if !hash.is_empty() => format!("dev@{hash}"),
        _ => "dev@unknown".to_string(),
    }
}

fn main() {
    for watched in [".git/HEAD", ".git/refs/"] {
        println!("cargo:rerun-if-changed={watched}");
    }
    println!("cargo:rustc-env=LEADSITE_VERSION={}", version_label());
}
