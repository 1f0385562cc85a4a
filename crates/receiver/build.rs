//! Stamps the receiver version with the source revision and build date.

use std::env;
use std::path::PathBuf;
use std::process::Command;

use time::OffsetDateTime;

fn main() {
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    if let Some(head) = workspace_git_head() {
        println!("cargo:rerun-if-changed={}", head.display());
    }

    println!("cargo:rustc-env=GIT_SHA={}", source_revision());
    println!("cargo:rustc-env=BUILD_DATE={}", build_date());
}

/// `.git/HEAD` of the workspace this crate lives in, two levels up.
fn workspace_git_head() -> Option<PathBuf> {
    let manifest = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
    let head = manifest.ancestors().nth(2)?.join(".git").join("HEAD");
    head.exists().then_some(head)
}

/// Short commit id, suffixed with `-dirty` for uncommitted changes.
fn source_revision() -> String {
    Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|rev| rev.trim().to_owned())
        .filter(|rev| !rev.is_empty())
        .unwrap_or_else(|| "norev".to_owned())
}

/// Calendar date of the build; `SOURCE_DATE_EPOCH` pins it for reproducible builds.
fn build_date() -> String {
    let when = env::var("SOURCE_DATE_EPOCH")
        .ok()
        .and_then(|secs| secs.parse::<i64>().ok())
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .unwrap_or_else(OffsetDateTime::now_utc);
    when.date().to_string()
}
