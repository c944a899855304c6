use std::process::Command;
use vergen::EmitBuilder;

fn main() {
    // Git metadata is optional; source tarballs build without it
    let is_git_available = Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false);

    let result = if is_git_available {
        EmitBuilder::builder()
            .build_timestamp()
            .git_sha(false)
            .emit()
    } else {
        EmitBuilder::builder().build_timestamp().emit()
    };

    result.expect("Unable to generate build metadata");
}
