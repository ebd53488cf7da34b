//! Common helpers for focal-web binary tests
use std::{path::Path, process::Command};

/// Command for the built `focal-web` binary, isolated from any local settings file.
pub fn focal_web(work_dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_focal-web"));
    cmd.current_dir(work_dir).env("RUST_LOG", "warn");
    cmd
}
