#![allow(clippy::expect_used, clippy::unwrap_used, dead_code)]

use assert_cmd::Command;
use std::path::Path;
use std::time::Duration;

pub const CMD_TIMEOUT: Duration = Duration::from_secs(15);

/// Create a `mediasync` command isolated from the user's config and data.
pub fn mediasync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("mediasync"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("HOME", home);
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env("MEDIASYNC_DATA_DIR", home.join("data"));
    cmd.env_remove("MEDIASYNC_API_URL");
    cmd.env_remove("MEDIASYNC_TOKEN");
    cmd.env_remove("MEDIASYNC_CONFIG");
    cmd.env("NO_COLOR", "1");
    cmd
}
