use anyhow::{anyhow, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;
use url::Url;

/// Opens `path` with the platform's default handler, without waiting for it.
pub fn open(path: &Path) -> Result<()> {
    let absolute = std::path::absolute(path)
        .map_err(|e| anyhow!("Failed to resolve {}: {}", path.display(), e))?;
    let url = Url::from_file_path(&absolute)
        .map_err(|_| anyhow!("Cannot build a file URL for {}", absolute.display()))?;

    let mut command = opener(url.as_str());
    debug!("Launching {:?}", command);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;
    Ok(())
}

fn opener(target: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(target);
        command
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", target]);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(target);
        command
    }
}
