//! Remote copies of the snapshot file.
//!
//! A push always replaces the whole remote file, so one successful push
//! after any number of failures brings the remote copy back in sync.

use fs_err as fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PresenceError, Result};

pub trait RemoteMirror {
    fn push(&mut self, local: &Path) -> Result<()>;
}

impl<M: RemoteMirror + ?Sized> RemoteMirror for Box<M> {
    fn push(&mut self, local: &Path) -> Result<()> {
        (**self).push(local)
    }
}

/// No remote copy configured.
#[derive(Debug, Default)]
pub struct NoMirror;

impl RemoteMirror for NoMirror {
    fn push(&mut self, _local: &Path) -> Result<()> {
        Ok(())
    }
}

/// Copies the snapshot to another path, typically a network mount or a
/// directory served by the web front end.
#[derive(Debug, Clone)]
pub struct CopyMirror {
    target: PathBuf,
}

impl CopyMirror {
    pub fn new(target: PathBuf) -> Self {
        Self { target }
    }
}

impl RemoteMirror for CopyMirror {
    fn push(&mut self, local: &Path) -> Result<()> {
        if let Some(parent) = self.target.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                PresenceError::Mirror(format!("Failed to create mirror directory: {}", err))
            })?;
        }
        let tmp_path = self.target.with_extension("tmp");
        fs::copy(local, &tmp_path)
            .map_err(|err| PresenceError::Mirror(format!("Failed to copy snapshot: {}", err)))?;
        fs::rename(&tmp_path, &self.target)
            .map_err(|err| PresenceError::Mirror(format!("Failed to commit snapshot copy: {}", err)))?;
        Ok(())
    }
}

/// Uploads the snapshot with `scp`, authenticating with an identity file.
#[derive(Debug, Clone)]
pub struct ScpMirror {
    host: String,
    user: String,
    identity_file: Option<PathBuf>,
    target: String,
}

impl ScpMirror {
    pub fn new(host: String, user: String, identity_file: Option<PathBuf>, target: String) -> Self {
        Self {
            host,
            user,
            identity_file,
            target,
        }
    }

    fn destination(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.target)
    }

    fn command(&self, local: &Path) -> Command {
        let mut command = Command::new("scp");
        command.args(["-q", "-o", "BatchMode=yes"]);
        if let Some(identity) = &self.identity_file {
            command.arg("-i").arg(identity);
        }
        command.arg(local).arg(self.destination());
        command
    }
}

impl RemoteMirror for ScpMirror {
    fn push(&mut self, local: &Path) -> Result<()> {
        let output = self
            .command(local)
            .output()
            .map_err(|err| PresenceError::Mirror(format!("Failed to run scp: {}", err)))?;
        if !output.status.success() {
            return Err(PresenceError::Mirror(format!(
                "scp to {} exited with {}: {}",
                self.destination(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
