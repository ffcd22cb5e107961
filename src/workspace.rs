//! Per-run scratch directories.
//!
//! Every pipeline run owns `{root}/generated_pdfs/{uuid}/`. The directory is
//! removed by [`Workspace::release`] or, failing that, when the handle drops,
//! so panics and cancelled runs clean up too. Both remove synchronously. The
//! pipeline releases on a blocking thread; `Drop` runs wherever the last
//! handle goes, usually a render or pack thread still finishing its write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{error, info};
use thiserror::Error;
use uuid::Uuid;

pub const WORKSPACE_DIR: &str = "generated_pdfs";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to remove workspace {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    released: bool,
}

impl Workspace {
    /// Creates a fresh, uniquely named directory under `root`.
    pub fn acquire(root: &Path) -> Result<Self, WorkspaceError> {
        let parent = root.join(WORKSPACE_DIR);
        fs::create_dir_all(&parent).map_err(|source| WorkspaceError::Create {
            path: parent.clone(),
            source,
        })?;

        let id = Uuid::new_v4();
        let path = parent.join(id.to_string());
        // Not create_dir_all: an existing directory must be an error, not shared.
        fs::create_dir(&path).map_err(|source| WorkspaceError::Create {
            path: path.clone(),
            source,
        })?;

        info!("Workspace {} created at {}", id, path.display());
        Ok(Self {
            id,
            path,
            released: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_path(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }

    /// Deletes the workspace tree.
    pub fn release(mut self) -> Result<(), WorkspaceError> {
        self.released = true;
        remove_tree(&self.path)?;
        info!("Workspace {} removed", self.id);
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match remove_tree(&self.path) {
            Ok(()) => info!("Workspace {} removed on drop", self.id),
            Err(e) => error!("Workspace {} was not cleaned up: {}", self.id, e),
        }
    }
}

fn remove_tree(path: &Path) -> Result<(), WorkspaceError> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkspaceError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
