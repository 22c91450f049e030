use std::path::PathBuf;

const ROOT_DIRECTORY: &str = "ballot_test";

/// Per test scratch directory located at `<system temp>/ballot_test/<module>/<name>`.
#[derive(Debug, Clone)]
pub struct TempDir {
    module: String,
    name: String,
}

impl TempDir {
    /// Describe a scratch directory, nothing is touched on disk.
    pub fn new<M: Into<String>, N: Into<String>>(module: M, name: N) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// Location of the scratch directory.
    pub fn build_path(&self) -> PathBuf {
        std::env::temp_dir()
            .join(ROOT_DIRECTORY)
            .join(&self.module)
            .join(&self.name)
    }

    /// Create the scratch directory, wiping what a previous run left in it.
    pub fn build(&self) -> PathBuf {
        let path = self.build_path();
        if path.exists() {
            std::fs::remove_dir_all(&path)
                .unwrap_or_else(|e| panic!("Could not wipe test directory {path:?}: {e}"));
        }
        std::fs::create_dir_all(&path)
            .unwrap_or_else(|e| panic!("Could not create test directory {path:?}: {e}"));

        path
    }

    /// Shortcut for `TempDir::new(module, name).build()`.
    pub fn create<M: Into<String>, N: Into<String>>(module: M, name: N) -> PathBuf {
        Self::new(module, name).build()
    }
}
