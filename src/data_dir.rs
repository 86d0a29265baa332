use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub const ENV_VAR: &'static str = "FLEETSEEK_DATA_DIR";

    /// Resolve the data directory from, in order of priority:
    /// 1. An explicit path (from --data-dir)
    /// 2. The FLEETSEEK_DATA_DIR environment variable
    /// 3. The XDG data directory (~/.local/share/fleetseek/)
    ///
    /// The directory is created if missing.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = choose_root(explicit, std::env::var_os(Self::ENV_VAR))?;
        std::fs::create_dir_all(&root)
            .map_err(|_| Error::DataDir(root.clone()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fleet_db(&self) -> PathBuf {
        self.root.join("fleet.redb")
    }
}

fn choose_root(explicit: Option<&Path>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(val) = env.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(val));
    }
    xdg::BaseDirectories::with_prefix("fleetseek")
        .get_data_home()
        .ok_or_else(|| {
            Error::Config("could not determine XDG data home directory".into())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_with_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DataDir::resolve(Some(tmp.path())).unwrap();

        assert_eq!(dir.root(), tmp.path());
        assert_eq!(dir.fleet_db(), tmp.path().join("fleet.redb"));
    }

    #[test]
    fn explicit_path_beats_environment() {
        let root = choose_root(
            Some(Path::new("/srv/fleet")),
            Some(OsString::from("/tmp/other")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/srv/fleet"));
    }

    #[test]
    fn environment_used_without_flag() {
        let root = choose_root(None, Some(OsString::from("/tmp/fleet"))).unwrap();
        assert_eq!(root, PathBuf::from("/tmp/fleet"));
    }

    #[test]
    fn empty_environment_falls_back_to_xdg() {
        if let Ok(root) = choose_root(None, Some(OsString::new())) {
            assert!(root.ends_with("fleetseek"));
        }
    }

    #[test]
    fn explicit_path_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let dir = DataDir::resolve(Some(&nested)).unwrap();

        assert!(nested.is_dir());
        assert_eq!(dir.root(), nested.as_path());
    }
}
