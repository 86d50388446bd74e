use crate::data::SearchEnvironment;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// The name of the Java runtime executable on the current platform.
#[cfg(windows)]
pub const JAVA_EXECUTABLE: &str = "java.exe";
#[cfg(not(windows))]
pub const JAVA_EXECUTABLE: &str = "java";

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Unable to find executable: {executable}")]
    NotFound { executable: String },
}

/// Find the Java runtime.
///
/// The explicit override takes precedence over the `JAVA_HOME` value of the environment.
pub fn find_java(
    java_home: Option<&Path>,
    environment: &SearchEnvironment,
) -> Result<PathBuf, LocateError> {
    let home = java_home
        .filter(|home| !home.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .or_else(|| {
            environment
                .java_home
                .as_ref()
                .filter(|home| !home.is_empty())
                .map(PathBuf::from)
        });

    locate(
        JAVA_EXECUTABLE,
        home.as_deref(),
        environment.path.as_deref(),
    )
}

/// Locate an executable, by name.
///
/// Candidates are the `bin` directory of `home` (if set), followed by each entry of the search
/// path. The first candidate which exists as a file wins. Nothing else (like permissions) is
/// checked, that will fail when running it.
pub fn locate(
    executable: &str,
    home: Option<&Path>,
    search_path: Option<&OsStr>,
) -> Result<PathBuf, LocateError> {
    let home = home.map(|home| home.join("bin"));
    let search = search_path
        .map(|path| std::env::split_paths(path).collect::<Vec<_>>())
        .unwrap_or_default();

    home.into_iter()
        .chain(search)
        .map(|dir| dir.join(executable))
        .inspect(|candidate| log::trace!("Probing: {}", candidate.display()))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| LocateError::NotFound {
            executable: executable.to_string(),
        })
}
