use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The Java class implementing the tool's command line.
pub const TOOL_MAIN_CLASS: &str = "com.ssl.code.signing.tool.CodeSignTool";

/// The name of the tool's installation directory, when located next to our own binary.
pub const TOOL_DIRECTORY_NAME: &str = "CodeSignTool";

/// The installation of the external signing tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolLayout {
    /// The installation directory, also used as working directory of the process.
    pub directory: PathBuf,
    pub main_class: String,
}

impl ToolLayout {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            main_class: TOOL_MAIN_CLASS.to_string(),
        }
    }

    /// Use the `CodeSignTool` directory next to the current executable.
    pub fn next_to_current_exe() -> anyhow::Result<Self> {
        let exe = std::env::current_exe()?;
        let base = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(base.join(TOOL_DIRECTORY_NAME)))
    }

    /// The classpath, a wildcard over all entries of the `jar` directory.
    pub fn classpath(&self) -> PathBuf {
        self.directory.join("jar").join("*")
    }
}

/// Environment values which drive the executable lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchEnvironment {
    pub java_home: Option<OsString>,
    pub path: Option<OsString>,
}

impl SearchEnvironment {
    /// Capture `JAVA_HOME` and `PATH` from the current process.
    pub fn from_process() -> Self {
        Self {
            java_home: std::env::var_os("JAVA_HOME"),
            path: std::env::var_os("PATH"),
        }
    }
}

/// Everything a batch run needs besides the request itself.
#[derive(Clone, Debug)]
pub struct BatchSettings {
    pub tool: ToolLayout,
    pub environment: SearchEnvironment,
    /// The directory in which staging directories get created.
    pub temp_dir: PathBuf,
}

impl BatchSettings {
    pub fn new(tool: ToolLayout) -> Self {
        Self {
            tool,
            environment: SearchEnvironment::from_process(),
            temp_dir: std::env::temp_dir(),
        }
    }
}
