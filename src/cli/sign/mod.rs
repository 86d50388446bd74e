use crate::batch::sign_files;
use crate::data::{BatchSettings, SigningRequest, ToolLayout};
use crate::report::LogFacadeSink;
use anyhow::bail;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub struct Options {
    pub files: Vec<PathBuf>,
    pub username: String,
    pub password: String,
    pub credential_id: Option<String>,
    pub totp_secret: Option<String>,
    pub program_name: Option<String>,
    pub java_home: Option<PathBuf>,
    pub timeout: u64,
    pub error_on_no_files: bool,
    pub tool_dir: Option<PathBuf>,
}

impl From<Options> for SigningRequest {
    fn from(options: Options) -> Self {
        let mut request = SigningRequest::new(options.files, options.username, options.password);
        request.credential_id = options.credential_id;
        request.totp_secret = options.totp_secret;
        request.program_name = options.program_name;
        request.java_home = options.java_home;
        request.timeout = Duration::from_millis(options.timeout);
        request.error_on_no_files = options.error_on_no_files;
        request
    }
}

pub(crate) async fn run(mut options: Options) -> anyhow::Result<()> {
    let tool = match options.tool_dir.take() {
        Some(dir) => ToolLayout::new(dir),
        None => ToolLayout::next_to_current_exe()?,
    };
    log::debug!("Tool directory: {}", tool.directory.display());

    let settings = BatchSettings::new(tool);
    let request = SigningRequest::from(options);

    log::info!("Signing {} file(s)", request.files.len());

    if !sign_files(&request, &settings, Arc::new(LogFacadeSink)).await {
        bail!("Signing failed");
    }

    Ok(())
}
