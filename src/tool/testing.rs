//! Helpers for running against a fake tool installation.

use crate::data::ToolLayout;
use std::fs;
use std::path::{Path, PathBuf};

/// Create the tool installation directory below `base`.
pub fn tool_layout(base: &Path) -> ToolLayout {
    let tool = ToolLayout::new(base.join("CodeSignTool"));
    fs::create_dir_all(tool.directory.join("jar")).unwrap();
    tool
}

/// Install a shell script as `<base>/jdk/bin/java`, returning its path.
#[cfg(unix)]
pub fn fake_java(base: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = base.join("jdk").join("bin");
    fs::create_dir_all(&bin).unwrap();
    let java = bin.join(crate::utils::locate::JAVA_EXECUTABLE);
    fs::write(&java, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();
    java
}

/// A fake tool, which "signs" by appending to the content of the input file.
///
/// Inputs with `fail` in their name are rejected, each call is recorded in `calls.log` of the
/// working directory.
pub const FAKE_SIGNER: &str = r#"
for arg in "$@"; do
  case "$arg" in
    -input_file_path=*) input="${arg#-input_file_path=}" ;;
    -output_dir_path=*) output="${arg#-output_dir_path=}" ;;
  esac
done
echo "$input" >> calls.log
case "$input" in
  *fail*)
    echo "Error: unable to sign $input"
    exit 1
    ;;
esac
name=$(basename "$input")
{ cat "$input"; printf '+signed'; } > "$output/$name"
echo "Code signed successfully: $output/$name"
"#;
