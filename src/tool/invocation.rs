use crate::data::{SigningRequest, ToolLayout};
use std::ffi::OsString;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// A single argument of the tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Argument {
    /// A plain argument, like the subcommand.
    Plain(String),
    /// A path argument, rendered in quotes.
    Path(PathBuf),
    /// A `-name=value` option, with a quoted value.
    Quoted(&'static str, String),
    /// A `-name=path` option, with a quoted value. The path is passed on as is, even if it is
    /// not valid UTF-8.
    PathOption(&'static str, PathBuf),
    /// A `-name=value` option, rendered as is.
    Unquoted(&'static str, String),
}

impl Argument {
    /// The argument as seen by the tool, after the command line got parsed.
    pub fn to_os_string(&self) -> OsString {
        match self {
            Self::Plain(value) => value.into(),
            Self::Path(path) => path.into(),
            Self::Quoted(name, value) | Self::Unquoted(name, value) => {
                format!("-{name}={value}").into()
            }
            Self::PathOption(name, path) => {
                let mut arg = OsString::from(format!("-{name}="));
                arg.push(path);
                arg
            }
        }
    }
}

impl Display for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain(value) => write!(f, "{value}"),
            Self::Path(path) => write!(f, "\"{}\"", path.display()),
            Self::Quoted(name, value) => write!(f, "-{name}=\"{value}\""),
            Self::PathOption(name, path) => write!(f, "-{name}=\"{}\"", path.display()),
            Self::Unquoted(name, value) => write!(f, "-{name}={value}"),
        }
    }
}

/// The command line running the tool for one file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub working_dir: PathBuf,
    pub arguments: Vec<Argument>,
}

impl Invocation {
    /// Build the `sign` invocation for a single file.
    ///
    /// Optional values are only added when present.
    pub fn sign(
        java: &Path,
        tool: &ToolLayout,
        output_dir: &Path,
        source: &Path,
        request: &SigningRequest,
    ) -> Self {
        let mut arguments = vec![
            Argument::Plain("-cp".into()),
            Argument::Path(tool.classpath()),
            Argument::Plain(tool.main_class.clone()),
            Argument::Plain("sign".into()),
            Argument::Quoted("username", request.credentials.username.clone()),
            Argument::Quoted("password", request.credentials.password.clone()),
            Argument::PathOption("input_file_path", source.to_path_buf()),
            Argument::PathOption("output_dir_path", output_dir.to_path_buf()),
        ];

        let optional = [
            ("credential_id", request.credential_id()),
            ("totp_secret", request.totp_secret()),
            ("program_name", request.program_name()),
        ];
        arguments.extend(
            optional
                .into_iter()
                .filter_map(|(name, value)| Some(Argument::Unquoted(name, value?.to_string()))),
        );

        Self {
            program: java.to_path_buf(),
            working_dir: tool.directory.clone(),
            arguments,
        }
    }

    pub fn args(&self) -> impl Iterator<Item = OsString> + '_ {
        self.arguments.iter().map(Argument::to_os_string)
    }
}

/// Renders the full command line, as it would be typed in.
impl Display for Invocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for argument in &self.arguments {
            write!(f, " {argument}")?;
        }
        Ok(())
    }
}
