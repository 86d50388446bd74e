//! Running the external signing tool.

use crate::data::{SigningRequest, ToolLayout};
use crate::report::{censored_error, censored_message, Censor, Level};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

mod invocation;

pub use invocation::*;

#[cfg(test)]
pub(crate) mod testing;

/// The name of the tool, as used in reports.
pub const TOOL_NAME: &str = "CodeSignTool";

/// Marks an error written to stdout.
const STDOUT_ERROR_MARKER: &str = "Error:";

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("Cannot find file to sign: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Failed to launch {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The result of signing a single file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignOutcome {
    /// The tool exited with code zero, and didn't report any error.
    pub success: bool,
    /// The exit code, if the process exited on its own.
    pub exit_code: Option<i32>,
    /// Some output line was classified as an error.
    pub error_output: bool,
    pub timed_out: bool,
}

/// The output streams of the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    /// Everything on stderr is an error. Some errors get written to stdout, prefixed with "Error:".
    pub fn classify(&self, line: &str) -> Level {
        match self {
            Self::Stderr => Level::Error,
            Self::Stdout if line.contains(STDOUT_ERROR_MARKER) => Level::Error,
            Self::Stdout => Level::Message,
        }
    }
}

/// Sign a single file, writing the signed version into `output_dir`.
///
/// The caller is responsible for picking up the result from the output directory.
pub async fn sign_file(
    java: &Path,
    tool: &ToolLayout,
    output_dir: &Path,
    source: &Path,
    request: &SigningRequest,
    censor: &Censor,
) -> anyhow::Result<SignOutcome> {
    let invocation = Invocation::sign(java, tool, output_dir, source, request);
    run(&invocation, request.timeout, censor).await
}

/// Run the invocation, reporting its output through the censor.
///
/// The process gets killed once the timeout expires, which counts as a failure.
pub async fn run(
    invocation: &Invocation,
    timeout: Duration,
    censor: &Censor,
) -> anyhow::Result<SignOutcome> {
    censored_message!(censor, "Executing: {invocation}");

    let mut command = Command::new(&invocation.program);
    command
        .args(invocation.args())
        .current_dir(&invocation.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    command.creation_flags(CREATE_NO_WINDOW);

    let deadline = Instant::now() + timeout;

    let mut child = command.spawn().map_err(|source| SignError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;

    let error_output = Arc::new(AtomicBool::new(false));
    let readers: Vec<JoinHandle<io::Result<()>>> = [
        child
            .stdout
            .take()
            .map(|out| spawn_reader(out, Stream::Stdout, censor, &error_output)),
        child
            .stderr
            .take()
            .map(|err| spawn_reader(err, Stream::Stderr, censor, &error_output)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let status = match timeout_at(deadline, child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            censored_error!(
                censor,
                "{TOOL_NAME} did not exit before the {} millisecond timeout.",
                timeout.as_millis()
            );
            if let Err(err) = child.kill().await {
                log::warn!("Failed to kill process: {err}");
            }
            for reader in &readers {
                reader.abort();
            }
            return Ok(SignOutcome {
                success: false,
                exit_code: None,
                error_output: error_output.load(Ordering::SeqCst),
                timed_out: true,
            });
        }
    };

    // drain what is left in the pipes, something else might still hold them open
    for reader in readers {
        match timeout_at(deadline, reader).await {
            Ok(result) => result??,
            Err(_) => {
                censored_error!(
                    censor,
                    "{TOOL_NAME} output did not close before the {} millisecond timeout.",
                    timeout.as_millis()
                );
                return Ok(SignOutcome {
                    success: false,
                    exit_code: status.code(),
                    error_output: error_output.load(Ordering::SeqCst),
                    timed_out: true,
                });
            }
        }
    }

    let error_output = error_output.load(Ordering::SeqCst);
    let exit_code = status.code();
    let success = exit_code == Some(0) && !error_output;

    let code = match exit_code {
        Some(code) => code.to_string(),
        None => status.to_string(),
    };
    if success {
        censored_message!(censor, "{TOOL_NAME} exited code {code}");
    } else {
        censored_error!(censor, "{TOOL_NAME} exited code {code}");
    }

    Ok(SignOutcome {
        success,
        exit_code,
        error_output,
        timed_out: false,
    })
}

fn spawn_reader<R>(
    stream: R,
    kind: Stream,
    censor: &Censor,
    error_output: &Arc<AtomicBool>,
) -> JoinHandle<io::Result<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let censor = censor.clone();
    let error_output = error_output.clone();
    tokio::spawn(async move { read_lines(stream, kind, &censor, &error_output).await })
}

/// Report each line of the stream, until it gets closed.
async fn read_lines<R>(
    stream: R,
    kind: Stream,
    censor: &Censor,
    error_output: &AtomicBool,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();

    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            return Ok(());
        }

        // the tool doesn't necessarily write UTF-8
        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        match kind.classify(line) {
            Level::Error => {
                error_output.store(true, Ordering::SeqCst);
                censor.error(line);
            }
            Level::Message => censor.message(line),
        }
    }
}

#[cfg(test)]
mod test {
    use super::testing::*;
    use super::*;
    use crate::data::TOOL_MAIN_CLASS;
    use crate::report::{MemorySink, Redactions};
    use std::time::Instant as StdInstant;

    fn setup() -> (Arc<MemorySink>, Censor) {
        let _ = env_logger::builder().is_test(true).try_init();
        let sink = Arc::new(MemorySink::new());
        let censor = Censor::new(Redactions::new(["alice", "hunter2"]), sink.clone());
        (sink, censor)
    }

    fn request() -> SigningRequest {
        SigningRequest::new(vec![], "alice", "hunter2")
    }

    #[test]
    fn test_classify() {
        assert_eq!(Stream::Stdout.classify("Signing file"), Level::Message);
        assert_eq!(Stream::Stdout.classify("Error: invalid credentials"), Level::Error);
        assert_eq!(Stream::Stdout.classify("[main] Error: oops"), Level::Error);
        assert_eq!(Stream::Stdout.classify("error: lower case"), Level::Message);
        assert_eq!(Stream::Stderr.classify("just a warning"), Level::Error);
        assert_eq!(Stream::Stderr.classify(""), Level::Error);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo 'Code signed successfully'\nexit 0");

        let outcome = sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request(), &censor)
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(sink.errors().is_empty(), "{:?}", sink.errors());
        assert!(sink
            .messages()
            .contains(&"Code signed successfully".to_string()));
        assert!(sink.contains("CodeSignTool exited code 0"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_error_on_stdout() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo 'Error: something went wrong'\nexit 0");

        let outcome = sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request(), &censor)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.error_output);
        assert!(sink
            .errors()
            .contains(&"Error: something went wrong".to_string()));
        assert!(sink
            .errors()
            .contains(&"CodeSignTool exited code 0".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stderr_is_error() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo 'a warning' >&2\nexit 0");

        let outcome = sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request(), &censor)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(sink.errors().contains(&"a warning".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo 'working'\nexit 3");

        let outcome = sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request(), &censor)
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(!outcome.error_output);
        assert_eq!(outcome.exit_code, Some(3));
        assert_eq!(sink.errors(), vec!["CodeSignTool exited code 3".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo $$ > pid\necho 'started'\nexec sleep 30");

        let mut request = request();
        request.timeout = Duration::from_millis(300);

        let start = StdInstant::now();
        let outcome = sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request, &censor)
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(!outcome.success);
        assert!(outcome.timed_out);
        assert_eq!(outcome.exit_code, None);
        assert!(sink.errors().contains(
            &"CodeSignTool did not exit before the 300 millisecond timeout.".to_string()
        ));

        // the process is gone, not just abandoned
        let pid = std::fs::read_to_string(tool.directory.join("pid")).unwrap();
        let alive = std::process::Command::new("kill")
            .args(["-0", pid.trim()])
            .stderr(Stdio::null())
            .status()
            .unwrap();
        assert!(!alive.success(), "process {} still running", pid.trim());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_is_redacted() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "echo \"$@\"\necho \"$@\" >&2\nexit 0");

        sign_file(&java, &tool, tmp.path(), Path::new("/in.exe"), &request(), &censor)
            .await
            .unwrap();

        let entries = sink.entries();
        assert!(entries.len() >= 3);
        for entry in entries {
            assert!(!entry.text.contains("alice"), "{}", entry.text);
            assert!(!entry.text.contains("hunter2"), "{}", entry.text);
        }
        assert!(sink.contains("-username=\"********\""));
        assert!(sink.contains("-password=********"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_arguments() {
        let (sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());
        let java = fake_java(tmp.path(), "for arg in \"$@\"; do echo \"arg: $arg\"; done");

        let mut request = request();
        request.credential_id = Some("cid".into());
        request.program_name = Some("My Setup".into());

        let outcome = sign_file(&java, &tool, Path::new("/out"), Path::new("/in.msi"), &request, &censor)
            .await
            .unwrap();
        assert!(outcome.success);

        let args: Vec<_> = sink
            .messages()
            .into_iter()
            .filter_map(|m| m.strip_prefix("arg: ").map(ToString::to_string))
            .collect();
        assert_eq!(
            args,
            vec![
                "-cp".to_string(),
                tool.classpath().display().to_string(),
                TOOL_MAIN_CLASS.to_string(),
                "sign".to_string(),
                "-username=********".to_string(),
                "-password=********".to_string(),
                "-input_file_path=/in.msi".to_string(),
                "-output_dir_path=/out".to_string(),
                "-credential_id=cid".to_string(),
                "-program_name=My Setup".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let (_sink, censor) = setup();
        let tmp = tempfile::tempdir().unwrap();
        let tool = tool_layout(tmp.path());

        let result = sign_file(
            &tmp.path().join("no-such-java"),
            &tool,
            tmp.path(),
            Path::new("/in.exe"),
            &request(),
            &censor,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SignError>(),
            Some(SignError::Spawn { .. })
        ));
    }
}
