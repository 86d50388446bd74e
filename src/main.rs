use crate::cli::sign;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::path::PathBuf;

pub(crate) mod batch;
mod cli;
pub(crate) mod data;
pub(crate) mod report;
pub(crate) mod tool;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Don't output anything
    #[arg(global = true, short, long, default_value = "false")]
    quiet: bool,

    /// Increase verbosity level
    #[arg(global = true, short, long, action=clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign files, replacing each of them with its signed version
    Sign {
        /// The files to sign
        #[arg()]
        files: Vec<PathBuf>,

        /// The account username
        #[arg(long, env = "CODESIGNTOOL_USERNAME")]
        username: String,

        /// The account password
        #[arg(long, env = "CODESIGNTOOL_PASSWORD", hide_env_values = true)]
        password: String,

        /// The credential ID, required if the account has more than one certificate
        #[arg(long, env = "CODESIGNTOOL_CREDENTIAL_ID")]
        credential_id: Option<String>,

        /// The OAuth TOTP secret
        #[arg(long, env = "CODESIGNTOOL_TOTP_SECRET", hide_env_values = true)]
        totp_secret: Option<String>,

        /// The program name, shown when signing MSI installers
        #[arg(long)]
        program_name: Option<String>,

        /// Overrides the JAVA_HOME environment variable
        #[arg(long)]
        java_home: Option<PathBuf>,

        /// Timeout of signing a single file, in milliseconds
        #[arg(long, default_value_t = 10000)]
        timeout: u64,

        /// Fail if there are no files to sign
        #[arg(long)]
        error_on_no_files: bool,

        /// The installation directory of the CodeSignTool
        #[arg(long, env = "CODESIGNTOOL_HOME")]
        tool_dir: Option<PathBuf>,
    },
}

fn setup_logger(cli: &Cli) {
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => LevelFilter::Off,
        (_, 0) => LevelFilter::Warn,
        (_, 1) => LevelFilter::Info,
        (_, 2) => LevelFilter::Debug,
        (_, _) => LevelFilter::Trace,
    };

    if let Err(err) = TermLogger::init(
        log_level,
        ConfigBuilder::new()
            .set_time_level(LevelFilter::Debug)
            .set_max_level(LevelFilter::Debug)
            .build(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ) {
        eprintln!("Unable to setup logging: {err}");
    }

    log::debug!("Log Level: {log_level}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logger(&cli);

    match cli.command {
        Command::Sign {
            files,
            username,
            password,
            credential_id,
            totp_secret,
            program_name,
            java_home,
            timeout,
            error_on_no_files,
            tool_dir,
        } => {
            sign::run(sign::Options {
                files,
                username,
                password,
                credential_id,
                totp_secret,
                program_name,
                java_home,
                timeout,
                error_on_no_files,
                tool_dir,
            })
            .await?
        }
    }

    Ok(())
}
