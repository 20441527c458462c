use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use intake_core::{SessionConfig, SurfaceId};
use intake_engine::ServiceSettings;

use super::logging::LogDestination;

/// Command-line arguments for intake
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(about = "Add input files to a project on a processing service and follow its progress")]
#[command(version)]
pub struct Cli {
    /// Root URL of the service
    #[arg(long, env = "INTAKE_URL", default_value = "http://localhost:8080/")]
    pub url: String,

    /// Project identifier
    #[arg(short, long, env = "INTAKE_PROJECT")]
    pub project: Option<String>,

    #[arg(long, env = "INTAKE_USER")]
    pub user: Option<String>,

    #[arg(long, env = "INTAKE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    #[arg(long, env = "INTAKE_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    #[arg(long, env = "INTAKE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Delay between status polls while the project runs
    #[arg(long, env = "INTAKE_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Status log lines kept on screen
    #[arg(long, env = "INTAKE_MAX_LOG_ENTRIES", default_value_t = 500)]
    pub max_log_entries: usize,

    /// Where log output goes
    #[arg(long, value_enum, env = "INTAKE_LOG", default_value_t = LogTarget::File)]
    pub log: LogTarget,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogTarget {
    File,
    Terminal,
    Both,
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::File => LogDestination::File,
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the input types the project accepts
    Templates,
    /// Show input files and status, following progress while the project runs
    Watch,
    /// Upload a local file
    UploadFile {
        path: PathBuf,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Have the service download a file from a URL
    UploadUrl {
        url: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Create an input file from text
    Edit {
        /// Name of the new file; may be omitted when the type forces one
        #[arg(short, long, default_value = "")]
        filename: String,
        /// Text of the file
        #[arg(long, conflicts_with = "from_file")]
        text: Option<String>,
        /// Read the text from a local file
        #[arg(long)]
        from_file: Option<PathBuf>,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Add a file from data pre-installed for an input type
    UseSource {
        source: String,
        #[arg(short, long, default_value = "")]
        filename: String,
        #[command(flatten)]
        form: FormArgs,
    },
    /// Use pre-installed data as the whole project input
    SelectSource { source: String },
    /// Remove an input file
    Delete { filename: String },
    /// Create a new project
    Create { name: String },
    /// Abort a running project, keeping it
    Abort,
    /// Delete the project
    DeleteProject,
    /// Delete the project's output so it can run again
    Restart,
}

#[derive(Args, Debug, Clone)]
pub struct FormArgs {
    /// Input type id
    #[arg(short, long)]
    pub template: String,

    /// Parameter value as ID=VALUE; repeatable
    #[arg(short = 'P', long = "param", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Converter to apply to the uploaded file
    #[arg(long)]
    pub converter: Option<String>,
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got {raw:?}"))?;
    if key.trim().is_empty() {
        return Err(format!("missing parameter id in {raw:?}"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

impl Command {
    /// Commands that act on an existing project and need its session loaded.
    pub fn needs_session(&self) -> bool {
        !matches!(self, Command::Create { .. })
    }

    /// Surface whose parameter form the command fills in.
    pub fn surface(&self) -> Option<SurfaceId> {
        match self {
            Command::UploadFile { .. } => Some(SurfaceId::Upload),
            Command::UploadUrl { .. } => Some(SurfaceId::UrlUpload),
            Command::Edit { .. } => Some(SurfaceId::Editor),
            Command::UseSource { .. } => Some(SurfaceId::InputSource),
            _ => None,
        }
    }
}

impl Cli {
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            base_url: self.url.clone(),
            project: self.project.clone().unwrap_or_default(),
            user: self.user.clone(),
            access_token: self.access_token.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_log_entries: self.max_log_entries,
        }
    }
}
