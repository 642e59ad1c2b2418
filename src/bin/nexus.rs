//! Nexus CLI - Command-line interface for Nexus Flux
//!
//! Commands:
//! - replay: Replay a UI signal trace into a profile
//! - inspect: Summarize a stored profile
//! - prompt: Print the content-generation prompt for a profile
//! - validate: Validate a UI signal trace
//! - doctor: Diagnose configuration and profile health

use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use nexus_flux::config::EngineConfig;
use nexus_flux::event::EventType;
use nexus_flux::pipeline::replay_trace;
use nexus_flux::profile::{rebuild_interactions, FileStorage, ProfileStorage};
use nexus_flux::ranking::build_prompt;
use nexus_flux::signal::SignalTrace;
use nexus_flux::types::UserProfile;
use nexus_flux::{EngineError, NEXUS_VERSION, PRODUCER_NAME};

/// Nexus - behavioral telemetry engine for a personalized content feed
#[derive(Parser)]
#[command(name = "nexus")]
#[command(author = "Nexus Personale")]
#[command(version = NEXUS_VERSION)]
#[command(about = "Turn UI signal traces into engagement profiles", long_about = None)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a UI signal trace into a profile
    Replay {
        /// Trace file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Starting profile (.json); a missing file starts fresh
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Output profile path (.json, use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Emit the full outcome (recorded events and sessions) instead of the profile
        #[arg(long)]
        outcome: bool,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Summarize a stored profile
    Inspect {
        /// Profile path (.json)
        #[arg(short, long)]
        profile: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the content-generation prompt for a profile
    Prompt {
        /// Profile path (.json); omit for a first-session prompt
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Validate a UI signal trace
    Validate {
        /// Trace file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and profile health
    Doctor {
        /// Check a stored profile
        #[arg(long)]
        profile: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, NexusCliError> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), NexusCliError> {
    match cli.command {
        Commands::Replay {
            input,
            profile,
            output,
            outcome,
            output_format,
        } => cmd_replay(
            &input,
            profile.as_deref(),
            &output,
            outcome,
            output_format,
            &load_config(cli.config.as_deref())?,
        ),
        Commands::Inspect { profile, json } => cmd_inspect(&profile, json),
        Commands::Prompt { profile } => cmd_prompt(profile.as_deref()),
        Commands::Validate { input, json } => cmd_validate(&input, json),
        Commands::Doctor { profile, json } => {
            cmd_doctor(cli.config.as_deref(), profile.as_deref(), json)
        }
    }
}

fn read_input(input: &Path) -> Result<String, NexusCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

/// Single-record file storage for a profile path
fn profile_storage(path: &Path) -> Result<(FileStorage, String), NexusCliError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(FileStorage::for_file(path)),
        _ => Err(NexusCliError::ProfilePath(path.to_path_buf())),
    }
}

fn read_profile(path: &Path) -> Result<Option<String>, NexusCliError> {
    let (storage, key) = profile_storage(path)?;
    Ok(storage.read(&key)?)
}

fn cmd_replay(
    input: &Path,
    profile: Option<&Path>,
    output: &Path,
    emit_outcome: bool,
    output_format: OutputFormat,
    config: &EngineConfig,
) -> Result<(), NexusCliError> {
    let trace = read_input(input)?;

    let starting_profile = match profile {
        Some(path) => read_profile(path)?,
        None => None,
    };

    let outcome = replay_trace(&trace, starting_profile.as_deref(), config)?;
    log::info!(
        "Profile now holds {} events ({} liked, {} viewed)",
        outcome.profile.interaction_history.len(),
        outcome.profile.interactions.liked.len(),
        outcome.profile.interactions.viewed.len()
    );

    let rendered = match (emit_outcome, output_format) {
        (true, OutputFormat::Json) => serde_json::to_string(&outcome)?,
        (true, OutputFormat::JsonPretty) => serde_json::to_string_pretty(&outcome)?,
        (false, OutputFormat::Json) => serde_json::to_string(&outcome.profile)?,
        (false, OutputFormat::JsonPretty) => serde_json::to_string_pretty(&outcome.profile)?,
    };

    if output.to_string_lossy() == "-" {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
    } else {
        let (mut storage, key) = profile_storage(output)?;
        storage.write(&key, &rendered)?;
    }

    Ok(())
}

fn cmd_inspect(path: &Path, json: bool) -> Result<(), NexusCliError> {
    let raw = read_profile(path)?.ok_or_else(|| NexusCliError::NoProfile(path.to_path_buf()))?;
    let profile: UserProfile = serde_json::from_str(&raw)?;

    let mut event_counts: BTreeMap<EventType, usize> = BTreeMap::new();
    for event in &profile.interaction_history {
        *event_counts.entry(event.event_type()).or_insert(0) += 1;
    }

    let report = InspectReport {
        history_len: profile.interaction_history.len(),
        liked: profile.interactions.liked.len(),
        viewed: profile.interactions.viewed.len(),
        first_event: profile
            .interaction_history
            .front()
            .map(|e| e.timestamp.to_rfc3339()),
        last_event: profile
            .interaction_history
            .back()
            .map(|e| e.timestamp.to_rfc3339()),
        event_counts: event_counts
            .into_iter()
            .map(|(t, n)| (t.as_str().to_string(), n))
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Profile Report");
        println!("==============");
        println!("History events: {}", report.history_len);
        println!("Liked items:    {}", report.liked);
        println!("Viewed items:   {}", report.viewed);
        if let (Some(first), Some(last)) = (&report.first_event, &report.last_event) {
            println!("Span:           {} .. {}", first, last);
        }
        if !report.event_counts.is_empty() {
            println!("\nEvents by type:");
            for (event_type, count) in &report.event_counts {
                println!("  {:<22} {}", event_type, count);
            }
        }
    }

    Ok(())
}

fn cmd_prompt(path: Option<&Path>) -> Result<(), NexusCliError> {
    let profile = match path {
        Some(path) => match read_profile(path)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => return Err(NexusCliError::NoProfile(path.to_path_buf())),
        },
        None => UserProfile::default(),
    };

    println!("{}", build_prompt(&profile));
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), NexusCliError> {
    let trace = SignalTrace::parse(&read_input(input)?)?;
    let issues = trace.validate();

    let report = ValidationReport {
        total_records: trace.len(),
        valid_records: trace.len() - issues.len(),
        invalid_records: issues.len(),
        errors: issues
            .iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                signal: issue.signal.to_string(),
                error: issue.message.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} (index {}): {}", err.signal, err.index, err.error);
            }
        }
    }

    if report.invalid_records > 0 {
        Err(NexusCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    config_path: Option<&Path>,
    profile: Option<&Path>,
    json: bool,
) -> Result<(), NexusCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "nexus_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Nexus version {}", NEXUS_VERSION),
    });

    let config = match config_path {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config {} valid", path.display()),
                });
                config
            }
            Err(e) => {
                checks.push(DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                });
                EngineConfig::default()
            }
        },
        None => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Using built-in defaults".to_string(),
            });
            EngineConfig::default()
        }
    };

    if let Some(profile_path) = profile {
        checks.push(check_profile(profile_path, &config));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (trace input ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: NEXUS_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Nexus Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(NexusCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_profile(path: &Path, config: &EngineConfig) -> DoctorCheck {
    let raw = match read_profile(path) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            return DoctorCheck {
                name: "profile".to_string(),
                status: CheckStatus::Warning,
                message: "Profile file does not exist (a fresh profile will be created)"
                    .to_string(),
            }
        }
        Err(e) => {
            return DoctorCheck {
                name: "profile".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot read profile: {}", CliError::from(e).message),
            }
        }
    };

    match serde_json::from_str::<UserProfile>(&raw) {
        Ok(profile) if profile.interaction_history.len() > config.history_limit => DoctorCheck {
            name: "profile".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "History holds {} events, {} oldest will be dropped on load",
                profile.interaction_history.len(),
                profile.interaction_history.len() - config.history_limit
            ),
        },
        Ok(profile) => {
            let derived = rebuild_interactions(&profile.interaction_history);
            let missing = derived
                .liked
                .difference(&profile.interactions.liked)
                .chain(derived.viewed.difference(&profile.interactions.viewed))
                .count();
            if missing > 0 {
                DoctorCheck {
                    name: "profile".to_string(),
                    status: CheckStatus::Warning,
                    message: format!(
                        "{} liked/viewed entries are missing for items in the history",
                        missing
                    ),
                }
            } else {
                DoctorCheck {
                    name: "profile".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Profile valid ({} events)",
                        profile.interaction_history.len()
                    ),
                }
            }
        }
        Err(e) => DoctorCheck {
            name: "profile".to_string(),
            status: CheckStatus::Error,
            message: format!("Profile is corrupt and would be discarded: {}", e),
        },
    }
}

// Error types

#[derive(Debug)]
enum NexusCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoProfile(PathBuf),
    ProfilePath(PathBuf),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for NexusCliError {
    fn from(e: io::Error) -> Self {
        NexusCliError::Io(e)
    }
}

impl From<EngineError> for NexusCliError {
    fn from(e: EngineError) -> Self {
        NexusCliError::Engine(e)
    }
}

impl From<nexus_flux::error::StorageError> for NexusCliError {
    fn from(e: nexus_flux::error::StorageError) -> Self {
        NexusCliError::Engine(e.into())
    }
}

impl From<serde_json::Error> for NexusCliError {
    fn from(e: serde_json::Error) -> Self {
        NexusCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<NexusCliError> for CliError {
    fn from(e: NexusCliError) -> Self {
        match e {
            NexusCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            NexusCliError::Engine(EngineError::Config(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check the --config file".to_string()),
            },
            NexusCliError::Engine(e @ EngineError::InvalidSignal(_)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'nexus validate' for details".to_string()),
            },
            NexusCliError::Engine(e @ EngineError::Storage(_)) => CliError {
                code: "STORAGE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            NexusCliError::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a JSON array or NDJSON of signal records".to_string()),
            },
            NexusCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            NexusCliError::NoProfile(path) => CliError {
                code: "NO_PROFILE".to_string(),
                message: format!("No profile at {}", path.display()),
                hint: Some("Create one with 'nexus replay --output'".to_string()),
            },
            NexusCliError::ProfilePath(path) => CliError {
                code: "PROFILE_PATH".to_string(),
                message: format!("Profile path {} must end in .json", path.display()),
                hint: None,
            },
            NexusCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            NexusCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct InspectReport {
    history_len: usize,
    liked: usize,
    viewed: usize,
    first_event: Option<String>,
    last_event: Option<String>,
    event_counts: BTreeMap<String, usize>,
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    signal: String,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
