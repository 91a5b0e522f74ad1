use std::fmt;
use std::time::Duration;

use course_core::model::Theme;
use services::{AppServices, Clock, CourseConfig, LatencyMode};
use tracing_subscriber::EnvFilter;

mod walkthrough;

use walkthrough::WalkthroughOptions;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownSubcommand(String),
    InvalidDbUrl { raw: String },
    InvalidThemeAction { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownSubcommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidThemeAction { raw } => {
                write!(f, "invalid theme action: {raw} (expected show, light, dark or toggle)")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- walkthrough [--db <sqlite_url>] [--instant] [--fail-quiz]");
    eprintln!("  cargo run -p app -- theme [show|light|dark|toggle] [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://course.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  COURSE_DB_URL, COURSE_LATENCY (simulated|instant), COURSE_READ_DWELL_MS, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThemeAction {
    Show,
    Set(Theme),
    Toggle,
}

impl ThemeAction {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "show" => Some(Self::Show),
            "light" => Some(Self::Set(Theme::Light)),
            "dark" => Some(Self::Set(Theme::Dark)),
            "toggle" => Some(Self::Toggle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Walkthrough { fail_quiz: bool },
    Theme(ThemeAction),
}

#[derive(Debug)]
struct Args {
    command: Command,
    config: CourseConfig,
}

impl Args {
    /// Flags override values taken from the environment.
    fn parse(
        argv: impl IntoIterator<Item = String>,
        mut config: CourseConfig,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        let is_positional = |arg: &String| !arg.starts_with("--");

        // Default behavior: walkthrough when no subcommand is provided.
        let mut command = Command::Walkthrough { fail_quiz: false };
        if let Some(sub) = args.next_if(is_positional) {
            command = match sub.as_str() {
                "walkthrough" => Command::Walkthrough { fail_quiz: false },
                "theme" => {
                    let action = match args.next_if(is_positional) {
                        Some(raw) => ThemeAction::from_arg(&raw)
                            .ok_or(ArgsError::InvalidThemeAction { raw })?,
                        None => ThemeAction::Show,
                    };
                    Command::Theme(action)
                }
                _ => return Err(ArgsError::UnknownSubcommand(sub)),
            };
        }

        while let Some(arg) = args.next() {
            match (arg.as_str(), &mut command) {
                ("--db", _) => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    config.database_url = normalize_sqlite_url(value);
                }
                ("--instant", Command::Walkthrough { .. }) => {
                    config.latency = LatencyMode::Instant;
                    config.read_dwell = Duration::ZERO;
                }
                ("--fail-quiz", Command::Walkthrough { fail_quiz }) => *fail_quiz = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { command, config })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.contains("mode=memory") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// `SQLite` will not create a missing database file on its own.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if matches!(argv.first().map(String::as_str), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }

    let Args { command, config } =
        Args::parse(argv, CourseConfig::from_env()).inspect_err(|e| {
            eprintln!("{e}");
            print_usage();
        })?;

    prepare_sqlite_file(&config.database_url)?;
    let services = AppServices::new_sqlite(config, Clock::default()).await?;

    match command {
        Command::Walkthrough { fail_quiz } => {
            walkthrough::run(
                &services,
                WalkthroughOptions {
                    fail_first_quiz: fail_quiz,
                },
            )
            .await
        }
        Command::Theme(action) => {
            let theme = services.theme();
            let current = theme.load().await;
            let shown = match action {
                ThemeAction::Show => current,
                ThemeAction::Set(next) => theme.set(next).await?,
                ThemeAction::Toggle => theme.toggle(current).await?,
            };
            println!("{shown}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
