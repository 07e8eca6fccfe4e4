use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Overrides `--log-level` with full filter directives when set.
pub const LOG_ENV: &str = "WIRECHAT_LOG";

/// Crates whose events `--log-level` controls; everything else stays at warn.
const WIRECHAT_TARGETS: [&str; 4] = [
    "wirechat",
    "wirechat_session",
    "wirechat_transport",
    "wirechat_frame",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `--log-level` applies to the wirechat crates; the websocket and runtime
/// crates underneath only report warnings unless `WIRECHAT_LOG` says otherwise.
pub fn default_filter(level: LogLevel) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    let level = level.as_filter();
    let mut filter = EnvFilter::default().add_directive(level.min(LevelFilter::WARN).into());
    for target in WIRECHAT_TARGETS {
        if let Ok(directive) = format!("{target}={level}").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the stderr subscriber. Stdout is reserved for command output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(default_filter(level))
        .with_ansi(false)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if installed.is_err() {
        eprintln!("warning: a log subscriber is already installed");
    }
}
