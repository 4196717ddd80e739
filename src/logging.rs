use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "renamer=info,renamer_engine=info,renamer_naming=warn,renamer_storage=warn";
const VERBOSE_DIRECTIVES: &str =
    "renamer=debug,renamer_engine=debug,renamer_naming=debug,renamer_storage=debug,renamer_archive=debug";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Install the global subscriber. Logs go to stderr.
///
/// Without `-v`, `RUST_LOG` wins over the built-in default. `-v` forces
/// debug output for every renamer crate; `-vv` and above log everything.
pub fn init(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES)),
        1 => EnvFilter::new(VERBOSE_DIRECTIVES),
        _ => EnvFilter::new("trace"),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}
