use {
    crate::{Config, Format},
    std::{io::IsTerminal, panic::PanicHookInfo, sync::Once},
    time::macros::format_description,
    tracing_subscriber::{
        EnvFilter,
        Layer,
        fmt::{time::UtcTime, writer::MakeWriterExt as _},
        prelude::*,
    },
};

/// Installs the global subscriber and routes panics through it.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn initialize(config: &Config) {
    install(config);
    std::panic::set_hook(Box::new(log_panic));
}

/// Like [`initialize`] with only a filter, ignored after the first call of
/// the process. For tests.
pub fn initialize_reentrant(filter: &str) {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| initialize(&Config::default().with_filter(filter)));
}

fn install(config: &Config) {
    let filter = config.env_filter().unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}, falling back to info", config.filter);
        EnvFilter::new("info")
    });
    let writer = std::io::stdout
        .with_min_level(config.stderr_level)
        .or_else(std::io::stderr);
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
    ));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_timer(timer);
    let fmt = match config.format {
        Format::Json => fmt.json().boxed(),
        Format::Plain => fmt.with_ansi(std::io::stdout().is_terminal()).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt.with_filter(filter))
        .init();
    tracing::info!(format = ?config.format, filter = %config.filter, "logging initialized");
}

/// Logs panics as errors so they end up next to the events that led to them.
fn log_panic(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
