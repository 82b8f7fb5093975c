use {crate::domain::mechanism, optimizer::branch_and_bound, std::fmt::Debug};

pub mod file;

/// Everything needed to run the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mechanism: mechanism::Config,
    pub optimizer: branch_and_bound::Config,
    /// Handed to `observe::tracing::initialize` by the hosting process.
    pub observe: observe::Config,
}

/// Unwraps result or logs a `TOML` parsing error.
fn unwrap_or_log<T, E, P>(result: Result<T, E>, path: &P) -> T
where
    E: Debug,
    P: Debug,
{
    result.unwrap_or_else(|err| {
        if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") {
            panic!("failed to parse TOML config at {path:?}: {err:#?}")
        } else {
            panic!(
                "failed to parse TOML config at: {path:?}. Set TOML_TRACE_ERROR=1 to print \
                 parsing error."
            )
        }
    })
}
