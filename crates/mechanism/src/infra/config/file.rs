use {
    crate::domain::{
        mechanism,
        payment::{PaymentRule, core_selecting},
    },
    anyhow::{Context, ensure},
    optimizer::branch_and_bound,
    serde::Deserialize,
    std::{path::Path, time::Duration},
    tokio::fs,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// How winners pay.
    payment_rule: PaymentRule,

    /// Seed for drawing availability realizations. Rules that value the
    /// realized outcome refuse to run without one.
    seed: Option<u64>,

    /// Slack tolerated when comparing coalition values with payments.
    #[serde(default = "default_epsilon")]
    epsilon: f64,

    /// Constraint generation iterations before giving up on the core.
    #[serde(default = "default_max_iterations")]
    max_iterations: usize,

    #[serde(default)]
    master_objective: core_selecting::MasterObjective,

    #[serde(default)]
    optimizer: OptimizerConfig,

    #[serde(default)]
    logging: observe::Config,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct OptimizerConfig {
    #[serde(default = "default_max_nodes")]
    max_nodes: usize,

    #[serde(default = "default_max_pivots")]
    max_pivots: usize,

    #[serde(default = "default_tolerance")]
    tolerance: f64,

    /// Wall clock limit of a single optimizer call. Hitting it during core
    /// generation is reported as an empty core.
    #[serde(default, with = "humantime_serde")]
    time_limit: Option<Duration>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_pivots: default_max_pivots(),
            tolerance: default_tolerance(),
            time_limit: None,
        }
    }
}

fn default_epsilon() -> f64 {
    core_selecting::Config::default().epsilon
}

fn default_max_iterations() -> usize {
    core_selecting::Config::default().max_iterations
}

fn default_max_nodes() -> usize {
    branch_and_bound::Config::default().max_nodes
}

fn default_max_pivots() -> usize {
    branch_and_bound::Config::default().max_pivots
}

fn default_tolerance() -> f64 {
    branch_and_bound::Config::default().tolerance
}

/// Parses and validates a TOML configuration.
pub fn parse(data: &str) -> anyhow::Result<super::Config> {
    let config = toml::de::from_str::<Config>(data).context("invalid TOML configuration")?;
    ensure!(
        config.epsilon.is_finite() && config.epsilon > 0.,
        "epsilon must be positive, got {}",
        config.epsilon
    );
    ensure!(
        config.optimizer.tolerance.is_finite() && config.optimizer.tolerance > 0.,
        "optimizer tolerance must be positive, got {}",
        config.optimizer.tolerance
    );
    ensure!(config.optimizer.max_nodes > 0, "max-nodes must not be zero");
    config
        .logging
        .env_filter()
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    Ok(super::Config {
        mechanism: mechanism::Config {
            rule: config.payment_rule,
            seed: config.seed,
            core: core_selecting::Config {
                epsilon: config.epsilon,
                max_iterations: config.max_iterations,
                objective: config.master_objective,
            },
        },
        optimizer: branch_and_bound::Config {
            max_nodes: config.optimizer.max_nodes,
            max_pivots: config.optimizer.max_pivots,
            tolerance: config.optimizer.tolerance,
            time_limit: config.optimizer.time_limit,
        },
        observe: config.logging,
    })
}

/// Load the engine configuration from a TOML file.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(path: &Path) -> super::Config {
    let data = fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));
    super::unwrap_or_log(parse(&data), &path)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::domain::payment::core_selecting::MasterObjective};

    #[test]
    fn parses_full_config() {
        let config = parse(
            r#"
            payment-rule = "ecc-core"
            seed = 42
            epsilon = 1e-5
            max-iterations = 50
            master-objective = "minimum-revenue"

            [optimizer]
            max-nodes = 1000
            time-limit = "2s"

            [logging]
            filter = "mechanism=debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.mechanism.rule, PaymentRule::EccCore);
        assert_eq!(config.mechanism.seed, Some(42));
        assert_eq!(
            config.mechanism.core,
            core_selecting::Config {
                epsilon: 1e-5,
                max_iterations: 50,
                objective: MasterObjective::MinimumRevenue,
            }
        );
        assert_eq!(config.optimizer.max_nodes, 1000);
        assert_eq!(config.optimizer.time_limit, Some(Duration::from_secs(2)));
        assert_eq!(
            config.observe,
            observe::Config::default()
                .with_filter("mechanism=debug")
                .with_format(observe::Format::Json)
        );
    }

    #[test]
    fn applies_defaults() {
        let config = parse(r#"payment-rule = "core""#).unwrap();

        assert_eq!(config.mechanism, mechanism::Config::new(PaymentRule::Core));
        assert_eq!(config.optimizer, branch_and_bound::Config::default());
        assert_eq!(config.observe, observe::Config::default());
    }

    #[test]
    fn rejects_unknown_fields_and_rules() {
        assert!(parse("payment-rule = \"core\"\nfoo = 1").is_err());
        assert!(parse("payment-rule = \"second-price\"").is_err());
        assert!(parse("payment-rule = \"core\"\nepsilon = 0").is_err());
        assert!(parse("payment-rule = \"core\"\n[logging]\nfilter = \"mechanism=[\"").is_err());
    }

    #[test]
    fn builds_a_mechanism() {
        let config = parse(
            r#"
            payment-rule = "llg-core"

            [optimizer]
            max-nodes = 500
            "#,
        )
        .unwrap();

        let mechanism =
            crate::Mechanism::from_config(crate::tests::llg(0.3, 0.4, 0.6), &config).unwrap();
        let outcome = mechanism.solve_it().unwrap();

        assert_eq!(mechanism.config(), &config.mechanism);
        assert_eq!(mechanism.optimizer().config().max_nodes, 500);
        assert!((outcome.payments().total() - 0.6).abs() < 1e-9);
        assert!(crate::Mechanism::from_config(crate::tests::two_agents(), &config).is_err());
    }

    #[tokio::test]
    async fn loads_from_disk() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "payment-rule = \"vcg\"\nseed = 3\n")
            .await
            .unwrap();

        let config = load(file.path()).await;

        assert_eq!(config.mechanism.rule, PaymentRule::Vcg);
        assert_eq!(config.mechanism.seed, Some(3));
    }
}
