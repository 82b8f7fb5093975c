use {
    super::{
        Error,
        allocation::{Allocation, RealizedAllocation},
        auction::{Auction, InvalidAuction},
        availability::{AvailabilityModel, Realization},
        evaluator::{Conditioned, Deterministic, Evaluation, Evaluator, Expected, RealizedReference},
        payment::{
            PaymentRule,
            PaymentVector,
            Resolution,
            core_selecting::{self, CoalitionConstraint, CorePayments},
            llg,
            vcg,
        },
        winner_determination::Request,
    },
    crate::infra,
    optimizer::{BranchAndBound, Optimizer},
    std::sync::{
        Arc,
        OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Shared flag to abort a running solve. It is checked before every VCG
/// re-solve and between constraint generation iterations.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rule: PaymentRule,
    /// Seed of the availability realization. It is never replaced by a
    /// random one.
    pub seed: Option<u64>,
    pub core: core_selecting::Config,
}

impl Config {
    pub fn new(rule: PaymentRule) -> Self {
        Self {
            rule,
            seed: None,
            core: Default::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Everything a solve produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub rule: PaymentRule,
    /// The efficient allocation, chosen on expected values whenever the
    /// auction has an availability model.
    pub allocation: Allocation,
    /// The same winners valued the way the payment rule values them. Payment
    /// vectors are index aligned with its winners.
    pub valuation: Allocation,
    /// Ex-post view for probabilistic auctions solved with a seed.
    pub realization: Option<RealizedAllocation>,
    pub vcg: PaymentVector,
    pub resolution: Resolution,
    /// Coalition constraints generated by core-selecting rules.
    pub constraints: Vec<CoalitionConstraint>,
    pub iterations: usize,
}

impl Outcome {
    /// Payments owed by every winner. Empty cores fall back to VCG.
    pub fn payments(&self) -> &PaymentVector {
        self.resolution.or_vcg()
    }
}

/// An auction together with its payment rule. The outcome is computed once
/// and cached.
#[derive(Debug)]
pub struct Mechanism<O = BranchAndBound> {
    auction: Auction,
    config: Config,
    optimizer: O,
    cancellation: Cancellation,
    outcome: OnceLock<Outcome>,
}

impl Mechanism {
    pub fn new(auction: Auction, config: Config) -> Result<Self, Error> {
        Self::with_optimizer(auction, config, BranchAndBound::default())
    }

    /// Builds the mechanism from a loaded configuration file and installs
    /// the metrics registry if nothing did so before.
    pub fn from_config(auction: Auction, config: &infra::config::Config) -> Result<Self, Error> {
        infra::observe::metrics::init();
        Self::with_optimizer(
            auction,
            config.mechanism.clone(),
            BranchAndBound::new(config.optimizer.clone()),
        )
    }
}

impl<O: Optimizer> Mechanism<O> {
    pub fn with_optimizer(auction: Auction, config: Config, optimizer: O) -> Result<Self, Error> {
        let rule = config.rule;
        if rule.needs_model() && auction.availability().is_none() {
            return Err(InvalidAuction::MissingAvailability(rule).into());
        }
        if rule.needs_realization() && config.seed.is_none() {
            return Err(InvalidAuction::MissingSeed(rule).into());
        }
        if rule.is_llg() {
            llg::detect(&auction)?;
        }
        Ok(Self {
            auction,
            config,
            optimizer,
            cancellation: Cancellation::default(),
            outcome: OnceLock::new(),
        })
    }

    pub fn auction(&self) -> &Auction {
        &self.auction
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    /// A handle to cancel the solve from another thread.
    pub fn cancellation(&self) -> Cancellation {
        self.cancellation.clone()
    }

    /// Computes the allocation and payments. Repeated calls return the
    /// cached outcome.
    pub fn solve_it(&self) -> Result<&Outcome, Error> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome);
        }
        let outcome = self.solve()?;
        Ok(self.outcome.get_or_init(|| outcome))
    }

    fn solve(&self) -> Result<Outcome, Error> {
        let rule = self.config.rule;
        let _span = tracing::info_span!(
            "solve_it",
            %rule,
            bidders = self.auction.bids().len(),
            items = self.auction.items()
        )
        .entered();
        infra::observe::solving(rule);

        let model = self.auction.availability().cloned();
        let ex_ante: Box<dyn Evaluator> = match &model {
            Some(model) => Box::new(Expected(model.clone())),
            None => Box::new(Deterministic),
        };
        let allocation = Request::new(&self.auction, ex_ante.as_ref())
            .solve(&self.optimizer)?
            .allocation;
        tracing::debug!(
            winners = allocation.winners().len(),
            welfare = allocation.welfare(),
            "allocation selected"
        );

        let drawn = match (&model, self.config.seed) {
            (Some(model), Some(seed)) => Some(model.draw_realization(seed)),
            _ => None,
        };
        let evaluator = self.evaluator(model, drawn.clone())?;
        let valuation = allocation.revalue(&self.auction, evaluator.as_ref());
        let realization = drawn.map(|realization| RealizedAllocation {
            allocation: allocation.revalue(&self.auction, &Conditioned(realization.clone())),
            realization,
        });

        let vcg = vcg::payments(
            &self.auction,
            &valuation,
            evaluator.as_ref(),
            &self.optimizer,
            &self.cancellation,
        )?;
        let (resolution, constraints, iterations) = match rule {
            rule if rule.is_llg() => {
                let llg = llg::detect(&self.auction)?;
                let resolution = llg::payments(
                    &self.auction,
                    &llg,
                    &valuation,
                    evaluator.as_ref(),
                    vcg.clone(),
                    self.config.core.epsilon,
                );
                (resolution, Vec::new(), 0)
            }
            rule if rule.is_core_selecting() => {
                let report = CorePayments {
                    auction: &self.auction,
                    allocation: &valuation,
                    evaluator: evaluator.as_ref(),
                    optimizer: &self.optimizer,
                    config: &self.config.core,
                    cancellation: &self.cancellation,
                }
                .solve(vcg.clone())?;
                (report.resolution, report.constraints, report.iterations)
            }
            _ => (Resolution::Solved(vcg.clone()), Vec::new(), 0),
        };

        infra::observe::resolved(rule, &resolution);
        tracing::info!(
            resolution = resolution.label(),
            revenue = resolution.or_vcg().total(),
            iterations,
            "auction solved"
        );
        Ok(Outcome {
            rule,
            allocation,
            valuation,
            realization,
            vcg,
            resolution,
            constraints,
            iterations,
        })
    }

    fn evaluator(
        &self,
        model: Option<Arc<dyn AvailabilityModel>>,
        realization: Option<Realization>,
    ) -> Result<Box<dyn Evaluator>, Error> {
        let rule = self.config.rule;
        let missing_model = || InvalidAuction::MissingAvailability(rule);
        let missing_seed = || InvalidAuction::MissingSeed(rule);
        Ok(match rule.evaluation() {
            Evaluation::Deterministic => Box::new(Deterministic),
            Evaluation::Expected => Box::new(Expected(model.ok_or_else(missing_model)?)),
            Evaluation::Conditioned => Box::new(Conditioned(realization.ok_or_else(missing_seed)?)),
            Evaluation::RealizedReference => Box::new(RealizedReference {
                model: model.ok_or_else(missing_model)?,
                realization: realization.ok_or_else(missing_seed)?,
            }),
        })
    }
}
