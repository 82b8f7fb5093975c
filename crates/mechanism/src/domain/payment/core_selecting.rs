//! Core-selecting payments by constraint generation.
//!
//! Starting from VCG, every iteration looks for a blocking coalition: a
//! group of bidders that, together with the seller, could agree on an
//! allocation they all prefer over the current payments. Finding it is a
//! winner determination where every winner's bids are discounted by the
//! surplus it currently enjoys. Each blocking coalition yields a linear
//! constraint on the payments of the winners outside of it and the master
//! problem picks new payments subject to all constraints found so far.

use {
    super::{EmptyCore, EmptyCoreReason, PaymentVector, Resolution},
    crate::{
        domain::{
            Error,
            allocation::Allocation,
            auction::Auction,
            bid::BidderId,
            evaluator::Evaluator,
            mechanism::Cancellation,
            winner_determination::Request,
        },
        infra,
    },
    itertools::{Either, Itertools},
    optimizer::{Constraint, Domain, Objective, Optimizer, Program, Relation, Sense, Status},
    serde::{Deserialize, Serialize},
    std::collections::BTreeSet,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Slack tolerated in coalition and payment comparisons.
    pub epsilon: f64,
    pub max_iterations: usize,
    pub objective: MasterObjective,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            max_iterations: 1000,
            objective: MasterObjective::default(),
        }
    }
}

/// Which point of the core the master problem selects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MasterObjective {
    /// The revenue minimising payments closest to VCG.
    #[default]
    NearestVcg,
    /// Any revenue minimising payments.
    MinimumRevenue,
}

/// `Σ_{payers} pᵢ >= bound`, induced by one blocking coalition.
#[derive(Debug, Clone, PartialEq)]
pub struct CoalitionConstraint {
    /// Bidders winning in the blocking allocation.
    pub coalition: BTreeSet<BidderId>,
    /// Positions of the current winners outside of the coalition.
    pub payers: Vec<usize>,
    pub bound: f64,
}

impl CoalitionConstraint {
    pub fn is_satisfied(&self, payments: &PaymentVector, epsilon: f64) -> bool {
        let paid: f64 = self
            .payers
            .iter()
            .filter_map(|&payer| payments.get(payer))
            .sum();
        paid >= self.bound - epsilon
    }

    fn to_constraint(&self) -> Constraint {
        Constraint::new(
            self.payers.iter().map(|&payer| (payer, 1.)).collect(),
            Relation::Ge,
            self.bound,
        )
    }
}

/// Outcome of a constraint generation run together with the constraints it
/// generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub resolution: Resolution,
    pub constraints: Vec<CoalitionConstraint>,
    pub iterations: usize,
}

pub struct CorePayments<'a> {
    pub auction: &'a Auction,
    /// The efficient allocation, valued by `evaluator`.
    pub allocation: &'a Allocation,
    pub evaluator: &'a dyn Evaluator,
    pub optimizer: &'a dyn Optimizer,
    pub config: &'a Config,
    pub cancellation: &'a Cancellation,
}

/// Internal early exits of the generation loop.
enum Stop {
    EmptyCore(EmptyCoreReason),
    Failed(Error),
}

impl From<Error> for Stop {
    fn from(err: Error) -> Self {
        match err {
            Error::Optimizer(optimizer::Error::TimeLimit(limit)) => {
                tracing::warn!(?limit, "optimizer timed out during core generation");
                Stop::EmptyCore(EmptyCoreReason::TimedOut)
            }
            err => Stop::Failed(err),
        }
    }
}

impl From<optimizer::Error> for Stop {
    fn from(err: optimizer::Error) -> Self {
        Error::from(err).into()
    }
}

impl CorePayments<'_> {
    pub fn solve(&self, vcg: PaymentVector) -> Result<Report, Error> {
        let mut constraints = Vec::new();
        if self.allocation.is_empty() {
            return Ok(Report {
                resolution: Resolution::Solved(PaymentVector::default()),
                constraints,
                iterations: 0,
            });
        }

        let mut iterations = 0;
        let outcome = self.generate(&vcg, &mut constraints, &mut iterations);
        let resolution = match outcome {
            Ok(None) => Resolution::VcgInCore(vcg),
            Ok(Some(payments)) => Resolution::Solved(payments),
            Err(Stop::EmptyCore(reason)) => {
                tracing::warn!(?reason, iterations, "core is empty");
                Resolution::EmptyCore(EmptyCore { reason, vcg })
            }
            Err(Stop::Failed(err)) => return Err(err),
        };
        infra::observe::core_iterations(iterations);
        Ok(Report {
            resolution,
            constraints,
            iterations,
        })
    }

    /// Runs the loop. `None` means VCG was never blocked.
    fn generate(
        &self,
        vcg: &PaymentVector,
        constraints: &mut Vec<CoalitionConstraint>,
        iterations: &mut usize,
    ) -> Result<Option<PaymentVector>, Stop> {
        let mut payments = vcg.clone();
        let mut seen = BTreeSet::new();
        loop {
            self.cancellation.check()?;
            *iterations += 1;
            let Some(blocking) = self.separate(&payments)? else {
                return Ok((!constraints.is_empty()).then_some(payments));
            };
            if *iterations > self.config.max_iterations || !seen.insert(blocking.coalition.clone())
            {
                return Err(Stop::EmptyCore(EmptyCoreReason::NotConverged {
                    iterations: *iterations,
                }));
            }
            tracing::debug!(
                coalition = ?blocking.coalition,
                bound = blocking.bound,
                "blocking coalition"
            );
            constraints.push(blocking);
            payments = self
                .master(vcg, constraints)?
                .ok_or(Stop::EmptyCore(EmptyCoreReason::Infeasible))?;
        }
    }

    /// Finds the most blocking coalition against `payments`, if any.
    fn separate(&self, payments: &PaymentVector) -> Result<Option<CoalitionConstraint>, Error> {
        let winners = self.allocation.winners();
        let mut request = Request::new(self.auction, self.evaluator);
        for (winner, payment) in winners.iter().zip(payments.as_slice()) {
            request = request.with_discount(winner.bidder, winner.value - payment);
        }
        let selection = request.solve(self.optimizer)?;

        let cost = self.allocation.total_cost();
        let retained = payments.total() - cost;
        if selection.objective <= retained + self.config.epsilon {
            return Ok(None);
        }

        let coalition: BTreeSet<_> = selection.allocation.bidders().collect();
        let (members, payers): (Vec<f64>, Vec<usize>) =
            winners.iter().enumerate().partition_map(|(position, winner)| {
                if coalition.contains(&winner.bidder) {
                    Either::Left(winner.value)
                } else {
                    Either::Right(position)
                }
            });
        let member_value: f64 = members.iter().sum();
        Ok(Some(CoalitionConstraint {
            coalition,
            payers,
            bound: selection.allocation.welfare() - member_value + cost,
        }))
    }

    /// Solves the master problem, `None` if the constraints admit no
    /// individually rational payments.
    fn master(
        &self,
        vcg: &PaymentVector,
        constraints: &[CoalitionConstraint],
    ) -> Result<Option<PaymentVector>, Stop> {
        let epsilon = self.config.epsilon;
        let mut variables = Vec::with_capacity(vcg.len());
        for (winner, &lower) in self.allocation.winners().iter().zip(vcg.as_slice()) {
            if lower > winner.value + epsilon {
                return Ok(None);
            }
            variables.push(Domain::Continuous {
                lower,
                upper: Some(winner.value.max(lower)),
            });
        }
        let rows: Vec<_> = constraints
            .iter()
            .map(CoalitionConstraint::to_constraint)
            .collect();

        infra::observe::optimizer_call();
        let minimum = Program {
            objective: Objective::Linear {
                sense: Sense::Minimize,
                coefficients: vec![1.; variables.len()],
            },
            variables: variables.clone(),
            constraints: rows.clone(),
        };
        let Status::Optimal(minimum) = self.optimizer.solve(&minimum)? else {
            return Ok(None);
        };
        if self.config.objective == MasterObjective::MinimumRevenue {
            return Ok(Some(minimum.assignment.into()));
        }

        infra::observe::optimizer_call();
        let revenue = Constraint::new(
            (0..variables.len()).map(|variable| (variable, 1.)).collect(),
            Relation::Le,
            minimum.objective + epsilon,
        );
        let nearest = Program {
            objective: Objective::NearestPoint {
                target: vcg.as_slice().to_vec(),
            },
            variables,
            constraints: rows,
        }
        .with_constraint(revenue);
        // The minimum revenue point is in the core already, the projection
        // only moves along its face.
        Ok(Some(match self.optimizer.solve(&nearest) {
            Ok(Status::Optimal(solution)) => solution.assignment.into(),
            Ok(Status::Infeasible) => minimum.assignment.into(),
            Err(optimizer::Error::IterationLimit(limit)) => {
                tracing::warn!(limit, "projection did not converge, keeping minimum revenue");
                minimum.assignment.into()
            }
            Err(err) => return Err(err.into()),
        }))
    }
}
