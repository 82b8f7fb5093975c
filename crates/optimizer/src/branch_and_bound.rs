//! Depth-first branch and bound over binary variables.

use {
    crate::{
        Optimizer,
        program::{Error, Objective, Program, Sense, Solution, Status},
        projection,
        simplex::{self, Lp, LpStatus},
    },
    std::time::{Duration, Instant},
};

/// Values closer than this to 0 or 1 count as integral.
const INTEGRALITY: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Maximum number of branch and bound nodes per solve.
    pub max_nodes: usize,
    /// Maximum number of simplex pivots (or active-set iterations) per
    /// relaxation.
    pub max_pivots: usize,
    /// Numeric tolerance for pivoting and pruning.
    pub tolerance: f64,
    /// Optional wall clock limit per solve.
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nodes: 100_000,
            max_pivots: 100_000,
            tolerance: 1e-9,
            time_limit: None,
        }
    }
}

/// The open [`Optimizer`] implementation.
///
/// Search order is fully deterministic: the lowest-index fractional variable
/// is branched on first, its `x = 1` child is explored first and a new
/// incumbent replaces the current one only if it is strictly better.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBound {
    config: Config,
}

impl BranchAndBound {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn solve_linear(
        &self,
        program: &Program,
        sense: Sense,
        coefficients: &[f64],
    ) -> Result<Status, Error> {
        let started = Instant::now();
        let objective: Vec<f64> = match sense {
            Sense::Maximize => coefficients.to_vec(),
            Sense::Minimize => coefficients.iter().map(|c| -c).collect(),
        };
        let binaries: Vec<usize> = program
            .variables
            .iter()
            .enumerate()
            .filter(|(_, domain)| matches!(domain, crate::Domain::Binary))
            .map(|(index, _)| index)
            .collect();

        let root: Vec<_> = program.variables.iter().map(|domain| domain.bounds()).collect();
        let mut stack = vec![root];
        let mut incumbent: Option<(Vec<f64>, f64)> = None;
        let mut nodes = 0;

        while let Some(bounds) = stack.pop() {
            nodes += 1;
            if nodes > self.config.max_nodes {
                return Err(Error::NodeLimit(self.config.max_nodes));
            }
            if let Some(limit) = self.config.time_limit {
                if started.elapsed() >= limit {
                    return Err(Error::TimeLimit(limit));
                }
            }

            let relaxation = simplex::maximize(
                &Lp {
                    objective: &objective,
                    bounds: &bounds,
                    constraints: &program.constraints,
                },
                self.config.tolerance,
                self.config.max_pivots,
            )?;
            let LpStatus::Optimal {
                assignment,
                objective: bound,
            } = relaxation
            else {
                continue;
            };
            if let Some((_, best)) = &incumbent {
                if bound <= best + self.config.tolerance * (1. + best.abs()) {
                    continue;
                }
            }

            let fractional = binaries.iter().copied().find(|&index| {
                let value = assignment[index];
                value.min(1. - value).abs() > INTEGRALITY
            });
            match fractional {
                None => {
                    let mut assignment = assignment;
                    for &index in &binaries {
                        assignment[index] = assignment[index].round();
                    }
                    let value = objective
                        .iter()
                        .zip(&assignment)
                        .map(|(c, x)| c * x)
                        .sum();
                    incumbent = Some((assignment, value));
                }
                Some(index) => {
                    let mut down = bounds.clone();
                    down[index] = (0., Some(0.));
                    let mut up = bounds;
                    up[index] = (1., Some(1.));
                    // LIFO: the `x = 1` branch is explored first.
                    stack.push(down);
                    stack.push(up);
                }
            }
        }

        tracing::trace!(nodes, elapsed = ?started.elapsed(), "branch and bound finished");
        Ok(match incumbent {
            Some((assignment, _)) => {
                let objective = coefficients
                    .iter()
                    .zip(&assignment)
                    .map(|(c, x)| c * x)
                    .sum();
                Status::Optimal(Solution {
                    assignment,
                    objective,
                })
            }
            None => Status::Infeasible,
        })
    }
}

impl Optimizer for BranchAndBound {
    fn solve(&self, program: &Program) -> Result<Status, Error> {
        program.validate()?;
        match &program.objective {
            Objective::Linear {
                sense,
                coefficients,
            } => self.solve_linear(program, *sense, coefficients),
            Objective::NearestPoint { target } => {
                projection::nearest_point(program, target, &self.config)
            }
        }
    }
}
