use std::time::Duration;

/// Direction of a linear objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Objective {
    /// `coefficients · x`, one coefficient per variable.
    Linear {
        sense: Sense,
        coefficients: Vec<f64>,
    },
    /// Minimise `Σ (xᵢ - targetᵢ)²`. Only continuous variables are allowed.
    NearestPoint { target: Vec<f64> },
}

impl Objective {
    fn len(&self) -> usize {
        match self {
            Objective::Linear { coefficients, .. } => coefficients.len(),
            Objective::NearestPoint { target } => target.len(),
        }
    }

    fn values(&self) -> &[f64] {
        match self {
            Objective::Linear { coefficients, .. } => coefficients,
            Objective::NearestPoint { target } => target,
        }
    }
}

/// Domain of a single decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Domain {
    Binary,
    Continuous { lower: f64, upper: Option<f64> },
}

impl Domain {
    pub const NON_NEGATIVE: Self = Self::Continuous {
        lower: 0.,
        upper: None,
    };

    /// Bounds of the variable in the linear relaxation.
    pub(crate) fn bounds(self) -> (f64, Option<f64>) {
        match self {
            Domain::Binary => (0., Some(1.)),
            Domain::Continuous { lower, upper } => (lower, upper),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
    Eq,
}

/// A linear constraint `Σ coefficient · x[variable] <relation> rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub terms: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(terms: Vec<(usize, f64)>, relation: Relation, rhs: f64) -> Self {
        Self {
            terms,
            relation,
            rhs,
        }
    }

    /// Evaluates the left hand side for an assignment.
    pub fn lhs(&self, assignment: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(variable, coefficient)| coefficient * assignment[variable])
            .sum()
    }

    pub fn is_satisfied(&self, assignment: &[f64], tolerance: f64) -> bool {
        let lhs = self.lhs(assignment);
        match self.relation {
            Relation::Le => lhs <= self.rhs + tolerance,
            Relation::Ge => lhs >= self.rhs - tolerance,
            Relation::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub objective: Objective,
    pub variables: Vec<Domain>,
    pub constraints: Vec<Constraint>,
}

impl Program {
    pub fn new(objective: Objective, variables: Vec<Domain>) -> Self {
        Self {
            objective,
            variables,
            constraints: Vec::new(),
        }
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.add_constraint(constraint);
        self
    }

    pub fn has_binaries(&self) -> bool {
        self.variables
            .iter()
            .any(|domain| matches!(domain, Domain::Binary))
    }

    /// Checks that the program is well formed before any solver touches it.
    pub fn validate(&self) -> Result<(), Error> {
        let n = self.variables.len();
        if self.objective.len() != n {
            return Err(Error::Malformed(format!(
                "objective has {} entries for {n} variables",
                self.objective.len()
            )));
        }
        if self.objective.values().iter().any(|value| !value.is_finite()) {
            return Err(Error::Malformed("non-finite objective entry".into()));
        }
        if matches!(self.objective, Objective::NearestPoint { .. }) && self.has_binaries() {
            return Err(Error::Malformed(
                "nearest point objectives only support continuous variables".into(),
            ));
        }
        for (index, domain) in self.variables.iter().enumerate() {
            let (lower, upper) = domain.bounds();
            if !lower.is_finite() || upper.is_some_and(|upper| !upper.is_finite()) {
                return Err(Error::Malformed(format!(
                    "variable {index} has a non-finite bound"
                )));
            }
            if upper.is_some_and(|upper| upper < lower) {
                return Err(Error::Malformed(format!(
                    "variable {index} has an empty domain [{lower}, {upper:?}]"
                )));
            }
        }
        for constraint in &self.constraints {
            if !constraint.rhs.is_finite() {
                return Err(Error::Malformed("non-finite right hand side".into()));
            }
            for &(variable, coefficient) in &constraint.terms {
                if variable >= n {
                    return Err(Error::Malformed(format!(
                        "constraint references variable {variable} of {n}"
                    )));
                }
                if !coefficient.is_finite() {
                    return Err(Error::Malformed("non-finite constraint coefficient".into()));
                }
            }
        }
        Ok(())
    }
}

/// An optimal assignment together with its objective value.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub assignment: Vec<f64>,
    pub objective: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Optimal(Solution),
    Infeasible,
}

impl Status {
    pub fn optimal(self) -> Option<Solution> {
        match self {
            Status::Optimal(solution) => Some(solution),
            Status::Infeasible => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("program is unbounded")]
    Unbounded,
    #[error("iteration limit of {0} exceeded")]
    IterationLimit(usize),
    #[error("node limit of {0} exceeded")]
    NodeLimit(usize),
    #[error("time limit of {0:?} exceeded")]
    TimeLimit(Duration),
    #[error("malformed program: {0}")]
    Malformed(String),
}
