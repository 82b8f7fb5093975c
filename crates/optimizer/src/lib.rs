//! Optimization oracle consumed by the mechanism engine.
//!
//! The engine only ever talks to the [`Optimizer`] trait so that any solver
//! (commercial or open) can be plugged in. [`BranchAndBound`] is the open
//! implementation shipped with this crate: a dense two-phase simplex solves
//! linear relaxations, a depth-first branch and bound handles binary
//! variables and an active-set projection handles squared-distance objectives.

pub mod branch_and_bound;
mod program;
mod projection;
mod simplex;

pub use {
    branch_and_bound::BranchAndBound,
    program::{Constraint, Domain, Error, Objective, Program, Relation, Sense, Solution, Status},
};

/// A solver for linear, binary and nearest-point programs.
pub trait Optimizer: Send + Sync {
    /// Solves the program to optimality.
    ///
    /// Infeasibility is a regular [`Status`], everything that prevents the
    /// solver from deciding feasibility or optimality is an [`Error`].
    fn solve(&self, program: &Program) -> Result<Status, Error>;
}

impl<T: Optimizer + ?Sized> Optimizer for &T {
    fn solve(&self, program: &Program) -> Result<Status, Error> {
        (**self).solve(program)
    }
}

impl<T: Optimizer + ?Sized> Optimizer for Box<T> {
    fn solve(&self, program: &Program) -> Result<Status, Error> {
        (**self).solve(program)
    }
}
