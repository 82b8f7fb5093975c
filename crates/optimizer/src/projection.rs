//! Euclidean projection onto a polyhedron.
//!
//! Minimises `Σ (xᵢ - targetᵢ)²` subject to linear constraints with a primal
//! active-set method. A phase one simplex decides feasibility and provides
//! the starting vertex. Every iteration projects the gradient onto the null
//! space of the working set and either steps to the next blocking constraint
//! or, once the step vanishes, drops the working constraint with the most
//! negative multiplier. Programs here have a handful of variables so the
//! normal equations are solved densely.

use crate::{
    branch_and_bound::Config,
    program::{Error, Program, Relation, Solution, Status},
    simplex::{self, Lp, LpStatus},
};

/// A constraint in `a · x >= b` (or `a · x = b`) form.
struct HalfSpace {
    normal: Vec<f64>,
    rhs: f64,
    equality: bool,
}

impl HalfSpace {
    fn new(dimension: usize, terms: &[(usize, f64)], scale: f64, rhs: f64, equality: bool) -> Self {
        let mut normal = vec![0.; dimension];
        for &(variable, a) in terms {
            normal[variable] += scale * a;
        }
        Self {
            normal,
            rhs,
            equality,
        }
    }

    fn dot(&self, x: &[f64]) -> f64 {
        dot(&self.normal, x)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(a, b)| a * b).sum()
}

pub(crate) fn nearest_point(
    program: &Program,
    target: &[f64],
    config: &Config,
) -> Result<Status, Error> {
    let dimension = target.len();
    let bounds: Vec<_> = program.variables.iter().map(|domain| domain.bounds()).collect();
    let feasibility = simplex::maximize(
        &Lp {
            objective: &vec![0.; dimension],
            bounds: &bounds,
            constraints: &program.constraints,
        },
        config.tolerance,
        config.max_pivots,
    )?;
    let LpStatus::Optimal {
        assignment: mut point,
        ..
    } = feasibility
    else {
        return Ok(Status::Infeasible);
    };

    let mut half_spaces = Vec::new();
    for constraint in &program.constraints {
        let terms = &constraint.terms;
        half_spaces.push(match constraint.relation {
            Relation::Ge => HalfSpace::new(dimension, terms, 1., constraint.rhs, false),
            Relation::Le => HalfSpace::new(dimension, terms, -1., -constraint.rhs, false),
            Relation::Eq => HalfSpace::new(dimension, terms, 1., constraint.rhs, true),
        });
    }
    for (variable, &(lower, upper)) in bounds.iter().enumerate() {
        half_spaces.push(HalfSpace::new(dimension, &[(variable, 1.)], 1., lower, false));
        if let Some(upper) = upper {
            half_spaces.push(HalfSpace::new(dimension, &[(variable, 1.)], -1., -upper, false));
        }
    }
    half_spaces.retain(|half_space| dot(&half_space.normal, &half_space.normal) > config.tolerance);

    // Equalities stay in the working set for good, redundant ones are left
    // out so the normal equations remain regular.
    let mut working: Vec<usize> = Vec::new();
    for (index, half_space) in half_spaces.iter().enumerate() {
        if half_space.equality
            && residual(&half_spaces, &working, &half_space.normal, config.tolerance)
                > config.tolerance.sqrt()
        {
            working.push(index);
        }
    }

    for _ in 0..config.max_pivots {
        let gradient: Vec<f64> = point.iter().zip(target).map(|(x, t)| x - t).collect();
        let multipliers = least_squares(&half_spaces, &working, &gradient, config.tolerance);
        let mut direction: Vec<f64> = gradient.iter().map(|g| -g).collect();
        for (&index, multiplier) in working.iter().zip(&multipliers) {
            for (d, a) in direction.iter_mut().zip(&half_spaces[index].normal) {
                *d += multiplier * a;
            }
        }

        let scale = 1. + point.iter().fold(0., |max: f64, x| max.max(x.abs()));
        if direction.iter().all(|d| d.abs() <= config.tolerance * scale) {
            let dropped = working
                .iter()
                .zip(&multipliers)
                .enumerate()
                .filter(|(_, (index, _))| !half_spaces[**index].equality)
                .min_by(|(_, (_, a)), (_, (_, b))| a.total_cmp(b))
                .filter(|(_, (_, multiplier))| **multiplier < -config.tolerance)
                .map(|(position, _)| position);
            match dropped {
                Some(position) => {
                    working.remove(position);
                    continue;
                }
                None => {
                    let objective = gradient.iter().map(|g| g * g).sum();
                    return Ok(Status::Optimal(Solution {
                        assignment: point,
                        objective,
                    }));
                }
            }
        }

        let mut step = 1.;
        let mut blocking = None;
        for (index, half_space) in half_spaces.iter().enumerate() {
            if half_space.equality || working.contains(&index) {
                continue;
            }
            let rate = half_space.dot(&direction);
            if rate >= -config.tolerance {
                continue;
            }
            let ratio = ((half_space.rhs - half_space.dot(&point)) / rate).max(0.);
            if ratio < step {
                step = ratio;
                blocking = Some(index);
            }
        }
        for (x, d) in point.iter_mut().zip(&direction) {
            *x += step * d;
        }
        if let Some(index) = blocking {
            working.push(index);
        }
    }
    Err(Error::IterationLimit(config.max_pivots))
}

/// Solves `(A Aᵀ) μ = A v` for the rows `A` of the working set. Pivots that
/// vanish leave their multiplier at zero.
fn least_squares(
    half_spaces: &[HalfSpace],
    working: &[usize],
    v: &[f64],
    tolerance: f64,
) -> Vec<f64> {
    let size = working.len();
    let mut system: Vec<Vec<f64>> = working
        .iter()
        .map(|&row| {
            let a = &half_spaces[row].normal;
            let mut line: Vec<f64> = working
                .iter()
                .map(|&column| dot(a, &half_spaces[column].normal))
                .collect();
            line.push(dot(a, v));
            line
        })
        .collect();

    let mut pivots = vec![None; size];
    for column in 0..size {
        let Some(pivot) = (0..size)
            .filter(|&row| pivots[..column].iter().all(|&p| p != Some(row)))
            .max_by(|&a, &b| system[a][column].abs().total_cmp(&system[b][column].abs()))
        else {
            continue;
        };
        if system[pivot][column].abs() <= tolerance {
            continue;
        }
        pivots[column] = Some(pivot);
        let line = system[pivot].clone();
        for (row, entries) in system.iter_mut().enumerate() {
            if row == pivot {
                continue;
            }
            let factor = entries[column] / line[column];
            if factor != 0. {
                for (entry, value) in entries.iter_mut().zip(&line) {
                    *entry -= factor * value;
                }
            }
        }
    }

    pivots
        .iter()
        .enumerate()
        .map(|(column, pivot)| match pivot {
            Some(row) => system[*row][size] / system[*row][column],
            None => 0.,
        })
        .collect()
}

/// Length of the part of `v` outside of the span of the working set.
fn residual(half_spaces: &[HalfSpace], working: &[usize], v: &[f64], tolerance: f64) -> f64 {
    let multipliers = least_squares(half_spaces, working, v, tolerance);
    let mut rest = v.to_vec();
    for (&index, multiplier) in working.iter().zip(&multipliers) {
        for (r, a) in rest.iter_mut().zip(&half_spaces[index].normal) {
            *r -= multiplier * a;
        }
    }
    dot(&rest, &rest).sqrt()
}
