//! Dense two-phase primal simplex.
//!
//! Variables are shifted by their lower bounds so the tableau only ever deals
//! with `y >= 0`; finite upper bounds become explicit rows. Bland's rule is
//! used for both the entering and the leaving variable which rules out
//! cycling on the degenerate programs winner determination produces.

use crate::program::{Constraint, Error, Relation};

/// A linear program to maximise over continuous, bounded variables.
pub(crate) struct Lp<'a> {
    pub objective: &'a [f64],
    pub bounds: &'a [(f64, Option<f64>)],
    pub constraints: &'a [Constraint],
}

#[derive(Debug)]
pub(crate) enum LpStatus {
    Optimal { assignment: Vec<f64>, objective: f64 },
    Infeasible,
}

pub(crate) fn maximize(lp: &Lp, tolerance: f64, max_pivots: usize) -> Result<LpStatus, Error> {
    let n = lp.bounds.len();

    // Rows in terms of the shifted variables `y = x - lower`.
    let mut rows: Vec<(Vec<f64>, Relation, f64)> = Vec::new();
    for constraint in lp.constraints {
        let mut coefficients = vec![0.; n];
        let mut rhs = constraint.rhs;
        for &(variable, coefficient) in &constraint.terms {
            coefficients[variable] += coefficient;
            rhs -= coefficient * lp.bounds[variable].0;
        }
        rows.push((coefficients, constraint.relation, rhs));
    }
    for (variable, &(lower, upper)) in lp.bounds.iter().enumerate() {
        if let Some(upper) = upper {
            let mut coefficients = vec![0.; n];
            coefficients[variable] = 1.;
            rows.push((coefficients, Relation::Le, upper - lower));
        }
    }

    let mut tableau = Tableau::new(n, rows, tolerance, max_pivots);
    if !tableau.phase_one()? {
        return Ok(LpStatus::Infeasible);
    }

    let mut costs = vec![0.; tableau.width];
    costs[..n].copy_from_slice(lp.objective);
    tableau.optimize(&costs, tableau.artificial_from)?;

    let mut assignment: Vec<f64> = lp.bounds.iter().map(|&(lower, _)| lower).collect();
    for (row, &basic) in tableau.rows.iter().zip(&tableau.basis) {
        if basic < n {
            assignment[basic] += row[tableau.width].max(0.);
        }
    }
    let objective = lp
        .objective
        .iter()
        .zip(&assignment)
        .map(|(c, x)| c * x)
        .sum();

    Ok(LpStatus::Optimal {
        assignment,
        objective,
    })
}

struct Tableau {
    /// `rows[r]` holds the coefficients of all columns followed by the rhs.
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    /// Number of columns, excluding the rhs.
    width: usize,
    /// Columns at or after this index are artificial.
    artificial_from: usize,
    tolerance: f64,
    pivots: usize,
    max_pivots: usize,
}

impl Tableau {
    fn new(
        structural: usize,
        mut rows: Vec<(Vec<f64>, Relation, f64)>,
        tolerance: f64,
        max_pivots: usize,
    ) -> Self {
        // Normalise right hand sides to be non-negative.
        for (coefficients, relation, rhs) in &mut rows {
            if *rhs < 0. {
                coefficients.iter_mut().for_each(|c| *c = -*c);
                *rhs = -*rhs;
                *relation = match relation {
                    Relation::Le => Relation::Ge,
                    Relation::Ge => Relation::Le,
                    Relation::Eq => Relation::Eq,
                };
            }
        }

        let slacks = rows
            .iter()
            .filter(|(_, relation, _)| *relation != Relation::Eq)
            .count();
        let artificials = rows
            .iter()
            .filter(|(_, relation, _)| *relation != Relation::Le)
            .count();
        let artificial_from = structural + slacks;
        let width = artificial_from + artificials;

        let mut tableau_rows = Vec::with_capacity(rows.len());
        let mut basis = Vec::with_capacity(rows.len());
        let (mut slack, mut artificial) = (structural, artificial_from);
        for (coefficients, relation, rhs) in rows {
            let mut row = coefficients;
            row.resize(width + 1, 0.);
            row[width] = rhs;
            match relation {
                Relation::Le => {
                    row[slack] = 1.;
                    basis.push(slack);
                    slack += 1;
                }
                Relation::Ge => {
                    row[slack] = -1.;
                    row[artificial] = 1.;
                    basis.push(artificial);
                    slack += 1;
                    artificial += 1;
                }
                Relation::Eq => {
                    row[artificial] = 1.;
                    basis.push(artificial);
                    artificial += 1;
                }
            }
            tableau_rows.push(row);
        }

        Self {
            rows: tableau_rows,
            basis,
            width,
            artificial_from,
            tolerance,
            pivots: 0,
            max_pivots,
        }
    }

    /// Finds a basic feasible solution. Returns `false` if there is none.
    fn phase_one(&mut self) -> Result<bool, Error> {
        if self.artificial_from == self.width {
            return Ok(true);
        }

        let mut costs = vec![0.; self.width];
        costs[self.artificial_from..].iter_mut().for_each(|c| *c = -1.);
        let infeasibility = -self.optimize(&costs, self.width)?;
        let scale = self
            .rows
            .iter()
            .map(|row| row[self.width])
            .fold(1., f64::max);
        if infeasibility > self.tolerance.sqrt() * scale {
            return Ok(false);
        }

        // Drive the remaining (zero valued) artificials out of the basis and
        // drop rows that turn out to be redundant.
        let mut row = 0;
        while row < self.rows.len() {
            if self.basis[row] < self.artificial_from {
                row += 1;
                continue;
            }
            let column = (0..self.artificial_from)
                .find(|&column| self.rows[row][column].abs() > self.tolerance);
            match column {
                Some(column) => {
                    self.pivot(row, column, None)?;
                    row += 1;
                }
                None => {
                    self.rows.remove(row);
                    self.basis.remove(row);
                }
            }
        }
        Ok(true)
    }

    /// Maximises `costs · x` letting only columns below `entering_limit`
    /// enter the basis. Returns the optimal objective value.
    fn optimize(&mut self, costs: &[f64], entering_limit: usize) -> Result<f64, Error> {
        let mut reduced = self.reduced_costs(costs);
        loop {
            let Some(column) =
                (0..entering_limit).find(|&column| reduced[column] < -self.tolerance)
            else {
                return Ok(reduced[self.width]);
            };
            let row = self.ratio_test(column).ok_or(Error::Unbounded)?;
            self.pivot(row, column, Some(&mut reduced))?;
        }
    }

    fn reduced_costs(&self, costs: &[f64]) -> Vec<f64> {
        let mut reduced: Vec<f64> = costs.iter().map(|cost| -cost).chain([0.]).collect();
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            let cost = costs[basic];
            if cost != 0. {
                for (entry, coefficient) in reduced.iter_mut().zip(row) {
                    *entry += cost * coefficient;
                }
            }
        }
        reduced
    }

    fn ratio_test(&self, column: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (row, entries) in self.rows.iter().enumerate() {
            let coefficient = entries[column];
            if coefficient <= self.tolerance {
                continue;
            }
            let ratio = entries[self.width] / coefficient;
            best = match best {
                None => Some((row, ratio)),
                Some((best_row, best_ratio)) => {
                    let better = ratio < best_ratio - self.tolerance
                        || (ratio <= best_ratio + self.tolerance
                            && self.basis[row] < self.basis[best_row]);
                    if better {
                        Some((row, ratio))
                    } else {
                        Some((best_row, best_ratio))
                    }
                }
            };
        }
        best.map(|(row, _)| row)
    }

    fn pivot(
        &mut self,
        row: usize,
        column: usize,
        reduced: Option<&mut Vec<f64>>,
    ) -> Result<(), Error> {
        self.pivots += 1;
        if self.pivots > self.max_pivots {
            return Err(Error::IterationLimit(self.max_pivots));
        }

        let pivot = self.rows[row][column];
        self.rows[row].iter_mut().for_each(|entry| *entry /= pivot);
        let pivot_row = self.rows[row].clone();

        let eliminate = |target: &mut Vec<f64>| {
            let factor = target[column];
            if factor != 0. {
                for (entry, coefficient) in target.iter_mut().zip(&pivot_row) {
                    *entry -= factor * coefficient;
                }
            }
        };
        for (index, target) in self.rows.iter_mut().enumerate() {
            if index != row {
                eliminate(target);
            }
        }
        if let Some(reduced) = reduced {
            eliminate(reduced);
        }

        self.basis[row] = column;
        Ok(())
    }
}
