//! The allocation program.
//!
//! One binary variable per atomic bid, at most one winning clause per bidder
//! and every item allocated at most once. The objective is the welfare
//! `Σ (value - cost) · x` under an [`Evaluator`], optionally discounted per
//! bidder, which is how the core separation problem reuses the program.

use {
    super::{
        Error,
        allocation::{Allocation, Winner},
        auction::Auction,
        bid::{AtomicBid, BidderId, Item},
        evaluator::Evaluator,
    },
    crate::infra,
    optimizer::{Constraint, Domain, Objective, Optimizer, Program, Relation, Sense, Status},
    std::collections::BTreeMap,
};

/// Variables closer than this to 1 count as selected.
const SELECTED: f64 = 0.5;

/// A single winner determination problem over an auction.
pub struct Request<'a> {
    auction: &'a Auction,
    evaluator: &'a dyn Evaluator,
    excluded: Option<BidderId>,
    discounts: BTreeMap<BidderId, f64>,
}

struct Column<'a> {
    bid: &'a AtomicBid,
    bid_index: usize,
    coefficient: f64,
}

/// The outcome of a winner determination solve.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Winning bids valued by the request's evaluator, without discounts.
    pub allocation: Allocation,
    /// Optimal objective including discounts.
    pub objective: f64,
}

impl<'a> Request<'a> {
    pub fn new(auction: &'a Auction, evaluator: &'a dyn Evaluator) -> Self {
        Self {
            auction,
            evaluator,
            excluded: None,
            discounts: BTreeMap::new(),
        }
    }

    /// Removes all bids of `bidder` from the problem.
    pub fn without(mut self, bidder: BidderId) -> Self {
        self.excluded = Some(bidder);
        self
    }

    /// Lowers the contribution of any winning clause of `bidder` by
    /// `discount`.
    pub fn with_discount(mut self, bidder: BidderId, discount: f64) -> Self {
        self.discounts.insert(bidder, discount);
        self
    }

    /// Columns in bidder order, then clause order. Clauses that can never
    /// improve the objective are left out.
    fn columns(&self) -> Vec<Column<'a>> {
        let costs = self.auction.costs();
        self.auction
            .bids()
            .iter()
            .filter(|bid| Some(bid.bidder()) != self.excluded)
            .flat_map(|bid| bid.atomic_bids().iter().enumerate())
            .filter_map(|(bid_index, bid)| {
                let discount = self.discounts.get(&bid.bidder).copied().unwrap_or_default();
                let coefficient = self.evaluator.net(bid, costs) - discount;
                (coefficient > 0.).then_some(Column {
                    bid,
                    bid_index,
                    coefficient,
                })
            })
            .collect()
    }

    fn program(&self, columns: &[Column<'_>]) -> Program {
        let mut program = Program::new(
            Objective::Linear {
                sense: Sense::Maximize,
                coefficients: columns.iter().map(|column| column.coefficient).collect(),
            },
            vec![Domain::Binary; columns.len()],
        );

        let mut per_bidder = BTreeMap::<BidderId, Vec<(usize, f64)>>::new();
        let mut per_item = BTreeMap::<Item, Vec<(usize, f64)>>::new();
        for (variable, column) in columns.iter().enumerate() {
            per_bidder
                .entry(column.bid.bidder)
                .or_default()
                .push((variable, 1.));
            for item in column.bid.bundle.items() {
                per_item.entry(item).or_default().push((variable, 1.));
            }

            let reserve = self.auction.reserve_of(&column.bid.bundle);
            if column.bid.value < reserve {
                program.add_constraint(Constraint::new(
                    vec![(variable, column.bid.value - reserve)],
                    Relation::Ge,
                    0.,
                ));
            }
        }
        for terms in per_bidder.into_values().chain(per_item.into_values()) {
            if terms.len() > 1 {
                program.add_constraint(Constraint::new(terms, Relation::Le, 1.));
            }
        }
        program
    }

    pub fn solve(&self, optimizer: &dyn Optimizer) -> Result<Selection, Error> {
        let columns = self.columns();
        if columns.is_empty() {
            return Ok(Selection {
                allocation: Allocation::empty(),
                objective: 0.,
            });
        }

        let program = self.program(&columns);
        infra::observe::optimizer_call();
        let solution = match optimizer.solve(&program)? {
            Status::Optimal(solution) => solution,
            Status::Infeasible => return Err(Error::InfeasibleAllocation),
        };

        let winners = columns
            .iter()
            .zip(&solution.assignment)
            .filter(|(_, x)| **x > SELECTED)
            .map(|(column, _)| {
                Winner::new(
                    column.bid,
                    column.bid_index,
                    self.auction.costs(),
                    self.evaluator,
                )
            })
            .collect();
        let allocation = Allocation::new(winners);
        if !allocation.is_feasible() {
            return Err(Error::InfeasibleAllocation);
        }

        tracing::trace!(
            winners = allocation.winners().len(),
            objective = solution.objective,
            "winner determination solved"
        );
        Ok(Selection {
            allocation,
            objective: solution.objective,
        })
    }
}
