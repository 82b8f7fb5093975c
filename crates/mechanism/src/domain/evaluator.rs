//! Strategies for valuing an atomic bid.
//!
//! Winner determination, VCG and the core constraint generation only ever ask
//! an [`Evaluator`] for values and costs, so the payment rules differ solely
//! in which evaluator they plug in.

use {
    super::{
        availability::{AvailabilityModel, Realization},
        bid::{AtomicBid, Bundle, Costs, Item},
    },
    std::sync::Arc,
};

pub trait Evaluator: Send + Sync {
    /// Availability of a single item.
    fn availability(&self, item: Item) -> f64;

    /// Value the bidder derives from winning `bid`.
    fn value(&self, bid: &AtomicBid) -> f64;

    /// Cost of supplying `bundle`. Costs are only incurred for the delivered
    /// share of each item.
    fn cost(&self, bundle: &Bundle, costs: &Costs) -> f64 {
        bundle
            .items()
            .map(|item| costs.of(item) * self.availability(item))
            .sum()
    }

    /// Contribution of `bid` to welfare.
    fn net(&self, bid: &AtomicBid, costs: &Costs) -> f64 {
        self.value(bid) - self.cost(&bid.bundle, costs)
    }
}

/// Every item is delivered for sure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deterministic;

impl Evaluator for Deterministic {
    fn availability(&self, _: Item) -> f64 {
        1.
    }

    fn value(&self, bid: &AtomicBid) -> f64 {
        bid.value
    }
}

/// Unconditional expectation under an availability model.
#[derive(Debug, Clone)]
pub struct Expected(pub Arc<dyn AvailabilityModel>);

impl Evaluator for Expected {
    fn availability(&self, item: Item) -> f64 {
        self.0.marginal_probability(&Bundle::new([item]))
    }

    fn value(&self, bid: &AtomicBid) -> f64 {
        bid.value * self.0.marginal_probability(&bid.bundle)
    }
}

/// Values and costs conditioned on one drawn realization.
#[derive(Debug, Clone)]
pub struct Conditioned(pub Realization);

impl Evaluator for Conditioned {
    fn availability(&self, item: Item) -> f64 {
        self.0.of(item)
    }

    fn value(&self, bid: &AtomicBid) -> f64 {
        bid.value * self.0.bundle(&bid.bundle)
    }
}

/// Expected values, with costs referenced to the realized per-good
/// availability.
#[derive(Debug, Clone)]
pub struct RealizedReference {
    pub model: Arc<dyn AvailabilityModel>,
    pub realization: Realization,
}

impl Evaluator for RealizedReference {
    fn availability(&self, item: Item) -> f64 {
        self.realization.of(item)
    }

    fn value(&self, bid: &AtomicBid) -> f64 {
        bid.value * self.model.marginal_probability(&bid.bundle)
    }
}

/// Which evaluator a payment rule values outcomes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Deterministic,
    Expected,
    Conditioned,
    RealizedReference,
}
