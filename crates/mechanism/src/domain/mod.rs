pub mod allocation;
pub mod auction;
pub mod availability;
pub mod bid;
pub mod evaluator;
pub mod mechanism;
pub mod payment;
pub mod winner_determination;

pub use {
    allocation::{Allocation, RealizedAllocation, Winner},
    auction::{Auction, InvalidAuction},
    availability::{AvailabilityModel, Bombing, InvalidModel, Realization, Scenarios},
    bid::{AtomicBid, Bid, BidderId, Bundle, Costs, Item},
    mechanism::{Cancellation, Mechanism, Outcome},
    payment::{EmptyCore, EmptyCoreReason, PaymentRule, PaymentVector, Resolution},
};

/// Errors that abort a solve. Economic degeneracies are not errors, see
/// [`Resolution`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidAuction(#[from] InvalidAuction),
    #[error("winner determination returned no feasible allocation")]
    InfeasibleAllocation,
    #[error("optimizer failed: {0}")]
    Optimizer(#[from] optimizer::Error),
    #[error("solve was cancelled")]
    Cancelled,
}
