//! Combinatorial auctions with XOR bids: efficient winner determination,
//! VCG payments and core-selecting payments by constraint generation,
//! optionally under uncertain and correlated item availability.

pub mod domain;
pub mod infra;
mod run;
#[cfg(test)]
mod tests;

pub use {
    domain::{
        AtomicBid,
        Auction,
        AvailabilityModel,
        Bid,
        BidderId,
        Bombing,
        Bundle,
        Cancellation,
        Costs,
        EmptyCore,
        EmptyCoreReason,
        Error,
        InvalidAuction,
        Item,
        Mechanism,
        Outcome,
        PaymentRule,
        PaymentVector,
        Resolution,
        Scenarios,
    },
    run::solve_all,
};
