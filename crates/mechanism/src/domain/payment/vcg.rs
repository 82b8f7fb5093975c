use {
    super::PaymentVector,
    crate::domain::{
        Error,
        allocation::Allocation,
        auction::Auction,
        evaluator::Evaluator,
        mechanism::Cancellation,
        winner_determination::Request,
    },
    optimizer::Optimizer,
};

/// VCG payments `pᵢ = W₋ᵢ - (W - vᵢ)` of every winner of `allocation`.
///
/// `W` is the welfare of `allocation` valued by `evaluator`, `W₋ᵢ` the
/// optimal welfare under the same evaluator once bidder `i` is removed and
/// `vᵢ` the value bidder `i` derives from its winning bundle.
pub fn payments(
    auction: &Auction,
    allocation: &Allocation,
    evaluator: &dyn Evaluator,
    optimizer: &dyn Optimizer,
    cancellation: &Cancellation,
) -> Result<PaymentVector, Error> {
    let welfare = allocation.welfare();
    let mut payments = Vec::with_capacity(allocation.winners().len());
    for winner in allocation.winners() {
        cancellation.check()?;
        let without = Request::new(auction, evaluator)
            .without(winner.bidder)
            .solve(optimizer)?;
        let payment = without.objective - (welfare - winner.value);
        tracing::debug!(bidder = %winner.bidder, payment, "vcg payment");
        payments.push(payment);
    }
    Ok(payments.into())
}
