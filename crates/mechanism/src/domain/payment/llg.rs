//! Local-local-global auctions: two bidders on one item each and a global
//! bidder on both. The nearest-VCG core point has a closed form here.

use {
    super::{EmptyCore, EmptyCoreReason, PaymentVector, Resolution},
    crate::domain::{
        allocation::Allocation,
        auction::{Auction, InvalidAuction},
        bid::{BidderId, Bundle},
        evaluator::Evaluator,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Llg {
    pub locals: [BidderId; 2],
    pub global: BidderId,
}

/// Checks that the auction has the local-local-global shape.
pub fn detect(auction: &Auction) -> Result<Llg, InvalidAuction> {
    let [a, b, c] = auction.bids() else {
        return Err(InvalidAuction::NotLlg("expected exactly three bidders"));
    };
    let mut clauses = Vec::with_capacity(3);
    for bid in [a, b, c] {
        let [clause] = bid.atomic_bids() else {
            return Err(InvalidAuction::NotLlg("every bidder needs exactly one bundle"));
        };
        clauses.push(clause);
    }
    clauses.sort_by_key(|clause| clause.bundle.len());
    let [first, second, global] = clauses[..] else {
        return Err(InvalidAuction::NotLlg("expected exactly three bidders"));
    };
    if first.bundle.len() != 1
        || second.bundle.len() != 1
        || !first.bundle.is_disjoint(&second.bundle)
    {
        return Err(InvalidAuction::NotLlg("locals need distinct single items"));
    }
    let union: Bundle = first.bundle.items().chain(second.bundle.items()).collect();
    if global.bundle != union {
        return Err(InvalidAuction::NotLlg("global bundle must be the union of the locals"));
    }
    let mut locals = [first.bidder, second.bidder];
    locals.sort();
    Ok(Llg {
        locals,
        global: global.bidder,
    })
}

/// Nearest-VCG core payments. The only coalition that can block VCG is the
/// global bidder against two winning locals, so the shortfall is split
/// evenly between them within their values.
pub fn payments(
    auction: &Auction,
    llg: &Llg,
    allocation: &Allocation,
    evaluator: &dyn Evaluator,
    vcg: PaymentVector,
    epsilon: f64,
) -> Resolution {
    if allocation.is_empty() {
        return Resolution::Solved(PaymentVector::default());
    }
    let (Some(first), Some(second)) = (
        allocation.position(llg.locals[0]),
        allocation.position(llg.locals[1]),
    ) else {
        return Resolution::VcgInCore(vcg);
    };
    let Some(global) = auction
        .bid_of(llg.global)
        .and_then(|bid| bid.atomic_bids().first())
    else {
        return Resolution::VcgInCore(vcg);
    };

    let bound = evaluator.net(global, auction.costs()) + allocation.total_cost();
    let (vcg1, vcg2) = (
        vcg.get(first).unwrap_or_default(),
        vcg.get(second).unwrap_or_default(),
    );
    if vcg1 + vcg2 >= bound - epsilon {
        return Resolution::VcgInCore(vcg);
    }

    let winners = allocation.winners();
    let (value1, value2) = (winners[first].value, winners[second].value);
    if vcg1 > value1 + epsilon || vcg2 > value2 + epsilon {
        return Resolution::EmptyCore(EmptyCore {
            reason: EmptyCoreReason::Infeasible,
            vcg,
        });
    }
    let shortfall = bound - vcg1 - vcg2;
    let (mut p1, mut p2) = (vcg1 + shortfall / 2., vcg2 + shortfall / 2.);
    if p1 > value1 {
        (p1, p2) = (value1, bound - value1);
    } else if p2 > value2 {
        (p1, p2) = (bound - value2, value2);
    }
    if p1 > value1 + epsilon || p2 > value2 + epsilon {
        return Resolution::EmptyCore(EmptyCore {
            reason: EmptyCoreReason::Infeasible,
            vcg,
        });
    }

    let mut payments = vcg.as_slice().to_vec();
    payments[first] = p1;
    payments[second] = p2;
    Resolution::Solved(payments.into())
}
