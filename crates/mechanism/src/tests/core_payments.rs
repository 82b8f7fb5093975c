use {
    super::*,
    crate::domain::{
        BidderId,
        Outcome,
        PaymentRule,
        Resolution,
        payment::core_selecting::MasterObjective,
    },
    approx::assert_abs_diff_eq,
    itertools::Itertools,
    rstest::rstest,
    std::collections::BTreeSet,
};

/// Four agents on two items where VCG revenue falls short of the global bid.
fn undersold() -> Auction {
    auction(serde_json::json!({
        "items": 2,
        "bids": [
            { "bidder": 1, "bundles": [[[1], 0.1]] },
            { "bidder": 2, "bundles": [[[2], 0.1]] },
            { "bidder": 3, "bundles": [[[1], 0.01], [[2], 0.05]] },
            { "bidder": 4, "bundles": [[[1, 2], 0.1]] },
        ],
    }))
}

/// No coalition of bidders can offer the seller more than the winners
/// outside of it pay plus what its winning members keep.
fn assert_in_core(auction: &Auction, outcome: &Outcome) {
    let allocation = &outcome.valuation;
    let payments = outcome.payments();
    let retained = payments.total() - allocation.total_cost();
    let bidders = auction.bids().iter().map(|bid| bid.bidder()).collect_vec();
    for coalition in bidders.into_iter().powerset() {
        let surplus: f64 = allocation
            .winners()
            .iter()
            .zip(payments.as_slice())
            .filter(|(winner, _)| coalition.contains(&winner.bidder))
            .map(|(winner, payment)| winner.value - payment)
            .sum();
        let blocking = brute_force_welfare(auction, |bidder| coalition.contains(&bidder));
        assert!(
            blocking <= retained + surplus + 1e-5,
            "coalition {coalition:?} blocks: {blocking} > {}",
            retained + surplus
        );
    }
}

#[test]
fn raises_vcg_to_the_nearest_core_point() {
    let auction = undersold();
    let mechanism = mechanism(auction.clone(), PaymentRule::Core);
    let outcome = mechanism.solve_it().unwrap();

    assert_abs_diff_eq!(outcome.vcg.as_slice(), [0.01, 0.05].as_slice(), epsilon = 1e-9);
    let Resolution::Solved(payments) = &outcome.resolution else {
        panic!("unexpected resolution {:?}", outcome.resolution);
    };
    assert_abs_diff_eq!(payments.as_slice(), [0.03, 0.07].as_slice(), epsilon = 1e-6);
    assert_eq!(outcome.constraints.len(), 1);
    assert_eq!(outcome.constraints[0].coalition, BTreeSet::from([BidderId(4)]));
    assert_in_core(&auction, outcome);
}

#[test]
fn vcg_already_in_core() {
    let mechanism = mechanism(two_agents(), PaymentRule::Core);
    let outcome = mechanism.solve_it().unwrap();

    assert_eq!(outcome.resolution, Resolution::VcgInCore(outcome.vcg.clone()));
    assert_eq!(outcome.iterations, 1);
    assert_abs_diff_eq!(outcome.payments().as_slice(), [0., 10.].as_slice());
}

#[test]
fn minimum_revenue_objective() {
    let mut config = crate::domain::mechanism::Config::new(PaymentRule::Core);
    config.core.objective = MasterObjective::MinimumRevenue;
    let mechanism = Mechanism::new(undersold(), config).unwrap();
    let outcome = mechanism.solve_it().unwrap();

    let payments = outcome.payments();
    assert_abs_diff_eq!(payments.total(), 0.1, epsilon = 1e-6);
    assert!(payments.as_slice()[0] >= 0.01 - 1e-9);
    assert!(payments.as_slice()[1] >= 0.05 - 1e-9);
}

#[rstest]
fn payments_are_in_the_core(#[values(13, 21, 22, 23, 24, 25, 26, 27, 28)] seed: u64) {
    let auction = random(seed, 4, 3);
    let mechanism = mechanism(auction.clone(), PaymentRule::Core);
    let outcome = mechanism.solve_it().unwrap();

    assert!(
        matches!(
            outcome.resolution,
            Resolution::Solved(_) | Resolution::VcgInCore(_)
        ),
        "unexpected resolution {:?}",
        outcome.resolution
    );
    for (winner, (payment, vcg)) in outcome
        .valuation
        .winners()
        .iter()
        .zip(outcome.payments().as_slice().iter().zip(outcome.vcg.as_slice()))
    {
        assert!(*payment >= vcg - 1e-6);
        assert!(*payment <= winner.value + 1e-6);
    }
    for constraint in &outcome.constraints {
        assert!(constraint.is_satisfied(outcome.payments(), 1e-6));
    }
    assert_in_core(&auction, outcome);
}

#[test]
fn converges_on_a_thin_revenue_face() {
    let auction = auction(serde_json::json!({
        "items": 3,
        "costs": [0.375, 0.125, 0.375],
        "bids": [
            { "bidder": 1, "bundles": [[[1, 2, 3], 9.875], [[2], 3.125]] },
            { "bidder": 2, "bundles": [[[3], 7.5], [[1, 3], 8.25]] },
            { "bidder": 3, "bundles": [[[1], 9.875]] },
            { "bidder": 4, "bundles": [[[3], 8.0]] },
        ],
    }));
    let mechanism = mechanism(auction.clone(), PaymentRule::Core);
    let outcome = mechanism.solve_it().unwrap();

    let bidders = outcome.allocation.bidders().collect_vec();
    assert_eq!(bidders, [BidderId(1), BidderId(3), BidderId(4)]);
    assert_abs_diff_eq!(
        outcome.vcg.as_slice(),
        [0.125, 0.375, 7.5].as_slice(),
        epsilon = 1e-9
    );
    let Resolution::Solved(payments) = &outcome.resolution else {
        panic!("unexpected resolution {:?}", outcome.resolution);
    };
    assert_abs_diff_eq!(payments.total(), 8.375, epsilon = 1e-6);
    assert_abs_diff_eq!(
        payments.as_slice(),
        [0.125, 0.5625, 7.6875].as_slice(),
        epsilon = 1e-6
    );
    assert_in_core(&auction, outcome);
}
