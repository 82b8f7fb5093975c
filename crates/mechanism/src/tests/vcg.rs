use {
    super::*,
    crate::domain::{BidderId, PaymentRule, Resolution},
    approx::assert_abs_diff_eq,
    rstest::rstest,
};

#[test]
fn two_agents() {
    let mechanism = mechanism(super::two_agents(), PaymentRule::Vcg);
    let outcome = mechanism.solve_it().unwrap();

    assert_abs_diff_eq!(outcome.vcg.as_slice(), [0., 10.].as_slice());
    assert_eq!(outcome.resolution, Resolution::Solved(outcome.vcg.clone()));
    assert!(outcome.constraints.is_empty());
}

#[test]
fn global_bidder_pays_the_locals_bids() {
    let outcome = mechanism(llg(0.9, 0.8, 2.), PaymentRule::Vcg)
        .solve_it()
        .unwrap()
        .clone();

    let bidders: Vec<_> = outcome.allocation.bidders().collect();
    assert_eq!(bidders, [BidderId(3)]);
    assert_abs_diff_eq!(outcome.payments().as_slice(), [1.7].as_slice(), epsilon = 1e-9);
}

#[test]
fn locals_underpay_the_global_bid() {
    let outcome = mechanism(llg(0.3, 0.4, 0.6), PaymentRule::Vcg)
        .solve_it()
        .unwrap()
        .clone();

    assert_abs_diff_eq!(outcome.vcg.as_slice(), [0.2, 0.3].as_slice(), epsilon = 1e-9);
    assert!(outcome.vcg.total() < 0.6);
}

#[rstest]
fn payments_lie_between_cost_and_value(#[values(11, 12, 13, 14, 15, 16)] seed: u64) {
    let outcome = mechanism(random(seed, 5, 4), PaymentRule::Vcg)
        .solve_it()
        .unwrap()
        .clone();

    assert_eq!(outcome.vcg.len(), outcome.allocation.winners().len());
    for (winner, payment) in outcome.allocation.winners().iter().zip(outcome.vcg.as_slice()) {
        assert!(*payment >= winner.cost - 1e-9, "{payment} below cost {}", winner.cost);
        assert!(*payment <= winner.value + 1e-9, "{payment} above value {}", winner.value);
    }
}

#[test]
fn uncontested_winner_pays_cost() {
    let auction = auction(serde_json::json!({
        "items": 2,
        "costs": [1.0, 0.5],
        "bids": [
            { "bidder": 4, "bundles": [[[1, 2], 3.0]] },
        ],
    }));
    let outcome = mechanism(auction, PaymentRule::Vcg).solve_it().unwrap().clone();

    assert_abs_diff_eq!(outcome.vcg.as_slice(), [1.5].as_slice(), epsilon = 1e-9);
}
