//! Scenario tests of the whole engine. Auctions are described as JSON so the
//! cases read like the inputs a caller would hand in.

use {
    crate::domain::{
        Auction,
        Bid,
        BidderId,
        Bundle,
        Costs,
        Mechanism,
        PaymentRule,
        mechanism::Config,
    },
    rand::{Rng, SeedableRng, rngs::StdRng},
    serde::Deserialize,
    serde_json::Value,
};

mod core_payments;
mod vcg;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct AuctionCase {
    items: usize,
    #[serde(default)]
    costs: Option<Vec<f64>>,
    #[serde(default)]
    reserve_prices: Option<Vec<f64>>,
    bids: Vec<BidCase>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct BidCase {
    bidder: u32,
    bundles: Vec<(Vec<u32>, f64)>,
}

/// Builds an auction from a JSON description.
pub fn auction(case: Value) -> Auction {
    let case: AuctionCase = serde_json::from_value(case).unwrap();
    let bids = case
        .bids
        .into_iter()
        .map(|bid| {
            Bid::new(
                BidderId(bid.bidder),
                bid.bundles
                    .into_iter()
                    .map(|(items, value)| (Bundle::from(items.as_slice()), value)),
            )
        })
        .collect();
    let costs = case
        .costs
        .map(Costs::new)
        .unwrap_or_else(|| Costs::zero(case.items));
    let auction = Auction::new(bids, case.items, costs).unwrap();
    match case.reserve_prices {
        Some(prices) => auction.with_reserve_prices(prices).unwrap(),
        None => auction,
    }
}

pub fn mechanism(auction: Auction, rule: PaymentRule) -> Mechanism {
    observe::tracing::initialize_reentrant("mechanism=debug");
    Mechanism::new(auction, Config::new(rule)).unwrap()
}

/// Two agents on four items with zero costs.
pub fn two_agents() -> Auction {
    auction(serde_json::json!({
        "items": 4,
        "bids": [
            { "bidder": 1, "bundles": [[[1], 20.0], [[2], 20.0], [[3, 4], 10.0]] },
            { "bidder": 2, "bundles": [[[1, 2], 35.0], [[3], 10.0]] },
        ],
    }))
}

/// Two single item bidders against one bidder on both items.
pub fn llg(local1: f64, local2: f64, global: f64) -> Auction {
    auction(serde_json::json!({
        "items": 2,
        "bids": [
            { "bidder": 1, "bundles": [[[1], local1]] },
            { "bidder": 2, "bundles": [[[2], local2]] },
            { "bidder": 3, "bundles": [[[1, 2], global]] },
        ],
    }))
}

/// A small random auction. Values are multiples of 1/8 to keep the
/// arithmetic exact.
pub fn random(seed: u64, bidders: u32, items: u32) -> Auction {
    let mut rng = StdRng::seed_from_u64(seed);
    let bids = (1..=bidders)
        .map(|bidder| {
            let clauses = rng.gen_range(1..=2);
            Bid::new(
                BidderId(bidder),
                (0..clauses)
                    .map(|_| {
                        let bundle: Bundle = (1..=items)
                            .filter(|_| rng.gen_bool(0.4))
                            .map(crate::domain::Item)
                            .collect();
                        let bundle = if bundle.is_empty() {
                            Bundle::from([rng.gen_range(1..=items)])
                        } else {
                            bundle
                        };
                        let value = f64::from(rng.gen_range(1..=80u32)) / 8.;
                        (bundle, value)
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect();
    let costs = (0..items)
        .map(|_| f64::from(rng.gen_range(0..=4u32)) / 8.)
        .collect();
    Auction::new(bids, items as usize, Costs::new(costs)).unwrap()
}

/// Optimal deterministic welfare over the bids of the bidders accepted by
/// `filter`, by exhaustive search.
pub fn brute_force_welfare(auction: &Auction, filter: impl Fn(BidderId) -> bool) -> f64 {
    fn search(bids: &[&Bid], costs: &Costs, used: &mut Vec<Bundle>) -> f64 {
        let Some((bid, rest)) = bids.split_first() else {
            return 0.;
        };
        let mut best = search(rest, costs, used);
        for clause in bid.atomic_bids() {
            if used.iter().all(|bundle| bundle.is_disjoint(&clause.bundle)) {
                let net = clause.value
                    - clause
                        .bundle
                        .items()
                        .map(|item| costs.of(item))
                        .sum::<f64>();
                used.push(clause.bundle.clone());
                best = best.max(net + search(rest, costs, used));
                used.pop();
            }
        }
        best
    }

    let bids: Vec<_> = auction
        .bids()
        .iter()
        .filter(|bid| filter(bid.bidder()))
        .collect();
    search(&bids, auction.costs(), &mut Vec::new())
}
