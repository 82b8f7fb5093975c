use {
    super::{
        availability::AvailabilityModel,
        bid::{AtomicBid, Bid, BidderId, Bundle, Costs, Item},
        payment::PaymentRule,
    },
    std::{collections::BTreeSet, sync::Arc},
};

/// Immutable inputs of one auction.
#[derive(Debug, Clone)]
pub struct Auction {
    bids: Vec<Bid>,
    items: usize,
    costs: Costs,
    reserve_prices: Option<Vec<f64>>,
    availability: Option<Arc<dyn AvailabilityModel>>,
}

impl Auction {
    /// Validates the bids against `items` goods with the given per-item
    /// costs. Bids are kept ordered by bidder id.
    pub fn new(mut bids: Vec<Bid>, items: usize, costs: Costs) -> Result<Self, InvalidAuction> {
        if items == 0 {
            return Err(InvalidAuction::NoItems);
        }
        if costs.len() != items {
            return Err(InvalidAuction::CostCount {
                items,
                costs: costs.len(),
            });
        }
        if let Some((item, cost)) = costs.iter().find(|(_, cost)| !is_amount(*cost)) {
            return Err(InvalidAuction::InvalidCost { item, cost });
        }

        let mut bidders = BTreeSet::new();
        for bid in &bids {
            if !bidders.insert(bid.bidder()) {
                return Err(InvalidAuction::DuplicateBidder(bid.bidder()));
            }
            if bid.atomic_bids().is_empty() {
                return Err(InvalidAuction::EmptyBid(bid.bidder()));
            }
            for atomic in bid.atomic_bids() {
                validate_atomic_bid(bid.bidder(), atomic, items)?;
            }
        }
        bids.sort_by_key(Bid::bidder);

        Ok(Self {
            bids,
            items,
            costs,
            reserve_prices: None,
            availability: None,
        })
    }

    /// Sets a reserve price per item.
    pub fn with_reserve_prices(mut self, prices: Vec<f64>) -> Result<Self, InvalidAuction> {
        if prices.len() != self.items {
            return Err(InvalidAuction::ReservePriceCount {
                items: self.items,
                prices: prices.len(),
            });
        }
        if let Some((index, &price)) = prices.iter().enumerate().find(|(_, p)| !is_amount(**p)) {
            return Err(InvalidAuction::InvalidReservePrice {
                item: Item(u32::try_from(index + 1).unwrap_or(u32::MAX)),
                price,
            });
        }
        self.reserve_prices = Some(prices);
        Ok(self)
    }

    pub fn with_availability(mut self, model: Arc<dyn AvailabilityModel>) -> Self {
        self.availability = Some(model);
        self
    }

    pub fn bids(&self) -> &[Bid] {
        &self.bids
    }

    pub fn items(&self) -> usize {
        self.items
    }

    pub fn costs(&self) -> &Costs {
        &self.costs
    }

    pub fn reserve_prices(&self) -> Option<&[f64]> {
        self.reserve_prices.as_deref()
    }

    pub fn availability(&self) -> Option<&Arc<dyn AvailabilityModel>> {
        self.availability.as_ref()
    }

    /// Sum of the reserve prices of a bundle, zero without reserve prices.
    pub fn reserve_of(&self, bundle: &Bundle) -> f64 {
        let Some(prices) = &self.reserve_prices else {
            return 0.;
        };
        bundle
            .items()
            .map(|item| prices.get(item.index()).copied().unwrap_or_default())
            .sum()
    }

    pub fn bid_of(&self, bidder: BidderId) -> Option<&Bid> {
        self.bids
            .binary_search_by_key(&bidder, Bid::bidder)
            .ok()
            .map(|index| &self.bids[index])
    }
}

fn is_amount(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.
}

fn validate_atomic_bid(
    bidder: BidderId,
    atomic: &AtomicBid,
    items: usize,
) -> Result<(), InvalidAuction> {
    if atomic.bidder != bidder {
        return Err(InvalidAuction::ForeignAtomicBid {
            bid: bidder,
            atomic: atomic.bidder,
        });
    }
    if atomic.bundle.is_empty() {
        return Err(InvalidAuction::EmptyBundle(bidder));
    }
    if let Some(item) = atomic
        .bundle
        .items()
        .find(|item| item.0 == 0 || item.index() >= items)
    {
        return Err(InvalidAuction::UnknownItem { bidder, item, items });
    }
    if !is_amount(atomic.value) {
        return Err(InvalidAuction::InvalidValue {
            bidder,
            value: atomic.value,
        });
    }
    Ok(())
}

/// Configuration errors. They are never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidAuction {
    #[error("auction has no items")]
    NoItems,
    #[error("{costs} costs for {items} items")]
    CostCount { items: usize, costs: usize },
    #[error("cost {cost} of item {item} is not a finite non-negative amount")]
    InvalidCost { item: Item, cost: f64 },
    #[error("{prices} reserve prices for {items} items")]
    ReservePriceCount { items: usize, prices: usize },
    #[error("reserve price {price} of item {item} is not a finite non-negative amount")]
    InvalidReservePrice { item: Item, price: f64 },
    #[error("bidder {0} submitted more than one bid")]
    DuplicateBidder(BidderId),
    #[error("bidder {0} submitted a bid without atomic bids")]
    EmptyBid(BidderId),
    #[error("bid of bidder {bid} contains an atomic bid of bidder {atomic}")]
    ForeignAtomicBid { bid: BidderId, atomic: BidderId },
    #[error("bidder {0} bids on an empty bundle")]
    EmptyBundle(BidderId),
    #[error("bidder {bidder} bids on item {item} outside of 1..={items}")]
    UnknownItem {
        bidder: BidderId,
        item: Item,
        items: usize,
    },
    #[error("bidder {bidder} bids {value} which is not a finite non-negative amount")]
    InvalidValue { bidder: BidderId, value: f64 },
    #[error("payment rule {0} requires an availability model")]
    MissingAvailability(PaymentRule),
    #[error("payment rule {0} requires a realization seed")]
    MissingSeed(PaymentRule),
    #[error("auction is not a local-local-global auction: {0}")]
    NotLlg(&'static str),
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn bid(bidder: u32, clauses: &[(&[u32], f64)]) -> Bid {
        Bid::new(
            BidderId(bidder),
            clauses
                .iter()
                .map(|(items, value)| (Bundle::from(*items), *value)),
        )
    }

    #[test]
    fn orders_bids_by_bidder() {
        let auction = Auction::new(
            vec![bid(7, &[(&[1], 1.)]), bid(2, &[(&[2], 1.)])],
            2,
            Costs::zero(2),
        )
        .unwrap();

        assert_eq!(
            auction.bids().iter().map(Bid::bidder).collect::<Vec<_>>(),
            vec![BidderId(2), BidderId(7)]
        );
        assert_eq!(auction.bid_of(BidderId(7)), Some(&auction.bids()[1]));
        assert_eq!(auction.bid_of(BidderId(3)), None);
    }

    #[rstest]
    #[case::no_items(vec![], 0, InvalidAuction::NoItems)]
    #[case::unknown_item(
        vec![bid(1, &[(&[3], 1.)])],
        2,
        InvalidAuction::UnknownItem { bidder: BidderId(1), item: Item(3), items: 2 },
    )]
    #[case::item_zero(
        vec![bid(1, &[(&[0], 1.)])],
        2,
        InvalidAuction::UnknownItem { bidder: BidderId(1), item: Item(0), items: 2 },
    )]
    #[case::empty_bundle(vec![bid(1, &[(&[], 1.)])], 2, InvalidAuction::EmptyBundle(BidderId(1)))]
    #[case::negative_value(
        vec![bid(1, &[(&[1], -1.)])],
        2,
        InvalidAuction::InvalidValue { bidder: BidderId(1), value: -1. },
    )]
    #[case::duplicate_bidder(
        vec![bid(1, &[(&[1], 1.)]), bid(1, &[(&[2], 1.)])],
        2,
        InvalidAuction::DuplicateBidder(BidderId(1)),
    )]
    #[case::empty_bid(vec![bid(4, &[])], 2, InvalidAuction::EmptyBid(BidderId(4)))]
    fn rejects_malformed_bids(
        #[case] bids: Vec<Bid>,
        #[case] items: usize,
        #[case] expected: InvalidAuction,
    ) {
        assert_eq!(
            Auction::new(bids, items, Costs::zero(items)).unwrap_err(),
            expected
        );
    }

    #[test]
    fn rejects_foreign_atomic_bids() {
        let foreign = Bid::from_atomic_bids(
            BidderId(1),
            vec![AtomicBid {
                bidder: BidderId(2),
                bundle: Bundle::from([1]),
                value: 1.,
            }],
        );

        assert_eq!(
            Auction::new(vec![foreign], 1, Costs::zero(1)).unwrap_err(),
            InvalidAuction::ForeignAtomicBid {
                bid: BidderId(1),
                atomic: BidderId(2)
            }
        );
    }

    #[test]
    fn validates_costs_and_reserve_prices() {
        assert_eq!(
            Auction::new(vec![], 2, Costs::zero(3)).unwrap_err(),
            InvalidAuction::CostCount { items: 2, costs: 3 }
        );
        assert_eq!(
            Auction::new(vec![], 2, Costs::new(vec![0., f64::NAN]))
                .unwrap_err()
                .to_string(),
            "cost NaN of item 2 is not a finite non-negative amount"
        );

        let auction = Auction::new(vec![], 2, Costs::zero(2)).unwrap();
        assert_eq!(
            auction.clone().with_reserve_prices(vec![1.]).unwrap_err(),
            InvalidAuction::ReservePriceCount {
                items: 2,
                prices: 1
            }
        );
        assert_eq!(
            auction.clone().with_reserve_prices(vec![1., -2.]).unwrap_err(),
            InvalidAuction::InvalidReservePrice {
                item: Item(2),
                price: -2.
            }
        );

        let auction = auction.with_reserve_prices(vec![1., 2.]).unwrap();
        assert_eq!(auction.reserve_of(&Bundle::from([1, 2])), 3.);
    }
}
