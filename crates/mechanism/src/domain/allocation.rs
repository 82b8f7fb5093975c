use {
    super::{
        auction::Auction,
        availability::Realization,
        bid::{AtomicBid, BidderId, Bundle, Costs, Item},
        evaluator::Evaluator,
    },
    std::collections::BTreeSet,
};

/// A winning atomic bid, valued by the evaluator the allocation was built
/// with.
#[derive(Debug, Clone, PartialEq)]
pub struct Winner {
    pub bidder: BidderId,
    /// Position of the winning clause within the bidder's XOR bid.
    pub bid_index: usize,
    pub bundle: Bundle,
    pub value: f64,
    pub cost: f64,
    /// Availability of every allocated item, 1 in deterministic auctions.
    pub availability: Vec<(Item, f64)>,
}

impl Winner {
    pub fn new(
        bid: &AtomicBid,
        bid_index: usize,
        costs: &Costs,
        evaluator: &dyn Evaluator,
    ) -> Self {
        Self {
            bidder: bid.bidder,
            bid_index,
            bundle: bid.bundle.clone(),
            value: evaluator.value(bid),
            cost: evaluator.cost(&bid.bundle, costs),
            availability: bid
                .bundle
                .items()
                .map(|item| (item, evaluator.availability(item)))
                .collect(),
        }
    }

    pub fn net(&self) -> f64 {
        self.value - self.cost
    }
}

/// Winning atomic bids, ordered by bidder id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    winners: Vec<Winner>,
}

impl Allocation {
    pub fn new(mut winners: Vec<Winner>) -> Self {
        winners.sort_by_key(|winner| winner.bidder);
        Self { winners }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn winners(&self) -> &[Winner] {
        &self.winners
    }

    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    pub fn bidders(&self) -> impl Iterator<Item = BidderId> + '_ {
        self.winners.iter().map(|winner| winner.bidder)
    }

    /// Index of the bidder among the winners, which is also its index in
    /// every payment vector of this allocation.
    pub fn position(&self, bidder: BidderId) -> Option<usize> {
        self.winners
            .binary_search_by_key(&bidder, |winner| winner.bidder)
            .ok()
    }

    pub fn winner(&self, bidder: BidderId) -> Option<&Winner> {
        self.position(bidder).map(|index| &self.winners[index])
    }

    /// `Σ (value - cost)` over all winners.
    pub fn welfare(&self) -> f64 {
        self.winners.iter().map(Winner::net).sum()
    }

    pub fn total_value(&self) -> f64 {
        self.winners.iter().map(|winner| winner.value).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.winners.iter().map(|winner| winner.cost).sum()
    }

    /// The same winning bids valued by a different evaluator.
    pub fn revalue(&self, auction: &Auction, evaluator: &dyn Evaluator) -> Self {
        let winners = self
            .winners
            .iter()
            .filter_map(|winner| {
                let bid = auction.bid_of(winner.bidder)?;
                let atomic = bid.atomic_bids().get(winner.bid_index)?;
                Some(Winner::new(
                    atomic,
                    winner.bid_index,
                    auction.costs(),
                    evaluator,
                ))
            })
            .collect();
        Self { winners }
    }

    /// Every bidder wins at most once and no item is allocated twice.
    pub fn is_feasible(&self) -> bool {
        let mut bidders = BTreeSet::new();
        let mut items = BTreeSet::new();
        self.winners.iter().all(|winner| {
            bidders.insert(winner.bidder) && winner.bundle.items().all(|item| items.insert(item))
        })
    }
}

/// Ex-post view of an allocation under one drawn realization.
#[derive(Debug, Clone, PartialEq)]
pub struct RealizedAllocation {
    pub realization: Realization,
    /// The winners valued with their realized availability.
    pub allocation: Allocation,
}

impl RealizedAllocation {
    pub fn welfare(&self) -> f64 {
        self.allocation.welfare()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::domain::{bid::Bid, evaluator::Deterministic},
    };

    fn winner(bidder: u32, items: &[u32]) -> Winner {
        Winner {
            bidder: BidderId(bidder),
            bid_index: 0,
            bundle: Bundle::from(items),
            value: 2.,
            cost: 0.5,
            availability: vec![],
        }
    }

    #[test]
    fn winners_are_ordered_by_bidder() {
        let allocation = Allocation::new(vec![winner(5, &[1]), winner(2, &[2])]);

        assert_eq!(
            allocation.bidders().collect::<Vec<_>>(),
            vec![BidderId(2), BidderId(5)]
        );
        assert_eq!(allocation.position(BidderId(5)), Some(1));
        assert_eq!(allocation.position(BidderId(3)), None);
        assert_eq!(allocation.welfare(), 3.);
        assert_eq!(allocation.total_cost(), 1.);
    }

    #[test]
    fn detects_double_allocation() {
        assert!(Allocation::new(vec![winner(1, &[1]), winner(2, &[2])]).is_feasible());
        assert!(!Allocation::new(vec![winner(1, &[1, 2]), winner(2, &[2])]).is_feasible());
        assert!(!Allocation::new(vec![winner(1, &[1]), winner(1, &[2])]).is_feasible());
    }

    #[test]
    fn revalues_winning_bids() {
        let auction = Auction::new(
            vec![Bid::new(
                BidderId(1),
                [(Bundle::from([1]), 1.), (Bundle::from([1, 2]), 3.)],
            )],
            2,
            Costs::new(vec![0.5, 0.25]),
        )
        .unwrap();
        let mut stale = winner(1, &[1, 2]);
        stale.bid_index = 1;

        let allocation = Allocation::new(vec![stale]).revalue(&auction, &Deterministic);

        assert_eq!(allocation.winners()[0].value, 3.);
        assert_eq!(allocation.winners()[0].cost, 0.75);
        assert_eq!(
            allocation.winners()[0].availability,
            vec![(Item(1), 1.), (Item(2), 1.)]
        );
    }
}
