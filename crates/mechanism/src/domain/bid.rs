use {
    derive_more::{Display, From, Into},
    std::collections::BTreeSet,
};

/// An indivisible good. Ids are 1-based, i.e. valid ids of an auction with
/// `M` items are `1..=M`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display)]
pub struct Item(pub u32);

impl Item {
    /// Zero-based position of the item in per-item vectors.
    pub fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX).saturating_sub(1)
    }
}

/// Identifies an agent taking part in the auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Display)]
pub struct BidderId(pub u32);

/// A set of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bundle(BTreeSet<Item>);

impl Bundle {
    pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
        Self(items.into_iter().collect())
    }

    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, item: Item) -> bool {
        self.0.contains(&item)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_disjoint(&self, other: &Bundle) -> bool {
        self.0.is_disjoint(&other.0)
    }
}

impl FromIterator<Item> for Bundle {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl<const N: usize> From<[u32; N]> for Bundle {
    fn from(items: [u32; N]) -> Self {
        items.into_iter().map(Item).collect()
    }
}

impl From<&[u32]> for Bundle {
    fn from(items: &[u32]) -> Self {
        items.iter().copied().map(Item).collect()
    }
}

/// One XOR clause of an agent's valuation: the agent is willing to pay up to
/// `value` for `bundle`.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicBid {
    pub bidder: BidderId,
    pub bundle: Bundle,
    pub value: f64,
}

/// An agent's full valuation. At most one of its atomic bids wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Bid {
    bidder: BidderId,
    atomic_bids: Vec<AtomicBid>,
}

impl Bid {
    /// Creates a bid from `(bundle, value)` clauses.
    pub fn new(bidder: BidderId, clauses: impl IntoIterator<Item = (Bundle, f64)>) -> Self {
        let atomic_bids = clauses
            .into_iter()
            .map(|(bundle, value)| AtomicBid {
                bidder,
                bundle,
                value,
            })
            .collect();
        Self {
            bidder,
            atomic_bids,
        }
    }

    /// Creates a bid from fully specified atomic bids. Consistency of the
    /// bidder ids is checked when the auction is assembled.
    pub fn from_atomic_bids(bidder: BidderId, atomic_bids: Vec<AtomicBid>) -> Self {
        Self {
            bidder,
            atomic_bids,
        }
    }

    pub fn bidder(&self) -> BidderId {
        self.bidder
    }

    pub fn atomic_bids(&self) -> &[AtomicBid] {
        &self.atomic_bids
    }
}

/// Cost the seller incurs per delivered unit of each item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Costs(Vec<f64>);

impl Costs {
    pub fn new(costs: Vec<f64>) -> Self {
        Self(costs)
    }

    pub fn zero(items: usize) -> Self {
        Self(vec![0.; items])
    }

    /// Cost of a single item. Unknown items are free.
    pub fn of(&self, item: Item) -> f64 {
        self.0.get(item.index()).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Item, f64)> + '_ {
        (1u32..).map(Item).zip(self.0.iter().copied())
    }
}
