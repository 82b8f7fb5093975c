//! Probabilistic models of item deliverability.
//!
//! Availability of an item is a number in `[0, 1]`; a bundle is as available
//! as the product of its items. Models expose expectations for winner
//! determination and seedable draws for ex-post reporting.

use {
    super::bid::{Bundle, Item},
    rand::{Rng, SeedableRng, rngs::StdRng},
    std::{
        collections::{BTreeMap, BTreeSet},
        fmt::Debug,
    },
};

/// Number of scenarios a [`Bombing`] model may expand into.
const MAX_SCENARIOS: usize = 1 << 16;

pub trait AvailabilityModel: Debug + Send + Sync {
    /// Expected availability of all `items` jointly, `E[Π aᵢ]`. The empty
    /// bundle is always available.
    fn marginal_probability(&self, items: &Bundle) -> f64;

    /// Draws one concrete availability outcome. The same seed always yields
    /// the same outcome.
    fn draw_realization(&self, seed: u64) -> Realization;
}

/// Concrete availability of every item. Items without an entry are fully
/// available.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Realization(BTreeMap<Item, f64>);

impl Realization {
    pub fn new(availability: impl IntoIterator<Item = (Item, f64)>) -> Self {
        Self(availability.into_iter().collect())
    }

    pub fn of(&self, item: Item) -> f64 {
        self.0.get(&item).copied().unwrap_or(1.)
    }

    pub fn bundle(&self, bundle: &Bundle) -> f64 {
        bundle.items().map(|item| self.of(item)).product()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Item, f64)> + '_ {
        self.0.iter().map(|(item, availability)| (*item, *availability))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidModel {
    #[error("probability {0} is outside of [0, 1]")]
    Probability(f64),
    #[error("scenario probabilities sum to {0} instead of 1")]
    Normalization(f64),
    #[error("availability {availability} of item {item} is outside of [0, 1]")]
    Availability { item: Item, availability: f64 },
    #[error("reduction {0} is outside of [0, 1]")]
    Reduction(f64),
    #[error("item {item} is outside of 1..={items}")]
    UnknownItem { item: Item, items: usize },
    #[error("model expands into more than {MAX_SCENARIOS} scenarios")]
    TooManyScenarios,
}

/// A finite distribution over realizations.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenarios(Vec<(f64, Realization)>);

impl Scenarios {
    pub fn new(scenarios: Vec<(f64, Realization)>) -> Result<Self, InvalidModel> {
        for (probability, realization) in &scenarios {
            if !(0. ..=1.).contains(probability) {
                return Err(InvalidModel::Probability(*probability));
            }
            if let Some((item, availability)) = realization
                .iter()
                .find(|(_, availability)| !(0. ..=1.).contains(availability))
            {
                return Err(InvalidModel::Availability { item, availability });
            }
        }
        let total: f64 = scenarios.iter().map(|(probability, _)| probability).sum();
        if (total - 1.).abs() > 1e-9 {
            return Err(InvalidModel::Normalization(total));
        }
        Ok(Self(scenarios))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Realization)> + '_ {
        self.0
            .iter()
            .map(|(probability, realization)| (*probability, realization))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AvailabilityModel for Scenarios {
    fn marginal_probability(&self, items: &Bundle) -> f64 {
        self.iter()
            .map(|(probability, realization)| probability * realization.bundle(items))
            .sum()
    }

    fn draw_realization(&self, seed: u64) -> Realization {
        let draw: f64 = StdRng::seed_from_u64(seed).r#gen();
        let mut cumulative = 0.;
        for (probability, realization) in self.iter() {
            cumulative += probability;
            if draw < cumulative {
                return realization.clone();
            }
        }
        // Only reachable through rounding of the cumulative sum.
        self.0
            .iter()
            .rev()
            .find(|(probability, _)| *probability > 0.)
            .map(|(_, realization)| realization.clone())
            .unwrap_or_default()
    }
}

/// Correlated failures from bombs landing on a proximity graph.
///
/// Every bomb explodes with its probability and then hits one item chosen
/// uniformly at random. The hit item keeps a `1 - primary` share of its
/// availability, all of its graph neighbours keep a `1 - secondary` share.
/// Effects of several bombs multiply.
#[derive(Debug, Clone)]
pub struct Bombing {
    items: usize,
    neighbours: BTreeMap<Item, BTreeSet<Item>>,
    bombs: Vec<f64>,
    primary: f64,
    secondary: f64,
}

impl Bombing {
    pub fn new(items: usize, primary_reduction: f64, secondary_reduction: f64) -> Self {
        Self {
            items,
            neighbours: BTreeMap::new(),
            bombs: Vec::new(),
            primary: primary_reduction,
            secondary: secondary_reduction,
        }
    }

    /// Marks two items as close to each other.
    pub fn with_edge(mut self, a: Item, b: Item) -> Self {
        self.neighbours.entry(a).or_default().insert(b);
        self.neighbours.entry(b).or_default().insert(a);
        self
    }

    pub fn with_bomb(mut self, probability: f64) -> Self {
        self.bombs.push(probability);
        self
    }

    fn item_ids(&self) -> impl Iterator<Item = Item> + '_ {
        (1..=self.items).map(|id| Item(u32::try_from(id).unwrap_or(u32::MAX)))
    }

    /// Expands the model into its exact scenario distribution.
    pub fn scenarios(&self) -> Result<Scenarios, InvalidModel> {
        for reduction in [self.primary, self.secondary] {
            if !(0. ..=1.).contains(&reduction) {
                return Err(InvalidModel::Reduction(reduction));
            }
        }
        if let Some(&item) = self
            .neighbours
            .keys()
            .find(|item| item.0 == 0 || item.index() >= self.items)
        {
            return Err(InvalidModel::UnknownItem {
                item,
                items: self.items,
            });
        }

        let intact = Realization::new(self.item_ids().map(|item| (item, 1.)));
        let mut scenarios = vec![(1., intact)];
        let uniform = 1. / self.items.max(1) as f64;
        for &probability in &self.bombs {
            if !(0. ..=1.).contains(&probability) {
                return Err(InvalidModel::Probability(probability));
            }
            let mut next = Vec::new();
            for (weight, realization) in scenarios {
                if probability < 1. {
                    next.push((weight * (1. - probability), realization.clone()));
                }
                if probability > 0. {
                    for target in self.item_ids() {
                        next.push((weight * probability * uniform, self.hit(&realization, target)));
                    }
                }
            }
            if next.len() > MAX_SCENARIOS {
                return Err(InvalidModel::TooManyScenarios);
            }
            scenarios = next;
        }

        Scenarios::new(scenarios)
    }

    fn hit(&self, realization: &Realization, target: Item) -> Realization {
        let mut availability = realization.0.clone();
        if let Some(value) = availability.get_mut(&target) {
            *value *= 1. - self.primary;
        }
        for neighbour in self.neighbours.get(&target).into_iter().flatten() {
            if let Some(value) = availability.get_mut(neighbour) {
                *value *= 1. - self.secondary;
            }
        }
        Realization(availability)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, approx::assert_abs_diff_eq};

    fn single_bomb() -> Scenarios {
        Bombing::new(2, 1., 0.5)
            .with_edge(Item(1), Item(2))
            .with_bomb(1.)
            .scenarios()
            .unwrap()
    }

    #[test]
    fn single_certain_bomb() {
        let scenarios = single_bomb();

        assert_eq!(
            scenarios.iter().collect::<Vec<_>>(),
            vec![
                (0.5, &Realization::new([(Item(1), 0.), (Item(2), 0.5)])),
                (0.5, &Realization::new([(Item(1), 0.5), (Item(2), 0.)])),
            ]
        );
        assert_abs_diff_eq!(scenarios.marginal_probability(&Bundle::from([1])), 0.25);
        assert_abs_diff_eq!(scenarios.marginal_probability(&Bundle::from([2])), 0.25);
        assert_abs_diff_eq!(scenarios.marginal_probability(&Bundle::from([1, 2])), 0.);
        assert_abs_diff_eq!(scenarios.marginal_probability(&Bundle::default()), 1.);
    }

    #[test]
    fn uncertain_bombs_multiply() {
        let scenarios = Bombing::new(3, 0.5, 0.)
            .with_bomb(0.5)
            .with_bomb(0.5)
            .scenarios()
            .unwrap();

        assert_eq!(scenarios.len(), 16);
        // P(item 1 is hit by a given bomb) = 1/6, availability halves per hit.
        let expected = (1. - 1. / 6. * 0.5_f64).powi(2);
        assert_abs_diff_eq!(
            scenarios.marginal_probability(&Bundle::from([1])),
            expected,
            epsilon = 1e-12
        );
    }

    #[test]
    fn draws_are_reproducible() {
        let scenarios = single_bomb();

        for seed in 0..32 {
            let realization = scenarios.draw_realization(seed);
            assert_eq!(realization, scenarios.draw_realization(seed));
            assert!(realization.iter().all(|(_, a)| (0. ..=1.).contains(&a)));
        }
    }

    #[test]
    fn draws_follow_the_distribution() {
        let scenarios = single_bomb();

        let first_hit = (0..2_000)
            .filter(|&seed| scenarios.draw_realization(seed).of(Item(1)) == 0.)
            .count();

        assert!((800..1_200).contains(&first_hit), "{first_hit}");
    }

    #[test]
    fn rejects_invalid_models() {
        assert_eq!(
            Bombing::new(2, 1.5, 0.).scenarios().unwrap_err(),
            InvalidModel::Reduction(1.5)
        );
        assert_eq!(
            Bombing::new(2, 1., 0.)
                .with_edge(Item(1), Item(3))
                .scenarios()
                .unwrap_err(),
            InvalidModel::UnknownItem {
                item: Item(3),
                items: 2
            }
        );
        assert_eq!(
            Scenarios::new(vec![(0.4, Realization::default())]).unwrap_err(),
            InvalidModel::Normalization(0.4)
        );
    }
}
