//! Randomized word decks tagged by element and charge tier.

use rand::{Rng, seq::IndexedRandom};
use serde::Deserialize;

use crate::state::game::{Element, WordWithElement};

/// Normal and charge vocabularies for one element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementPool {
    /// Words worth a small charge and a chip boost.
    #[serde(default)]
    pub normal: Vec<String>,
    /// Words worth a large charge.
    #[serde(default)]
    pub charge: Vec<String>,
}

impl ElementPool {
    fn from_static(normal: &[&str], charge: &[&str]) -> Self {
        Self {
            normal: normal.iter().map(|word| word.to_string()).collect(),
            charge: charge.iter().map(|word| word.to_string()).collect(),
        }
    }

    /// Keep only usable entries (trimmed, lowercase, non-empty); fall back to `defaults` per tier
    /// when a tier ends up empty.
    fn sanitized(self, defaults: &ElementPool) -> Self {
        let clean = |words: Vec<String>, fallback: &Vec<String>| {
            let words: Vec<String> = words
                .into_iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|word| !word.is_empty())
                .collect();
            if words.is_empty() {
                fallback.clone()
            } else {
                words
            }
        };
        Self {
            normal: clean(self.normal, &defaults.normal),
            charge: clean(self.charge, &defaults.charge),
        }
    }
}

/// Word pools for all three elements.
#[derive(Debug, Clone)]
pub struct WordPools {
    fire: ElementPool,
    water: ElementPool,
    leaf: ElementPool,
}

impl WordPools {
    /// Build pools from configured vocabularies, filling gaps from the built-in set.
    pub fn new(fire: ElementPool, water: ElementPool, leaf: ElementPool) -> Self {
        let defaults = Self::default();
        Self {
            fire: fire.sanitized(&defaults.fire),
            water: water.sanitized(&defaults.water),
            leaf: leaf.sanitized(&defaults.leaf),
        }
    }

    /// Pool for `element`.
    pub fn pool(&self, element: Element) -> &ElementPool {
        match element {
            Element::Fire => &self.fire,
            Element::Water => &self.water,
            Element::Leaf => &self.leaf,
        }
    }
}

impl Default for WordPools {
    fn default() -> Self {
        Self {
            fire: ElementPool::from_static(
                &[
                    "flame", "ember", "spark", "blaze", "heat", "ash", "smoke", "torch", "burn",
                    "coal", "glow", "flare", "scorch", "lava", "kindle", "cinder",
                ],
                &["inferno", "wildfire", "phoenix", "eruption", "firestorm"],
            ),
            water: ElementPool::from_static(
                &[
                    "wave", "rain", "tide", "river", "mist", "drop", "pond", "stream", "splash",
                    "brook", "foam", "dew", "lake", "surf", "ripple", "current",
                ],
                &["tsunami", "maelstrom", "monsoon", "torrent", "deluge"],
            ),
            leaf: ElementPool::from_static(
                &[
                    "leaf", "root", "vine", "moss", "seed", "bloom", "fern", "bark", "thorn",
                    "petal", "sprout", "grove", "stem", "reed", "ivy", "branch",
                ],
                &["overgrowth", "wildwood", "photosynth", "evergreen", "rainforest"],
            ),
        }
    }
}

/// Samples decks from [`WordPools`]; randomness is supplied by the caller.
#[derive(Debug, Clone)]
pub struct WordGenerator {
    pools: WordPools,
    charge_probability: f64,
}

impl WordGenerator {
    /// Create a generator drawing charge words with `charge_probability`.
    pub fn new(pools: WordPools, charge_probability: f64) -> Self {
        Self {
            pools,
            charge_probability: charge_probability.clamp(0.0, 1.0),
        }
    }

    /// Produce `count` independently sampled words. Duplicates are allowed.
    pub fn generate<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<WordWithElement> {
        (0..count).map(|_| self.sample(rng)).collect()
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> WordWithElement {
        let element = Element::ALL[rng.random_range(0..Element::ALL.len())];
        let is_charge = rng.random_bool(self.charge_probability);
        let pool = self.pools.pool(element);
        let words = if is_charge { &pool.charge } else { &pool.normal };
        let word = words.choose(rng).cloned().unwrap_or_default();

        WordWithElement {
            word,
            element,
            is_charge,
        }
    }
}

impl Default for WordGenerator {
    fn default() -> Self {
        Self::new(WordPools::default(), 0.3)
    }
}
