//! Scorecard: one slot per category plus the Dicee bonus accumulator (spec §3
//! PlayerGameState, invariant I3: a filled slot is immutable for the rest of the game).

use super::Category;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scorecard {
    slots: HashMap<Category, i32>,
    dicee_bonus: i32,
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if the category has not yet been scored.
    pub fn get(&self, category: Category) -> Option<i32> {
        self.slots.get(&category).copied()
    }

    /// Sets a category's score. Callers must check `get(category).is_none()` first (I3);
    /// this is an unconditional write so that engine tests can set up arbitrary fixtures.
    pub fn set(&mut self, category: Category, value: i32) {
        self.slots.insert(category, value);
    }

    pub fn is_complete(&self) -> bool {
        Category::ALL.iter().all(|c| self.slots.contains_key(c))
    }

    pub fn dicee_bonus(&self) -> i32 {
        self.dicee_bonus
    }

    pub fn add_dicee_bonus(&mut self, amount: i32) {
        self.dicee_bonus += amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_category_is_none() {
        let scorecard = Scorecard::new();
        assert_eq!(scorecard.get(Category::Chance), None);
    }

    #[test]
    fn is_complete_requires_all_thirteen_categories() {
        let mut scorecard = Scorecard::new();
        for (i, cat) in Category::ALL.iter().enumerate() {
            assert!(!scorecard.is_complete());
            scorecard.set(*cat, i as i32);
        }
        assert!(scorecard.is_complete());
    }
}
