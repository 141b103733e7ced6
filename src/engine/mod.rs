//! GameEngine (C5): pure, deterministic dice-scoring functions.
//!
//! Nothing in this module touches storage or a clock; every function takes exactly the
//! state it needs and an injected RNG where randomness is required (spec §4.5, §9 "RNG
//! determinism"). No teacher module covers this domain directly — the pattern of keeping
//! side-effect-free logic behind a narrow, fully-owned interface mirrors the teacher's
//! `GameDatabase` trait boundary (`database::mod::GameDatabase`), applied here to scoring
//! instead of persistence.

mod scorecard;

pub use scorecard::Scorecard;

use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

/// The 13 Yahtzee-family scoring categories, in the fixed enumeration order used for
/// every deterministic tie-break in the spec (AFK auto-score, forfeiture scoring).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Dicee,
    Chance,
}

impl Category {
    /// Fixed enumeration order, matching declaration order above.
    pub const ALL: [Category; 13] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Dicee,
        Category::Chance,
    ];

    pub const UPPER_SECTION: [Category; 6] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
    ];

    pub const fn is_upper(self) -> bool {
        matches!(
            self,
            Category::Ones
                | Category::Twos
                | Category::Threes
                | Category::Fours
                | Category::Fives
                | Category::Sixes
        )
    }
}

/// Five dice faces, each `1..=6`.
pub type Dice = [u8; 5];

/// Sticky keep mask: once `true`, a bit cannot become `false` within the same turn
/// (spec §4.6.4 "Edge cases / tie-breaks").
pub type KeepMask = [bool; 5];

const UPPER_BONUS_THRESHOLD: i32 = 63;
const UPPER_BONUS_AMOUNT: i32 = 35;
const DICEE_SCORE: i32 = 50;
const DICEE_BONUS: i32 = 100;
const FULL_HOUSE_SCORE: i32 = 25;
const SMALL_STRAIGHT_SCORE: i32 = 30;
const LARGE_STRAIGHT_SCORE: i32 = 40;

/// Roll the dice not covered by `keep`, leaving kept faces untouched. `current` is `None`
/// on the first roll of a turn (all dice rolled fresh).
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, current: Option<&Dice>, keep: &KeepMask) -> Dice {
    let mut result = current.copied().unwrap_or([0; 5]);
    for i in 0..5 {
        if !keep[i] || current.is_none() {
            result[i] = rng.random_range(1..=6);
        }
    }
    result
}

fn face_counts(dice: &Dice) -> [u8; 7] {
    let mut counts = [0u8; 7];
    for &d in dice {
        if (1..=6).contains(&d) {
            counts[d as usize] += 1;
        }
    }
    counts
}

fn sum_of(dice: &Dice) -> i32 {
    dice.iter().map(|&d| d as i32).sum()
}

fn has_n_of_a_kind(dice: &Dice, n: u8) -> bool {
    face_counts(dice).iter().any(|&c| c >= n)
}

fn is_full_house(dice: &Dice) -> bool {
    let counts = face_counts(dice);
    let has_three = counts.iter().any(|&c| c == 3);
    let has_two = counts.iter().any(|&c| c == 2);
    has_three && has_two
}

fn is_small_straight(dice: &Dice) -> bool {
    let mut present = [false; 7];
    for &d in dice {
        if (1..=6).contains(&d) {
            present[d as usize] = true;
        }
    }
    let runs: [[usize; 4]; 3] = [[1, 2, 3, 4], [2, 3, 4, 5], [3, 4, 5, 6]];
    runs.iter().any(|run| run.iter().all(|&f| present[f]))
}

fn is_large_straight(dice: &Dice) -> bool {
    let mut sorted = *dice;
    sorted.sort_unstable();
    sorted == [1, 2, 3, 4, 5] || sorted == [2, 3, 4, 5, 6]
}

fn is_dicee(dice: &Dice) -> bool {
    has_n_of_a_kind(dice, 5)
}

/// Score `dice` in `category`, per the canonical Yahtzee-family rules (spec §4.5).
/// Does not account for the Dicee bonus — callers apply that separately via
/// [`dicee_bonus_awarded`], since the bonus is a property of *when* a Dicee is scored
/// relative to prior turns, not of the dice alone.
pub fn score_category(dice: &Dice, category: Category) -> i32 {
    match category {
        Category::Ones => face_counts(dice)[1] as i32 * 1,
        Category::Twos => face_counts(dice)[2] as i32 * 2,
        Category::Threes => face_counts(dice)[3] as i32 * 3,
        Category::Fours => face_counts(dice)[4] as i32 * 4,
        Category::Fives => face_counts(dice)[5] as i32 * 5,
        Category::Sixes => face_counts(dice)[6] as i32 * 6,
        Category::ThreeOfAKind => {
            if has_n_of_a_kind(dice, 3) {
                sum_of(dice)
            } else {
                0
            }
        }
        Category::FourOfAKind => {
            if has_n_of_a_kind(dice, 4) {
                sum_of(dice)
            } else {
                0
            }
        }
        Category::FullHouse => {
            if is_full_house(dice) {
                FULL_HOUSE_SCORE
            } else {
                0
            }
        }
        Category::SmallStraight => {
            if is_small_straight(dice) {
                SMALL_STRAIGHT_SCORE
            } else {
                0
            }
        }
        Category::LargeStraight => {
            if is_large_straight(dice) {
                LARGE_STRAIGHT_SCORE
            } else {
                0
            }
        }
        Category::Dicee => {
            if is_dicee(dice) {
                DICEE_SCORE
            } else {
                0
            }
        }
        Category::Chance => sum_of(dice),
    }
}

/// Whether scoring `dice` into `category` earns a Dicee bonus: the dice must be a
/// five-of-a-kind, and a Dicee must already have been recorded this game (spec §4.5,
/// scenario 2). The bonus accrues regardless of which category absorbs the five-of-a-kind
/// (a "Joker" play) — only the *first* Dicee fills the `dicee` category slot itself.
pub fn dicee_bonus_awarded(dice: &Dice, scorecard: &Scorecard) -> bool {
    is_dicee(dice) && scorecard.get(Category::Dicee).is_some()
}

/// Upper-section bonus: 35 iff the upper section total is >= 63 once every upper category
/// is filled.
pub fn upper_bonus(scorecard: &Scorecard) -> i32 {
    let all_filled = Category::UPPER_SECTION
        .iter()
        .all(|&c| scorecard.get(c).is_some());
    if !all_filled {
        return 0;
    }
    let total: i32 = Category::UPPER_SECTION
        .iter()
        .filter_map(|&c| scorecard.get(c))
        .sum();
    if total >= UPPER_BONUS_THRESHOLD {
        UPPER_BONUS_AMOUNT
    } else {
        0
    }
}

/// Sum of all scored slots plus upper bonus plus accumulated Dicee bonus.
pub fn total_score(scorecard: &Scorecard) -> i32 {
    let slots: i32 = Category::ALL.iter().filter_map(|&c| scorecard.get(c)).sum();
    slots + upper_bonus(scorecard) + scorecard.dicee_bonus()
}

/// The first category, in enumeration order, that has not yet been scored. Used for
/// forfeiture scoring (§4.6.3) and as the AFK forced-score fallback (§4.6.5) when the
/// player never rolled this turn; a player who did roll is scored by the lowest-value
/// open category instead (`room::RoomActor::force_timeout_score`), per the Open Question
/// resolutions in `DESIGN.md`.
pub fn first_unscored_category(scorecard: &Scorecard) -> Option<Category> {
    Category::ALL.iter().copied().find(|&c| scorecard.get(c).is_none())
}

/// Advance to the next seated, still-participating player in `player_order`, wrapping
/// around. Returns `(next_index, wrapped)`; callers increment `roundNumber` on wrap.
pub fn advance_turn(current_index: usize, participating: &[bool]) -> (usize, bool) {
    let n = participating.len();
    assert!(n > 0, "advance_turn requires a non-empty player order");
    let mut idx = current_index;
    let mut wrapped = false;
    for _ in 0..n {
        idx = (idx + 1) % n;
        if idx <= current_index {
            wrapped = true;
        }
        if participating[idx] {
            return (idx, wrapped);
        }
    }
    // No other participating player: turn stays put (degenerate single-player remainder).
    (current_index, wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn dicee_on_first_roll_scores_fifty() {
        let dice: Dice = [5, 5, 5, 5, 5];
        let mut scorecard = Scorecard::new();
        assert_eq!(score_category(&dice, Category::Dicee), 50);
        assert!(!dicee_bonus_awarded(&dice, &scorecard));
        scorecard.set(Category::Dicee, 50);
        assert_eq!(total_score(&scorecard), 50);
    }

    #[test]
    fn second_dicee_awards_bonus_via_joker_category() {
        let mut scorecard = Scorecard::new();
        scorecard.set(Category::Dicee, 50);
        let dice: Dice = [3, 3, 3, 3, 3];
        assert!(dicee_bonus_awarded(&dice, &scorecard));
        let threes = score_category(&dice, Category::Threes);
        assert_eq!(threes, 15);
        scorecard.set(Category::Threes, threes);
        scorecard.add_dicee_bonus(DICEE_BONUS);
        assert_eq!(total_score(&scorecard), 50 + 15 + 100);
    }

    #[test]
    fn full_house_requires_exact_three_and_two() {
        assert_eq!(score_category(&[2, 2, 2, 5, 5], Category::FullHouse), 25);
        assert_eq!(score_category(&[2, 2, 2, 2, 5], Category::FullHouse), 0);
    }

    #[test]
    fn straights_detect_any_qualifying_subset_or_full_run() {
        assert_eq!(score_category(&[1, 2, 3, 4, 6], Category::SmallStraight), 30);
        assert_eq!(score_category(&[1, 2, 3, 4, 6], Category::LargeStraight), 0);
        assert_eq!(score_category(&[2, 3, 4, 5, 6], Category::LargeStraight), 40);
    }

    #[test]
    fn upper_bonus_requires_all_upper_filled_and_threshold() {
        let mut scorecard = Scorecard::new();
        for (cat, value) in Category::UPPER_SECTION.iter().zip([3, 6, 9, 12, 15, 18]) {
            scorecard.set(*cat, value);
        }
        // sum = 63
        assert_eq!(upper_bonus(&scorecard), 35);
    }

    #[test]
    fn upper_bonus_zero_when_below_threshold() {
        let mut scorecard = Scorecard::new();
        for cat in Category::UPPER_SECTION {
            scorecard.set(cat, 1);
        }
        assert_eq!(upper_bonus(&scorecard), 0);
    }

    #[test]
    fn first_unscored_category_follows_enumeration_order() {
        let mut scorecard = Scorecard::new();
        scorecard.set(Category::Ones, 3);
        scorecard.set(Category::Twos, 4);
        assert_eq!(first_unscored_category(&scorecard), Some(Category::Threes));
    }

    #[test]
    fn advance_turn_wraps_and_skips_nonparticipating() {
        let participating = [true, false, true, true];
        let (next, wrapped) = advance_turn(0, &participating);
        assert_eq!(next, 2);
        assert!(!wrapped);
        let (next, wrapped) = advance_turn(3, &participating);
        assert_eq!(next, 0);
        assert!(wrapped);
    }

    #[test]
    fn roll_dice_respects_keep_mask_determinism() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = roll_dice(&mut rng, None, &[false; 5]);
        let keep = [true, false, true, false, true];
        let second = roll_dice(&mut rng, Some(&first), &keep);
        assert_eq!(second[0], first[0]);
        assert_eq!(second[2], first[2]);
        assert_eq!(second[4], first[4]);
    }
}
