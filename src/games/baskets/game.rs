/*
Game: Three Baskets
Coins worth 1..N are dropped one at a time into three baskets. The presenter
names the basket, the placer picks the coin. Once every coin is placed the
placer wins with a strictly largest basket; any tie for the top goes to the
presenter.
*/

use std::fmt;

use enum_iterator::{all, Sequence};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BASKET_COUNT: usize = 3;
pub const MIN_COINS: u8 = 4;
pub const MAX_COINS: u8 = 10;
pub const DEFAULT_COINS: u8 = 4;

pub type Coin = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("basket {0} cannot be offered: the game is over or an offer is already pending")]
    InvalidOffer(Basket),
    #[error("coin {coin} cannot be placed into basket {basket}")]
    InvalidPlacement { basket: Basket, coin: Coin },
    #[error("unreachable state: {0}")]
    UnreachableState(&'static str),
    #[error("coin count {0} is outside 4..=10")]
    InvalidCoinCount(u8),
    #[error("basket index {0} is outside 0..=2")]
    InvalidBasket(usize),
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Sequence,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "camelCase")]
pub enum Basket {
    #[default]
    First = 0,
    Second = 1,
    Third = 2,
}

impl Basket {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Result<Basket, GameError> {
        match index {
            0 => Ok(Basket::First),
            1 => Ok(Basket::Second),
            2 => Ok(Basket::Third),
            _ => Err(GameError::InvalidBasket(index)),
        }
    }
}

impl fmt::Display for Basket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Sequence, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    // Chooses which basket receives the next coin
    Presenter,
    // Chooses which coin goes into the offered basket
    Placer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Presenter => write!(f, "presenter"),
            Role::Placer => write!(f, "placer"),
        }
    }
}

/// Coins still in hand, one bit per face value (bit 0 unused).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CoinSet(u32);

impl CoinSet {
    pub fn full(coin_count: u8) -> Self {
        CoinSet(((1u32 << coin_count) - 1) << 1)
    }

    pub fn empty() -> Self {
        CoinSet(0)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, coin: Coin) -> bool {
        coin < 32 && self.0 & (1 << coin) != 0
    }

    pub fn without(self, coin: Coin) -> Self {
        CoinSet(self.0 & !(1 << coin))
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Ascending face values.
    pub fn iter(self) -> impl Iterator<Item = Coin> {
        (1..32u8).filter(move |&coin| self.contains(coin))
    }

    pub fn largest(self) -> Option<Coin> {
        if self.is_empty() {
            None
        } else {
            Some((31 - self.0.leading_zeros()) as Coin)
        }
    }

    pub fn total(self) -> u32 {
        self.iter().map(u32::from).sum()
    }

    pub fn is_subset_of(self, other: CoinSet) -> bool {
        self.0 & !other.0 == 0
    }
}

impl FromIterator<Coin> for CoinSet {
    fn from_iter<I: IntoIterator<Item = Coin>>(iter: I) -> Self {
        // Values past the mask are dropped; callers compare lengths to catch them
        CoinSet(iter.into_iter().fold(0, |bits, coin| {
            bits | 1u32.checked_shl(u32::from(coin)).unwrap_or(0)
        }))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub winner: Role,
    pub top_sum: u32,
    pub second_sum: u32,
}

impl Outcome {
    /// Applies the win rule to final basket sums. A tie at the top, three-way
    /// included, goes to the presenter.
    pub fn from_sums(sums: [u32; BASKET_COUNT]) -> Self {
        let mut sorted = sums;
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        let winner = if sorted[0] > sorted[1] {
            Role::Placer
        } else {
            Role::Presenter
        };
        Outcome {
            winner,
            top_sum: sorted[0],
            second_sum: sorted[1],
        }
    }
}

/// A position in the game. Transitions never mutate; they hand back a new
/// value so states explored by the solver cannot alias the table's state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    coin_count: u8,
    // Running total of each basket, indexed by Basket::index
    sums: [u32; BASKET_COUNT],
    // Coins not yet placed
    remaining: CoinSet,
    // Coins placed so far
    turn: u8,
    // Basket waiting for a coin, if the presenter has offered one
    offer: Option<Basket>,
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState::fresh(DEFAULT_COINS)
    }

    pub fn with_coin_count(coin_count: u8) -> Result<Self, GameError> {
        check_coin_count(coin_count)?;
        Ok(GameState::fresh(coin_count))
    }

    pub(crate) fn fresh(coin_count: u8) -> Self {
        GameState {
            coin_count,
            sums: [0; BASKET_COUNT],
            remaining: CoinSet::full(coin_count),
            turn: 0,
            offer: None,
        }
    }

    /// Rebuilds a position from stored parts, e.g. a room record.
    pub fn from_parts(
        coin_count: u8,
        sums: [u32; BASKET_COUNT],
        remaining: CoinSet,
        offer: Option<Basket>,
    ) -> Result<Self, GameError> {
        check_coin_count(coin_count)?;
        if !remaining.is_subset_of(CoinSet::full(coin_count)) {
            return Err(GameError::UnreachableState(
                "remaining coins outside the coin range",
            ));
        }
        let state = GameState {
            coin_count,
            sums,
            remaining,
            turn: coin_count - remaining.len() as u8,
            offer,
        };
        state.validate()?;
        Ok(state)
    }

    pub fn coin_count(&self) -> u8 {
        self.coin_count
    }

    pub fn sums(&self) -> [u32; BASKET_COUNT] {
        self.sums
    }

    pub fn sum(&self, basket: Basket) -> u32 {
        self.sums[basket.index()]
    }

    pub fn remaining(&self) -> CoinSet {
        self.remaining
    }

    pub fn turn(&self) -> u8 {
        self.turn
    }

    pub fn offer(&self) -> Option<Basket> {
        self.offer
    }

    pub fn is_terminal(&self) -> bool {
        self.turn == self.coin_count
    }

    /// Checks the bookkeeping invariants tying turn, sums and remaining coins
    /// together. Deserialized states skip the constructors, so the solver
    /// calls this before searching.
    pub fn validate(&self) -> Result<(), GameError> {
        check_coin_count(self.coin_count)?;
        let full = CoinSet::full(self.coin_count);
        if !self.remaining.is_subset_of(full) {
            return Err(GameError::UnreachableState(
                "remaining coins outside the coin range",
            ));
        }
        if self.turn as usize != self.coin_count as usize - self.remaining.len() {
            return Err(GameError::UnreachableState(
                "turn does not match the coins placed",
            ));
        }
        let placed = self
            .sums
            .iter()
            .try_fold(0u32, |total, &sum| total.checked_add(sum));
        if placed != Some(full.total() - self.remaining.total()) {
            return Err(GameError::UnreachableState(
                "basket sums do not match the coins placed",
            ));
        }
        if self.is_terminal() && self.offer.is_some() {
            return Err(GameError::UnreachableState(
                "offer pending after the last coin",
            ));
        }
        Ok(())
    }

    pub fn apply_offer(&self, basket: Basket) -> Result<GameState, GameError> {
        if self.is_terminal() || self.offer.is_some() {
            return Err(GameError::InvalidOffer(basket));
        }
        Ok(GameState {
            offer: Some(basket),
            ..*self
        })
    }

    pub fn apply_placement(&self, basket: Basket, coin: Coin) -> Result<GameState, GameError> {
        if self.offer != Some(basket) || !self.remaining.contains(coin) {
            return Err(GameError::InvalidPlacement { basket, coin });
        }
        Ok(self.placed(basket, coin))
    }

    // Unchecked placement used by the search, which only feeds it coins from
    // `remaining`.
    pub(crate) fn placed(&self, basket: Basket, coin: Coin) -> GameState {
        let mut sums = self.sums;
        sums[basket.index()] += u32::from(coin);
        GameState {
            coin_count: self.coin_count,
            sums,
            remaining: self.remaining.without(coin),
            turn: self.turn + 1,
            offer: None,
        }
    }

    pub fn evaluate_terminal(&self) -> Result<Outcome, GameError> {
        if !self.is_terminal() {
            return Err(GameError::UnreachableState(
                "evaluated a game that still has coins to place",
            ));
        }
        Ok(Outcome::from_sums(self.sums))
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for basket in all::<Basket>() {
            let marker = if self.offer == Some(basket) { "*" } else { " " };
            write!(f, "[{}{}: {:>2}] ", marker, basket, self.sum(basket))?;
        }
        let coins: Vec<String> = self.remaining.iter().map(|c| c.to_string()).collect();
        write!(f, "coins: {{{}}} turn {}/{}", coins.join(", "), self.turn, self.coin_count)
    }
}

fn check_coin_count(coin_count: u8) -> Result<(), GameError> {
    if (MIN_COINS..=MAX_COINS).contains(&coin_count) {
        Ok(())
    } else {
        Err(GameError::InvalidCoinCount(coin_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(values: &[Coin]) -> CoinSet {
        values.iter().copied().collect()
    }

    #[test]
    fn test_new_game() {
        let state = GameState::new();
        assert_eq!(state.coin_count(), DEFAULT_COINS);
        assert_eq!(state.sums(), [0, 0, 0]);
        assert_eq!(state.remaining().iter().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(state.turn(), 0);
        assert_eq!(state.offer(), None);
        assert!(!state.is_terminal());
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn test_coin_count_bounds() {
        assert_eq!(
            GameState::with_coin_count(3),
            Err(GameError::InvalidCoinCount(3))
        );
        assert_eq!(
            GameState::with_coin_count(11),
            Err(GameError::InvalidCoinCount(11))
        );
        let state = GameState::with_coin_count(10).unwrap();
        assert_eq!(state.remaining().len(), 10);
        assert_eq!(state.remaining().total(), 55);
        assert_eq!(state.remaining().largest(), Some(10));
    }

    #[test]
    fn test_coin_set() {
        let set = coins(&[4, 1, 3]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3, 4]);
        assert!(set.contains(3));
        assert!(!set.contains(2));
        assert!(!set.contains(40));
        assert_eq!(set.without(3).iter().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(set.largest(), Some(4));
        assert_eq!(CoinSet::empty().largest(), None);
        assert!(set.is_subset_of(CoinSet::full(4)));
        assert!(!coins(&[5]).is_subset_of(CoinSet::full(4)));
    }

    #[test]
    fn test_basket_index_round_trip() {
        for basket in all::<Basket>() {
            assert_eq!(Basket::from_index(basket.index()), Ok(basket));
        }
        assert_eq!(Basket::from_index(3), Err(GameError::InvalidBasket(3)));
    }

    #[derive(Debug)]
    struct OutcomeScenario {
        name: &'static str,
        sums: [u32; 3],
        expected: Outcome,
    }

    #[test]
    fn test_win_rule() {
        let scenarios = vec![
            OutcomeScenario {
                name: "tie at the top goes to the presenter",
                sums: [5, 5, 3],
                expected: Outcome {
                    winner: Role::Presenter,
                    top_sum: 5,
                    second_sum: 5,
                },
            },
            OutcomeScenario {
                name: "unique maximum goes to the placer",
                sums: [7, 5, 3],
                expected: Outcome {
                    winner: Role::Placer,
                    top_sum: 7,
                    second_sum: 5,
                },
            },
            OutcomeScenario {
                name: "three-way tie goes to the presenter",
                sums: [5, 5, 5],
                expected: Outcome {
                    winner: Role::Presenter,
                    top_sum: 5,
                    second_sum: 5,
                },
            },
            OutcomeScenario {
                name: "basket order does not matter",
                sums: [3, 5, 7],
                expected: Outcome {
                    winner: Role::Placer,
                    top_sum: 7,
                    second_sum: 5,
                },
            },
            OutcomeScenario {
                name: "tie below the top does not matter",
                sums: [2, 9, 2],
                expected: Outcome {
                    winner: Role::Placer,
                    top_sum: 9,
                    second_sum: 2,
                },
            },
        ];

        for scenario in scenarios {
            assert_eq!(
                Outcome::from_sums(scenario.sums),
                scenario.expected,
                "Scenario: {}",
                scenario.name
            );
        }
    }

    #[test]
    fn test_evaluate_terminal() {
        // {3, 4} / {5} / {1, 2}
        let state = GameState::from_parts(5, [7, 5, 3], CoinSet::empty(), None).unwrap();
        assert!(state.is_terminal());
        assert_eq!(
            state.evaluate_terminal(),
            Ok(Outcome {
                winner: Role::Placer,
                top_sum: 7,
                second_sum: 5,
            })
        );

        // {1, 4} / {2, 3} / {5}
        let tied = GameState::from_parts(5, [5, 5, 5], CoinSet::empty(), None).unwrap();
        assert_eq!(tied.evaluate_terminal().unwrap().winner, Role::Presenter);

        assert!(matches!(
            GameState::new().evaluate_terminal(),
            Err(GameError::UnreachableState(_))
        ));
    }

    #[test]
    fn test_offer_then_place() {
        let state = GameState::new();
        let offered = state.apply_offer(Basket::Second).unwrap();
        assert_eq!(offered.offer(), Some(Basket::Second));
        assert_eq!(offered.turn(), 0);

        let placed = offered.apply_placement(Basket::Second, 3).unwrap();
        assert_eq!(placed.sums(), [0, 3, 0]);
        assert_eq!(placed.remaining().iter().collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(placed.turn(), 1);
        assert_eq!(placed.offer(), None);
        assert_eq!(placed.validate(), Ok(()));

        // Transitions leave the source value untouched
        assert_eq!(state, GameState::new());
        assert_eq!(offered.offer(), Some(Basket::Second));
    }

    #[test]
    fn test_second_offer_is_rejected() {
        let offered = GameState::new().apply_offer(Basket::First).unwrap();
        assert_eq!(
            offered.apply_offer(Basket::Third),
            Err(GameError::InvalidOffer(Basket::Third))
        );
        assert_eq!(
            offered.apply_offer(Basket::First),
            Err(GameError::InvalidOffer(Basket::First))
        );
    }

    #[test]
    fn test_offer_after_last_coin_is_rejected() {
        let state = GameState::from_parts(4, [4, 3, 3], CoinSet::empty(), None).unwrap();
        assert_eq!(
            state.apply_offer(Basket::First),
            Err(GameError::InvalidOffer(Basket::First))
        );
    }

    #[test]
    fn test_invalid_placements_leave_state_unchanged() {
        let offered = GameState::new()
            .apply_offer(Basket::First)
            .unwrap()
            .apply_placement(Basket::First, 2)
            .unwrap()
            .apply_offer(Basket::Third)
            .unwrap();
        let before = offered;

        // Already placed
        assert_eq!(
            offered.apply_placement(Basket::Third, 2),
            Err(GameError::InvalidPlacement {
                basket: Basket::Third,
                coin: 2
            })
        );
        // Never existed
        assert_eq!(
            offered.apply_placement(Basket::Third, 9),
            Err(GameError::InvalidPlacement {
                basket: Basket::Third,
                coin: 9
            })
        );
        // Wrong basket
        assert_eq!(
            offered.apply_placement(Basket::Second, 1),
            Err(GameError::InvalidPlacement {
                basket: Basket::Second,
                coin: 1
            })
        );
        assert_eq!(offered, before);

        // No offer pending
        let idle = GameState::new();
        assert_eq!(
            idle.apply_placement(Basket::First, 1),
            Err(GameError::InvalidPlacement {
                basket: Basket::First,
                coin: 1
            })
        );
        assert_eq!(idle, GameState::new());
    }

    #[test]
    fn test_full_game() {
        let moves = [
            (Basket::First, 4),
            (Basket::Second, 1),
            (Basket::Second, 2),
            (Basket::Third, 3),
        ];
        let mut state = GameState::new();
        for (basket, coin) in moves {
            state = state
                .apply_offer(basket)
                .and_then(|s| s.apply_placement(basket, coin))
                .unwrap();
        }
        assert!(state.is_terminal());
        assert_eq!(state.sums(), [4, 3, 3]);
        assert_eq!(state.evaluate_terminal().unwrap().winner, Role::Placer);
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_state() {
        // Placed {1, 4} but sums only account for 4
        assert_eq!(
            GameState::from_parts(4, [4, 0, 0], coins(&[2, 3]), None),
            Err(GameError::UnreachableState(
                "basket sums do not match the coins placed"
            ))
        );
        assert!(matches!(
            GameState::from_parts(4, [0, 0, 0], coins(&[1, 2, 3, 4, 5]), None),
            Err(GameError::UnreachableState(_))
        ));
        assert!(matches!(
            GameState::from_parts(4, [4, 3, 3], CoinSet::empty(), Some(Basket::First)),
            Err(GameError::UnreachableState(_))
        ));
        assert_eq!(
            GameState::from_parts(12, [0, 0, 0], CoinSet::full(12), None),
            Err(GameError::InvalidCoinCount(12))
        );

        let state = GameState::from_parts(4, [5, 0, 0], coins(&[2, 3]), Some(Basket::Second)).unwrap();
        assert_eq!(state.turn(), 2);
        assert_eq!(state.offer(), Some(Basket::Second));
    }

    #[test]
    fn test_deserialized_state_is_validated() {
        let json = r#"{"coinCount":4,"sums":[9,0,0],"remaining":30,"turn":0,"offer":null}"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert!(matches!(
            state.validate(),
            Err(GameError::UnreachableState(_))
        ));
    }

    #[test]
    fn test_deserialized_coin_count_is_validated() {
        let json = r#"{"coinCount":11,"sums":[0,0,0],"remaining":4094,"turn":0,"offer":null}"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.validate(), Err(GameError::InvalidCoinCount(11)));

        let json = r#"{"coinCount":40,"sums":[0,0,0],"remaining":0,"turn":40,"offer":null}"#;
        let state: GameState = serde_json::from_str(json).unwrap();
        assert_eq!(state.validate(), Err(GameError::InvalidCoinCount(40)));
    }

    #[test]
    fn test_huge_sums_are_rejected() {
        assert_eq!(
            GameState::from_parts(4, [u32::MAX, 1, 0], CoinSet::full(4), None),
            Err(GameError::UnreachableState(
                "basket sums do not match the coins placed"
            ))
        );
    }
}
