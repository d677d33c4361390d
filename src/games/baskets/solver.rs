use std::collections::HashMap;

use enum_iterator::all;
use log::debug;

use super::game::{Basket, Coin, GameError, GameState, Outcome, Role, BASKET_COUNT};

/// Identifies a search position: the basket about to receive a coin plus
/// everything about the state the rest of the game depends on. Basket order
/// is kept as is since future offers address baskets by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    sums: [u32; BASKET_COUNT],
    remaining: u32,
    turn: u8,
    basket: Basket,
}

impl StateKey {
    pub fn new(state: &GameState, basket: Basket) -> Self {
        StateKey {
            sums: state.sums(),
            remaining: state.remaining().bits(),
            turn: state.turn(),
            basket,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Exhaustive forced-win search for the placer. One solver is one solving
/// session: it owns its cache, and callers that want parallel sessions create
/// one solver each.
#[derive(Debug, Default)]
pub struct Solver {
    cache: HashMap<StateKey, bool>,
    hits: u64,
    misses: u64,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every cached verdict. Results never depend on the cache, only
    /// memory use does.
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> SolverStats {
        SolverStats {
            entries: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    /// Whether the placer, about to fill `basket`, has a coin that wins
    /// against every later offer.
    pub fn can_force_win(&mut self, state: &GameState, basket: Basket) -> Result<bool, GameError> {
        check_searchable(state, basket)?;
        let result = self.search(state, basket);
        debug!(
            "can_force_win {} on basket {} = {} ({:?})",
            state,
            basket,
            result,
            self.stats()
        );
        Ok(result)
    }

    /// Every coin that keeps a forced win, smallest first.
    pub fn forcing_coins(&mut self, state: &GameState, basket: Basket) -> Result<Vec<Coin>, GameError> {
        check_searchable(state, basket)?;
        Ok(state
            .remaining()
            .iter()
            .filter(|&coin| self.coin_forces_win(state, basket, coin))
            .collect())
    }

    /// Picks the placer's coin for `basket`: the smallest forcing coin, or the
    /// largest coin left when no forced win exists. The fallback is only a
    /// legal move to play on with, not a best reply.
    pub fn choose_coin(&mut self, state: &GameState, basket: Basket) -> Result<Coin, GameError> {
        check_searchable(state, basket)?;
        if let Some(coin) = state
            .remaining()
            .iter()
            .find(|&coin| self.coin_forces_win(state, basket, coin))
        {
            debug!("coin {} forces a win from {}", coin, state);
            return Ok(coin);
        }
        let coin = state
            .remaining()
            .largest()
            .ok_or(GameError::UnreachableState("no coins left to place"))?;
        debug!("no forced win from {}, playing largest coin {}", state, coin);
        Ok(coin)
    }

    /// Picks the presenter's basket: the first one the placer cannot force a
    /// win from, or the first basket when every offer loses.
    pub fn choose_offer(&mut self, state: &GameState) -> Result<Basket, GameError> {
        state.validate()?;
        if state.is_terminal() {
            return Err(GameError::UnreachableState(
                "no offer to make after the last coin",
            ));
        }
        if let Some(pending) = state.offer() {
            return Err(GameError::InvalidOffer(pending));
        }
        let basket = all::<Basket>()
            .find(|&basket| !self.search(state, basket))
            .unwrap_or_default();
        debug!("presenter offers basket {} from {}", basket, state);
        Ok(basket)
    }

    fn search(&mut self, state: &GameState, basket: Basket) -> bool {
        let key = StateKey::new(state, basket);
        if let Some(&result) = self.cache.get(&key) {
            self.hits += 1;
            return result;
        }
        self.misses += 1;
        let result = state
            .remaining()
            .iter()
            .any(|coin| self.coin_forces_win(state, basket, coin));
        self.cache.insert(key, result);
        result
    }

    // The placer picks one coin, then the presenter may offer any basket next
    fn coin_forces_win(&mut self, state: &GameState, basket: Basket, coin: Coin) -> bool {
        let next = state.placed(basket, coin);
        if next.is_terminal() {
            return Outcome::from_sums(next.sums()).winner == Role::Placer;
        }
        all::<Basket>().all(|offer| self.search(&next, offer))
    }
}

fn check_searchable(state: &GameState, basket: Basket) -> Result<(), GameError> {
    state.validate()?;
    if state.is_terminal() {
        return Err(GameError::UnreachableState(
            "searched a game with no coins left",
        ));
    }
    match state.offer() {
        Some(pending) if pending != basket => Err(GameError::UnreachableState(
            "searched a basket other than the pending offer",
        )),
        _ => Ok(()),
    }
}
