use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use serde::{Deserialize, Serialize};

use super::game::{
    Basket, Coin, CoinSet, GameError, GameState, Outcome, BASKET_COUNT, MAX_COINS, MIN_COINS,
};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    // Seats are still being filled
    Waiting,
    // Presenter to name a basket
    Offering,
    // Placer to drop a coin into the offered basket
    Placing,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub turn: u8,
    pub basket: Basket,
    pub coin: Coin,
}

/// The shared record a multiplayer room keeps for its game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub sums: [u32; BASKET_COUNT],
    pub remaining: Vec<Coin>,
    pub turn: u8,
    pub coin_count: u8,
    pub current_offer: Option<u8>,
    pub phase: Phase,
}

impl RoomRecord {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Holds the canonical state of one game. Every mutation is computed on a
/// copy and stored only once it has been accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    state: GameState,
    history: Vec<Placement>,
    started: bool,
}

impl Table {
    pub fn new(coin_count: u8) -> Result<Self, GameError> {
        Ok(Table {
            state: GameState::with_coin_count(coin_count)?,
            history: vec![],
            started: false,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn history(&self) -> &[Placement] {
        &self.history
    }

    pub fn start(&mut self) {
        self.started = true;
    }

    /// Clears the baskets for a new game with the same coin count.
    pub fn reset(&mut self) {
        self.state = GameState::fresh(self.state.coin_count());
        self.history.clear();
    }

    pub fn phase(&self) -> Phase {
        if !self.started {
            Phase::Waiting
        } else if self.state.is_terminal() {
            Phase::Finished
        } else if self.state.offer().is_some() {
            Phase::Placing
        } else {
            Phase::Offering
        }
    }

    pub fn offer(&mut self, basket: Basket) -> Result<(), GameError> {
        if !self.started {
            return Err(GameError::InvalidOffer(basket));
        }
        self.state = self.state.apply_offer(basket)?;
        info!("basket {} offered on turn {}", basket, self.state.turn());
        Ok(())
    }

    pub fn place(&mut self, basket: Basket, coin: Coin) -> Result<Placement, GameError> {
        let placement = Placement {
            turn: self.state.turn(),
            basket,
            coin,
        };
        self.state = self.state.apply_placement(basket, coin)?;
        self.history.push(placement);
        info!("coin {} placed into basket {}: {}", coin, basket, self.state);
        Ok(placement)
    }

    pub fn outcome(&self) -> Result<Outcome, GameError> {
        self.state.evaluate_terminal()
    }

    pub fn to_record(&self) -> RoomRecord {
        RoomRecord {
            sums: self.state.sums(),
            remaining: self.state.remaining().iter().collect(),
            turn: self.state.turn(),
            coin_count: self.state.coin_count(),
            current_offer: self.state.offer().map(|basket| basket.index() as u8),
            phase: self.phase(),
        }
    }

    /// Rebuilds a table from a stored record. Only `waiting` is read from the
    /// stored phase; the rest is projected from the game state again. The
    /// placement history is not part of the record and starts out empty.
    pub fn from_record(record: &RoomRecord) -> Result<Self, GameError> {
        let offer = record
            .current_offer
            .map(|index| Basket::from_index(index as usize))
            .transpose()?;
        if !(MIN_COINS..=MAX_COINS).contains(&record.coin_count) {
            return Err(GameError::InvalidCoinCount(record.coin_count));
        }
        if record
            .remaining
            .iter()
            .any(|&coin| coin == 0 || coin > record.coin_count)
        {
            return Err(GameError::UnreachableState("coin outside the coin range"));
        }
        let remaining: CoinSet = record.remaining.iter().copied().collect();
        if remaining.len() != record.remaining.len() {
            return Err(GameError::UnreachableState("duplicate coins in record"));
        }
        let state = GameState::from_parts(record.coin_count, record.sums, remaining, offer)?;
        if state.turn() != record.turn {
            return Err(GameError::UnreachableState(
                "turn does not match the coins placed",
            ));
        }
        Ok(Table {
            state,
            history: vec![],
            started: record.phase != Phase::Waiting,
        })
    }
}

/// A table behind a mutex, for drivers that apply moves from more than one
/// thread. Each call locks once so two competing offers cannot both land on
/// the same turn.
#[derive(Debug, Clone)]
pub struct SharedTable(Arc<Mutex<Table>>);

impl SharedTable {
    pub fn new(table: Table) -> Self {
        SharedTable(Arc::new(Mutex::new(table)))
    }

    // A panic mid-move never leaves a half-applied state behind, so a
    // poisoned lock still guards a consistent table.
    fn lock(&self) -> MutexGuard<'_, Table> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Table {
        self.lock().clone()
    }

    pub fn offer(&self, basket: Basket) -> Result<(), GameError> {
        self.lock().offer(basket)
    }

    pub fn place(&self, basket: Basket, coin: Coin) -> Result<Placement, GameError> {
        self.lock().place(basket, coin)
    }
}
