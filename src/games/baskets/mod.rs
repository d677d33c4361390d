pub mod game;
pub mod solver;
pub mod table;

// Re-export the main types
pub use game::{
    Basket, Coin, CoinSet, GameError, GameState, Outcome, Role, DEFAULT_COINS, MAX_COINS,
    MIN_COINS,
};
pub use solver::{Solver, SolverStats, StateKey};
pub use table::{Phase, Placement, RoomRecord, SharedTable, Table};
