//! game-2048: rule engine and session state machine for 2048
//!
//! This crate provides:
//! - A `Board` type with the sliding/merging rules (`engine` module)
//! - A spawn policy placing 2s and 4s after each successful move
//! - Single-player sessions with a one-step undo (`session` module)
//! - Menu/playing state, two-player composition and the best score (`game` module)
//! - A fixed-layout, checksummed save record (`persistence` module)
//! - An application context wiring it all to a presentation layer (`app` module)
//!
//! Quick start:
//! ```
//! use game_2048::engine::{Board, Move};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic board initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let b0 = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
//! let outcome = b0.attempt(Move::Left);
//! assert!(outcome.changed || outcome.board == b0);
//! ```
//!
//! Full loop over a session
//! ```
//! use game_2048::engine::{Move, SpawnPolicy};
//! use game_2048::session::Session;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let policy = SpawnPolicy::default();
//! let mut session = Session::new(&policy, &mut rng);
//! let mut moves = 0u32;
//! while !session.is_game_over() && moves < 50 {
//!     for dir in Move::ALL {
//!         if session.attempt(dir, &policy, &mut rng).changed() {
//!             moves += 1;
//!             break;
//!         }
//!     }
//! }
//! assert!(moves > 0);
//! ```
//!
pub mod app;
pub mod config;
pub mod engine;
pub mod game;
pub mod persistence;
pub mod session;

pub use app::{App, Headless, Presenter};
pub use config::{BestScorePolicy, GameConfig};
pub use engine::{attempt_move, Board, Move, MoveOutcome, SpawnPolicy};
pub use game::{Command, Game, Mode, Outcome, Phase, Player};
pub use session::{Session, SoundCue};
