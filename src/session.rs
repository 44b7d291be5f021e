//! One player's game: board, score, game-over flag and a one-step undo snapshot.

use rand::Rng;
use tracing::debug;

use crate::engine::{attempt_move, Board, Move, MoveOutcome, Score, Spawn, SpawnPolicy};

/// Audio hint for the presentation layer, derived from a move attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Tiles slid without merging.
    Move,
    /// At least one merge happened.
    Merge,
    /// The move left the board with no legal follow-up.
    GameOver,
}

/// What happened when a session processed a directional input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReport {
    pub outcome: MoveOutcome,
    /// The tile placed after a changing move.
    pub spawn: Option<Spawn>,
    /// True when this move put the session into game over.
    pub entered_game_over: bool,
    /// True when the input was ignored because the session was already over.
    pub rejected: bool,
}

impl MoveReport {
    #[inline]
    pub fn changed(&self) -> bool {
        self.outcome.changed
    }

    #[inline]
    pub fn score_delta(&self) -> Score {
        self.outcome.score_delta
    }

    /// The sound to play for this move, if any.
    pub fn cue(&self) -> Option<SoundCue> {
        if self.entered_game_over {
            Some(SoundCue::GameOver)
        } else if self.outcome.score_delta > 0 {
            Some(SoundCue::Merge)
        } else if self.outcome.changed {
            Some(SoundCue::Move)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    board: Board,
    score: Score,
    previous_board: Board,
    previous_score: Score,
    game_over: bool,
}

impl Session {
    /// A zero-filled session with no tiles; the state before any game was started.
    pub fn empty() -> Self {
        Session::default()
    }

    /// A fresh session: zero board with two spawned tiles.
    ///
    /// ```
    /// use game_2048::engine::SpawnPolicy;
    /// use game_2048::session::Session;
    /// use rand::{rngs::StdRng, SeedableRng};
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let s = Session::new(&SpawnPolicy::default(), &mut rng);
    /// assert_eq!(s.board().count_empty(), 14);
    /// assert_eq!(s.score(), 0);
    /// ```
    pub fn new<R: Rng + ?Sized>(policy: &SpawnPolicy, rng: &mut R) -> Self {
        let mut session = Session::empty();
        session.reset(policy, rng);
        session
    }

    /// Rebuild a session from persisted parts.
    pub fn from_parts(
        board: Board,
        score: Score,
        previous_board: Board,
        previous_score: Score,
        game_over: bool,
    ) -> Self {
        Session { board, score, previous_board, previous_score, game_over }
    }

    /// Start over: clear board and score, drop game over, spawn two tiles.
    pub fn reset<R: Rng + ?Sized>(&mut self, policy: &SpawnPolicy, rng: &mut R) {
        *self = Session::empty();
        self.spawn(policy, rng);
        self.spawn(policy, rng);
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    #[inline]
    pub fn previous_board(&self) -> &Board {
        &self.previous_board
    }

    #[inline]
    pub fn previous_score(&self) -> Score {
        self.previous_score
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// True once tiles have been placed, i.e. a game was started on this session.
    pub fn is_started(&self) -> bool {
        self.board != Board::EMPTY
    }

    /// Process one directional input.
    ///
    /// Snapshots board and score first (even if the move turns out to be a
    /// no-op), then slides. A changing move adds its merge score, spawns one
    /// tile and re-checks for game over. Input is rejected without touching
    /// anything once the session is over.
    pub fn attempt<R: Rng + ?Sized>(
        &mut self,
        dir: Move,
        policy: &SpawnPolicy,
        rng: &mut R,
    ) -> MoveReport {
        if self.game_over {
            return MoveReport {
                outcome: attempt_move(self.board, dir),
                spawn: None,
                entered_game_over: false,
                rejected: true,
            };
        }

        self.previous_board = self.board;
        self.previous_score = self.score;

        let outcome = attempt_move(self.board, dir);
        debug!(?dir, changed = outcome.changed, score_delta = outcome.score_delta, "move attempt");
        if !outcome.changed {
            return MoveReport { outcome, spawn: None, entered_game_over: false, rejected: false };
        }

        self.board = outcome.board;
        self.score = self.score.saturating_add(outcome.score_delta);
        let spawn = self.spawn(policy, rng);
        MoveReport { outcome, spawn, entered_game_over: self.game_over, rejected: false }
    }

    /// Restore the snapshot taken before the last move attempt.
    ///
    /// Returns false when there is nothing different to restore.
    pub fn undo(&mut self) -> bool {
        if self.previous_board == Board::EMPTY
            || (self.previous_board == self.board && self.previous_score == self.score)
        {
            return false;
        }
        self.board = self.previous_board;
        self.score = self.previous_score;
        self.game_over = !self.board.can_move();
        true
    }

    fn spawn<R: Rng + ?Sized>(&mut self, policy: &SpawnPolicy, rng: &mut R) -> Option<Spawn> {
        let (board, spawn) = policy.spawn(self.board, rng);
        self.board = board;
        if !self.board.can_move() {
            self.game_over = true;
        }
        spawn
    }
}
