//! Application state: menu/playing screens, one or two sessions and the best score.
//!
//! ```
//! use game_2048::engine::{Move, SpawnPolicy};
//! use game_2048::game::{Command, Game, Mode, Phase, Player};
//! use game_2048::config::BestScorePolicy;
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(3);
//! let mut game = Game::new(SpawnPolicy::default(), BestScorePolicy::Shared);
//! assert_eq!(game.phase(), Phase::Menu);
//!
//! game.handle(Command::Play(Mode::Multi), &mut rng);
//! assert_eq!(game.phase(), Phase::Playing);
//! game.handle(Command::Move(Player::Two, Move::Left), &mut rng);
//! assert!(game.winner().is_none());
//! ```

use rand::Rng;
use tracing::{debug, info};

use crate::config::BestScorePolicy;
use crate::engine::{Move, Score, SpawnPolicy};
use crate::persistence::SaveRecord;
use crate::session::{MoveReport, Session, SoundCue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Player {
    One,
    Two,
}

impl Player {
    #[inline]
    fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

/// Where the game as a whole stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Menu,
    Playing,
    /// Every active session is out of moves; only navigation is accepted.
    GameOver,
}

/// Result of a finished two-player game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Winner(Player),
    Draw,
}

/// Input from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Slide one player's board. In single-player mode either player drives the only board.
    Move(Player, Move),
    /// Leave the menu in `Mode`, resuming stored boards unless this is the first game.
    Play(Mode),
    /// Throw away the current boards of the active mode and deal fresh ones.
    NewGame,
    /// Return to the menu, keeping all boards.
    Back,
    /// Restore the board from before that player's last move attempt.
    Undo(Player),
}

/// What a command did, for the caller to act on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// State changed in a way that must be written to the save record.
    pub persist: bool,
    pub cue: Option<SoundCue>,
    /// Set for `Command::Move` that reached a session.
    pub report: Option<MoveReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    in_menu: bool,
    first_game: bool,
    mode: Mode,
    sessions: [Session; 2],
    best_score: Score,
    policy: SpawnPolicy,
    best_policy: BestScorePolicy,
}

impl Game {
    /// The state of a first launch: menu shown, no boards dealt.
    pub fn new(policy: SpawnPolicy, best_policy: BestScorePolicy) -> Self {
        Game {
            in_menu: true,
            first_game: true,
            mode: Mode::Single,
            sessions: [Session::empty(), Session::empty()],
            best_score: 0,
            policy,
            best_policy,
        }
    }

    /// Rebuild from a decoded save record.
    pub fn from_record(
        record: &SaveRecord,
        policy: SpawnPolicy,
        best_policy: BestScorePolicy,
    ) -> Self {
        let one = Session::from_parts(
            record.board,
            record.score,
            record.previous_board,
            record.previous_score,
            record.game_over,
        );
        let two = Session::from_parts(
            record.board2,
            record.score2,
            record.previous_board2,
            record.previous_score2,
            record.game_over2,
        );
        Game {
            in_menu: record.in_menu,
            first_game: record.first_game,
            mode: if record.is_multiplayer { Mode::Multi } else { Mode::Single },
            sessions: [one, two],
            best_score: record.best_score,
            policy,
            best_policy,
        }
    }

    pub fn to_record(&self) -> SaveRecord {
        let [one, two] = &self.sessions;
        SaveRecord {
            in_menu: self.in_menu,
            first_game: self.first_game,
            is_multiplayer: self.mode == Mode::Multi,
            score: one.score(),
            score2: two.score(),
            best_score: self.best_score,
            game_over: one.is_game_over(),
            game_over2: two.is_game_over(),
            board: *one.board(),
            board2: *two.board(),
            previous_board: *one.previous_board(),
            previous_board2: *two.previous_board(),
            previous_score: one.previous_score(),
            previous_score2: two.previous_score(),
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn in_menu(&self) -> bool {
        self.in_menu
    }

    #[inline]
    pub fn is_first_game(&self) -> bool {
        self.first_game
    }

    #[inline]
    pub fn best_score(&self) -> Score {
        self.best_score
    }

    #[inline]
    pub fn session(&self, player: Player) -> &Session {
        &self.sessions[player.index()]
    }

    /// Sessions that take part in the current mode.
    pub fn active_sessions(&self) -> &[Session] {
        match self.mode {
            Mode::Single => &self.sessions[..1],
            Mode::Multi => &self.sessions[..],
        }
    }

    pub fn phase(&self) -> Phase {
        if self.in_menu {
            Phase::Menu
        } else if self.active_sessions().iter().all(Session::is_game_over) {
            Phase::GameOver
        } else {
            Phase::Playing
        }
    }

    /// Winner of a finished two-player game; `None` while either player can still move.
    pub fn winner(&self) -> Option<Outcome> {
        if self.mode != Mode::Multi || self.phase() != Phase::GameOver {
            return None;
        }
        let [one, two] = &self.sessions;
        Some(match one.score().cmp(&two.score()) {
            std::cmp::Ordering::Greater => Outcome::Winner(Player::One),
            std::cmp::Ordering::Less => Outcome::Winner(Player::Two),
            std::cmp::Ordering::Equal => Outcome::Draw,
        })
    }

    pub fn handle<R: Rng + ?Sized>(&mut self, command: Command, rng: &mut R) -> Response {
        match command {
            Command::Move(player, dir) => self.play_move(player, dir, rng),
            Command::Play(mode) => self.play(mode, rng),
            Command::NewGame => self.new_game(rng),
            Command::Back => self.back(),
            Command::Undo(player) => self.undo(player),
        }
    }

    fn target(&self, player: Player) -> usize {
        match self.mode {
            Mode::Single => 0,
            Mode::Multi => player.index(),
        }
    }

    fn play_move<R: Rng + ?Sized>(&mut self, player: Player, dir: Move, rng: &mut R) -> Response {
        if self.in_menu {
            return Response::default();
        }
        let idx = self.target(player);
        let report = self.sessions[idx].attempt(dir, &self.policy, rng);
        if !report.changed() {
            return Response { persist: false, cue: None, report: Some(report) };
        }
        if report.score_delta() > 0 {
            self.raise_best(self.sessions[idx].score());
        }
        if report.entered_game_over {
            info!(?player, score = self.sessions[idx].score(), "session over");
        }
        Response { persist: true, cue: report.cue(), report: Some(report) }
    }

    fn raise_best(&mut self, score: Score) {
        let counts = match self.best_policy {
            BestScorePolicy::Shared => true,
            BestScorePolicy::SinglePlayerOnly => self.mode == Mode::Single,
        };
        if counts && score > self.best_score {
            debug!(best = score, "new best score");
            self.best_score = score;
        }
    }

    fn play<R: Rng + ?Sized>(&mut self, mode: Mode, rng: &mut R) -> Response {
        if !self.in_menu {
            return Response::default();
        }
        self.in_menu = false;
        self.mode = mode;
        if self.first_game {
            self.deal(rng);
            self.first_game = false;
        } else {
            let count = self.active_sessions().len();
            for session in &mut self.sessions[..count] {
                if !session.is_started() {
                    session.reset(&self.policy, rng);
                }
            }
        }
        info!(?mode, "leaving menu");
        Response { persist: true, ..Response::default() }
    }

    fn new_game<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Response {
        self.in_menu = false;
        self.first_game = false;
        self.deal(rng);
        info!(mode = ?self.mode, "new game");
        Response { persist: true, ..Response::default() }
    }

    fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let count = self.active_sessions().len();
        for session in &mut self.sessions[..count] {
            session.reset(&self.policy, rng);
        }
    }

    fn back(&mut self) -> Response {
        if self.in_menu {
            return Response::default();
        }
        self.in_menu = true;
        info!("back to menu");
        Response { persist: true, ..Response::default() }
    }

    fn undo(&mut self, player: Player) -> Response {
        if self.in_menu {
            return Response::default();
        }
        let idx = self.target(player);
        let persist = self.sessions[idx].undo();
        Response { persist, ..Response::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Board;
    use rand::{rngs::StdRng, SeedableRng};

    const STUCK: [[u32; 4]; 4] = [[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]];

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn game() -> Game {
        Game::new(SpawnPolicy::default(), BestScorePolicy::Shared)
    }

    fn playing_record(board: Board, board2: Board, multi: bool) -> SaveRecord {
        SaveRecord {
            in_menu: false,
            first_game: false,
            is_multiplayer: multi,
            board,
            board2,
            ..SaveRecord::default()
        }
    }

    fn single_player(board: Board) -> Game {
        let record = playing_record(board, Board::EMPTY, false);
        Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared)
    }

    #[test]
    fn first_play_deals_fresh_boards() {
        let mut g = game();
        let r = g.handle(Command::Play(Mode::Single), &mut rng());
        assert!(r.persist);
        assert_eq!(g.phase(), Phase::Playing);
        assert!(!g.is_first_game());
        assert_eq!(g.session(Player::One).board().count_empty(), 14);
        assert!(!g.session(Player::Two).is_started());
    }

    #[test]
    fn menu_ignores_moves() {
        let mut g = game();
        let r = g.handle(Command::Move(Player::One, Move::Left), &mut rng());
        assert_eq!(r, Response::default());
        assert_eq!(g.phase(), Phase::Menu);
    }

    #[test]
    fn back_keeps_boards_and_resume_restores_them() {
        let mut rng = rng();
        let mut g = game();
        g.handle(Command::Play(Mode::Single), &mut rng);
        let board = *g.session(Player::One).board();
        assert!(g.handle(Command::Back, &mut rng).persist);
        assert_eq!(g.phase(), Phase::Menu);
        assert!(!g.handle(Command::Back, &mut rng).persist);
        g.handle(Command::Play(Mode::Single), &mut rng);
        assert_eq!(*g.session(Player::One).board(), board);
    }

    #[test]
    fn switching_to_multi_deals_the_second_board_once() {
        let mut rng = rng();
        let mut g = game();
        g.handle(Command::Play(Mode::Single), &mut rng);
        let one = *g.session(Player::One).board();
        g.handle(Command::Back, &mut rng);
        g.handle(Command::Play(Mode::Multi), &mut rng);
        assert_eq!(*g.session(Player::One).board(), one);
        assert!(g.session(Player::Two).is_started());
        assert_eq!(g.active_sessions().len(), 2);
    }

    #[test]
    fn changing_move_raises_best_and_persists() {
        let start = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut g = single_player(start);
        let r = g.handle(Command::Move(Player::One, Move::Left), &mut rng());
        assert!(r.persist);
        assert_eq!(r.cue, Some(SoundCue::Merge));
        assert_eq!(g.session(Player::One).score(), 4);
        assert_eq!(g.best_score(), 4);
    }

    #[test]
    fn noop_move_is_not_persisted() {
        let start = Board::from_rows([[2, 4, 2, 4], [0; 4], [0; 4], [0; 4]]);
        let mut g = single_player(start);
        let r = g.handle(Command::Move(Player::One, Move::Left), &mut rng());
        assert!(!r.persist);
        assert_eq!(r.cue, None);
        assert!(!r.report.unwrap().changed());
    }

    #[test]
    fn decoded_extreme_save_keeps_playing() {
        use crate::engine::MAX_TILE;
        use crate::persistence::{encode_record, parse_record_bytes};

        let record = SaveRecord {
            score: Score::MAX - 1,
            best_score: Score::MAX - 1,
            ..playing_record(
                Board::from_rows([[MAX_TILE, MAX_TILE, 0, 0], [2, 2, 0, 0], [0; 4], [0; 4]]),
                Board::EMPTY,
                false,
            )
        };
        let decoded = parse_record_bytes(&encode_record(&record)).unwrap();
        let mut g = Game::from_record(&decoded, SpawnPolicy::default(), BestScorePolicy::Shared);
        let r = g.handle(Command::Move(Player::One, Move::Left), &mut rng());
        assert!(r.persist);
        let session = g.session(Player::One);
        assert_eq!(session.board().get(0, 0), MAX_TILE);
        assert_eq!(session.board().get(0, 1), MAX_TILE);
        assert_eq!(session.board().get(1, 0), 4);
        assert_eq!(session.score(), Score::MAX);
        assert_eq!(g.best_score(), Score::MAX);
    }

    #[test]
    fn best_score_never_drops_on_new_game() {
        let record = SaveRecord {
            best_score: 900,
            ..playing_record(Board::from_rows(STUCK), Board::EMPTY, false)
        };
        let mut g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        g.handle(Command::NewGame, &mut rng());
        assert_eq!(g.best_score(), 900);
        assert_eq!(g.session(Player::One).score(), 0);
    }

    #[test]
    fn best_score_policy_in_multiplayer() {
        let start = Board::from_rows([[4, 4, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let cases = [(BestScorePolicy::Shared, 8), (BestScorePolicy::SinglePlayerOnly, 0)];
        for (policy, expected) in cases {
            let record = playing_record(start, start, true);
            let mut g = Game::from_record(&record, SpawnPolicy::default(), policy);
            g.handle(Command::Move(Player::Two, Move::Left), &mut rng());
            assert_eq!(g.session(Player::Two).score(), 8);
            assert_eq!(g.session(Player::One).score(), 0);
            assert_eq!(g.best_score(), expected);
        }
    }

    #[test]
    fn single_mode_routes_both_key_sets_to_one_board() {
        let start = Board::from_rows([[0, 0, 0, 2], [0; 4], [0; 4], [0; 4]]);
        let mut g = single_player(start);
        let r = g.handle(Command::Move(Player::Two, Move::Left), &mut rng());
        assert!(r.persist);
        assert_eq!(g.session(Player::One).board().get(0, 0), 2);
        assert!(!g.session(Player::Two).is_started());
    }

    #[test]
    fn multiplayer_winner_needs_both_sessions_over() {
        let stuck = Board::from_rows(STUCK);
        let mut record = playing_record(stuck, stuck, true);
        record.game_over = true;
        record.score = 300;
        record.score2 = 200;
        let g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(g.phase(), Phase::Playing);
        assert_eq!(g.winner(), None);

        record.game_over2 = true;
        let g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(g.phase(), Phase::GameOver);
        assert_eq!(g.winner(), Some(Outcome::Winner(Player::One)));

        record.score2 = 301;
        let g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(g.winner(), Some(Outcome::Winner(Player::Two)));

        record.score2 = 300;
        let g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(g.winner(), Some(Outcome::Draw));
    }

    #[test]
    fn game_over_rejects_moves_but_allows_navigation() {
        let mut record = playing_record(Board::from_rows(STUCK), Board::EMPTY, false);
        record.game_over = true;
        let mut g = Game::from_record(&record, SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(g.phase(), Phase::GameOver);
        let r = g.handle(Command::Move(Player::One, Move::Up), &mut rng());
        assert!(r.report.unwrap().rejected);
        assert!(!r.persist);
        assert!(g.handle(Command::Back, &mut rng()).persist);
        assert_eq!(g.phase(), Phase::Menu);
        g.handle(Command::NewGame, &mut rng());
        assert_eq!(g.phase(), Phase::Playing);
    }

    #[test]
    fn undo_reverts_the_last_move() {
        let start = Board::from_rows([[2, 2, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let mut g = single_player(start);
        g.handle(Command::Move(Player::One, Move::Left), &mut rng());
        assert!(g.handle(Command::Undo(Player::One), &mut rng()).persist);
        assert_eq!(*g.session(Player::One).board(), start);
        assert_eq!(g.session(Player::One).score(), 0);
        assert_eq!(g.best_score(), 4);
    }

    #[test]
    fn record_round_trip_preserves_state() {
        let mut rng = rng();
        let mut g = game();
        g.handle(Command::Play(Mode::Multi), &mut rng);
        for dir in [Move::Left, Move::Up, Move::Right, Move::Down] {
            g.handle(Command::Move(Player::One, dir), &mut rng);
            g.handle(Command::Move(Player::Two, dir), &mut rng);
        }
        let back =
            Game::from_record(&g.to_record(), SpawnPolicy::default(), BestScorePolicy::Shared);
        assert_eq!(back, g);
    }
}
