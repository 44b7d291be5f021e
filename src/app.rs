//! Application context: owns the game, its save file, the RNG and the presenter.
//!
//! Every input runs one cycle: transition, persist when needed, play the cue,
//! render. The state is written once more when the context is dropped, so an
//! early return or a panic unwinding through the event loop still saves.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::game::{Command, Game, Response};
use crate::persistence::{self, PersistError};
use crate::session::SoundCue;

/// The presentation layer, as seen from the core.
pub trait Presenter {
    fn render(&mut self, game: &Game);
    fn play(&mut self, cue: SoundCue);
}

/// A presenter that draws and plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Presenter for Headless {
    fn render(&mut self, _game: &Game) {}
    fn play(&mut self, _cue: SoundCue) {}
}

pub struct App<P: Presenter> {
    game: Game,
    save_path: PathBuf,
    rng: StdRng,
    presenter: P,
}

impl<P: Presenter> App<P> {
    /// Build the context, resuming from the save file when it decodes cleanly.
    ///
    /// A missing, truncated or corrupt save yields a brand-new game.
    pub fn start(config: &GameConfig, presenter: P) -> Self {
        let game = load_or_default(config);
        let mut app = App {
            game,
            save_path: config.save_path.clone(),
            rng: config.rng(),
            presenter,
        };
        app.presenter.render(&app.game);
        app
    }

    /// Like [`App::start`] but ignores any existing save.
    pub fn start_fresh(config: &GameConfig, presenter: P) -> Self {
        let game = Game::new(config.spawn_policy(), config.best_score_policy);
        let mut app = App {
            game,
            save_path: config.save_path.clone(),
            rng: config.rng(),
            presenter,
        };
        app.presenter.render(&app.game);
        app
    }

    #[inline]
    pub fn game(&self) -> &Game {
        &self.game
    }

    #[inline]
    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    #[inline]
    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    #[inline]
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    pub fn dispatch(&mut self, command: Command) -> Response {
        let response = self.game.handle(command, &mut self.rng);
        if response.persist {
            self.save();
        }
        if let Some(cue) = response.cue {
            self.presenter.play(cue);
        }
        self.presenter.render(&self.game);
        response
    }

    /// Write the current state. Failures are logged and dropped.
    pub fn save(&self) -> bool {
        match persistence::write_record_to_path(&self.save_path, &self.game.to_record()) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.save_path.display(), error = %e, "save failed");
                false
            }
        }
    }
}

impl<P: Presenter> Drop for App<P> {
    fn drop(&mut self) {
        self.save();
    }
}

fn load_or_default(config: &GameConfig) -> Game {
    let policy = config.spawn_policy();
    match persistence::read_record_from_path(&config.save_path) {
        Ok(record) => {
            info!(path = %config.save_path.display(), "save loaded");
            Game::from_record(&record, policy, config.best_score_policy)
        }
        Err(e) => {
            log_load_failure(&config.save_path, &e);
            Game::new(policy, config.best_score_policy)
        }
    }
}

fn log_load_failure(path: &Path, e: &PersistError) {
    if e.is_missing() {
        info!(path = %path.display(), "no save found, starting fresh");
    } else {
        warn!(path = %path.display(), error = %e, "save unreadable, starting fresh");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Board, Move};
    use crate::game::{Mode, Phase, Player};
    use crate::persistence::SaveRecord;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        frames: usize,
        cues: Vec<SoundCue>,
    }

    impl Presenter for Recorder {
        fn render(&mut self, _game: &Game) {
            self.frames += 1;
        }
        fn play(&mut self, cue: SoundCue) {
            self.cues.push(cue);
        }
    }

    fn config(dir: &Path) -> GameConfig {
        GameConfig { save_path: dir.join("save.dat"), seed: Some(2048), ..GameConfig::default() }
    }

    #[test]
    fn missing_save_starts_in_menu() {
        let dir = tempdir().unwrap();
        let app = App::start(&config(dir.path()), Recorder::default());
        assert_eq!(app.game().phase(), Phase::Menu);
        assert!(app.game().is_first_game());
        assert_eq!(app.presenter().frames, 1);
    }

    #[test]
    fn corrupt_save_starts_fresh() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        fs::write(&cfg.save_path, b"not a save file").unwrap();
        let app = App::start(&cfg, Headless);
        assert_eq!(*app.game(), Game::new(cfg.spawn_policy(), cfg.best_score_policy));
    }

    #[test]
    fn state_survives_a_restart() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let snapshot = {
            let mut app = App::start(&cfg, Recorder::default());
            assert!(app.dispatch(Command::Play(Mode::Multi)).persist);
            for mv in Move::ALL {
                app.dispatch(Command::Move(Player::One, mv));
                app.dispatch(Command::Move(Player::Two, mv));
            }
            assert!(app.presenter().frames >= 9);
            app.game().clone()
        };
        let app = App::start(&cfg, Headless);
        assert_eq!(*app.game(), snapshot);
        assert_eq!(app.game().phase(), Phase::Playing);
    }

    #[test]
    fn moves_play_cues_and_menu_round_trip_persists() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let mut app = App::start(&cfg, Recorder::default());
        app.dispatch(Command::Play(Mode::Single));
        let mut changed = 0;
        for &mv in Move::ALL.iter().cycle().take(12) {
            if app.dispatch(Command::Move(Player::One, mv)).persist {
                changed += 1;
            }
        }
        assert_eq!(app.presenter().cues.len(), changed);
        app.dispatch(Command::Back);
        let on_disk = persistence::read_record_from_path(&cfg.save_path).unwrap();
        assert!(on_disk.in_menu);
        assert_eq!(on_disk, app.game().to_record());
    }

    #[test]
    fn dropping_the_app_saves_unpersisted_state() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        let start = SaveRecord {
            in_menu: false,
            first_game: false,
            score: 12,
            best_score: 12,
            board: Board::from_rows([[2, 4, 2, 4], [0; 4], [0; 4], [0; 4]]),
            ..SaveRecord::default()
        };
        persistence::write_record_to_path(&cfg.save_path, &start).unwrap();

        let mut app = App::start(&cfg, Headless);
        let r = app.dispatch(Command::Move(Player::One, Move::Left));
        assert!(!r.persist);
        let expected = app.game().to_record();
        assert_ne!(expected, start);
        assert_eq!(persistence::read_record_from_path(&cfg.save_path).unwrap(), start);

        drop(app);
        assert_eq!(persistence::read_record_from_path(&cfg.save_path).unwrap(), expected);
    }

    #[test]
    fn fresh_start_ignores_existing_save() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path());
        {
            let mut app = App::start(&cfg, Headless);
            app.dispatch(Command::Play(Mode::Single));
        }
        let app = App::start_fresh(&cfg, Headless);
        assert!(app.game().is_first_game());
    }

    #[test]
    fn unwritable_save_path_is_not_fatal() {
        let dir = tempdir().unwrap();
        let cfg = GameConfig {
            save_path: dir.path().join("nope").join("save.dat"),
            ..config(dir.path())
        };
        let mut app = App::start(&cfg, Headless);
        let r = app.dispatch(Command::Play(Mode::Single));
        assert!(r.persist);
        assert!(!app.save());
        assert_eq!(app.game().phase(), Phase::Playing);
    }
}
