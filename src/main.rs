use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use game_2048::config::{BestScorePolicy, GameConfig};
use game_2048::engine::Move;
use game_2048::game::{Command, Game, Mode, Outcome, Phase, Player};
use game_2048::{App, Presenter, SoundCue};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "game-2048",
    version,
    about = "Play 2048 in the terminal, alone or two players on one keyboard"
)]
struct Cli {
    /// TOML config file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Save file location (overrides the config file)
    #[arg(long = "save", value_name = "FILE")]
    save: Option<PathBuf>,
    /// Seed for a reproducible tile sequence
    #[arg(long)]
    seed: Option<u64>,
    /// Who may raise the best score
    #[arg(long = "best-score", value_enum)]
    best_score: Option<BestScorePolicy>,
    /// Ignore any existing save and start from the menu
    #[arg(long)]
    fresh: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<(GameConfig, bool)> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        if let Some(save) = self.save {
            config.save_path = save;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(policy) = self.best_score {
            config.best_score_policy = policy;
        }
        config.validate()?;
        Ok((config, self.fresh))
    }
}

enum Input {
    Command(Command),
    Quit,
}

/// Player 1 plays on W/A/S/D, player 2 on I/J/K/L. In single-player mode both drive the one board.
fn key_input(key: char) -> Option<Input> {
    let cmd = match key.to_ascii_lowercase() {
        'w' => Command::Move(Player::One, Move::Up),
        'a' => Command::Move(Player::One, Move::Left),
        's' => Command::Move(Player::One, Move::Down),
        'd' => Command::Move(Player::One, Move::Right),
        'i' => Command::Move(Player::Two, Move::Up),
        'j' => Command::Move(Player::Two, Move::Left),
        'k' => Command::Move(Player::Two, Move::Down),
        'l' => Command::Move(Player::Two, Move::Right),
        'u' => Command::Undo(Player::One),
        'o' => Command::Undo(Player::Two),
        '1' => Command::Play(Mode::Single),
        '2' => Command::Play(Mode::Multi),
        'n' => Command::NewGame,
        'b' | 'm' => Command::Back,
        'q' => return Some(Input::Quit),
        _ => return None,
    };
    Some(Input::Command(cmd))
}

struct Terminal<W: Write> {
    out: W,
}

impl<W: Write> Terminal<W> {
    fn draw(&mut self, game: &Game) -> io::Result<()> {
        let out = &mut self.out;
        match game.phase() {
            Phase::Menu => {
                writeln!(out, "\n== 2048 ==   best: {}", game.best_score())?;
                writeln!(out, "[1] single player   [2] two players   [q] quit")?;
            }
            phase => {
                writeln!(out, "\nbest: {}   [n] new game  [b] menu  [q] quit", game.best_score())?;
                let labels = ["P1 (WASD, undo U)", "P2 (IJKL, undo O)"];
                for (session, label) in game.active_sessions().iter().zip(labels) {
                    let label = if game.mode() == Mode::Single {
                        "you (WASD or IJKL, undo U)"
                    } else {
                        label
                    };
                    writeln!(out, "\n{label}   score: {}", session.score())?;
                    write!(out, "{}", session.board())?;
                    if session.is_game_over() {
                        writeln!(out, "-- no moves left --")?;
                    }
                }
                if phase == Phase::GameOver {
                    match game.winner() {
                        Some(Outcome::Winner(Player::One)) => writeln!(out, "\nPlayer 1 wins!")?,
                        Some(Outcome::Winner(Player::Two)) => writeln!(out, "\nPlayer 2 wins!")?,
                        Some(Outcome::Draw) => writeln!(out, "\nIt's a tie!")?,
                        None => writeln!(out, "\nGame over.")?,
                    }
                }
            }
        }
        write!(out, "> ")?;
        out.flush()
    }

    fn bell(&mut self) -> io::Result<()> {
        self.out.write_all(b"\x07")?;
        self.out.flush()
    }
}

impl<W: Write> Presenter for Terminal<W> {
    fn render(&mut self, game: &Game) {
        if let Err(e) = self.draw(game) {
            tracing::warn!(error = %e, "render failed");
        }
    }

    fn play(&mut self, cue: SoundCue) {
        // Terminal bell stands in for the merge and game-over sounds.
        if matches!(cue, SoundCue::Merge | SoundCue::GameOver) {
            if let Err(e) = self.bell() {
                tracing::warn!(error = %e, ?cue, "bell failed");
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let (config, fresh) = Cli::parse().into_config()?;
    info!(save = %config.save_path.display(), "starting");

    let terminal = Terminal { out: io::stdout() };
    let mut app = if fresh {
        App::start_fresh(&config, terminal)
    } else {
        App::start(&config, terminal)
    };

    let stdin = io::stdin();
    'events: for line in stdin.lock().lines() {
        for key in line?.chars() {
            match key_input(key) {
                Some(Input::Command(cmd)) => {
                    app.dispatch(cmd);
                }
                Some(Input::Quit) => break 'events,
                None => {}
            }
        }
    }

    // Dropping the context writes the final save.
    drop(app);
    info!("bye");
    Ok(())
}
