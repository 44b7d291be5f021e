use rand::Rng;
use std::fmt;

/// Side length of every board.
pub const GRID_SIZE: usize = 4;

/// Number of cells on a board.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

pub type Tile = u32;
pub type Score = u32;

/// Largest tile a cell can hold.
pub const MAX_TILE: Tile = 1 << 31;

type Line = [Tile; GRID_SIZE];

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Map a raw `(dx, dy)` input vector onto a cardinal direction.
    ///
    /// Screen coordinates: `dy < 0` is up. The zero vector and diagonals have
    /// no direction and yield `None`, which callers treat as a no-op.
    ///
    /// ```
    /// use game_2048::engine::Move;
    /// assert_eq!(Move::from_delta(-1, 0), Some(Move::Left));
    /// assert_eq!(Move::from_delta(0, 1), Some(Move::Down));
    /// assert_eq!(Move::from_delta(0, 0), None);
    /// ```
    pub fn from_delta(dx: i32, dy: i32) -> Option<Move> {
        match (dx.signum(), dy.signum()) {
            (-1, 0) => Some(Move::Left),
            (1, 0) => Some(Move::Right),
            (0, -1) => Some(Move::Up),
            (0, 1) => Some(Move::Down),
            _ => None,
        }
    }
}

/// A 4x4 board of tile values; `0` marks an empty cell.
///
/// Boards are plain values. The only ways to obtain a different board are
/// [`attempt_move`] (slide/merge) and [`SpawnPolicy::spawn`] (new tile).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board([[Tile; GRID_SIZE]; GRID_SIZE]);

impl Board {
    /// A constant empty board (all zeros).
    pub const EMPTY: Board = Board([[0; GRID_SIZE]; GRID_SIZE]);

    /// Construct a board from row-major rows.
    #[inline]
    pub fn from_rows(rows: [[Tile; GRID_SIZE]; GRID_SIZE]) -> Self {
        Board(rows)
    }

    /// Construct a board from a flat row-major cell array.
    pub fn from_cells(cells: [Tile; CELL_COUNT]) -> Self {
        let mut rows = [[0; GRID_SIZE]; GRID_SIZE];
        for (idx, &tile) in cells.iter().enumerate() {
            rows[idx / GRID_SIZE][idx % GRID_SIZE] = tile;
        }
        Board(rows)
    }

    /// Flatten into a row-major cell array.
    pub fn to_cells(self) -> [Tile; CELL_COUNT] {
        let mut cells = [0; CELL_COUNT];
        for (idx, tile) in self.tiles().enumerate() {
            cells[idx] = tile;
        }
        cells
    }

    #[inline]
    pub fn rows(&self) -> &[[Tile; GRID_SIZE]; GRID_SIZE] {
        &self.0
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Tile {
        self.0[row][col]
    }

    /// Iterate over all cell values in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        self.0.iter().flat_map(|row| row.iter().copied())
    }

    /// True if every nonzero tile is a power of two no smaller than 2.
    pub fn is_well_formed(&self) -> bool {
        self.tiles().all(is_valid_tile)
    }

    /// True if any cell is empty or two orthogonal neighbours hold the same value.
    ///
    /// Scans the whole board on every call.
    ///
    /// ```
    /// use game_2048::engine::Board;
    /// assert!(Board::EMPTY.can_move());
    /// let stuck = Board::from_rows([[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
    /// assert!(!stuck.can_move());
    /// ```
    pub fn can_move(&self) -> bool {
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let tile = self.0[row][col];
                if tile == 0 {
                    return true;
                }
                if row + 1 < GRID_SIZE && merges_with(tile, self.0[row + 1][col]) {
                    return true;
                }
                if col + 1 < GRID_SIZE && merges_with(tile, self.0[row][col + 1]) {
                    return true;
                }
            }
        }
        false
    }

    /// True if no legal moves remain.
    #[inline]
    pub fn is_game_over(&self) -> bool {
        !self.can_move()
    }

    /// Count the number of empty cells on the board.
    pub fn count_empty(&self) -> usize {
        self.tiles().filter(|&t| t == 0).count()
    }

    /// Return the highest tile value present on the board (0 when empty).
    pub fn highest_tile(&self) -> Tile {
        self.tiles().max().unwrap_or(0)
    }

    /// Sum of all tile values.
    pub fn tile_sum(&self) -> u64 {
        self.tiles().map(u64::from).sum()
    }

    /// Positions of all empty cells, row-major.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        let mut cells = Vec::with_capacity(CELL_COUNT);
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                if self.0[row][col] == 0 {
                    cells.push((row, col));
                }
            }
        }
        cells
    }

    /// Slide/merge tiles in `dir` and report the result (no random insert).
    #[inline]
    pub fn attempt(self, dir: Move) -> MoveOutcome {
        attempt_move(self, dir)
    }

    /// Return the board resulting from sliding/merging tiles in `dir`.
    ///
    /// ```
    /// use game_2048::engine::{Board, Move};
    /// let b = Board::from_rows([[0, 0, 0, 0], [2, 2, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
    /// assert_eq!(b.shift(Move::Left).get(1, 0), 4);
    /// ```
    #[inline]
    pub fn shift(self, dir: Move) -> Self {
        attempt_move(self, dir).board
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a random empty slot, using the provided RNG.
    ///
    /// ```
    /// use game_2048::engine::Board;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let b = Board::EMPTY.with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(b.count_empty(), 14);
    /// ```
    #[inline]
    pub fn with_random_tile<R: Rng + ?Sized>(self, rng: &mut R) -> Self {
        SpawnPolicy::default().spawn(self, rng).0
    }

    /// Perform a move then insert a random tile if the move changed the board.
    pub fn make_move<R: Rng + ?Sized>(self, dir: Move, rng: &mut R) -> Self {
        let outcome = attempt_move(self, dir);
        if outcome.changed {
            outcome.board.with_random_tile(rng)
        } else {
            self
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:?})", self.0)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = "-".repeat(GRID_SIZE * 8 - 1);
        for (idx, row) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f, "{separator}")?;
            }
            let cells: Vec<String> = row.iter().map(|&t| format_val(t)).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

/// Result of sliding a board in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The board after the move; identical to the input when `changed` is false.
    pub board: Board,
    /// Sum of the values produced by merges during this move.
    pub score_delta: Score,
    /// True if any cell differs from the input board.
    pub changed: bool,
    /// `(row, col)` of every tile produced by a merge, in the new board.
    pub merged: Vec<(usize, usize)>,
}

impl MoveOutcome {
    fn unchanged(board: Board) -> Self {
        MoveOutcome { board, score_delta: 0, changed: false, merged: Vec::new() }
    }
}

/// Slide/merge tiles of `board` toward `dir`. No randomness.
///
/// Each row (horizontal moves) or column (vertical moves) is read in slide
/// order, merged once front to back, and padded with zeros on the far side.
/// A tile takes part in at most one merge per move.
pub fn attempt_move(board: Board, dir: Move) -> MoveOutcome {
    let mut next = board;
    let mut score_delta: Score = 0;
    let mut merged = Vec::new();

    for line_idx in 0..GRID_SIZE {
        let cells = line_cells(dir, line_idx);
        let line = cells.map(|(r, c)| board.0[r][c]);
        let shifted = shift_line(line);
        score_delta = score_delta.saturating_add(shifted.score);
        for (pos, &(r, c)) in cells.iter().enumerate() {
            next.0[r][c] = shifted.tiles[pos];
            if shifted.merged[pos] {
                merged.push((r, c));
            }
        }
    }

    if next == board {
        return MoveOutcome::unchanged(board);
    }
    MoveOutcome { board: next, score_delta, changed: true, merged }
}

/// Coordinates of line `line_idx`, ordered from the edge tiles slide toward.
fn line_cells(dir: Move, line_idx: usize) -> [(usize, usize); GRID_SIZE] {
    let mut cells = [(0, 0); GRID_SIZE];
    for (pos, cell) in cells.iter_mut().enumerate() {
        let far = GRID_SIZE - 1 - pos;
        *cell = match dir {
            Move::Left => (line_idx, pos),
            Move::Right => (line_idx, far),
            Move::Up => (pos, line_idx),
            Move::Down => (far, line_idx),
        };
    }
    cells
}

struct ShiftedLine {
    tiles: Line,
    score: Score,
    merged: [bool; GRID_SIZE],
}

fn shift_line(line: Line) -> ShiftedLine {
    let mut tiles = [0; GRID_SIZE];
    let mut merged = [false; GRID_SIZE];
    let mut score: Score = 0;
    let mut len = 0;
    // The last written tile may absorb the next one only if it is not itself a merge product.
    let mut open = false;
    for tile in line.into_iter().filter(|&t| t != 0) {
        if open && merges_with(tiles[len - 1], tile) {
            let doubled = tile * 2;
            tiles[len - 1] = doubled;
            merged[len - 1] = true;
            score = score.saturating_add(doubled);
            open = false;
        } else {
            tiles[len] = tile;
            len += 1;
            open = true;
        }
    }
    ShiftedLine { tiles, score, merged }
}

/// Where and what the spawn policy placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub row: usize,
    pub col: usize,
    pub value: Tile,
}

/// Chooses where and what new tile appears after a successful move.
///
/// The cell is uniform over all empty cells; the value is 4 with
/// `four_probability` and 2 otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPolicy {
    four_probability: f64,
}

impl SpawnPolicy {
    pub const DEFAULT_FOUR_PROBABILITY: f64 = 0.1;

    /// Build a policy; out-of-range probabilities are clamped to `[0, 1]`
    /// and NaN falls back to the default.
    pub fn new(four_probability: f64) -> Self {
        let four_probability = if four_probability.is_nan() {
            Self::DEFAULT_FOUR_PROBABILITY
        } else {
            four_probability.clamp(0.0, 1.0)
        };
        SpawnPolicy { four_probability }
    }

    #[inline]
    pub fn four_probability(&self) -> f64 {
        self.four_probability
    }

    /// Place one tile into a random empty cell. A full board is returned untouched with `None`.
    pub fn spawn<R: Rng + ?Sized>(&self, board: Board, rng: &mut R) -> (Board, Option<Spawn>) {
        let empty = board.empty_cells();
        if empty.is_empty() {
            return (board, None);
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        let value = self.generate_tile(rng);
        let mut next = board;
        next.0[row][col] = value;
        (next, Some(Spawn { row, col, value }))
    }

    fn generate_tile<R: Rng + ?Sized>(&self, rng: &mut R) -> Tile {
        if rng.gen_bool(self.four_probability) {
            4
        } else {
            2
        }
    }
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        SpawnPolicy { four_probability: Self::DEFAULT_FOUR_PROBABILITY }
    }
}

/// Zero, or a power of two no smaller than 2.
#[inline]
pub fn is_valid_tile(tile: Tile) -> bool {
    tile == 0 || (tile >= 2 && tile.is_power_of_two())
}

/// Equal non-empty tiles merge, except at [`MAX_TILE`] where the sum would not fit.
#[inline]
fn merges_with(a: Tile, b: Tile) -> bool {
    a == b && a != 0 && a < MAX_TILE
}

fn format_val(val: Tile) -> String {
    match val {
        0 => String::from("       "),
        x => format!("{:^7}", x),
    }
}
