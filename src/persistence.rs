//! Fixed-layout binary save record.
//!
//! Layout (all integers little-endian):
//!
//! | field | size |
//! |---|---|
//! | magic `A2SV` | 4 |
//! | version, endianness | 1 + 1 |
//! | in_menu, first_game, is_multiplayer | 1 + 1 + 1 |
//! | score, score2, best_score | 4 × 3 |
//! | game_over, game_over2 | 1 + 1 |
//! | board, board2, previous_board, previous_board2 | 64 × 4 |
//! | previous_score, previous_score2 | 4 × 2 |
//! | CRC32C of everything above | 4 |
//!
//! Decoding is all-or-nothing: any short read, bad flag byte, invalid tile or
//! checksum mismatch fails the whole record.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::engine::{is_valid_tile, Board, Score, Tile, CELL_COUNT};

const MAGIC: &[u8; 4] = b"A2SV";
const VERSION: u8 = 1;
const ENDIAN_LE: u8 = 0; // 0 = little-endian

const HEADER_LEN: usize = 4 + 1 + 1;
const BOARD_LEN: usize = CELL_COUNT * 4;
const BODY_LEN: usize = 3 + 4 * 3 + 2 + BOARD_LEN * 4 + 4 * 2;

/// Exact size of an encoded record, checksum included.
pub const RECORD_LEN: usize = HEADER_LEN + BODY_LEN + 4;

/// Everything that survives a restart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SaveRecord {
    pub in_menu: bool,
    pub first_game: bool,
    pub is_multiplayer: bool,
    pub score: Score,
    pub score2: Score,
    pub best_score: Score,
    pub game_over: bool,
    pub game_over2: bool,
    pub board: Board,
    pub board2: Board,
    pub previous_board: Board,
    pub previous_board2: Board,
    pub previous_score: Score,
    pub previous_score2: Score,
}

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid magic or version")]
    MagicOrVersion,
    #[error("unsupported endianness")]
    Endianness,
    #[error("file too short or malformed")]
    Malformed,
    #[error("checksum mismatch")]
    Checksum,
    #[error("invalid tile {value} at cell {index}")]
    InvalidTile { index: usize, value: Tile },
}

impl PersistError {
    /// True when the record simply does not exist yet.
    pub fn is_missing(&self) -> bool {
        matches!(self, PersistError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

#[inline]
fn read_u32_le(bytes: &[u8]) -> Option<u32> {
    if bytes.len() < 4 {
        return None;
    }
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
fn read_bool(byte: u8) -> Result<bool, PersistError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(PersistError::Malformed),
    }
}

fn put_board(buf: &mut Vec<u8>, board: &Board) {
    for tile in board.tiles() {
        buf.extend_from_slice(&tile.to_le_bytes());
    }
}

pub fn encode_record(record: &SaveRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_LEN);

    // Header
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.push(ENDIAN_LE);

    // Body, in fixed field order
    buf.push(record.in_menu as u8);
    buf.push(record.first_game as u8);
    buf.push(record.is_multiplayer as u8);
    buf.extend_from_slice(&record.score.to_le_bytes());
    buf.extend_from_slice(&record.score2.to_le_bytes());
    buf.extend_from_slice(&record.best_score.to_le_bytes());
    buf.push(record.game_over as u8);
    buf.push(record.game_over2 as u8);
    put_board(&mut buf, &record.board);
    put_board(&mut buf, &record.board2);
    put_board(&mut buf, &record.previous_board);
    put_board(&mut buf, &record.previous_board2);
    buf.extend_from_slice(&record.previous_score.to_le_bytes());
    buf.extend_from_slice(&record.previous_score2.to_le_bytes());

    // Trailer: CRC32C of all preceding bytes
    let checksum = crc32c::crc32c(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    debug_assert_eq!(buf.len(), RECORD_LEN);
    buf
}

/// Sequential reader over the record body.
struct Cursor<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8, PersistError> {
        let b = *self.bytes.get(self.off).ok_or(PersistError::Malformed)?;
        self.off += 1;
        Ok(b)
    }

    fn flag(&mut self) -> Result<bool, PersistError> {
        read_bool(self.byte()?)
    }

    fn u32(&mut self) -> Result<u32, PersistError> {
        let rest = self.bytes.get(self.off..).unwrap_or(&[]);
        let v = read_u32_le(rest).ok_or(PersistError::Malformed)?;
        self.off += 4;
        Ok(v)
    }

    fn board(&mut self, cell_base: usize) -> Result<Board, PersistError> {
        let mut cells = [0; CELL_COUNT];
        for (i, cell) in cells.iter_mut().enumerate() {
            let value = self.u32()?;
            if !is_valid_tile(value) {
                return Err(PersistError::InvalidTile { index: cell_base + i, value });
            }
            *cell = value;
        }
        Ok(Board::from_cells(cells))
    }
}

pub fn parse_record_bytes(bytes: &[u8]) -> Result<SaveRecord, PersistError> {
    if bytes.len() != RECORD_LEN {
        return Err(PersistError::Malformed);
    }

    // Validate checksum first to avoid panics while reading fields
    let (content, trailer) = bytes.split_at(bytes.len() - 4);
    let file_crc = read_u32_le(trailer).ok_or(PersistError::Malformed)?;
    if file_crc != crc32c::crc32c(content) {
        return Err(PersistError::Checksum);
    }

    // Fixed header
    if &content[..4] != MAGIC || content[4] != VERSION {
        return Err(PersistError::MagicOrVersion);
    }
    if content[5] != ENDIAN_LE {
        return Err(PersistError::Endianness);
    }

    let mut cur = Cursor { bytes: content, off: HEADER_LEN };
    let in_menu = cur.flag()?;
    let first_game = cur.flag()?;
    let is_multiplayer = cur.flag()?;
    let score = cur.u32()?;
    let score2 = cur.u32()?;
    let best_score = cur.u32()?;
    let game_over = cur.flag()?;
    let game_over2 = cur.flag()?;
    let board = cur.board(0)?;
    let board2 = cur.board(CELL_COUNT)?;
    let previous_board = cur.board(CELL_COUNT * 2)?;
    let previous_board2 = cur.board(CELL_COUNT * 3)?;
    let previous_score = cur.u32()?;
    let previous_score2 = cur.u32()?;

    Ok(SaveRecord {
        in_menu,
        first_game,
        is_multiplayer,
        score,
        score2,
        best_score,
        game_over,
        game_over2,
        board,
        board2,
        previous_board,
        previous_board2,
        previous_score,
        previous_score2,
    })
}

/// Write the record to a sibling temp file, then rename it over `path`.
///
/// The previous save stays intact unless the new one is complete.
pub fn write_record_to_path<P: AsRef<Path>>(
    path: P,
    record: &SaveRecord,
) -> Result<(), PersistError> {
    let data = encode_record(record);
    replace_file(path.as_ref(), |f| f.write_all(&data))?;
    Ok(())
}

fn replace_file<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    // Dropped without persisting on any error, which deletes it.
    let mut tmp = NamedTempFile::new_in(dir)?;
    fill(tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn read_record_from_path<P: AsRef<Path>>(path: P) -> Result<SaveRecord, PersistError> {
    let data = fs::read(path)?;
    parse_record_bytes(&data)
}
