//! Level definitions and the grid format
//!
//! Levels are authored as rectangular character grids:
//!
//! | symbol | meaning                         |
//! |--------|---------------------------------|
//! | `.`    | empty (`0` is accepted too)     |
//! | `1`-`9`| obstacle pile of that many boxes|
//! | `T`    | turret                          |
//! | `R`    | rolie                           |
//! | `P`    | player start (at most one)      |
//!
//! Cell (row, col) maps to world XZ at the cell center, with the grid
//! centered on the origin. Rows run along +Z, columns along +X.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Symmetric arena extents around the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArenaBounds {
    pub half_x: f32,
    pub half_z: f32,
}

impl ArenaBounds {
    pub fn new(half_x: f32, half_z: f32) -> Self {
        Self { half_x, half_z }
    }

    /// Inside the arena grown by `margin` on each side
    pub fn contains_xz(&self, pos: Vec3, margin: f32) -> bool {
        pos.x.abs() <= self.half_x + margin && pos.z.abs() <= self.half_z + margin
    }

    /// Clamp so a body of `radius` stays inside the walls
    pub fn clamp_xz(&self, pos: Vec3, radius: f32) -> Vec3 {
        let lim_x = (self.half_x - radius).max(0.0);
        let lim_z = (self.half_z - radius).max(0.0);
        Vec3::new(pos.x.clamp(-lim_x, lim_x), pos.y, pos.z.clamp(-lim_z, lim_z))
    }
}

/// A stack of boxes at one spot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxPile {
    pub x: f32,
    pub z: f32,
    pub count: u32,
}

/// Everything needed to build one level. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDef {
    pub bounds: ArenaBounds,
    pub piles: Vec<BoxPile>,
    /// XZ positions
    pub turrets: Vec<(f32, f32)>,
    pub rolies: Vec<(f32, f32)>,
    pub player_start: Option<(f32, f32)>,
}

impl LevelDef {
    pub fn hostile_count(&self) -> usize {
        self.turrets.len() + self.rolies.len()
    }

    /// Level start, or one cell in from the (-X, -Z) corner
    pub fn start_or_corner(&self, cell_size: f32) -> (f32, f32) {
        self.player_start.unwrap_or((
            -self.bounds.half_x + cell_size,
            -self.bounds.half_z + cell_size,
        ))
    }
}

/// Grid parse failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelParseError {
    Empty,
    RaggedRow { row: usize, expected: usize, found: usize },
    UnknownSymbol { row: usize, col: usize, symbol: char },
    DuplicatePlayerStart { row: usize, col: usize },
}

impl std::fmt::Display for LevelParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelParseError::Empty => write!(f, "level grid is empty"),
            LevelParseError::RaggedRow {
                row,
                expected,
                found,
            } => write!(f, "row {row} has {found} cells, expected {expected}"),
            LevelParseError::UnknownSymbol { row, col, symbol } => {
                write!(f, "unknown symbol {symbol:?} at row {row}, col {col}")
            }
            LevelParseError::DuplicatePlayerStart { row, col } => {
                write!(f, "second player start at row {row}, col {col}")
            }
        }
    }
}

impl std::error::Error for LevelParseError {}

/// Parse grid rows into a level. Blank lines and surrounding whitespace are ignored.
pub fn parse_grid(rows: &[&str], cell_size: f32) -> Result<LevelDef, LevelParseError> {
    let rows: Vec<&str> = rows.iter().map(|r| r.trim()).filter(|r| !r.is_empty()).collect();
    let width = rows.first().map(|r| r.chars().count()).ok_or(LevelParseError::Empty)?;
    let depth = rows.len();

    let bounds = ArenaBounds::new(
        width as f32 * cell_size / 2.0,
        depth as f32 * cell_size / 2.0,
    );
    let mut level = LevelDef {
        bounds,
        piles: Vec::new(),
        turrets: Vec::new(),
        rolies: Vec::new(),
        player_start: None,
    };

    for (row, line) in rows.iter().enumerate() {
        let found = line.chars().count();
        if found != width {
            return Err(LevelParseError::RaggedRow {
                row,
                expected: width,
                found,
            });
        }
        for (col, symbol) in line.chars().enumerate() {
            let x = (col as f32 + 0.5) * cell_size - bounds.half_x;
            let z = (row as f32 + 0.5) * cell_size - bounds.half_z;
            match symbol {
                '.' | '0' => {}
                '1'..='9' => level.piles.push(BoxPile {
                    x,
                    z,
                    count: symbol.to_digit(10).unwrap_or(0),
                }),
                'T' => level.turrets.push((x, z)),
                'R' => level.rolies.push((x, z)),
                'P' => {
                    if level.player_start.is_some() {
                        return Err(LevelParseError::DuplicatePlayerStart { row, col });
                    }
                    level.player_start = Some((x, z));
                }
                _ => return Err(LevelParseError::UnknownSymbol { row, col, symbol }),
            }
        }
    }

    Ok(level)
}
