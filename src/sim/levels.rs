//! Built-in level content

use super::level::{LevelDef, LevelParseError, parse_grid};

pub const LEVEL_GRIDS: &[&[&str]] = &[
    // 1: a single turret behind cover
    &[
        "..........",
        "....T.....",
        "...2.2....",
        "..........",
        "..........",
        "..........",
        ".P........",
    ],
    // 2: first rolies, same footprint as level 1
    &[
        "..........",
        ".R......R.",
        "....3.....",
        "..T....T..",
        "..........",
        "....11....",
        ".P........",
    ],
    // 3: wider arena, crossfire
    &[
        "T............T",
        "..............",
        "...3......3...",
        "......R.......",
        "..............",
        "..2..4..4..2..",
        "..............",
        "......P.......",
    ],
    // 4: rolie nest
    &[
        "R..........R",
        "...2....2...",
        ".....RR.....",
        "..T......T..",
        "............",
        "...1....1...",
        "............",
        ".....P......",
    ],
    // 5: fortress
    &[
        "..T....T....T..",
        ".555.......555.",
        "...............",
        "...R...T...R...",
        "...............",
        "..3....R....3..",
        "...............",
        ".R...........R.",
        ".......P.......",
    ],
];

/// Parse every built-in grid
pub fn builtin_levels(cell_size: f32) -> Result<Vec<LevelDef>, LevelParseError> {
    LEVEL_GRIDS
        .iter()
        .map(|rows| parse_grid(rows, cell_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_levels_parse() {
        let levels = builtin_levels(3.0).unwrap();
        assert_eq!(levels.len(), LEVEL_GRIDS.len());
        for (i, level) in levels.iter().enumerate() {
            assert!(level.hostile_count() > 0, "level {i} has no hostiles");
            assert!(level.player_start.is_some(), "level {i} has no start");
        }
    }

    #[test]
    fn test_first_two_levels_share_extents() {
        let levels = builtin_levels(3.0).unwrap();
        assert_eq!(levels[0].bounds, levels[1].bounds);
        assert_ne!(levels[1].bounds, levels[2].bounds);
    }
}
