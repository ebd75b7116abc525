//! Procedurally generated world chunks.
//!
//! The world is an infinite grid of square chunks, each [`CHUNK_SIZE`] units
//! wide. A chunk holds a fixed number of planets which are generated the first
//! time anyone asks for the chunk and are persisted from then on.

use crate::models::RecordError;
use orbis_core::protocol::{FIELD_SEPARATOR, reply};
use rand::Rng;
use std::fmt;

pub const PLANETS_PER_CHUNK: usize = 10;
pub const CHUNK_SIZE: i64 = 20_000;
/// Planets are placed in `[MARGIN, MARGIN + SPREAD)` relative to the chunk origin.
pub const PLACEMENT_SPREAD: i64 = 19_000;
pub const PLACEMENT_MARGIN: i64 = 500;
pub const MIN_DIAMETER: i64 = 300;
pub const MAX_DIAMETER: i64 = 1_700;
pub const COLOR_LIMIT: u8 = 255;
pub const SPRITE_COUNT: u32 = 30;

const PLANET_COLUMNS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub cx: i32,
    pub cy: i32,
}

impl ChunkCoord {
    pub fn new(cx: i32, cy: i32) -> Self {
        Self { cx, cy }
    }

    /// World position of the chunk's top-left corner.
    pub fn origin(&self) -> (i64, i64) {
        (CHUNK_SIZE * self.cx as i64, CHUNK_SIZE * self.cy as i64)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.cx, self.cy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planet {
    /// Absolute world position of the planet's centre
    pub x: i64,
    pub y: i64,
    pub diameter: i64,
    pub color: [u8; 3],
    pub sprite: u32,
}

impl Planet {
    pub fn distance_to(&self, other: &Planet) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        dx.hypot(dy)
    }

    /// Placement rule: a new planet must be further from an existing one than
    /// twice its own diameter plus the other's diameter.
    pub fn keeps_clear_of(&self, placed: &Planet) -> bool {
        self.distance_to(placed) > (2 * self.diameter + placed.diameter) as f64
    }

    pub fn to_row(&self) -> String {
        let [r, g, b] = self.color;
        format!("{} {} {} {} {} {} {}", self.x, self.y, self.diameter, r, g, b, self.sprite)
    }

    pub fn parse_row(row: &str) -> Result<Self, RecordError> {
        let cols: Vec<&str> = row.split_whitespace().collect();
        if cols.len() != PLANET_COLUMNS {
            return Err(RecordError::Columns {
                expected: PLANET_COLUMNS,
                got: cols.len(),
            });
        }

        Ok(Self {
            x: number(cols[0])?,
            y: number(cols[1])?,
            diameter: number(cols[2])?,
            color: [number(cols[3])?, number(cols[4])?, number(cols[5])?],
            sprite: number(cols[6])?,
        })
    }
}

fn number<T: std::str::FromStr>(s: &str) -> Result<T, RecordError> {
    s.parse().map_err(|_| RecordError::Number(s.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub planets: Vec<Planet>,
}

impl Chunk {
    /// Generate a fresh chunk by rejection sampling.
    ///
    /// Candidates are redrawn until they keep clear of every planet accepted
    /// before them. Colour and sprite are drawn once per planet and are not
    /// affected by rejected candidates.
    pub fn generate<R: Rng>(coord: ChunkCoord, rng: &mut R) -> Self {
        let (ox, oy) = coord.origin();
        let mut planets: Vec<Planet> = Vec::with_capacity(PLANETS_PER_CHUNK);

        while planets.len() < PLANETS_PER_CHUNK {
            let sprite = rng.random_range(0..SPRITE_COUNT);
            let color = [
                rng.random_range(0..COLOR_LIMIT),
                rng.random_range(0..COLOR_LIMIT),
                rng.random_range(0..COLOR_LIMIT),
            ];

            let mut attempts = 0u32;
            let planet = loop {
                attempts += 1;
                let candidate = Planet {
                    x: ox + PLACEMENT_MARGIN + rng.random_range(0..PLACEMENT_SPREAD),
                    y: oy + PLACEMENT_MARGIN + rng.random_range(0..PLACEMENT_SPREAD),
                    diameter: rng.random_range(MIN_DIAMETER..MAX_DIAMETER),
                    color,
                    sprite,
                };
                if planets.iter().all(|placed| candidate.keeps_clear_of(placed)) {
                    break candidate;
                }
            };

            tracing::trace!(%coord, index = planets.len(), attempts, "placed planet");
            planets.push(planet);
        }

        Self { coord, planets }
    }

    /// Serialized form used by the chunk store: one planet per line.
    pub fn to_record(&self) -> String {
        let mut out = String::new();
        for planet in &self.planets {
            out.push_str(&planet.to_row());
            out.push('\n');
        }
        out
    }

    pub fn from_record(coord: ChunkCoord, record: &str) -> Result<Self, RecordError> {
        let planets = record
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(Planet::parse_row)
            .collect::<Result<Vec<_>, _>>()?;

        if planets.len() != PLANETS_PER_CHUNK {
            return Err(RecordError::Rows {
                expected: PLANETS_PER_CHUNK,
                got: planets.len(),
            });
        }

        Ok(Self { coord, planets })
    }

    /// One `retchunk{cx}~{cy}~x~y~diameter~r~g~b~sprite~` frame per planet.
    pub fn wire_rows(&self) -> impl Iterator<Item = String> + '_ {
        let tag = format!(
            "{}{}{sep}{}",
            reply::CHUNK_PREFIX,
            self.coord.cx,
            self.coord.cy,
            sep = FIELD_SEPARATOR
        );

        self.planets.iter().map(move |p| {
            let [r, g, b] = p.color;
            let mut row = tag.clone();
            for value in [p.x, p.y, p.diameter, r as i64, g as i64, b as i64, p.sprite as i64] {
                row.push(FIELD_SEPARATOR);
                row.push_str(&value.to_string());
            }
            row.push(FIELD_SEPARATOR);
            row
        })
    }
}
