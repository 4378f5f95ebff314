//! Team colors
//!
//! Colors travel as text (`rgb(r, g, b)` or `#rrggbb`) in roster files,
//! configs and saves, and as bytes when a map is rendered.

use std::fmt;
use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{char, multispace0, u8 as channel};
use nom::combinator::{all_consuming, map_res};
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Random color with every channel in 50..=255, so no team is near-black
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            r: rng.gen_range(50..=255),
            g: rng.gen_range(50..=255),
            b: rng.gen_range(50..=255),
        }
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

fn padded_channel(input: &str) -> IResult<&str, u8> {
    delimited(multispace0, channel, multispace0).parse(input)
}

fn rgb_function(input: &str) -> IResult<&str, Color> {
    let (rest, (r, _, g, _, b)) = delimited(
        (tag("rgb("), multispace0),
        (padded_channel, char(','), padded_channel, char(','), padded_channel),
        char(')'),
    )
    .parse(input)?;
    Ok((rest, Color::new(r, g, b)))
}

fn hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(
        take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit()),
        |digits: &str| u8::from_str_radix(digits, 16),
    )
    .parse(input)
}

fn hex_triplet(input: &str) -> IResult<&str, Color> {
    let (rest, (r, g, b)) = preceded(char('#'), (hex_byte, hex_byte, hex_byte)).parse(input)?;
    Ok((rest, Color::new(r, g, b)))
}

impl FromStr for Color {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(alt((rgb_function, hex_triplet)))
            .parse(s.trim())
            .map(|(_, color)| color)
            .map_err(|_| GameError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for Color {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}
