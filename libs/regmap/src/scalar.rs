//! Numeric literal grammar used by SVD documents and the command line.
//!
//! - hexadecimal: optional `0x`/`0X` prefix, then hex digits
//! - decimal: ASCII digits
//! - size: decimal unless explicitly prefixed with `0x`
//! - bit range: `[msb:lsb]`
//!
//! Surrounding whitespace is ignored everywhere.

use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1, hex_digit1, multispace0},
    combinator::{all_consuming, map_res, opt},
    sequence::{delimited, preceded, separated_pair},
    IResult,
};

fn hex(input: &str) -> IResult<&str, u64> {
    preceded(
        opt(tag_no_case("0x")),
        map_res(hex_digit1, |digits| u64::from_str_radix(digits, 16)),
    )(input)
}

fn prefixed_hex(input: &str) -> IResult<&str, u64> {
    preceded(
        tag_no_case("0x"),
        map_res(hex_digit1, |digits| u64::from_str_radix(digits, 16)),
    )(input)
}

fn dec(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |digits: &str| digits.parse::<u64>())(input)
}

fn bit_range(input: &str) -> IResult<&str, (u64, u64)> {
    delimited(
        char('['),
        separated_pair(
            delimited(multispace0, dec, multispace0),
            char(':'),
            delimited(multispace0, dec, multispace0),
        ),
        char(']'),
    )(input)
}

fn complete<'a, O>(
    parser: impl FnMut(&'a str) -> IResult<&'a str, O>,
    text: &'a str,
) -> Option<O> {
    all_consuming(parser)(text.trim()).ok().map(|(_, value)| value)
}

/// Hex text with or without the `0x` prefix. Digit separators are not accepted.
pub fn parse_hex(text: &str) -> Option<u64> {
    complete(hex, text)
}

pub fn parse_dec(text: &str) -> Option<u64> {
    complete(dec, text)
}

/// Register sizes are decimal; an explicit `0x` prefix switches to hex.
pub fn parse_size(text: &str) -> Option<u64> {
    complete(alt((prefixed_hex, dec)), text)
}

/// Parses `[msb:lsb]` into `(msb, lsb)`.
pub fn parse_bit_range(text: &str) -> Option<(u64, u64)> {
    complete(bit_range, text)
}
