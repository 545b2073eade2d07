//! Shared winnow-based parsing utilities used by the model and texture decoders.

use winnow::Parser;
use winnow::binary::le_f32;
use winnow::error::ContextError;
use winnow::token::take;

/// Common result type for winnow parsers.
pub type WResult<T> = Result<T, winnow::error::ErrMode<ContextError>>;

/// Builds a little-endian ident from its four ASCII bytes, e.g. `ident(b"BIVM")`.
pub const fn ident(tag: &[u8; 4]) -> u32 {
    u32::from_le_bytes(*tag)
}

/// Renders an ident as its four characters, replacing non-printable bytes with `.`.
pub fn fourcc(value: u32) -> String {
    value
        .to_le_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

pub fn parse_vec2(input: &mut &[u8]) -> WResult<[f32; 2]> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    Ok([x, y])
}

pub fn parse_vec3(input: &mut &[u8]) -> WResult<[f32; 3]> {
    let x = le_f32.parse_next(input)?;
    let y = le_f32.parse_next(input)?;
    let z = le_f32.parse_next(input)?;
    Ok([x, y, z])
}

/// Parse a fixed-width, null-padded name field.
///
/// The whole field is consumed; the string ends at the first NUL byte.
pub fn parse_fixed_string(input: &mut &[u8], len: usize) -> WResult<String> {
    let field: &[u8] = take(len).parse_next(input)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}
