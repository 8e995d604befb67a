use embedded_graphics::{pixelcolor::Rgb888, prelude::*};

/// Parses `#rgb`, `#rrggbb`, `rgb` or `rrggbb` into a color.
///
/// Returns `None` for anything else; callers keep their previous color.
pub fn parse_hex_color(hex: &str) -> Option<Rgb888> {
    let hex = hex.trim();
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match digits.len() {
        3 => {
            let mut channels = digits.chars().map(|c| {
                let nibble = c.to_digit(16).unwrap_or(0) as u8;
                nibble << 4 | nibble
            });
            Some(Rgb888::new(
                channels.next()?,
                channels.next()?,
                channels.next()?,
            ))
        }
        6 => {
            let value = u32::from_str_radix(digits, 16).ok()?;
            Some(Rgb888::new(
                (value >> 16 & 0xff) as u8,
                (value >> 8 & 0xff) as u8,
                (value & 0xff) as u8,
            ))
        }
        _ => None,
    }
}

/// Color as the `[0, 1]` RGB triple the shader consumes.
pub fn normalized(color: Rgb888) -> [f32; 3] {
    [
        color.r() as f32 / 255.0,
        color.g() as f32 / 255.0,
        color.b() as f32 / 255.0,
    ]
}

/// Lower-case `#rrggbb` form of `color`.
pub fn to_hex(color: Rgb888) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}
