//! Cell colors.

/// Number of distinct colors a cell can hold.
pub const COLOR_COUNT: u8 = 10;

/// Color of a single canvas cell.
///
/// The discriminant is the wire byte, so the order of the variants
/// is part of the protocol and must not change.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    White = 0,
    Green = 1,
    Yellow = 2,
    Red = 3,
    Orange = 4,
    Purple = 5,
    Blue = 6,
    LightBlue = 7,
    Pink = 8,
    Black = 9,
}

impl Color {
    /// Every color, in wire order.
    pub const ALL: [Color; COLOR_COUNT as usize] = [
        Color::White,
        Color::Green,
        Color::Yellow,
        Color::Red,
        Color::Orange,
        Color::Purple,
        Color::Blue,
        Color::LightBlue,
        Color::Pink,
        Color::Black,
    ];

    /// Wire representation (ordinal, `0..=9`).
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to parse from a wire byte. Bytes above `9` are not colors.
    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.get(v as usize).copied()
    }
}

impl TryFrom<u8> for Color {
    type Error = u8;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Color::from_u8(v).ok_or(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_bytes_follow_declaration_order() {
        for (i, color) in Color::ALL.iter().enumerate() {
            assert_eq!(color.as_u8() as usize, i);
            assert_eq!(Color::from_u8(i as u8), Some(*color));
        }
    }

    #[test]
    fn bytes_past_the_palette_are_rejected() {
        assert_eq!(Color::from_u8(COLOR_COUNT), None);
        assert_eq!(Color::from_u8(255), None);
        assert_eq!(Color::try_from(42u8), Err(42));
    }

    #[test]
    fn default_is_white() {
        assert_eq!(Color::default(), Color::White);
        assert_eq!(Color::default().as_u8(), 0);
    }
}
