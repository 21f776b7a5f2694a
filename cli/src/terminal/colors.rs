use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::Cyan;
pub const SEPARATOR: Color = Color::BrightBlack;

pub const OPEN: Color = Color::Green;
pub const CLOSED: Color = Color::Red;
pub const AMBIGUOUS: Color = Color::Yellow;
pub const FAILED: Color = Color::Magenta;
