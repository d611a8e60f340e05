use ratatui::style::Color;

/// A named color palette. Cycled with Ctrl+T and persisted in the config.
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub info: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
  pub chip_fg: Color,
  pub chip_bg: Color,
}

pub const THEMES: &[Theme] = &[
  Theme {
    name: "indigo",
    bg: Color::Rgb(13, 13, 18),
    fg: Color::Rgb(228, 228, 235),
    muted: Color::Rgb(125, 125, 145),
    accent: Color::Rgb(129, 140, 248),
    border: Color::Rgb(55, 55, 75),
    status: Color::Rgb(165, 180, 252),
    error: Color::Rgb(248, 113, 113),
    info: Color::Rgb(110, 231, 183),
    highlight_fg: Color::Rgb(238, 242, 255),
    highlight_bg: Color::Rgb(67, 56, 202),
    stripe_bg: Color::Rgb(19, 19, 26),
    key_fg: Color::Rgb(13, 13, 18),
    key_bg: Color::Rgb(129, 140, 248),
    chip_fg: Color::Rgb(224, 231, 255),
    chip_bg: Color::Rgb(49, 46, 129),
  },
  Theme {
    name: "clinic",
    bg: Color::Rgb(250, 250, 249),
    fg: Color::Rgb(41, 37, 36),
    muted: Color::Rgb(120, 113, 108),
    accent: Color::Rgb(13, 148, 136),
    border: Color::Rgb(214, 211, 209),
    status: Color::Rgb(15, 118, 110),
    error: Color::Rgb(185, 28, 28),
    info: Color::Rgb(21, 128, 61),
    highlight_fg: Color::Rgb(250, 250, 249),
    highlight_bg: Color::Rgb(15, 118, 110),
    stripe_bg: Color::Rgb(245, 245, 244),
    key_fg: Color::Rgb(250, 250, 249),
    key_bg: Color::Rgb(13, 148, 136),
    chip_fg: Color::Rgb(19, 78, 74),
    chip_bg: Color::Rgb(204, 251, 241),
  },
  Theme {
    name: "midnight",
    bg: Color::Rgb(9, 14, 24),
    fg: Color::Rgb(213, 224, 240),
    muted: Color::Rgb(100, 116, 139),
    accent: Color::Rgb(96, 165, 250),
    border: Color::Rgb(40, 52, 71),
    status: Color::Rgb(147, 197, 253),
    error: Color::Rgb(252, 165, 165),
    info: Color::Rgb(134, 239, 172),
    highlight_fg: Color::Rgb(239, 246, 255),
    highlight_bg: Color::Rgb(30, 64, 175),
    stripe_bg: Color::Rgb(13, 20, 33),
    key_fg: Color::Rgb(9, 14, 24),
    key_bg: Color::Rgb(96, 165, 250),
    chip_fg: Color::Rgb(219, 234, 254),
    chip_bg: Color::Rgb(30, 58, 138),
  },
];
