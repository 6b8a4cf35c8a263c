//! Style tokens for the console transcript.
//!
//! Each printable element of the story (feature header, context, event,
//! the three leaf outcomes, and the failure excerpt) carries its own
//! [`Style`] token. The reporter consumes tokens opaquely; callers can
//! restyle any element through [`crate::SuiteConfig`].

use colored::{Color, ColoredString, Colorize};

/// One style token: foreground, optional background, bold flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Style {
    pub color: Color,
    pub on_color: Option<Color>,
    pub bold: bool,
}

impl Style {
    /// Plain foreground color.
    pub const fn fg(color: Color) -> Self {
        Self {
            color,
            on_color: None,
            bold: false,
        }
    }

    /// Bold foreground color.
    pub const fn bold(color: Color) -> Self {
        Self {
            color,
            on_color: None,
            bold: true,
        }
    }

    /// Bold foreground over a background color.
    pub const fn bold_on(color: Color, on_color: Color) -> Self {
        Self {
            color,
            on_color: Some(on_color),
            bold: true,
        }
    }

    /// Apply the token to a piece of text.
    pub fn paint(&self, text: &str) -> ColoredString {
        let mut painted = text.color(self.color);
        if let Some(bg) = self.on_color {
            painted = painted.on_color(bg);
        }
        if self.bold {
            painted = painted.bold();
        }
        painted
    }
}

/// The full palette, one token per transcript element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StylePalette {
    pub feature: Style,
    pub given: Style,
    pub when: Style,
    pub it_pass: Style,
    pub it_not_implemented: Style,
    pub it_fail: Style,
    pub code: Style,
    pub code_error: Style,
    pub error_message: Style,
}

impl Default for StylePalette {
    fn default() -> Self {
        Self {
            feature: Style::fg(Color::White),
            given: Style::fg(Color::BrightBlack),
            when: Style::fg(Color::BrightGreen),
            it_pass: Style::fg(Color::Green),
            it_not_implemented: Style::fg(Color::BrightYellow),
            it_fail: Style::bold_on(Color::White, Color::Red),
            code: Style::fg(Color::BrightBlack),
            code_error: Style::bold(Color::BrightWhite),
            error_message: Style::fg(Color::Red),
        }
    }
}
