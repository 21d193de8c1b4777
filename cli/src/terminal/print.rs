use std::fmt::Display;

use colored::*;
use tracing::info;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "dnsprobe::print";

pub trait WithDefaultColor {
    fn with_default(self, default_color: Color) -> ColoredString;
}

impl WithDefaultColor for &str {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for String {
    fn with_default(self, default_color: Color) -> ColoredString {
        self.color(default_color)
    }
}

impl WithDefaultColor for ColoredString {
    fn with_default(self, _default_color: Color) -> ColoredString {
        self
    }
}

/// Emits `msg` verbatim, without the log symbol.
pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn header(msg: &str, quiet: bool) {
    if quiet {
        return;
    }

    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().color(colors::PRIMARY),
        "─".repeat(right)
    )
    .color(colors::SEPARATOR);

    print(&format!("{}", line));
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR);
    print(&format!("{}", sep));
}

/// Prints `key.....: value`, padding keys to `key_width`.
pub fn aligned_line<V>(key: &str, value: V, key_width: usize)
where
    V: Display + WithDefaultColor,
{
    let dots: String = ".".repeat((key_width + 1).saturating_sub(key.chars().count()));
    let colon: String = format!(
        "{}{}",
        dots.color(colors::SEPARATOR),
        ":".color(colors::SEPARATOR)
    );
    let value: ColoredString = value.with_default(colors::TEXT_DEFAULT);
    print_status(format!("{}{} {}", key.color(colors::PRIMARY), colon, value));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}
