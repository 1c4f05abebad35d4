//! ANSI styling for terminal output.

use std::fmt::Display;

use tandem_core::EventKind;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";
pub const RED: &str = "\x1b[31m";

/// Style of an event line.
pub fn for_event(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Started => DIM,
        EventKind::Completed => GREEN,
        EventKind::Failed => RED,
        EventKind::Aborted => YELLOW,
    }
}

/// Wrap `text` in `style`, resetting afterwards.
pub fn paint(style: &str, text: impl Display) -> String {
    format!("{style}{text}{RESET}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_resets() {
        assert_eq!(paint(BOLD, "hi"), "\x1b[1mhi\x1b[0m");
    }

    #[test]
    fn test_failures_stand_out() {
        assert_eq!(for_event(EventKind::Failed), RED);
        assert_ne!(for_event(EventKind::Started), for_event(EventKind::Completed));
    }
}
