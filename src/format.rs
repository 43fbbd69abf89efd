//! Terminal colors for the labels trackers attach to issues.

use nu_ansi_term::{Color, Style};

const PRIORITY_STYLES: &[(&str, Color, bool)] = &[
    ("immediate", Color::Red, true),
    ("urgent", Color::Red, false),
    ("high", Color::Yellow, true),
    ("normal", Color::Blue, true),
    ("low", Color::Green, false),
];

const STATUS_STYLES: &[(&str, Color, bool)] = &[
    ("new", Color::Yellow, true),
    ("in progress", Color::Cyan, true),
    ("resolved", Color::Green, false),
    ("closed", Color::Green, true),
];

const TAG_STYLES: &[(&str, Color, bool)] = &[
    ("issue", Color::Purple, false),
    ("bug", Color::Red, true),
    ("enhancement", Color::Blue, true),
    ("documentation", Color::Yellow, false),
    ("new feature", Color::Green, false),
    ("feature", Color::Green, false),
];

fn style_for(label: &str) -> Option<Style> {
    let label = label.to_lowercase();
    [PRIORITY_STYLES, STATUS_STYLES, TAG_STYLES]
        .into_iter()
        .flatten()
        .find(|(name, _, _)| *name == label)
        .map(|&(_, color, bright)| {
            if bright {
                color.bold()
            } else {
                color.normal()
            }
        })
}

/// Paint `text` with the color registered for `label`, or leave it alone if there is none.
pub(crate) fn colorize(text: &str, label: &str) -> String {
    match style_for(label) {
        Some(style) => style.paint(text).to_string(),
        None => text.to_string(),
    }
}

pub(crate) fn green(text: &str) -> String {
    Color::Green.paint(text).to_string()
}

pub(crate) fn magenta(text: &str) -> String {
    Color::Purple.paint(text).to_string()
}

#[cfg(test)]
mod test_colorize {
    use nu_ansi_term::Color;
    use pretty_assertions::assert_eq;

    use super::colorize;

    #[test]
    fn unknown_label_is_plain() {
        assert_eq!(colorize("whatever", "whatever"), "whatever");
    }

    #[test]
    fn label_is_case_insensitive() {
        assert_eq!(
            colorize("In Progress", "In Progress"),
            Color::Cyan.bold().paint("In Progress").to_string()
        );
    }

    #[test]
    fn priority_beats_tag() {
        assert_eq!(
            colorize(" Low: ", "low"),
            Color::Green.paint(" Low: ").to_string()
        );
    }

    #[test]
    fn tag_colors() {
        assert_eq!(
            colorize(" Bug: ", "Bug"),
            Color::Red.bold().paint(" Bug: ").to_string()
        );
    }
}
