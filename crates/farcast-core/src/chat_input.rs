//! Shaping of client chat input before delivery to the game.
//!
//! The game's chat box takes one line of at most 500 characters. Client
//! input may contain newlines and arbitrary length, so the server
//! sanitizes and splits it into command-sized pieces, keeping any leading
//! slash command working on every piece.

/// Maximum characters the game accepts in one chat command.
pub const MAX_INPUT_LEN: usize = 500;

/// Replace embedded line breaks with spaces.
///
/// CRLF collapses to a single space so pasted Windows line endings don't
/// double up.
#[must_use]
pub fn sanitize(input: &str) -> String {
    input.replace("\r\n", " ").replace(['\r', '\n'], " ")
}

/// Split `input` into pieces the game will accept.
///
/// Input at or under the limit passes through untouched. Longer input is
/// wrapped at word boundaries; a leading slash command is carried onto
/// every piece, and for `/tell` and `/t` the target-name argument (two
/// words) is carried too, so every piece still reaches the same
/// recipient.
#[must_use]
pub fn split_input(input: &str) -> Vec<String> {
    if input.chars().count() <= MAX_INPUT_LEN {
        return vec![input.to_owned()];
    }

    let (prefix, rest) = split_command_prefix(input);

    let budget = match prefix {
        Some(prefix) => MAX_INPUT_LEN.saturating_sub(prefix.chars().count() + 1),
        None => MAX_INPUT_LEN,
    };

    wrap_words(rest, budget)
        .into_iter()
        .map(|piece| match prefix {
            Some(prefix) => format!("{prefix} {piece}"),
            None => piece,
        })
        .collect()
}

/// Split off the slash-command prefix that must repeat on every piece.
///
/// For `/tell` and `/t` the prefix runs through the third space so the
/// `Forename Surname` target stays attached; for other commands it is the
/// first word.
fn split_command_prefix(input: &str) -> (Option<&str>, &str) {
    if !input.starts_with('/') {
        return (None, input);
    }

    let Some(first_space) = input.find(' ') else {
        return (None, input);
    };

    let command = &input[..first_space];
    if command == "/tell" || command == "/t" {
        if let Some(third_space) = nth_space(input, 3) {
            return (Some(&input[..third_space]), &input[third_space + 1..]);
        }
    }

    (Some(command), &input[first_space + 1..])
}

/// Byte index of the `n`-th space (1-based), if present.
fn nth_space(input: &str, n: usize) -> Option<usize> {
    input.match_indices(' ').nth(n - 1).map(|(idx, _)| idx)
}

/// Greedy word wrap at `budget` characters per line.
///
/// A single word longer than the budget is hard-split at character
/// boundaries.
fn wrap_words(input: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for word in input.split_whitespace() {
        let word_chars = word.chars().count();

        if word_chars > budget {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for slab in chars.chunks(budget) {
                pieces.push(slab.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_chars } else { word_chars + 1 };
        if current_chars + needed > budget {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_chars = word_chars;
        } else {
            if !current.is_empty() {
                current.push(' ');
                current_chars += 1;
            }
            current.push_str(word);
            current_chars += word_chars;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_flattens_line_breaks() {
        assert_eq!(sanitize("a\r\nb\rc\nd"), "a b c d");
    }

    #[test]
    fn short_input_passes_through() {
        assert_eq!(split_input("/say hi"), vec!["/say hi"]);
        assert_eq!(split_input("hi"), vec!["hi"]);
    }

    #[test]
    fn long_plain_input_wraps_at_words() {
        let input = "word ".repeat(150); // 750 chars
        let pieces = split_input(input.trim_end());

        assert!(pieces.len() >= 2);
        for piece in &pieces {
            assert!(piece.chars().count() <= MAX_INPUT_LEN);
            assert!(!piece.starts_with(' '));
        }

        let rejoined = pieces.join(" ");
        assert_eq!(rejoined, input.trim_end());
    }

    #[test]
    fn command_prefix_repeats_on_every_piece() {
        let input = format!("/shout {}", "word ".repeat(150));
        let pieces = split_input(input.trim_end());

        assert!(pieces.len() >= 2);
        for piece in &pieces {
            assert!(piece.starts_with("/shout "));
            assert!(piece.chars().count() <= MAX_INPUT_LEN);
        }
    }

    #[test]
    fn tell_keeps_the_target_on_every_piece() {
        let input = format!("/tell Aza Lindqvist {}", "word ".repeat(150));
        let pieces = split_input(input.trim_end());

        assert!(pieces.len() >= 2);
        for piece in &pieces {
            assert!(piece.starts_with("/tell Aza Lindqvist "));
        }
    }

    #[test]
    fn short_tell_alias_works_too() {
        let input = format!("/t Aza Lindqvist {}", "word ".repeat(150));
        let pieces = split_input(input.trim_end());

        for piece in &pieces {
            assert!(piece.starts_with("/t Aza Lindqvist "));
        }
    }

    #[test]
    fn unbroken_word_is_hard_split() {
        let input = "x".repeat(1200);
        let pieces = split_input(&input);

        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| p.chars().count() <= MAX_INPUT_LEN));
        assert_eq!(pieces.concat(), input);
    }
}
