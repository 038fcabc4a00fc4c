// SPDX-FileCopyrightText: 2025 Jens Pitkänen <jens.pitkanen@helsinki.fi>
//
// SPDX-License-Identifier: GPL-3.0-or-later

use arrayvec::ArrayVec;

/// The most command line arguments the client will ever look at. Matches
/// the launch protocol: username, mppass, address, port, and one spare.
pub const MAX_COMMAND_ARGS: usize = 5;

/// Splits a raw command line into arguments.
///
/// Arguments are separated by spaces; a double-quoted argument may contain
/// spaces ("two words"). Quotes don't nest and there are no escapes; this
/// only needs to round-trip what the launcher itself builds. Splitting
/// stops at [`MAX_COMMAND_ARGS`], or at an empty argument (an empty
/// quoted string, or the end of the line).
///
/// On platforms that deliver a pre-split argv this is unnecessary; it
/// exists for the ones that hand the process one flat string. Callers strip
/// the executable path themselves, since not every platform includes it.
pub fn split_args(command_line: &str) -> ArrayVec<&str, MAX_COMMAND_ARGS> {
    let mut args = ArrayVec::new();
    let mut rest = command_line;

    while !args.is_full() {
        let (arg, tail) = next_arg(rest);
        if arg.is_empty() {
            break;
        }
        args.push(arg);
        rest = tail;
    }
    args
}

fn next_arg(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches(' ');

    if let Some(quoted) = s.strip_prefix('"') {
        match quoted.find('"') {
            Some(end) => (&quoted[..end], &quoted[end + 1..]),
            None => (quoted, ""),
        }
    } else {
        match s.find(' ') {
            Some(end) => (&s[..end], &s[end + 1..]),
            None => (s, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::split_args;

    #[test]
    fn splits_on_spaces() {
        let args = split_args("Singleplayer pass 127.0.0.1 25565");
        assert_eq!(
            &["Singleplayer", "pass", "127.0.0.1", "25565"],
            args.as_slice()
        );
    }

    #[test]
    fn quoted_arguments_keep_their_spaces() {
        let args = split_args("\"Some Player\" pass");
        assert_eq!(&["Some Player", "pass"], args.as_slice());
    }

    #[test]
    fn leading_and_repeated_spaces_are_skipped() {
        let args = split_args("  a   b ");
        assert_eq!(&["a", "b"], args.as_slice());
    }

    #[test]
    fn argument_count_is_bounded() {
        let args = split_args("1 2 3 4 5 6 7");
        assert_eq!(&["1", "2", "3", "4", "5"], args.as_slice());
    }

    #[test]
    fn unterminated_quote_runs_to_the_end() {
        let args = split_args("\"half open");
        assert_eq!(&["half open"], args.as_slice());
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(split_args("").is_empty());
        assert!(split_args("   ").is_empty());
    }
}
