use std::borrow::Cow;

/// Replaces `%1`..`%9` with the matching argument.
///
/// Placeholders without an argument stay literal and surplus arguments are
/// ignored. Substituted text is never rescanned, so an argument containing
/// `%2` is inserted verbatim.
pub fn substitute<'a, S: AsRef<str>>(text: &'a str, arguments: &[S]) -> Cow<'a, str> {
    expand(text, None, arguments)
}

/// Replaces `%n` and `%Ln` with `count`, leaving positional placeholders alone.
pub fn substitute_count(text: &str, count: u64) -> Cow<'_, str> {
    expand(text, Some(count), &[] as &[&str])
}

pub(crate) fn expand<'a, S: AsRef<str>>(
    text: &'a str,
    count: Option<u64>,
    arguments: &[S],
) -> Cow<'a, str> {
    if !text.contains('%') {
        return Cow::Borrowed(text);
    }

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(position) = rest.find('%') {
        output.push_str(&rest[..position]);
        let tail = &rest[position + 1..];
        let mut chars = tail.chars();
        match (chars.next(), chars.next(), count) {
            (Some(digit @ '1'..='9'), _, _) => {
                let index = digit as usize - '1' as usize;
                match arguments.get(index) {
                    Some(argument) => output.push_str(argument.as_ref()),
                    None => {
                        output.push('%');
                        output.push(digit);
                    }
                }
                rest = &tail[1..];
            }
            (Some('n'), _, Some(value)) => {
                output.push_str(&value.to_string());
                rest = &tail[1..];
            }
            (Some('L'), Some('n'), Some(value)) => {
                output.push_str(&value.to_string());
                rest = &tail[2..];
            }
            _ => {
                output.push('%');
                rest = tail;
            }
        }
    }
    output.push_str(rest);
    Cow::Owned(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_matching_placeholders() {
        assert_eq!(substitute("Hide %1", &["Finder"]), "Hide Finder");
        assert_eq!(substitute("%2 before %1", &["a", "b"]), "b before a");
    }

    #[test]
    fn unmatched_placeholder_is_left_literal() {
        assert_eq!(substitute("%1, %2", &["en"]), "en, %2");
    }

    #[test]
    fn unused_arguments_are_ignored() {
        assert!(matches!(substitute("Ctrl", &["unused"]), Cow::Borrowed("Ctrl")));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        assert_eq!(substitute("%1 and %2", &["%2", "x"]), "%2 and x");
    }

    #[test]
    fn non_placeholder_percent_signs_survive() {
        assert_eq!(substitute("100% of %0 %", &["a"]), "100% of %0 %");
        assert_eq!(substitute("%10", &["a"]), "a0");
        assert_eq!(substitute("%n files", &["a"]), "%n files");
    }

    #[test]
    fn count_placeholders() {
        assert_eq!(substitute_count("%n soubory", 3), "3 soubory");
        assert_eq!(substitute_count("%Ln filer, %1", 1200), "1200 filer, %1");
        assert_eq!(substitute_count("%L1", 2), "%L1");
    }

    #[test]
    fn multibyte_text_around_placeholders() {
        assert_eq!(substitute("Skrýt %1…", &["Dokument"]), "Skrýt Dokument…");
    }
}
