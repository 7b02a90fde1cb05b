/// Cosmetic cleanup applied to bot replies at render time. The stored
/// message keeps the original API text; only the visual unit changes.
///
/// Strips emphasis markup (`*`, backticks), rewrites markdown bullet
/// prefixes to `•`, and collapses runs of blank lines.
pub fn format_bot_text(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut previous_blank = false;

    for line in text.lines() {
        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];

        let line = match trimmed
            .strip_prefix("* ")
            .or_else(|| trimmed.strip_prefix("- "))
        {
            Some(rest) => format!("{indent}• {rest}"),
            None => line.to_string(),
        };

        let cleaned: String = line.chars().filter(|c| !matches!(c, '*' | '`')).collect();

        let blank = cleaned.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        previous_blank = blank;
        out.push(if blank { String::new() } else { cleaned });
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis_markers() {
        assert_eq!(format_bot_text("isso é **importante**"), "isso é importante");
        assert_eq!(format_bot_text("use `cargo build`"), "use cargo build");
        assert_eq!(format_bot_text("*itálico* e normal"), "itálico e normal");
    }

    #[test]
    fn rewrites_bullets() {
        assert_eq!(
            format_bot_text("* primeiro\n* segundo"),
            "• primeiro\n• segundo"
        );
        assert_eq!(format_bot_text("- item"), "• item");
        assert_eq!(format_bot_text("  * aninhado"), "  • aninhado");
    }

    #[test]
    fn dash_inside_a_line_is_untouched() {
        assert_eq!(format_bot_text("bem-vindo"), "bem-vindo");
    }

    #[test]
    fn collapses_blank_line_runs() {
        assert_eq!(format_bot_text("a\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(format_bot_text("olá, tudo bem?"), "olá, tudo bem?");
    }
}
