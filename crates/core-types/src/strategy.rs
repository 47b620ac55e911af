/// Name reported when the original strategy text carries no declaration.
pub const ORIGINAL_STRATEGY_FALLBACK: &str = "Unknown Strategy";
/// Name reported when the rewritten strategy text carries no declaration.
pub const MODIFIED_STRATEGY_FALLBACK: &str = "Modified Strategy";

const DECLARATION: &str = "strategy(\"";

/// Scans strategy text for the first `strategy("<name>"` declaration and returns the name.
///
/// This is a plain substring search, line by line. A declaration whose closing quote
/// is missing on the same line is ignored and the scan continues.
pub fn strategy_name(code: &str) -> Option<&str> {
    code.lines().find_map(|line| {
        let start = line.find(DECLARATION)? + DECLARATION.len();
        let len = line[start..].find('"')?;
        Some(&line[start..start + len])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_the_declared_name() {
        let code = "//@version=4\nstrategy(\"Simple RSI Strategy\", overlay=true)\n";
        assert_eq!(strategy_name(code), Some("Simple RSI Strategy"));
    }

    #[test]
    fn first_declaration_wins() {
        let code = "strategy(\"First\")\nstrategy(\"Second\")";
        assert_eq!(strategy_name(code), Some("First"));
    }

    #[test]
    fn unterminated_declaration_is_skipped() {
        let code = "strategy(\"Broken\nstrategy(\"Good\")";
        assert_eq!(strategy_name(code), Some("Good"));
    }

    #[test]
    fn no_declaration() {
        assert_eq!(strategy_name("indicator(\"RSI\")"), None);
        assert_eq!(strategy_name(""), None);
    }
}
