const FENCE: &str = "```";

/// First line of the code returned when the response holds no complete fenced block.
pub const NO_BLOCK_NOTE: &str =
    "// Could not extract a code block from the model response. Raw response:";

/// A model response split into prose and code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Everything before the first opening fence, trimmed.
    pub explanation: String,
    /// The contents of the last fenced block, trimmed.
    pub modified_code: String,
    /// False when the fallback policy was applied.
    pub found_block: bool,
}

/// Splits a free-form response into an explanation and the last fenced code block.
///
/// An opening fence may carry a language hint (```` ```pine ````), which is dropped.
/// When no complete block exists (including an opening fence that is never closed),
/// the whole response becomes the explanation and the code is [`NO_BLOCK_NOTE`]
/// followed by the full response.
pub fn extract_code_block(response: &str) -> Extraction {
    let blocks = fenced_blocks(response);

    match blocks.last() {
        Some(last) => {
            let first_open = response.find(FENCE).unwrap_or(0);
            Extraction {
                explanation: response[..first_open].trim().to_string(),
                modified_code: last.trim().to_string(),
                found_block: true,
            }
        }
        None => Extraction {
            explanation: response.to_string(),
            modified_code: format!("{NO_BLOCK_NOTE}\n{response}"),
            found_block: false,
        },
    }
}

/// Bodies of every complete fenced block, language hints removed, in order.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(FENCE) {
        let body_start = &rest[open + FENCE.len()..];
        let Some(close) = body_start.find(FENCE) else {
            break;
        };
        blocks.push(strip_language_hint(&body_start[..close]));
        rest = &body_start[close + FENCE.len()..];
    }

    blocks
}

/// Drops a single-word tag sitting on the fence line, e.g. `pine` or `c++`.
fn strip_language_hint(body: &str) -> &str {
    match body.split_once('\n') {
        Some((tag, code)) if is_language_tag(tag) => code,
        _ => body,
    }
}

fn is_language_tag(tag: &str) -> bool {
    let tag = tag.trim_end_matches('\r');
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_with_language_hint() {
        let response = "The RSI threshold is too high.\n\n```pine\n//@version=4\nstrategy(\"X\")\n```\n";
        let extraction = extract_code_block(response);

        assert!(extraction.found_block);
        assert_eq!(extraction.explanation, "The RSI threshold is too high.");
        assert_eq!(extraction.modified_code, "//@version=4\nstrategy(\"X\")");
    }

    #[test]
    fn single_block_without_hint_is_trimmed() {
        let response = "Intro\n```\n\n  plot(close)  \n\n```";
        let extraction = extract_code_block(response);

        assert_eq!(extraction.explanation, "Intro");
        assert_eq!(extraction.modified_code, "plot(close)");
    }

    #[test]
    fn last_of_several_blocks_wins() {
        let response = "Before\n```pine\nfirst()\n```\nbetween\n```pine\nsecond()\n```\nafter";
        let extraction = extract_code_block(response);

        assert_eq!(extraction.explanation, "Before");
        assert_eq!(extraction.modified_code, "second()");
    }

    #[test]
    fn response_starting_with_a_fence_has_empty_explanation() {
        let extraction = extract_code_block("```pine\ncode()\n```\ntrailing prose");
        assert_eq!(extraction.explanation, "");
        assert_eq!(extraction.modified_code, "code()");
    }

    #[test]
    fn zero_fences_wrap_the_whole_response() {
        let response = "I could not improve this strategy.";
        let extraction = extract_code_block(response);

        assert!(!extraction.found_block);
        assert_eq!(extraction.explanation, response);
        assert_eq!(extraction.modified_code, format!("{NO_BLOCK_NOTE}\n{response}"));
    }

    #[test]
    fn unclosed_fence_counts_as_no_block() {
        let response = "Here you go:\n```pine\nstrategy(\"cut off";
        let extraction = extract_code_block(response);

        assert!(!extraction.found_block);
        assert!(extraction.modified_code.starts_with(NO_BLOCK_NOTE));
    }

    #[test]
    fn first_line_with_code_is_not_mistaken_for_a_hint() {
        let extraction = extract_code_block("```x = close + 1\nplot(x)\n```");
        assert_eq!(extraction.modified_code, "x = close + 1\nplot(x)");
    }

    #[test]
    fn inline_block_keeps_its_content() {
        let extraction = extract_code_block("Use ```plot(close)``` instead.");
        assert_eq!(extraction.modified_code, "plot(close)");
        assert_eq!(extraction.explanation, "Use");
    }
}
