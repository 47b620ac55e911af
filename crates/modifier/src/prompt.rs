use crate::error::ModifierError;
use core_types::event::render_or;
use core_types::{strategy_name, WebhookEvent, ORIGINAL_STRATEGY_FALLBACK, UNKNOWN};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_PROBLEM: &str = "Strategy optimisation is required.";
const DEFAULT_IMPROVEMENTS: &str = "Adjust the strategy parameters to current market conditions.";

/// The built-in prompt, used when no external template file is configured.
pub const DEFAULT_TEMPLATE: &str = r#"You are an expert in optimising Pine Script strategy code. Analyse the trading strategy below and improve it.

## Original strategy: {strategy_name}
```pine
{original_code}
```

## Strategy performance:
- Profit factor: {profit_factor}
- Win rate: {win_rate}
- Average profit: {avg_profit}
- Maximum drawdown: {max_drawdown}

## Problem:
{trading_problem}

## Suggested improvements:
{suggested_improvements}

{trades_summary}

Improve the strategy code using the information above. Follow these rules:
1. Keep the core logic of the strategy, but optimise its parameters and conditions.
2. You may integrate additional features or indicators to improve performance.
3. The code must be valid Pine Script.
4. Add comments that explain each change.
5. Return the complete Pine Script code in a single ```pine fenced block.

Improved Pine Script code:
"#;

/// A prompt template with `{placeholder}` slots.
///
/// Recognised placeholders: `strategy_name`, `original_code`, `profit_factor`,
/// `win_rate`, `avg_profit`, `max_drawdown`, `trading_problem`,
/// `suggested_improvements`, `trades_summary` and `recent_log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::from_text(DEFAULT_TEMPLATE)
    }
}

impl PromptTemplate {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Reads the template at `path`, first writing the built-in template there if the
    /// file does not exist yet.
    pub async fn load_or_create(path: &Path) -> Result<Self, ModifierError> {
        let template_err = |source| ModifierError::Template {
            path: path.to_path_buf(),
            source,
        };

        if !tokio::fs::try_exists(path).await.map_err(template_err)? {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(template_err)?;
            }
            tokio::fs::write(path, DEFAULT_TEMPLATE)
                .await
                .map_err(template_err)?;
            tracing::info!(path = %path.display(), "Seeded the prompt template file.");
        }

        let text = tokio::fs::read_to_string(path).await.map_err(template_err)?;
        Ok(Self::from_text(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Renders the prompt for `original_code` and `event`. Missing event fields are
    /// replaced by documented defaults, never reported as errors.
    pub fn render(&self, original_code: &str, event: &WebhookEvent) -> String {
        substitute(&self.text, &prompt_fields(original_code, event))
    }
}

/// The value for every recognised placeholder.
pub fn prompt_fields(original_code: &str, event: &WebhookEvent) -> HashMap<&'static str, String> {
    let recent_log = event
        .to_pretty_json()
        .unwrap_or_else(|_| event.as_value().to_string());

    HashMap::from([
        (
            "strategy_name",
            strategy_name(original_code)
                .unwrap_or(ORIGINAL_STRATEGY_FALLBACK)
                .to_string(),
        ),
        ("original_code", original_code.to_string()),
        ("profit_factor", event.performance_field("profit_factor")),
        ("win_rate", event.performance_field("win_rate")),
        ("avg_profit", event.performance_field("avg_profit")),
        ("max_drawdown", event.performance_field("max_drawdown")),
        ("trading_problem", event.text_or("trading_problem", DEFAULT_PROBLEM)),
        (
            "suggested_improvements",
            event.text_or("suggested_improvements", DEFAULT_IMPROVEMENTS),
        ),
        ("trades_summary", trades_summary(&event.recent_trades())),
        ("recent_log", recent_log),
    ])
}

/// One line per trade, under a header. Empty when there are no trades.
pub fn trades_summary(trades: &[Value]) -> String {
    if trades.is_empty() {
        return String::new();
    }

    let mut summary = format!("Summary of the last {} trades:\n", trades.len());
    for (i, trade) in trades.iter().enumerate() {
        summary.push_str(&format!(
            "- Trade {}: {}, result: {}, return: {}%\n",
            i + 1,
            render_or(trade.get("direction"), UNKNOWN),
            render_or(trade.get("result"), UNKNOWN),
            render_or(trade.get("profit_pct"), UNKNOWN),
        ));
    }
    summary
}

/// Replaces `{key}` slots in a single left-to-right pass. Text that came from a
/// substituted value is never rescanned, and unknown slots are kept verbatim.
fn substitute(template: &str, fields: &HashMap<&'static str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after
            .find('}')
            .and_then(|close| fields.get(&after[..close]).map(|value| (close, value)));

        match slot {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
