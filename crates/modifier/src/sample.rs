use core_types::WebhookEvent;
use serde_json::json;

/// The strategy analysed by the self-test endpoint. Its oversold level of 33 is
/// deliberately off the usual 30.
pub const SAMPLE_STRATEGY: &str = r#"//@version=4
strategy("Simple RSI Strategy", overlay=true)
rsiLength = input(14, title="RSI length")
rsiOverbought = input(70, title="RSI overbought level")
rsiOversold = input(33, title="RSI oversold level")
rsiValue = rsi(close, rsiLength)
if (crossover(rsiValue, rsiOversold))
    strategy.entry("RSI_Long", strategy.long)
if (crossunder(rsiValue, rsiOverbought))
    strategy.entry("RSI_Short", strategy.short)
"#;

/// The event paired with [`SAMPLE_STRATEGY`].
pub fn sample_event() -> WebhookEvent {
    WebhookEvent::new(json!({
        "trading_problem": "The RSI strategy has been unprofitable during the recent uptrend. The overbought and oversold levels do not fit current market conditions, and the take-profit and stop-loss settings need work.",
        "suggested_improvements": "Lower the RSI oversold level to 28 and raise take-profit from 5% to 7%. Apply a 2% trailing stop, and use the upper Bollinger Band as an extra exit signal to time short entries more precisely."
    }))
}
