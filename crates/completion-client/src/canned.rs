use crate::error::CompletionError;
use crate::{Completion, CompletionProvider, CompletionRequest, Usage};
use async_trait::async_trait;

const CANNED_RESPONSE: &str = r#"The RSI oversold threshold is set too high. At 33 it sits above the usual oversold level of 30, so the strategy fires too many long entries.

The take-profit and stop-loss handling also needs work: it may pass a backtest but behaves poorly in live trading.

Changes:
1. Lower the RSI oversold threshold from 33 to 30.
2. Compute take-profit and stop-loss levels from the average position price.
3. Document every strategy input.

```pine
//@version=4
strategy("Simple RSI Strategy", overlay=true, pyramiding=0, default_qty_type=strategy.percent_of_equity, default_qty_value=10)

// Inputs
rsiLength = input(14, title="RSI length")
rsiOverbought = input(70, title="RSI overbought level")
rsiOversold = input(30, title="RSI oversold level") // lowered from 33
takeProfitPct = input(5.0, title="Take profit %")
stopLossPct = input(3.0, title="Stop loss %")

rsiValue = rsi(close, rsiLength)

longCondition = crossover(rsiValue, rsiOversold)
shortCondition = crossunder(rsiValue, rsiOverbought)

if (longCondition)
    strategy.entry("RSI_Long", strategy.long)

if (shortCondition)
    strategy.entry("RSI_Short", strategy.short)

// Exits relative to the average entry price
longTakeProfitPrice = strategy.position_avg_price * (1 + takeProfitPct / 100)
longStopLossPrice = strategy.position_avg_price * (1 - stopLossPct / 100)
shortTakeProfitPrice = strategy.position_avg_price * (1 - takeProfitPct / 100)
shortStopLossPrice = strategy.position_avg_price * (1 + stopLossPct / 100)

if (strategy.position_size > 0)
    strategy.exit("TP_SL_Long", "RSI_Long", limit=longTakeProfitPrice, stop=longStopLossPrice)
else if (strategy.position_size < 0)
    strategy.exit("TP_SL_Short", "RSI_Short", limit=shortTakeProfitPrice, stop=shortStopLossPrice)

plot(rsiValue, "RSI", color.blue)
hline(rsiOverbought, "Overbought", color.red)
hline(rsiOversold, "Oversold", color.green)
```
"#;

/// An offline provider that answers every prompt with the same rewrite.
#[derive(Debug, Clone)]
pub struct CannedProvider {
    model: String,
}

impl CannedProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for CannedProvider {
    fn name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, CompletionError> {
        // Rough four-characters-per-token estimate.
        let prompt_tokens = (request.prompt.len() / 4) as u32;
        let completion_tokens = (CANNED_RESPONSE.len() / 4) as u32;

        Ok(Completion {
            text: CANNED_RESPONSE.to_string(),
            model: self.model.clone(),
            usage: Some(Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: ((request.prompt.len() + CANNED_RESPONSE.len()) / 4) as u32,
            }),
        })
    }
}
