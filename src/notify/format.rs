//! Signal event to message text

use crate::indicators::{kdj, macd, PairPoint};
use crate::models::{IndicatorKind, SignalEvent, SignalKind};

/// Render the alert message for one crossover event.
pub fn render(event: &SignalEvent) -> String {
    let (emoji, action) = match event.kind {
        SignalKind::GoldenCross => ("\u{1F4C8}", "golden cross"),
        SignalKind::DeathCross => ("\u{1F4C9}", "death cross"),
        SignalKind::None => ("", "no signal"),
    };

    let mut msg = format!("{} *{}*\n\n", emoji, event.symbol);
    msg.push_str(&format!("\u{1F514} {} {}\n", event.indicator, action));
    msg.push_str(&format!("\u{1F4B0} price: {:.2}\n", event.close));
    msg.push_str(&format!(
        "\u{23F0} {}\n",
        event.bar_ts.format("%Y-%m-%d %H:%M")
    ));
    msg.push_str(&format!("\u{1F4CA} timeframe: {}\n", event.timeframe));

    let point = PairPoint {
        fast: event.snapshot.fast,
        slow: event.snapshot.slow,
    };
    match event.indicator {
        IndicatorKind::Macd => {
            msg.push_str(&format!("\nDIF: {:.4}\n", point.fast));
            msg.push_str(&format!("DEA: {:.4}\n", point.slow));
            msg.push_str(&format!("MACD: {:.4}", macd::histogram(&point)));
        }
        IndicatorKind::Kdj => {
            msg.push_str(&format!("\nK: {:.2}\n", point.fast));
            msg.push_str(&format!("D: {:.2}\n", point.slow));
            msg.push_str(&format!("J: {:.2}", kdj::j_value(&point)));
        }
        IndicatorKind::Ma => {
            msg.push_str(&format!("\nMA5: {:.2}\n", point.fast));
            msg.push_str(&format!("MA10: {:.2}", point.slow));
        }
    }

    msg
}
