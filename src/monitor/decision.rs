use rust_decimal::Decimal;

use crate::types::Product;

/// Outcome of comparing a freshly fetched price against stored history.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertDecision {
    /// No prior observation. History is bootstrapped silently.
    FirstObservation,
    /// Same price as the latest observation.
    Unchanged,
    /// Price moved but stayed above the trailing-window minimum.
    AboveWindowLow { window_min: Decimal },
    /// At or below the window minimum (or the window is empty): alert.
    NewLow(NewLow),
}

impl AlertDecision {
    pub fn label(&self) -> &'static str {
        match self {
            AlertDecision::FirstObservation => "first_observation",
            AlertDecision::Unchanged => "unchanged",
            AlertDecision::AboveWindowLow { .. } => "above_window_low",
            AlertDecision::NewLow(_) => "new_low",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLow {
    pub previous: Decimal,
    pub current: Decimal,
    /// `previous - current`. Negative only when the previous observation has
    /// aged out of the window and the price rose.
    pub savings: Decimal,
    pub window_min: Option<Decimal>,
}

impl NewLow {
    /// True when the current price is itself the window's lowest.
    pub fn is_window_low(&self) -> bool {
        self.window_min.map_or(true, |min| self.current == min)
    }
}

/// Whether `decide` will need the window minimum for these inputs. Lets the
/// caller skip the store query for first and unchanged observations.
pub fn needs_window_minimum(previous: Option<Decimal>, current: Decimal) -> bool {
    previous.is_some_and(|prev| prev != current)
}

pub fn decide(
    previous: Option<Decimal>,
    current: Decimal,
    window_min: Option<Decimal>,
) -> AlertDecision {
    let Some(previous) = previous else {
        return AlertDecision::FirstObservation;
    };
    if current == previous {
        return AlertDecision::Unchanged;
    }
    match window_min {
        Some(min) if current > min => AlertDecision::AboveWindowLow { window_min: min },
        _ => AlertDecision::NewLow(NewLow {
            previous,
            current,
            savings: previous - current,
            window_min,
        }),
    }
}

pub fn format_amount(currency: &str, amount: Decimal) -> String {
    match currency {
        "INR" => format!("₹{amount:.2}"),
        other => format!("{other} {amount:.2}"),
    }
}

pub fn render_alert(product: &Product, low: &NewLow, window_days: u32, currency: &str) -> String {
    let lowest = if low.is_window_low() {
        "YES! 🎉".to_string()
    } else {
        // Strictly below the old minimum: show the minimum that was beaten.
        format_amount(currency, low.window_min.unwrap_or(low.current))
    };

    format!(
        "🚨 PRICE DROP ALERT! 🚨\n\n\
         Product: {}\n\
         Platform: {}\n\
         Previous Price: {}\n\
         Current Price: {}\n\
         Savings: {}\n\
         Lowest in {} days: {}\n\n\
         🔗 {}",
        product.name,
        product.platform,
        format_amount(currency, low.previous),
        format_amount(currency, low.current),
        format_amount(currency, low.savings),
        window_days,
        lowest,
        product.url,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Platform;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    /// 1.00 .. 20.00 in quarter steps.
    fn price_grid() -> Vec<Decimal> {
        (4..=80).map(|q| Decimal::new(q * 25, 2)).collect()
    }

    #[test]
    fn first_observation_never_alerts() {
        for current in price_grid() {
            for min in [None, Some(dec("1")), Some(dec("20"))] {
                assert_eq!(decide(None, current, min), AlertDecision::FirstObservation);
            }
        }
    }

    #[test]
    fn unchanged_price_never_alerts() {
        for p in price_grid() {
            for min in [None, Some(p), Some(dec("0.50"))] {
                assert_eq!(decide(Some(p), p, min), AlertDecision::Unchanged);
            }
        }
        // 999 and 999.00 are the same price
        assert_eq!(decide(Some(dec("999.00")), dec("999"), None), AlertDecision::Unchanged);
    }

    #[test]
    fn drop_to_or_below_window_min_alerts_with_non_negative_savings() {
        let grid = price_grid();
        for &prev in &grid {
            for &cur in grid.iter().filter(|c| **c < prev) {
                for min in std::iter::once(None).chain(grid.iter().filter(|m| cur <= **m).map(|m| Some(*m))) {
                    match decide(Some(prev), cur, min) {
                        AlertDecision::NewLow(low) => {
                            assert_eq!(low.savings, prev - cur);
                            assert!(low.savings >= Decimal::ZERO);
                        }
                        other => panic!("prev={prev} cur={cur} min={min:?} → {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn drop_above_window_min_is_silent() {
        let grid = price_grid();
        for &prev in &grid {
            for &cur in grid.iter().filter(|c| **c < prev) {
                for &min in grid.iter().filter(|m| **m < cur) {
                    assert_eq!(
                        decide(Some(prev), cur, Some(min)),
                        AlertDecision::AboveWindowLow { window_min: min }
                    );
                }
            }
        }
    }

    #[test]
    fn rise_cannot_alert_while_previous_is_inside_the_window() {
        // With the previous observation inside the window, min <= previous.
        let grid = price_grid();
        for &prev in &grid {
            for &cur in grid.iter().filter(|c| **c > prev) {
                for &min in grid.iter().filter(|m| **m <= prev) {
                    assert!(!matches!(decide(Some(prev), cur, Some(min)), AlertDecision::NewLow(_)));
                }
            }
        }
    }

    #[test]
    fn rise_after_window_gap_alerts_with_negative_savings() {
        // Previous observation older than the window: the window is empty.
        match decide(Some(dec("1000")), dec("1100"), None) {
            AlertDecision::NewLow(low) => assert_eq!(low.savings, dec("-100")),
            other => panic!("expected NewLow, got {other:?}"),
        }
    }

    #[test]
    fn scenario_decisions() {
        assert_eq!(
            decide(Some(dec("1000.00")), dec("1000.00"), Some(dec("950.00"))),
            AlertDecision::Unchanged
        );
        assert!(matches!(
            decide(Some(dec("1000.00")), dec("900.00"), Some(dec("950.00"))),
            AlertDecision::NewLow(_)
        ));
        assert_eq!(
            decide(Some(dec("1000.00")), dec("950.00"), Some(dec("900.00"))),
            AlertDecision::AboveWindowLow { window_min: dec("900.00") }
        );
    }

    #[test]
    fn window_query_only_needed_for_changed_prices() {
        assert!(!needs_window_minimum(None, dec("5")));
        assert!(!needs_window_minimum(Some(dec("5.00")), dec("5")));
        assert!(needs_window_minimum(Some(dec("6")), dec("5")));
    }

    fn product() -> Product {
        Product {
            id: "p1".into(),
            name: "Noise Buds VS102".into(),
            url: "https://www.amazon.in/dp/B0B".into(),
            platform: Platform::Amazon,
            created_at: 0,
        }
    }

    #[test]
    fn message_shows_savings_and_window_flag() {
        let low = NewLow {
            previous: dec("1000"),
            current: dec("900"),
            savings: dec("100"),
            window_min: Some(dec("900")),
        };
        let msg = render_alert(&product(), &low, 30, "INR");
        assert!(msg.contains("Product: Noise Buds VS102"));
        assert!(msg.contains("Platform: amazon"));
        assert!(msg.contains("Previous Price: ₹1000.00"));
        assert!(msg.contains("Current Price: ₹900.00"));
        assert!(msg.contains("Savings: ₹100.00"));
        assert!(msg.contains("Lowest in 30 days: YES! 🎉"));
        assert!(msg.ends_with("🔗 https://www.amazon.in/dp/B0B"));
    }

    #[test]
    fn message_shows_beaten_minimum() {
        let low = NewLow {
            previous: dec("1000"),
            current: dec("900"),
            savings: dec("100"),
            window_min: Some(dec("950")),
        };
        let msg = render_alert(&product(), &low, 7, "USD");
        assert!(msg.contains("Savings: USD 100.00"));
        assert!(msg.contains("Lowest in 7 days: USD 950.00"));
    }
}
