//! Price statistics over a snapshot, for the dashboard.

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::ScrapedItem;

pub const DEFAULT_BUCKETS: usize = 20;

static PRICE_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").ok());

/// Numeric value of a raw price string such as `"EGP 1,299.50"`.
/// Thousands separators are dropped and the first number wins.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    let regex = PRICE_REGEX.as_ref()?;
    let number = regex.captures(&cleaned)?.get(1)?.as_str();
    Decimal::from_str(number).ok()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub lower: Decimal,
    pub upper: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSummary {
    /// Items with a parsable price.
    pub count: usize,
    /// Items whose price could not be read.
    pub skipped: usize,
    pub lowest: Decimal,
    pub highest: Decimal,
    pub average: Decimal,
    pub median: Decimal,
    pub histogram: Vec<HistogramBucket>,
}

impl PriceSummary {
    /// `None` when no item carries a readable price.
    pub fn from_items<'a, I>(items: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ScrapedItem>,
    {
        Self::with_buckets(items, DEFAULT_BUCKETS)
    }

    pub fn with_buckets<'a, I>(items: I, buckets: usize) -> Option<Self>
    where
        I: IntoIterator<Item = &'a ScrapedItem>,
    {
        let mut prices = Vec::new();
        let mut skipped = 0;
        for item in items {
            match parse_price(item.price_raw()) {
                Some(price) => prices.push(price),
                None => skipped += 1,
            }
        }
        if prices.is_empty() {
            return None;
        }

        prices.sort();
        let count = prices.len();
        let lowest = prices[0];
        let highest = prices[count - 1];
        let total: Decimal = prices.iter().sum();
        let average = (total / Decimal::from(count)).round_dp(2);
        let median = if count % 2 == 1 {
            prices[count / 2]
        } else {
            (prices[count / 2 - 1] + prices[count / 2]) / Decimal::TWO
        };

        Some(Self {
            count,
            skipped,
            lowest,
            highest,
            average,
            median,
            histogram: histogram(&prices, buckets.max(1)),
        })
    }
}

/// Equal-width buckets between the lowest and highest price. `prices` must
/// be sorted and non-empty.
fn histogram(prices: &[Decimal], buckets: usize) -> Vec<HistogramBucket> {
    let lowest = prices[0];
    let highest = prices[prices.len() - 1];

    if lowest == highest {
        return vec![HistogramBucket {
            lower: lowest,
            upper: highest,
            count: prices.len(),
        }];
    }

    let width = (highest - lowest) / Decimal::from(buckets);
    let mut histogram: Vec<HistogramBucket> = (0..buckets)
        .map(|i| {
            let lower = lowest + width * Decimal::from(i);
            let upper = if i + 1 == buckets {
                highest
            } else {
                lowest + width * Decimal::from(i + 1)
            };
            HistogramBucket {
                lower: lower.round_dp(2),
                upper: upper.round_dp(2),
                count: 0,
            }
        })
        .collect();

    for price in prices {
        let index = ((*price - lowest) / width)
            .floor()
            .to_usize()
            .unwrap_or(0)
            .min(buckets - 1);
        histogram[index].count += 1;
    }
    histogram
}
