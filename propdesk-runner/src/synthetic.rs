//! Synthetic trade histories for demos, benchmarks and tests.
//!
//! Output is deterministic for a given seed and deliberately mixes the
//! payload shapes real exports use (snake_case API, MT5 terminal dump,
//! camelCase with Unix milliseconds) so it exercises the normalizer too.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use propdesk_core::normalize::RawTrade;

const SYMBOLS: &[&str] = &["EURUSD", "GBPUSD", "USDJPY", "XAUUSD", "US30", "NAS100"];

/// Knobs for `generate_trades`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticOptions {
    pub seed: u64,
    pub count: usize,
    /// First trading day; weekends are skipped.
    pub start: NaiveDate,
    /// Share of trades left open at the end of the history.
    pub open_rate: f64,
    /// Share of records emitted with a required field missing.
    pub malformed_rate: f64,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            count: 60,
            start: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap_or_default(),
            open_rate: 0.05,
            malformed_rate: 0.0,
        }
    }
}

/// Generate a raw trade history, oldest first.
pub fn generate_trades(opts: &SyntheticOptions) -> Vec<RawTrade> {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut day = opts.start;
    let mut trades = Vec::with_capacity(opts.count);

    while trades.len() < opts.count {
        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += Duration::days(1);
            continue;
        }

        let per_day = rng.gen_range(1..=4);
        for _ in 0..per_day {
            if trades.len() >= opts.count {
                break;
            }
            let index = trades.len();
            let open_time = day.and_hms_opt(7, 0, 0).unwrap_or_default().and_utc()
                + Duration::minutes(rng.gen_range(0..(12 * 60)));
            let close_time = if index + 1 > opts.count.saturating_sub(tail_open(opts)) {
                None
            } else {
                Some(open_time + Duration::minutes(rng.gen_range(2..(6 * 60))))
            };
            let trade = SyntheticTrade::random(&mut rng, 100_000 + index as u64, open_time, close_time);
            let malformed = rng.gen_bool(opts.malformed_rate.clamp(0.0, 1.0));
            trades.push(trade.to_payload(index % 3, malformed));
        }
        day += Duration::days(1);
    }
    trades
}

/// Number of trailing trades left open.
fn tail_open(opts: &SyntheticOptions) -> usize {
    (opts.count as f64 * opts.open_rate.clamp(0.0, 1.0)).round() as usize
}

struct SyntheticTrade {
    ticket: u64,
    symbol: &'static str,
    sell: bool,
    volume: f64,
    open_time: DateTime<Utc>,
    close_time: Option<DateTime<Utc>>,
    profit: f64,
    commission: f64,
    swap: f64,
}

impl SyntheticTrade {
    fn random(
        rng: &mut StdRng,
        ticket: u64,
        open_time: DateTime<Utc>,
        close_time: Option<DateTime<Utc>>,
    ) -> Self {
        let volume = (rng.gen_range(0.1..3.0_f64) * 100.0).round() / 100.0;
        let profit = if close_time.is_none() {
            0.0
        } else if rng.gen_bool(0.52) {
            rng.gen_range(50.0..600.0_f64)
        } else {
            -rng.gen_range(40.0..500.0_f64)
        };
        let overnight = close_time.is_some_and(|c| c.date_naive() != open_time.date_naive());
        Self {
            ticket,
            symbol: SYMBOLS[rng.gen_range(0..SYMBOLS.len())],
            sell: rng.gen_bool(0.5),
            volume,
            open_time,
            close_time,
            profit: (profit * 100.0).round() / 100.0,
            commission: -(volume * 7.0 * 100.0).round() / 100.0,
            swap: if overnight { -(volume * 2.5) } else { 0.0 },
        }
    }

    fn side(&self) -> &'static str {
        if self.sell {
            "sell"
        } else {
            "buy"
        }
    }

    fn to_payload(&self, style: usize, malformed: bool) -> RawTrade {
        let mut payload = match style {
            0 => json!({
                "id": self.ticket.to_string(),
                "symbol": self.symbol,
                "side": self.side(),
                "volume": self.volume,
                "open_time": self.open_time.to_rfc3339(),
                "close_time": self.close_time.map(|c| c.to_rfc3339()),
                "profit": self.profit,
                "commission": self.commission,
                "swap": self.swap,
            }),
            1 => json!({
                "Position": self.ticket,
                "Symbol": self.symbol,
                "Type": self.side(),
                "Volume": format!("{:.2}", self.volume),
                "Time Open": self.open_time.format("%Y.%m.%d %H:%M:%S").to_string(),
                "Time Close": self
                    .close_time
                    .map_or(String::new(), |c| c.format("%Y.%m.%d %H:%M:%S").to_string()),
                "Commission": format!("{:.2}", self.commission),
                "Swap": format!("{:.2}", self.swap),
                "Profit": format!("{:.2}", self.profit),
            }),
            _ => json!({
                "tradeId": self.ticket,
                "instrument": self.symbol,
                "direction": self.side().to_uppercase(),
                "lots": self.volume,
                "openTime": self.open_time.timestamp_millis(),
                "closeTime": self.close_time.map_or(0, |c| c.timestamp_millis()),
                "pnl": self.profit,
                "fees": self.commission,
                "rollover": self.swap,
            }),
        };
        if malformed {
            if let Some(obj) = payload.as_object_mut() {
                obj.retain(|key, _| !key.to_ascii_lowercase().contains("symbol") && key != "instrument");
            }
        }
        payload
    }
}
