use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use getset::{CopyGetters, Getters};
use rust_decimal::Decimal;

// Every date layout below, followed by a time.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y.%m.%dT%H:%M:%S%.f",
    "%Y.%m.%d %H:%M",
    "%Y%m%d %H:%M:%S%.f",
    "%Y%m%dT%H:%M:%S%.f",
    "%Y%m%d %H:%M",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%YT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d", "%m/%d/%Y"];

/// Parses a calendar timestamp in any of the layouts spreadsheets commonly export.
///
/// Returns `None` for anything unrecognised, including empty cells. Offsets in
/// RFC 3339 input are dropped and the local wall-clock time is kept.
pub fn parse_order_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.naive_local());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Parses a sales amount, tolerating thousands separators such as `4,000`.
pub fn parse_price(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<Decimal>().ok()
}

/// One cleaned sales record.
///
/// `year` and `month` are derived from `order_date` on construction and
/// cannot be set independently.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct Transaction {
    #[getset(get_copy = "pub")]
    order_date: NaiveDateTime,
    #[getset(get = "pub")]
    item: String,
    #[getset(get_copy = "pub")]
    price: Decimal,
    #[getset(get_copy = "pub")]
    year: i32,
    #[getset(get_copy = "pub")]
    month: u32,
    /// Remaining source columns as `(header, value)`, in source column order.
    #[getset(get = "pub")]
    extra: Vec<(String, String)>,
}

impl Transaction {
    pub fn new(order_date: NaiveDateTime, item: impl Into<String>, price: Decimal) -> Transaction {
        Transaction {
            order_date,
            item: item.into(),
            price,
            year: order_date.year(),
            month: order_date.month(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, extra: Vec<(String, String)>) -> Transaction {
        self.extra = extra;
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn test_parse_date_layouts() {
        let midnight = ymd_hms(2023, 1, 5, 0, 0, 0);
        for raw in ["2023-01-05", "2023/01/05", "2023.01.05", "20230105", "01/05/2023", " 2023-01-05 "] {
            assert_eq!(parse_order_date(raw), Some(midnight), "layout {:?}", raw);
        }
    }

    #[test]
    fn test_parse_datetime_layouts() {
        let expected = ymd_hms(2023, 1, 5, 14, 30, 0);
        for raw in [
            "2023-01-05 14:30:00",
            "2023-01-05T14:30:00",
            "2023-01-05 14:30",
            "2023/01/05 14:30:00",
            "2023/01/05T14:30:00",
            "2023/01/05 14:30",
            "2023.01.05 14:30:00",
            "2023.01.05T14:30:00",
            "2023.01.05 14:30",
            "20230105 14:30:00",
            "20230105T14:30:00",
            "20230105 14:30",
            "01/05/2023 14:30:00",
            "01/05/2023T14:30:00",
            "01/05/2023 14:30",
            "2023-01-05 14:30:00.000",
            "2023-01-05T14:30:00+09:00",
        ] {
            assert_eq!(parse_order_date(raw), Some(expected), "layout {:?}", raw);
        }
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        for raw in ["unknown", "", "   ", "2023-13-01", "2023-02-30", "yesterday"] {
            assert_eq!(parse_order_date(raw), None, "input {:?}", raw);
        }
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("4000"), Some(dec!(4000)));
        assert_eq!(parse_price("4,000"), Some(dec!(4000)));
        assert_eq!(parse_price(" 3500.50 "), Some(dec!(3500.50)));
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn test_calendar_fields_follow_order_date() {
        let tx = Transaction::new(ymd_hms(2022, 12, 31, 23, 59, 59), "Latte", dec!(4000));
        assert_eq!(tx.year(), 2022);
        assert_eq!(tx.month(), 12);
        assert_eq!(tx.item(), "Latte");
        assert_eq!(tx.price(), dec!(4000));
        assert_eq!(tx.extra().is_empty(), true);
    }
}
