use chrono::{DateTime, TimeZone};
use ncpack_core::{AttrValue, StoreWrite};

pub const HISTORY: &str = "history";

/// `"<ctime timestamp>: <argv joined by spaces>"`, e.g.
/// `"Tue Mar  4 09:15:02 2025: ncpack -v pr in.nc"`.
pub fn history_entry<Tz>(now: &DateTime<Tz>, argv: &[String]) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}: {}", now.format("%a %b %e %H:%M:%S %Y"), argv.join(" "))
}

/// Prepend `entry` to the store's `history` attribute, newest first, joined
/// with a single `\n` into one text value. A missing or non-text history is
/// replaced by `entry`.
pub fn update_history<W: StoreWrite + ?Sized>(dst: &mut W, entry: &str) -> anyhow::Result<()> {
    let value = match dst.global_attribute(HISTORY).and_then(|v| v.as_text()) {
        Some(previous) if !previous.is_empty() => format!("{}\n{}", entry, previous),
        _ => entry.to_string(),
    };
    dst.set_global_attribute(HISTORY, AttrValue::Text(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ncpack_core::{MemoryStore, StoreRead};

    #[test]
    fn test_entry_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 9, 15, 2).unwrap();
        let argv = vec!["ncpack".to_string(), "-v".to_string(), "pr".to_string(), "in.nc".to_string()];
        assert_eq!(history_entry(&now, &argv), "Tue Mar  4 09:15:02 2025: ncpack -v pr in.nc");
    }

    #[test]
    fn test_first_entry_becomes_history() {
        let mut store = MemoryStore::new();
        update_history(&mut store, "first").unwrap();
        assert_eq!(store.global_attributes().get(HISTORY).unwrap().as_text(), Some("first"));
    }

    #[test]
    fn test_newest_entry_is_prepended() {
        let mut store = MemoryStore::new();
        store
            .set_global_attribute(HISTORY, AttrValue::from("older\noldest"))
            .unwrap();
        update_history(&mut store, "newest").unwrap();
        let history = store.global_attributes().get(HISTORY).unwrap().as_text().unwrap();
        assert_eq!(history, "newest\nolder\noldest");
        assert_eq!(history.lines().count(), 3);
    }
}
