//! Bulk history import: the untrusted-row parsing boundary.
//!
//! Import rows arrive as loosely-typed JSON objects exported from
//! spreadsheets — numbers may be strings with currency formatting, fields
//! may be empty, dates come as dd/MM/yyyy. Each row is parsed into a
//! validated [`ParsedHistoryRow`] or rejected with a per-row error; the
//! store never sees a half-coerced value.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::Value;
use siscoca_core::error::{SiscocaError, SiscocaResult};
use uuid::Uuid;

/// How an import row identifies its campaign, in resolution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignRef {
    Id(Uuid),
    ExternalPlatformId(String),
    Name(String),
}

/// A fully validated import row, ready to upsert into weekly history.
#[derive(Debug, Clone)]
pub struct ParsedHistoryRow {
    pub campaign: CampaignRef,
    pub iso_week: Option<u32>,
    pub week_date: Option<DateTime<Utc>>,
    pub reach: Option<u64>,
    pub clicks: Option<u64>,
    pub leads: Option<u64>,
    pub weekly_cost: Option<f64>,
    pub cost_per_lead: Option<f64>,
    pub registered_drivers: Option<u64>,
    pub first_trip_drivers: Option<u64>,
    pub recorded_by: Option<String>,
}

/// Parse one untrusted row. Fails only when the row cannot identify a
/// campaign; unparseable metric values degrade to `None` rather than
/// failing the row.
pub fn parse_row(raw: &Value) -> SiscocaResult<ParsedHistoryRow> {
    let obj = raw
        .as_object()
        .ok_or_else(|| SiscocaError::Import("row is not a JSON object".to_string()))?;

    let campaign = campaign_ref(obj)?;

    Ok(ParsedHistoryRow {
        campaign,
        iso_week: obj.get("iso_week").and_then(coerce_count).map(|w| w as u32),
        week_date: obj
            .get("week_date")
            .and_then(Value::as_str)
            .and_then(parse_date),
        reach: obj.get("reach").and_then(coerce_count),
        clicks: obj.get("clicks").and_then(coerce_count),
        leads: obj.get("leads").and_then(coerce_count),
        weekly_cost: obj.get("weekly_cost").and_then(coerce_money),
        cost_per_lead: obj.get("cost_per_lead").and_then(coerce_money),
        registered_drivers: obj.get("registered_drivers").and_then(coerce_count),
        first_trip_drivers: obj.get("first_trip_drivers").and_then(coerce_count),
        recorded_by: obj
            .get("recorded_by")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

fn campaign_ref(obj: &serde_json::Map<String, Value>) -> SiscocaResult<CampaignRef> {
    if let Some(id) = obj.get("campaign_id").and_then(Value::as_str) {
        if let Ok(uuid) = Uuid::parse_str(id.trim()) {
            return Ok(CampaignRef::Id(uuid));
        }
    }
    if let Some(ext) = non_empty_str(obj.get("external_platform_id")) {
        return Ok(CampaignRef::ExternalPlatformId(ext));
    }
    if let Some(name) = non_empty_str(obj.get("campaign_name")) {
        return Ok(CampaignRef::Name(name));
    }
    Err(SiscocaError::Import(
        "row has no campaign_id, external_platform_id, or campaign_name".to_string(),
    ))
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Tolerant monetary coercion: numbers pass through, strings are stripped
/// of `$`, thousands separators, and whitespace. Empty, unparseable, and
/// negative values degrade to `None`.
pub fn coerce_money(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Tolerant count coercion: same cleaning as money, rounded to a whole
/// number. Fractional lead counts from spreadsheets round to nearest.
pub fn coerce_count(value: &Value) -> Option<u64> {
    coerce_money(value).map(|v| v.round() as u64)
}

/// Accepts `dd/MM/yyyy` (with an optional time suffix, which is dropped)
/// and ISO `yyyy-MM-dd`.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let date_part = raw.trim().split_whitespace().next()?;
    let date = NaiveDate::parse_from_str(date_part, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y-%m-%d"))
        .ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_currency_formatted_strings() {
        assert_eq!(coerce_money(&json!("$1,234.56")), Some(1234.56));
        assert_eq!(coerce_money(&json!("2500")), Some(2500.0));
        assert_eq!(coerce_money(&json!(125.5)), Some(125.5));
        assert_eq!(coerce_money(&json!("")), None);
        assert_eq!(coerce_money(&json!("n/a")), None);
        assert_eq!(coerce_money(&json!(-3.0)), None);
        assert_eq!(coerce_money(&json!(null)), None);
    }

    #[test]
    fn counts_round_to_whole_numbers() {
        assert_eq!(coerce_count(&json!("49.6")), Some(50));
        assert_eq!(coerce_count(&json!("1,200")), Some(1200));
        assert_eq!(coerce_count(&json!("")), None);
    }

    #[test]
    fn parses_spreadsheet_dates() {
        let parsed = parse_date("24/03/2025 14:30").unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2025-03-24");
        let parsed = parse_date("2025-03-24").unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2025-03-24");
        assert!(parse_date("March 24").is_none());
    }

    #[test]
    fn row_requires_a_campaign_reference() {
        let row = json!({"reach": 100});
        assert!(parse_row(&row).is_err());

        let row = json!({"external_platform_id": "fb-123", "reach": "1,000"});
        let parsed = parse_row(&row).unwrap();
        assert_eq!(
            parsed.campaign,
            CampaignRef::ExternalPlatformId("fb-123".into())
        );
        assert_eq!(parsed.reach, Some(1000));
    }

    #[test]
    fn row_id_takes_priority_over_name() {
        let id = Uuid::new_v4();
        let row = json!({
            "campaign_id": id.to_string(),
            "campaign_name": "PE-MOTOPER-FB-ADQ-001-GF-Verano2025",
            "weekly_cost": "$2,500.00",
            "leads": 50
        });
        let parsed = parse_row(&row).unwrap();
        assert_eq!(parsed.campaign, CampaignRef::Id(id));
        assert_eq!(parsed.weekly_cost, Some(2500.0));
        assert_eq!(parsed.leads, Some(50));
    }
}
