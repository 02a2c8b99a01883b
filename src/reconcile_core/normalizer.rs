//! Row normalization from JSONL records to business and category keys

use super::units::hours_to_units;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::error::Error;

pub const FIELD_PO: &str = "PO";
pub const FIELD_WORK_CITY: &str = "Work City";
pub const FIELD_PROJECT: &str = "Project";
pub const FIELD_PLANNING_GROUP: &str = "Planning Group";
pub const FIELD_ROLE: &str = "Role";
pub const FIELD_LEVEL: &str = "Level";
pub const FIELD_LANGUAGE: &str = "Language";
pub const FIELD_WEEK: &str = "Week";
pub const FIELD_COUNTRY: &str = "Country";
pub const FIELD_FACILITY: &str = "Facility";
pub const FIELD_HOURS: &str = "Hours";

pub const DEFAULT_UNASSIGNED_COUNTRY: &str = "No Assigned Country Yet";
pub const DEFAULT_UNASSIGNED_FACILITY: &str = "No Assigned Facility Yet";

/// Identifies one billing line item. Field order is the sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessKey {
    pub po: String,
    pub work_city: String,
    pub project: String,
    pub planning_group: String,
    pub role: String,
    pub level: String,
    pub language: String,
    pub week: String,
}

impl BusinessKey {
    /// Fields in output column order
    pub fn fields(&self) -> [&str; 8] {
        [
            self.po.as_str(),
            self.work_city.as_str(),
            self.project.as_str(),
            self.planning_group.as_str(),
            self.role.as_str(),
            self.level.as_str(),
            self.language.as_str(),
            self.week.as_str(),
        ]
    }
}

/// The (country, facility) pair a bucket of capacity belongs to
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CategoryKey {
    pub country: String,
    pub facility: String,
}

impl CategoryKey {
    pub fn new(country: impl Into<String>, facility: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            facility: facility.into(),
        }
    }
}

/// Sentinel values marking a row as an unassigned adjustment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnassignedSentinel {
    pub country: String,
    pub facility: String,
}

impl Default for UnassignedSentinel {
    fn default() -> Self {
        Self {
            country: DEFAULT_UNASSIGNED_COUNTRY.to_string(),
            facility: DEFAULT_UNASSIGNED_FACILITY.to_string(),
        }
    }
}

impl UnassignedSentinel {
    /// Both category fields must be absent or equal to the sentinel pair.
    pub fn matches(&self, category: &CategoryKey) -> bool {
        let country_unassigned = category.country.is_empty() || category.country == self.country;
        let facility_unassigned =
            category.facility.is_empty() || category.facility == self.facility;
        country_unassigned && facility_unassigned
    }

    pub fn category(&self) -> CategoryKey {
        CategoryKey::new(self.country.clone(), self.facility.clone())
    }
}

/// A raw input row: one field-value mapping as supplied by ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow {
    pub fields: Map<String, Value>,
}

impl RawRow {
    /// Parse a RawRow from a JSONL line
    pub fn from_jsonl(line: &str) -> Result<Self, Box<dyn Error>> {
        let row: RawRow = serde_json::from_str(line)?;
        Ok(row)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Text value of a field; missing and null become the empty string
    pub fn text(&self, field: &str) -> String {
        match self.fields.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => number_text(n),
            Some(other) => other.to_string(),
        }
    }

    pub fn business_key(&self) -> BusinessKey {
        BusinessKey {
            po: self.text(FIELD_PO),
            work_city: self.text(FIELD_WORK_CITY),
            project: self.text(FIELD_PROJECT),
            planning_group: self.text(FIELD_PLANNING_GROUP),
            role: self.text(FIELD_ROLE),
            level: self.text(FIELD_LEVEL),
            language: self.text(FIELD_LANGUAGE),
            week: self.text(FIELD_WEEK),
        }
    }

    pub fn category_key(&self) -> CategoryKey {
        CategoryKey::new(self.text(FIELD_COUNTRY), self.text(FIELD_FACILITY))
    }

    /// Raw hours value, `None` when missing or not numeric
    pub fn hours(&self) -> Option<f64> {
        match self.fields.get(FIELD_HOURS)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Quantity in fixed-point units; malformed values coerce to zero
    pub fn quantity_units(&self) -> i64 {
        self.hours().map(hours_to_units).unwrap_or(0)
    }
}

/// Shortest decimal text for a JSON number; `37.0` renders as `37`.
fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f == 0.0 => "0".to_string(),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_row_jsonl() {
        let line = r#"{"PO":"4500012345","Work City":"Manila","Project":"MUPDA","Planning Group":"PG-1","Role":"Annotator","Level":"L2","Language":"English","Week":37,"Country":"Philippines","Facility":"MNL-1","Hours":"12.5"}"#;

        let row = RawRow::from_jsonl(line).unwrap();
        let key = row.business_key();
        assert_eq!(key.po, "4500012345");
        assert_eq!(key.work_city, "Manila");
        assert_eq!(key.week, "37");
        assert_eq!(row.category_key(), CategoryKey::new("Philippines", "MNL-1"));
        assert_eq!(row.quantity_units(), 1_250_000_000);
    }

    #[test]
    fn test_malformed_jsonl() {
        let line = r#"{"PO": "1"#;
        assert!(RawRow::from_jsonl(line).is_err());
        assert!(RawRow::from_jsonl("[1, 2]").is_err());
    }

    #[test]
    fn test_non_numeric_hours_coerce_to_zero() {
        let row = RawRow::from_pairs([(FIELD_HOURS, json!("n/a"))]);
        assert_eq!(row.hours(), None);
        assert_eq!(row.quantity_units(), 0);

        let row = RawRow::from_pairs([(FIELD_HOURS, json!(true))]);
        assert_eq!(row.quantity_units(), 0);

        let row = RawRow::from_pairs([(FIELD_HOURS, json!("inf"))]);
        assert_eq!(row.quantity_units(), 0);

        let row = RawRow::default();
        assert_eq!(row.quantity_units(), 0);
    }

    #[test]
    fn test_whole_float_key_fields_match_integers() {
        let int_row = RawRow::from_jsonl(r#"{"PO":4500012345,"Week":37}"#).unwrap();
        let float_row = RawRow::from_jsonl(r#"{"PO":4500012345.0,"Week":37.0}"#).unwrap();

        assert_eq!(float_row.text(FIELD_WEEK), "37");
        assert_eq!(float_row.text(FIELD_PO), "4500012345");
        assert_eq!(int_row.business_key(), float_row.business_key());

        let row = RawRow::from_pairs([(FIELD_LEVEL, json!(2.5)), (FIELD_WEEK, json!(-0.0))]);
        assert_eq!(row.text(FIELD_LEVEL), "2.5");
        assert_eq!(row.text(FIELD_WEEK), "0");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let row = RawRow::from_pairs([(FIELD_PO, json!(null))]);
        assert_eq!(row.text(FIELD_PO), "");
        assert_eq!(row.text(FIELD_ROLE), "");
    }

    #[test]
    fn test_sentinel_matching() {
        let sentinel = UnassignedSentinel::default();

        assert!(sentinel.matches(&CategoryKey::new(
            DEFAULT_UNASSIGNED_COUNTRY,
            DEFAULT_UNASSIGNED_FACILITY
        )));
        assert!(sentinel.matches(&CategoryKey::new("", "")));
        assert!(sentinel.matches(&CategoryKey::new(DEFAULT_UNASSIGNED_COUNTRY, "")));
        assert!(!sentinel.matches(&CategoryKey::new("India", "")));
        assert!(!sentinel.matches(&CategoryKey::new(DEFAULT_UNASSIGNED_COUNTRY, "BLR-2")));
    }
}
