//! Result formatting for the command line.

use clap::ValueEnum;
use serde_json::{Map, Value, json};

use affseed_core::{Account, AffiliateRecord, ErrorSet, OrderSnapshot, ProductSnapshot};

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
    Csv,
    Ids,
}

/// Fixed-column record set.
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    pub fields: Vec<&'static str>,
    pub rows: Vec<Vec<Value>>,
}

pub trait Row {
    const FIELDS: &'static [&'static str];

    fn values(&self) -> Vec<Value>;
}

impl Records {
    pub fn from_rows<T: Row>(items: &[T]) -> Self {
        Self {
            fields: T::FIELDS.to_vec(),
            rows: items.iter().map(Row::values).collect(),
        }
    }

    pub fn ids(ids: &[u64]) -> Self {
        Self {
            fields: vec!["id"],
            rows: ids.iter().map(|id| vec![json!(id)]).collect(),
        }
    }

    fn objects(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.fields
                    .iter()
                    .map(|field| field.to_string())
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

pub struct UserRow {
    pub id: u64,
    pub name: String,
    pub login: String,
}

impl From<&Account> for UserRow {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: display_name(account),
            login: account.login.clone(),
        }
    }
}

impl Row for UserRow {
    const FIELDS: &'static [&'static str] = &["id", "name", "login"];

    fn values(&self) -> Vec<Value> {
        vec![json!(self.id), json!(self.name), json!(self.login)]
    }
}

pub struct AffiliateRow {
    pub id: u64,
    pub name: String,
    pub login: String,
    pub user_id: u64,
    pub rate: f64,
    pub rate_type: String,
    pub status: String,
}

impl AffiliateRow {
    pub fn new(affiliate: &AffiliateRecord, account: Option<&Account>) -> Self {
        Self {
            id: affiliate.id,
            name: account.map(display_name).unwrap_or_default(),
            login: account.map(|account| account.login.clone()).unwrap_or_default(),
            user_id: affiliate.user_id,
            rate: affiliate.rate,
            rate_type: affiliate.rate_type.clone(),
            status: affiliate.status.clone(),
        }
    }
}

impl Row for AffiliateRow {
    const FIELDS: &'static [&'static str] =
        &["id", "name", "login", "user_id", "rate", "rate_type", "status"];

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.name),
            json!(self.login),
            json!(self.user_id),
            json!(self.rate),
            json!(self.rate_type),
            json!(self.status),
        ]
    }
}

impl Row for ProductSnapshot {
    const FIELDS: &'static [&'static str] = &["id", "name", "price", "status", "created"];

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.name),
            json!(self.price),
            json!(self.status),
            json!(self.created),
        ]
    }
}

impl Row for OrderSnapshot {
    const FIELDS: &'static [&'static str] = &["id", "customer", "total", "status", "date"];

    fn values(&self) -> Vec<Value> {
        vec![
            json!(self.id),
            json!(self.customer),
            json!(self.total),
            json!(self.status),
            json!(self.date),
        ]
    }
}

fn display_name(account: &Account) -> String {
    format!("{} {}", account.first_name, account.last_name)
}

pub fn render(format: OutputFormat, records: &Records) -> Result<String, CliError> {
    match format {
        OutputFormat::Ids => Ok(render_ids(records)),
        OutputFormat::Table => Ok(render_table(records)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&records.objects())?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&records.objects())?),
        OutputFormat::Csv => render_csv(records),
    }
}

/// Space separated values of the `id` column.
fn render_ids(records: &Records) -> String {
    let Some(column) = records.fields.iter().position(|field| *field == "id") else {
        return String::new();
    };
    records
        .rows
        .iter()
        .filter_map(|row| row.get(column))
        .map(cell)
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_table(records: &Records) -> String {
    let cells: Vec<Vec<String>> = records
        .rows
        .iter()
        .map(|row| row.iter().map(cell).collect())
        .collect();

    let mut widths: Vec<usize> = records.fields.iter().map(|field| field.len()).collect();
    for row in &cells {
        for (width, value) in widths.iter_mut().zip(row) {
            *width = (*width).max(value.chars().count());
        }
    }

    let line = |values: Vec<&str>| -> String {
        values
            .iter()
            .zip(&widths)
            .map(|(value, width)| format!("{value:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(records.fields.clone())];
    lines.push(line(widths.iter().map(|width| "-".repeat(*width)).collect::<Vec<_>>().iter().map(String::as_str).collect()));
    for row in &cells {
        lines.push(line(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}

fn render_csv(records: &Records) -> Result<String, CliError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&records.fields)?;
    for row in &records.rows {
        writer.write_record(row.iter().map(cell))?;
    }
    writer.flush()?;
    let bytes = writer
        .into_inner()
        .map_err(|err| CliError::Io(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Every error message, nested sources included.
pub fn error_message(errors: &ErrorSet) -> String {
    let mut message = String::from("Errors were found:");
    for line in errors.messages() {
        message.push_str("\n - ");
        message.push_str(&line);
    }
    message
}

#[cfg(test)]
mod tests {
    use affseed_core::ErrorRecord;

    use super::*;

    fn products() -> Records {
        Records::from_rows(&[
            ProductSnapshot {
                id: 1,
                name: "Widget".to_string(),
                price: 9.5,
                status: "publish".to_string(),
                created: "2024-01-01 00:00:00".to_string(),
            },
            ProductSnapshot {
                id: 12,
                name: "Gadget, deluxe".to_string(),
                price: 20.0,
                status: "publish".to_string(),
                created: "2024-01-02 00:00:00".to_string(),
            },
        ])
    }

    #[test]
    fn ids_format_prints_ids_only() {
        assert_eq!(render(OutputFormat::Ids, &products()).expect("renders"), "1 12");
        assert_eq!(render(OutputFormat::Ids, &Records::ids(&[3, 4])).expect("renders"), "3 4");
    }

    #[test]
    fn table_aligns_columns() {
        let table = render(OutputFormat::Table, &Records::ids(&[7, 1234])).expect("renders");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines, vec!["id", "----", "7", "1234"]);

        let table = render(OutputFormat::Table, &products()).expect("renders");
        let header = table.lines().next().expect("header");
        assert!(header.starts_with("id  name"));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let csv = render(OutputFormat::Csv, &products()).expect("renders");
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("id,name,price,status,created"));
        assert_eq!(lines.next(), Some("1,Widget,9.5,publish,2024-01-01 00:00:00"));
        assert_eq!(
            lines.next(),
            Some("12,\"Gadget, deluxe\",20.0,publish,2024-01-02 00:00:00")
        );
    }

    #[test]
    fn json_and_yaml_emit_objects() {
        let json = render(OutputFormat::Json, &products()).expect("renders");
        let parsed: Vec<Map<String, Value>> = serde_json::from_str(&json).expect("valid json");
        assert_eq!(parsed[1]["name"], "Gadget, deluxe");

        let yaml = render(OutputFormat::Yaml, &products()).expect("renders");
        let parsed: Vec<Map<String, Value>> = serde_yaml::from_str(&yaml).expect("valid yaml");
        assert_eq!(parsed[0]["id"], 1);
    }

    #[test]
    fn error_messages_list_every_record() {
        let mut errors = ErrorSet::single("invalid_user_number_arg", "Number too low.");
        errors.push(
            ErrorRecord::new("transactions_generation_failed", "Stages failed.")
                .with_source(ErrorSet::single("affseed_min_price_invalid", "Price too low.")),
        );

        let message = error_message(&errors);
        assert!(message.starts_with("Errors were found:"));
        assert!(message.contains(" - Number too low."));
        assert!(message.contains(" - Price too low."));
    }
}
