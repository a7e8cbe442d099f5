use crate::ledger::LedgerEntry;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct DatasetRow {
    #[tabled(rename = "Dataset")]
    name: String,
    #[tabled(rename = "Priority")]
    priority: i64,
    #[tabled(rename = "Status")]
    status: String,
}

/// Render the imported-dataset ledger as a table
pub fn dataset_table(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }
    let rows: Vec<DatasetRow> = entries
        .iter()
        .map(|entry| DatasetRow {
            name: entry.name.clone(),
            priority: entry.priority,
            status: entry.status.as_str().to_string(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
