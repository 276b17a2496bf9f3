use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use super::{category_service::CategoryService, product_service::ProductService, user_service::UserService};
use crate::dto::export_dto::{ExportCounts, ExportFormat, ExportQuery, ExportStats};
use crate::error::{Error, Result};
use crate::repositories::UnitOfWork;
use crate::utils::time::to_file_stamp;

const TEXT_COLUMN_WIDTH: usize = 20;

/// A rendered export ready to be sent as an attachment.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

/// Scalar fields of a list of records, in declaration order.
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
        let objects = records
            .iter()
            .map(|record| match serde_json::to_value(record)? {
                Value::Object(map) => Ok(map),
                other => Err(Error::Internal(format!(
                    "Only structs can be exported, got {}",
                    other
                ))),
            })
            .collect::<Result<Vec<Map<String, Value>>>>()?;

        let columns: Vec<String> = objects
            .first()
            .map(|first| {
                first
                    .iter()
                    .filter(|(_, value)| !value.is_array() && !value.is_object())
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default();

        let rows = objects
            .iter()
            .map(|object| {
                columns
                    .iter()
                    .map(|column| object.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_csv(field: &str) -> String {
    if field.is_empty() {
        return "\"\"".to_string();
    }
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn camel_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (camel_case(&key), camel_case_keys(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camel_case_keys).collect()),
        other => other,
    }
}

/// Renders records into the supported export formats and runs the catalogue
/// exports on top of the domain services.
#[derive(Clone)]
pub struct ExportService {
    uow: Arc<UnitOfWork>,
}

impl ExportService {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Header row of scalar field names, then one row per record.
    pub fn to_csv<T: Serialize>(records: &[T], include_headers: bool) -> Result<Vec<u8>> {
        let table = Table::from_records(records)?;
        let mut lines = Vec::with_capacity(table.rows.len() + 1);
        if include_headers {
            lines.push(
                table
                    .columns
                    .iter()
                    .map(|c| escape_csv(c))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        for row in &table.rows {
            lines.push(
                row.iter()
                    .map(|value| escape_csv(&cell_text(value)))
                    .collect::<Vec<_>>()
                    .join(","),
            );
        }
        let mut csv = lines.join("\r\n");
        if !csv.is_empty() {
            csv.push_str("\r\n");
        }
        Ok(csv.into_bytes())
    }

    pub fn to_json<T: Serialize>(records: &[T], formatted: bool) -> Result<Vec<u8>> {
        let value = camel_case_keys(serde_json::to_value(records)?);
        let bytes = if formatted {
            serde_json::to_vec_pretty(&value)?
        } else {
            serde_json::to_vec(&value)?
        };
        Ok(bytes)
    }

    /// Fixed-width plain text table with a title and generation stamp.
    pub fn to_text_table<T: Serialize>(
        records: &[T],
        title: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let table = Table::from_records(records)?;
        let pad = |s: &str| format!("{:<width$}", s, width = TEXT_COLUMN_WIDTH);

        let mut out = String::new();
        out.push_str(&format!("# {}\n", title));
        out.push_str(&format!(
            "Generated: {} UTC\n\n",
            generated_at.format("%Y-%m-%d %H:%M:%S")
        ));

        let headers: Vec<String> = table.columns.iter().map(|c| pad(c)).collect();
        let rule_len = headers.iter().map(|h| h.chars().count()).sum::<usize>()
            + headers.len().saturating_sub(1) * 3;
        out.push_str(&headers.join(" | "));
        out.push('\n');
        out.push_str(&"-".repeat(rule_len));
        out.push('\n');

        for row in &table.rows {
            let cells: Vec<String> = row.iter().map(|value| pad(&cell_text(value))).collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        Ok(out.into_bytes())
    }

    /// Single-sheet workbook with a bold header row.
    pub fn to_xlsx<T: Serialize>(records: &[T], sheet_name: &str) -> Result<Vec<u8>> {
        let table = Table::from_records(records)?;
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name)?;

        let header_format = Format::new().set_bold();
        for (col, name) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, name, &header_format)?;
            worksheet.set_column_width(col as u16, 18.0)?;
        }

        for (idx, row) in table.rows.iter().enumerate() {
            let row_num = idx as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                let col = col as u16;
                match value {
                    Value::Null => {}
                    Value::Bool(flag) => {
                        worksheet.write_boolean(row_num, col, *flag)?;
                    }
                    Value::Number(n) => match n.as_f64() {
                        Some(f) => {
                            worksheet.write_number(row_num, col, f)?;
                        }
                        None => {
                            worksheet.write_string(row_num, col, &n.to_string())?;
                        }
                    },
                    other => {
                        worksheet.write_string(row_num, col, &cell_text(other))?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }

    /// Renders `records` in `format`; the file is named
    /// `{entity}_{yyyyMMdd_HHmmss}.{ext}`.
    pub fn render<T: Serialize>(
        records: &[T],
        format: ExportFormat,
        entity: &str,
        title: &str,
        now: DateTime<Utc>,
    ) -> Result<ExportFile> {
        let bytes = match format {
            ExportFormat::Csv => Self::to_csv(records, true)?,
            ExportFormat::Json => Self::to_json(records, true)?,
            ExportFormat::Pdf => Self::to_text_table(records, &format!("{} Export", title), now)?,
            ExportFormat::Excel => Self::to_xlsx(records, title)?,
        };
        Ok(ExportFile {
            bytes,
            content_type: format.content_type(),
            file_name: format!("{}_{}.{}", entity, to_file_stamp(now), format.extension()),
        })
    }

    /// By category when `category_id` is set, else active only or everything.
    pub async fn export_products(&self, query: &ExportQuery) -> Result<ExportFile> {
        let products = ProductService::new(self.uow.clone());
        let records = match (query.category_id, query.active_only) {
            (Some(category_id), _) => products.get_by_category(category_id).await?,
            (None, true) => products.get_active().await?,
            (None, false) => products.get_all().await?,
        };
        let file = Self::render(&records, query.format, "products", "Products", self.uow.clock().now())?;
        info!(format = ?query.format, count = records.len(), "Products exported");
        Ok(file)
    }

    pub async fn export_categories(&self, query: &ExportQuery) -> Result<ExportFile> {
        let mut records = CategoryService::new(self.uow.clone()).get_all().await?;
        if query.active_only {
            records.retain(|category| category.is_active);
        }
        let file = Self::render(&records, query.format, "categories", "Categories", self.uow.clock().now())?;
        info!(format = ?query.format, count = records.len(), "Categories exported");
        Ok(file)
    }

    pub async fn export_users(&self, query: &ExportQuery) -> Result<ExportFile> {
        let records = UserService::new(self.uow.clone()).get_all().await?;
        let file = Self::render(&records, query.format, "users", "Users", self.uow.clock().now())?;
        info!(format = ?query.format, count = records.len(), "Users exported");
        Ok(file)
    }

    pub async fn stats(&self) -> Result<ExportStats> {
        let products = self.uow.products().get_all().await?;
        let categories = self.uow.categories().get_all().await?;
        let users = self.uow.users().get_all().await?;

        let counts = |total: usize, active: usize| ExportCounts {
            total,
            active: Some(active),
            inactive: Some(total - active),
        };
        Ok(ExportStats {
            products: counts(products.len(), products.iter().filter(|p| p.is_active).count()),
            categories: counts(
                categories.len(),
                categories.iter().filter(|c| c.is_active).count(),
            ),
            users: ExportCounts {
                total: users.len(),
                active: None,
                inactive: None,
            },
        })
    }
}
