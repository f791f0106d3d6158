//! Client invoices. Hard delete only.

use super::client_products::ensure_project_of_client;
use super::clients::ensure_client;
use super::db::Session;
use super::error::{DbError, DbResult};
use super::rows::{
    change_f64, fetch_one, found, hard_delete, new_id, now_iso, require_non_negative, require_text, update_row, Changes, Conditions,
    FromRow, Page,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const INSERT_INVOICE: &str = "INSERT INTO Invoices
    (invoice_id, client_id, project_id, document_id, invoice_number, issue_date, due_date, total_amount, currency,
     payment_status, payment_date, payment_method, notes, created_at, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)";
const SELECT_INVOICE_BY_ID: &str = "SELECT * FROM Invoices WHERE invoice_id = ?1";
const SELECT_INVOICE_BY_NUMBER: &str = "SELECT * FROM Invoices WHERE invoice_number = ?1";
const SELECT_INVOICES: &str = "SELECT * FROM Invoices";

const INVOICE_COLUMNS: &[&str] = &[
    "project_id",
    "document_id",
    "invoice_number",
    "issue_date",
    "due_date",
    "total_amount",
    "currency",
    "payment_status",
    "payment_date",
    "payment_method",
    "notes",
];
const SORTABLE_COLUMNS: &[&str] = &["issue_date", "due_date", "total_amount", "payment_status"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    #[serde(rename = "unpaid")]
    Unpaid,
    #[serde(rename = "partially paid")]
    PartiallyPaid,
    #[serde(rename = "paid")]
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::PartiallyPaid => "partially paid",
            PaymentStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "partially paid" => Ok(PaymentStatus::PartiallyPaid),
            "paid" => Ok(PaymentStatus::Paid),
            other => Err(DbError::validation(
                "payment_status",
                format!("'{}' is not one of unpaid, partially paid, paid", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub client_id: String,
    pub project_id: Option<String>,
    pub document_id: Option<String>,
    pub invoice_number: String,
    pub issue_date: String,
    pub due_date: String,
    pub total_amount: f64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FromRow for Invoice {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let status: String = row.get("payment_status")?;
        let payment_status = status.parse().map_err(|e: DbError| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Invoice {
            invoice_id: row.get("invoice_id")?,
            client_id: row.get("client_id")?,
            project_id: row.get("project_id")?,
            document_id: row.get("document_id")?,
            invoice_number: row.get("invoice_number")?,
            issue_date: row.get("issue_date")?,
            due_date: row.get("due_date")?,
            total_amount: row.get("total_amount")?,
            currency: row.get("currency")?,
            payment_status,
            payment_date: row.get("payment_date")?,
            payment_method: row.get("payment_method")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInvoice {
    pub client_id: String,
    pub project_id: Option<String>,
    pub document_id: Option<String>,
    pub invoice_number: String,
    pub issue_date: String,
    pub due_date: String,
    pub total_amount: f64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl Default for NewInvoice {
    fn default() -> Self {
        NewInvoice {
            client_id: String::new(),
            project_id: None,
            document_id: None,
            invoice_number: String::new(),
            issue_date: String::new(),
            due_date: String::new(),
            total_amount: 0.0,
            currency: "EUR".to_string(),
            payment_status: PaymentStatus::Unpaid,
            payment_date: None,
            payment_method: None,
            notes: None,
        }
    }
}

/// Listing filter. Date bounds are inclusive and compared as ISO text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFilter {
    pub payment_status: Option<PaymentStatus>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub issue_date_from: Option<String>,
    pub issue_date_to: Option<String>,
    pub due_date_from: Option<String>,
    pub due_date_to: Option<String>,
}

/// Sort order parsed from `<column>_<asc|desc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceSort {
    column: &'static str,
    descending: bool,
}

impl Default for InvoiceSort {
    fn default() -> Self {
        InvoiceSort {
            column: "issue_date",
            descending: true,
        }
    }
}

impl InvoiceSort {
    pub fn parse(key: &str) -> DbResult<Self> {
        let key = key.trim();
        let (column, descending) = if let Some(column) = key.strip_suffix("_asc") {
            (column, false)
        } else if let Some(column) = key.strip_suffix("_desc") {
            (column, true)
        } else {
            return Err(DbError::validation("sort_by", format!("'{}' must end with _asc or _desc", key)));
        };
        let column = SORTABLE_COLUMNS
            .iter()
            .find(|c| **c == column)
            .ok_or_else(|| DbError::validation("sort_by", format!("cannot sort by '{}'", column)))?;
        Ok(InvoiceSort { column, descending })
    }

    fn to_sql(self) -> String {
        let direction = if self.descending { "DESC" } else { "ASC" };
        format!(" ORDER BY {} {}, invoice_number {}", self.column, direction, direction)
    }
}

pub struct Invoices<'a> {
    session: Session<'a>,
}

impl<'a> Invoices<'a> {
    pub fn new(session: Session<'a>) -> Self {
        Self { session }
    }

    pub fn add(&self, invoice: &NewInvoice) -> DbResult<String> {
        require_text("invoice_number", &invoice.invoice_number)?;
        require_text("issue_date", &invoice.issue_date)?;
        require_text("due_date", &invoice.due_date)?;
        require_non_negative("total_amount", invoice.total_amount)?;

        let invoice_id = new_id();
        self.session.run(|conn| {
            ensure_client(conn, &invoice.client_id)?;
            if let Some(project_id) = invoice.project_id.as_deref() {
                ensure_project_of_client(conn, project_id, &invoice.client_id)?;
            }
            conn.execute(
                INSERT_INVOICE,
                params![
                    invoice_id,
                    invoice.client_id,
                    invoice.project_id,
                    invoice.document_id,
                    invoice.invoice_number.trim(),
                    invoice.issue_date,
                    invoice.due_date,
                    invoice.total_amount,
                    invoice.currency,
                    invoice.payment_status.as_str(),
                    invoice.payment_date,
                    invoice.payment_method,
                    invoice.notes,
                    now_iso()
                ],
            )
            .map_err(|e| DbError::from(e).for_entity("Invoice"))?;
            Ok(invoice_id.clone())
        })
    }

    pub fn get(&self, invoice_id: &str) -> DbResult<Option<Invoice>> {
        self.session.run(|conn| fetch_one(conn, SELECT_INVOICE_BY_ID, [invoice_id]))
    }

    pub fn get_by_number(&self, invoice_number: &str) -> DbResult<Option<Invoice>> {
        self.session.run(|conn| fetch_one(conn, SELECT_INVOICE_BY_NUMBER, [invoice_number.trim()]))
    }

    pub fn list_all_invoices(&self, filter: &InvoiceFilter, sort: InvoiceSort, page: Page) -> DbResult<Vec<Invoice>> {
        let mut conditions = Conditions::new();
        conditions
            .push_opt("payment_status = ?", filter.payment_status.map(|s| s.as_str().to_string()))
            .push_opt("client_id = ?", filter.client_id.clone())
            .push_opt("project_id = ?", filter.project_id.clone())
            .push_opt("issue_date >= ?", filter.issue_date_from.clone())
            .push_opt("issue_date <= ?", filter.issue_date_to.clone())
            .push_opt("due_date >= ?", filter.due_date_from.clone())
            .push_opt("due_date <= ?", filter.due_date_to.clone());
        let tail = format!("{}{}", sort.to_sql(), page.to_sql());
        self.session.run(|conn| conditions.query(conn, SELECT_INVOICES, &tail))
    }

    pub fn update(&self, invoice_id: &str, changes: &Changes) -> DbResult<usize> {
        if let Some(status) = changes.get("payment_status") {
            let status = status
                .as_str()
                .ok_or_else(|| DbError::validation("payment_status", "must be a string"))?;
            status.parse::<PaymentStatus>()?;
        }
        if let Some(total) = change_f64(changes, "total_amount")? {
            require_non_negative("total_amount", total)?;
        }
        self.session.run(|conn| {
            if let Some(project_id) = changes.get("project_id").and_then(|v| v.as_str()) {
                let client_id: Option<String> = conn
                    .query_row("SELECT client_id FROM Invoices WHERE invoice_id = ?1", [invoice_id], |row| row.get(0))
                    .optional()?;
                let client_id = client_id.ok_or_else(|| DbError::not_found("Invoice", invoice_id))?;
                ensure_project_of_client(conn, project_id, &client_id)?;
            }
            let affected = update_row(
                conn,
                "Invoices",
                "invoice_id",
                SqlValue::Text(invoice_id.to_string()),
                INVOICE_COLUMNS,
                changes,
                Some("updated_at"),
            )
            .map_err(|e| e.for_entity("Invoice"))?;
            found(affected, "Invoice", invoice_id)
        })
    }

    pub fn delete(&self, invoice_id: &str) -> DbResult<()> {
        self.session
            .run(|conn| hard_delete(conn, "Invoices", "invoice_id", SqlValue::Text(invoice_id.to_string()), "Invoice"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_keys_are_whitelisted() {
        assert_eq!(InvoiceSort::parse("issue_date_asc").unwrap().to_sql(), " ORDER BY issue_date ASC, invoice_number ASC");
        assert_eq!(InvoiceSort::parse("total_amount_desc").unwrap().to_sql(), " ORDER BY total_amount DESC, invoice_number DESC");
        assert!(InvoiceSort::parse("notes_asc").is_err());
        assert!(InvoiceSort::parse("issue_date").is_err());
        assert!(InvoiceSort::parse("issue_date; DROP TABLE Invoices_asc").is_err());
    }

    #[test]
    fn payment_status_vocabulary() {
        assert_eq!("partially paid".parse::<PaymentStatus>().unwrap(), PaymentStatus::PartiallyPaid);
        assert!("overdue".parse::<PaymentStatus>().is_err());
        assert_eq!(PaymentStatus::Paid.to_string(), "paid");
    }
}
