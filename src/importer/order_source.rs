// ==========================================
// Pharmaflow - order intake sources
// ==========================================
// OrderRecord is the normalized shape every source produces; the network
// client lives outside this crate, so the shipped source reads normalized
// CSV exports (also used as test fixtures).
// ==========================================

use anyhow::Context;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// One normalized order row from the external system.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    /// Unique item id in the source system (upsert key).
    pub source_id: i64,
    pub source_order_id: Option<i64>,
    pub source_web_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub quantity: Option<i64>,
    pub unit_price: Option<Decimal>,
    pub total_price: Option<Decimal>,
    pub updated_date: Option<NaiveDate>,
    pub updated_time: Option<NaiveTime>,
}

#[async_trait]
pub trait OrderSource: Send + Sync {
    async fn fetch_records(&self) -> anyhow::Result<Vec<OrderRecord>>;
}

// ==========================================
// CsvOrderSource
// ==========================================
#[derive(Debug, Deserialize)]
struct CsvRow {
    source_id: i64,
    #[serde(default)]
    source_order_id: Option<i64>,
    #[serde(default)]
    source_web_id: Option<i64>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    quantity: Option<i64>,
    #[serde(default)]
    unit_price: Option<String>,
    #[serde(default)]
    total_price: Option<String>,
    #[serde(default)]
    updated_date: Option<String>,
    #[serde(default)]
    updated_time: Option<String>,
}

pub struct CsvOrderSource {
    path: PathBuf,
}

impl CsvOrderSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse_row(row: CsvRow) -> anyhow::Result<OrderRecord> {
        let parse_decimal = |raw: Option<String>, field: &str| -> anyhow::Result<Option<Decimal>> {
            match raw {
                Some(s) if !s.trim().is_empty() => Ok(Some(
                    Decimal::from_str(s.trim()).with_context(|| format!("bad {field}: '{s}'"))?,
                )),
                _ => Ok(None),
            }
        };
        let updated_date = match row.updated_date {
            Some(s) if !s.trim().is_empty() => Some(
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .with_context(|| format!("bad updated_date: '{s}'"))?,
            ),
            _ => None,
        };
        let updated_time = match row.updated_time {
            Some(s) if !s.trim().is_empty() => Some(
                NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
                    .with_context(|| format!("bad updated_time: '{s}'"))?,
            ),
            _ => None,
        };
        Ok(OrderRecord {
            source_id: row.source_id,
            source_order_id: row.source_order_id,
            source_web_id: row.source_web_id,
            name: row.name,
            description: row.description,
            quantity: row.quantity,
            unit_price: parse_decimal(row.unit_price, "unit_price")?,
            total_price: parse_decimal(row.total_price, "total_price")?,
            updated_date,
            updated_time,
        })
    }
}

#[async_trait]
impl OrderSource for CsvOrderSource {
    async fn fetch_records(&self) -> anyhow::Result<Vec<OrderRecord>> {
        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<OrderRecord>> {
            let mut reader = csv::Reader::from_path(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            let mut records = Vec::new();
            for row in reader.deserialize::<CsvRow>() {
                let row = row.context("malformed CSV row")?;
                records.push(CsvOrderSource::parse_row(row)?);
            }
            Ok(records)
        })
        .await
        .context("CSV read task failed")??;
        debug!(count = records.len(), "records read from CSV source");
        Ok(records)
    }
}
