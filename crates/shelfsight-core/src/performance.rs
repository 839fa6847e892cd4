//! Week-over-week keyword performance.
//!
//! The current window is the selected weeks, or the latest week present in the
//! fact table. The previous window is the same weeks shifted back by seven
//! days. Both windows are aggregated per (campaign, keyword) concurrently and
//! joined in memory; every metric gets a percentage delta.

use std::collections::HashMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use shelfsight_warehouse::{
    value_as_f64, value_as_string, ParamType, QueryExecutor, QueryResult, Row, Statement,
    StatementBuilder,
};

use crate::config::TableNames;
use crate::error::CoreError;
use crate::selection::{week_expr, Facet, FilterSelection};
use crate::week::Week;

/// Metrics reported per (campaign, keyword), in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Impressions,
    Clicks,
    Conversions,
    Spend,
    SalesRev,
    Cpc,
    AvgRank,
    Roas,
    Ctr,
    Cpa,
    ConversionRate,
}

impl Metric {
    pub const ALL: [Metric; 11] = [
        Metric::Impressions,
        Metric::Clicks,
        Metric::Conversions,
        Metric::Spend,
        Metric::SalesRev,
        Metric::Cpc,
        Metric::AvgRank,
        Metric::Roas,
        Metric::Ctr,
        Metric::Cpa,
        Metric::ConversionRate,
    ];

    /// Result column and JSON key.
    pub const fn column(self) -> &'static str {
        match self {
            Self::Impressions => "impressions",
            Self::Clicks => "clicks",
            Self::Conversions => "conversions",
            Self::Spend => "spend",
            Self::SalesRev => "sales_rev",
            Self::Cpc => "cpc",
            Self::AvgRank => "avg_rank",
            Self::Roas => "roas",
            Self::Ctr => "ctr",
            Self::Cpa => "cpa",
            Self::ConversionRate => "conversion_rate",
        }
    }

    /// Ratios stored as fractions but reported as percentages.
    const fn scale(self) -> f64 {
        match self {
            Self::Ctr | Self::ConversionRate => 100.0,
            _ => 1.0,
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// One optional value per [`Metric`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricSet([Option<f64>; 11]);

impl MetricSet {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0[metric.index()]
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        self.0[metric.index()] = value;
    }

    /// Read every metric column from a result row, applying percentage scaling.
    fn from_row(row: &Row) -> Self {
        let mut set = Self::default();
        for metric in Metric::ALL {
            let value = row
                .get(metric.column())
                .and_then(value_as_f64)
                .map(|value| value * metric.scale());
            set.set(metric, value);
        }
        set
    }
}

/// Percentage change from `previous` to `current`.
///
/// `None` when either side is missing or zero.
pub fn delta(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(current), Some(previous)) if current != 0.0 && previous != 0.0 => {
            Some((current - previous) * 100.0 / previous)
        }
        _ => None,
    }
}

/// Join key for the two windows.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub campaign_id: String,
    pub keyword_id: String,
}

impl RowKey {
    fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            campaign_id: row.get("campaign_id").and_then(value_as_string)?,
            keyword_id: row.get("keyword_id").and_then(value_as_string)?,
        })
    }
}

/// Current-window metrics for one (campaign, keyword) with deltas against the
/// previous window.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    pub key: RowKey,
    pub campaign_name: String,
    pub keyword_name: String,
    pub metrics: MetricSet,
    pub deltas: MetricSet,
}

impl Serialize for PerformanceRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4 + 2 * Metric::ALL.len()))?;
        map.serialize_entry("campaign_id", &self.key.campaign_id)?;
        map.serialize_entry("campaign_name", &self.campaign_name)?;
        map.serialize_entry("keyword_id", &self.key.keyword_id)?;
        map.serialize_entry("keyword_name", &self.keyword_name)?;
        for metric in Metric::ALL {
            map.serialize_entry(metric.column(), &self.metrics.get(metric))?;
            map.serialize_entry(
                &format!("{}_delta", metric.column()),
                &self.deltas.get(metric),
            )?;
        }
        map.end()
    }
}

/// Which weeks a window covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    /// Explicit week start dates.
    Weeks(Vec<Week>),
    /// The latest week in the fact table, shifted back `weeks_back` weeks.
    Latest { weeks_back: u8 },
}

impl Window {
    /// Current and previous windows for a selection.
    pub fn pair(selection: &FilterSelection) -> Result<(Self, Self), CoreError> {
        match selection.selected_weeks()? {
            Some(weeks) => {
                let previous = weeks.iter().filter_map(|week| week.previous()).collect();
                Ok((Self::Weeks(weeks), Self::Weeks(previous)))
            }
            None => Ok((
                Self::Latest { weeks_back: 0 },
                Self::Latest { weeks_back: 1 },
            )),
        }
    }

    fn predicate(&self, builder: &mut StatementBuilder, tables: &TableNames) -> String {
        match self {
            Self::Weeks(weeks) => {
                let dates = weeks.iter().map(|week| week.iso()).collect::<Vec<_>>();
                builder.in_list(&week_expr("f."), &dates, ParamType::Date)
            }
            Self::Latest { weeks_back } => {
                let latest = format!("MAX({})", week_expr(""));
                let target = if *weeks_back == 0 {
                    latest
                } else {
                    format!(
                        "CAST({latest} - INTERVAL {days} DAY AS DATE)",
                        days = u32::from(*weeks_back) * 7
                    )
                };
                format!(
                    "{} = (SELECT {target} FROM {fact})",
                    week_expr("f."),
                    fact = tables.fact
                )
            }
        }
    }
}

/// Aggregate statement for one window. With `with_names`, display names are
/// resolved from the dimension table, falling back to ids.
pub fn window_statement(
    mut builder: StatementBuilder,
    tables: &TableNames,
    selection: &FilterSelection,
    window: &Window,
    with_names: bool,
) -> Result<Statement, CoreError> {
    builder.push(
        "WITH agg AS (SELECT \
         CAST(f.campaign_id AS STRING) AS campaign_id, \
         CAST(f.keyword_id AS STRING) AS keyword_id, \
         CAST(SUM(f.impressions) AS BIGINT) AS impressions, \
         CAST(SUM(f.clicks) AS BIGINT) AS clicks, \
         CAST(SUM(f.conversions) AS BIGINT) AS conversions, \
         CAST(SUM(f.cost) AS DOUBLE) AS spend, \
         CAST(SUM(f.revenue) AS DOUBLE) AS sales_rev, \
         CAST(AVG(f.cpc) AS DOUBLE) AS cpc, \
         CAST(AVG(f.pos) AS DOUBLE) AS avg_rank, \
         CASE WHEN SUM(f.cost) = 0 THEN NULL \
         ELSE CAST(SUM(f.revenue) AS DOUBLE) / SUM(f.cost) END AS roas, \
         CASE WHEN SUM(f.impressions) = 0 THEN NULL \
         ELSE CAST(SUM(f.clicks) AS DOUBLE) / SUM(f.impressions) END AS ctr, \
         CASE WHEN SUM(f.conversions) = 0 THEN NULL \
         ELSE CAST(SUM(f.cost) AS DOUBLE) / SUM(f.conversions) END AS cpa, \
         CASE WHEN SUM(f.clicks) = 0 THEN NULL \
         ELSE CAST(SUM(f.conversions) AS DOUBLE) / SUM(f.clicks) END AS conversion_rate ",
    );
    push_window_source(&mut builder, tables, selection, window)?;
    builder.push(" GROUP BY f.campaign_id, f.keyword_id)");

    if with_names {
        // Names resolve per (retailer, id) pair seen in the window, the same
        // way the facet option lists resolve them.
        builder.push(
            ", names AS (SELECT \
             CAST(f.campaign_id AS STRING) AS campaign_id, \
             CAST(f.keyword_id AS STRING) AS keyword_id, \
             MAX(c.campaign_name) AS campaign_name, \
             MAX(k.keyword_name) AS keyword_name \
             FROM (SELECT DISTINCT f.retailer, f.campaign_id, f.keyword_id ",
        );
        push_window_source(&mut builder, tables, selection, window)?;
        builder.push(&format!(
            ") f LEFT JOIN {dimension} c \
             ON CAST(c.campaign_id AS STRING) = CAST(f.campaign_id AS STRING) \
             AND c.retailer = f.retailer \
             LEFT JOIN {dimension} k \
             ON CAST(k.keyword_id AS STRING) = CAST(f.keyword_id AS STRING) \
             AND k.retailer = f.retailer \
             GROUP BY f.campaign_id, f.keyword_id)",
            dimension = tables.dimension
        ));
        builder.push(
            " SELECT agg.*, \
             COALESCE(n.campaign_name, agg.campaign_id) AS campaign_name, \
             COALESCE(n.keyword_name, agg.keyword_id) AS keyword_name \
             FROM agg LEFT JOIN names n \
             ON n.campaign_id = agg.campaign_id AND n.keyword_id = agg.keyword_id \
             ORDER BY agg.spend DESC, agg.campaign_id, agg.keyword_id",
        );
    } else {
        builder.push(" SELECT * FROM agg");
    }

    Ok(builder.build())
}

/// `FROM <fact> f WHERE <window> AND <selection>`, binding values in text order.
fn push_window_source(
    builder: &mut StatementBuilder,
    tables: &TableNames,
    selection: &FilterSelection,
    window: &Window,
) -> Result<(), CoreError> {
    builder.push("FROM ");
    builder.push(&tables.fact);
    builder.push(" f WHERE ");
    let mut predicates = vec![window.predicate(builder, tables)];
    predicates.extend(selection.predicates(builder, "f.", Some(Facet::Weeks))?);
    builder.push(&predicates.join(" AND "));
    Ok(())
}

/// Join current rows with previous rows by (campaign, keyword).
///
/// Only keys present in the current window are reported.
pub fn join_windows(current: &QueryResult, previous: &QueryResult) -> Vec<PerformanceRow> {
    let previous = previous
        .rows
        .iter()
        .filter_map(|row| Some((RowKey::from_row(row)?, MetricSet::from_row(row))))
        .collect::<HashMap<_, _>>();

    current
        .rows
        .iter()
        .filter_map(|row| {
            let key = RowKey::from_row(row)?;
            let metrics = MetricSet::from_row(row);
            let before = previous.get(&key).copied().unwrap_or_default();
            let mut deltas = MetricSet::default();
            for metric in Metric::ALL {
                deltas.set(metric, delta(metrics.get(metric), before.get(metric)));
            }
            Some(PerformanceRow {
                campaign_name: row
                    .get("campaign_name")
                    .and_then(value_as_string)
                    .unwrap_or_else(|| key.campaign_id.clone()),
                keyword_name: row
                    .get("keyword_name")
                    .and_then(value_as_string)
                    .unwrap_or_else(|| key.keyword_id.clone()),
                key,
                metrics,
                deltas,
            })
        })
        .collect()
}

/// Current-window metrics with week-over-week deltas.
pub async fn performance_delta(
    executor: &dyn QueryExecutor,
    tables: &TableNames,
    selection: &FilterSelection,
) -> Result<Vec<PerformanceRow>, CoreError> {
    let (current_window, previous_window) = Window::pair(selection)?;
    let style = executor.param_style();
    let current_statement = window_statement(
        StatementBuilder::new(style),
        tables,
        selection,
        &current_window,
        true,
    )?;
    let previous_statement = window_statement(
        StatementBuilder::new(style),
        tables,
        selection,
        &previous_window,
        false,
    )?;

    let (current, previous) = tokio::try_join!(
        executor.execute(&current_statement),
        executor.execute(&previous_statement)
    )?;

    let rows = join_windows(&current, &previous);
    tracing::info!(
        current = current.row_count,
        previous = previous.row_count,
        rows = rows.len(),
        "computed performance deltas"
    );
    Ok(rows)
}
