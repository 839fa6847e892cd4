//! Facet selections shared by the dashboard endpoints.
//!
//! Each facet arrives as a query parameter holding either the sentinel `all`
//! or a comma-separated list of ids. Missing and empty parameters mean `all`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::Deserialize;
use shelfsight_warehouse::{ParamType, StatementBuilder};

use crate::error::ValidationError;
use crate::week::{parse_weeks, Week};

/// Sentinel meaning "no filter on this facet".
pub const ALL: &str = "all";

/// A single facet's filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FacetFilter {
    #[default]
    All,
    Only(Vec<String>),
}

impl FacetFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::All;
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case(ALL) {
            return Self::All;
        }
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        if values.is_empty() {
            Self::All
        } else {
            Self::Only(values)
        }
    }

    pub fn values(&self) -> Option<&[String]> {
        match self {
            Self::All => None,
            Self::Only(values) => Some(values),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// Raw query parameters, as received over HTTP.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectionParams {
    pub retailers: Option<String>,
    pub campaigns: Option<String>,
    pub keywords: Option<String>,
    pub weeks: Option<String>,
}

/// The four dashboard facets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Retailers,
    Campaigns,
    Keywords,
    Weeks,
}

impl Facet {
    pub const ALL: [Facet; 4] = [
        Facet::Retailers,
        Facet::Campaigns,
        Facet::Keywords,
        Facet::Weeks,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Retailers => "retailers",
            Self::Campaigns => "campaigns",
            Self::Keywords => "keywords",
            Self::Weeks => "weeks",
        }
    }

    /// Maximum number of options offered for this facet.
    pub const fn page_size(self) -> usize {
        match self {
            Self::Retailers | Self::Weeks => 20,
            Self::Campaigns | Self::Keywords => 50,
        }
    }
}

impl Display for Facet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "retailers" | "retailer" => Ok(Self::Retailers),
            "campaigns" | "campaign" => Ok(Self::Campaigns),
            "keywords" | "keyword" => Ok(Self::Keywords),
            "weeks" | "week" => Ok(Self::Weeks),
            _ => Err(ValidationError::UnknownFacet {
                value: value.to_string(),
            }),
        }
    }
}

/// Current filter state across all four facets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub retailers: FacetFilter,
    pub campaigns: FacetFilter,
    pub keywords: FacetFilter,
    pub weeks: FacetFilter,
}

impl From<&SelectionParams> for FilterSelection {
    fn from(params: &SelectionParams) -> Self {
        Self {
            retailers: FacetFilter::parse(params.retailers.as_deref()),
            campaigns: FacetFilter::parse(params.campaigns.as_deref()),
            keywords: FacetFilter::parse(params.keywords.as_deref()),
            weeks: FacetFilter::parse(params.weeks.as_deref()),
        }
    }
}

impl FilterSelection {
    pub fn filter(&self, facet: Facet) -> &FacetFilter {
        match facet {
            Facet::Retailers => &self.retailers,
            Facet::Campaigns => &self.campaigns,
            Facet::Keywords => &self.keywords,
            Facet::Weeks => &self.weeks,
        }
    }

    /// Pinned weeks, parsed. `None` when weeks are not filtered.
    pub fn selected_weeks(&self) -> Result<Option<Vec<Week>>, ValidationError> {
        self.weeks.values().map(parse_weeks).transpose()
    }

    /// One bound `IN (...)` predicate per pinned facet, skipping `except`.
    ///
    /// `alias` prefixes column references (e.g. `"f."`). Predicates are
    /// rendered in facet order, which is also binding order.
    pub fn predicates(
        &self,
        builder: &mut StatementBuilder,
        alias: &str,
        except: Option<Facet>,
    ) -> Result<Vec<String>, ValidationError> {
        let mut predicates = Vec::new();
        for facet in Facet::ALL {
            if Some(facet) == except {
                continue;
            }
            let Some(values) = self.filter(facet).values() else {
                continue;
            };
            let predicate = match facet {
                Facet::Retailers => {
                    builder.in_list(&format!("{alias}retailer"), values, ParamType::String)
                }
                Facet::Campaigns => builder.in_list(
                    &format!("CAST({alias}campaign_id AS STRING)"),
                    values,
                    ParamType::String,
                ),
                Facet::Keywords => builder.in_list(
                    &format!("CAST({alias}keyword_id AS STRING)"),
                    values,
                    ParamType::String,
                ),
                Facet::Weeks => {
                    let weeks = parse_weeks(values)?
                        .into_iter()
                        .map(Week::iso)
                        .collect::<Vec<_>>();
                    builder.in_list(&week_expr(alias), &weeks, ParamType::Date)
                }
            };
            predicates.push(predicate);
        }
        Ok(predicates)
    }
}

/// SQL expression for the week a fact row belongs to.
pub fn week_expr(alias: &str) -> String {
    format!("CAST(DATE_TRUNC('week', {alias}date) AS DATE)")
}

/// Render `WHERE a AND b ...`, or nothing when there are no predicates.
pub fn where_clause(predicates: &[String]) -> String {
    if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    }
}
