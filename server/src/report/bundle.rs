use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    db_core::queries::ReportQuery,
    error::{AppResult, ReportError},
};

use super::shaper::{shape_row, RawRow, RowShape, ShapedRecord};

/// The six records consumed by the report template, one per query.
///
/// A slot left as `None` means its query returned no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportBundle {
    pub yesterday_payments: Option<ShapedRecord>,
    pub last_month_payments: Option<ShapedRecord>,
    pub yesterday_users: Option<ShapedRecord>,
    pub total_users: Option<ShapedRecord>,
    pub yesterday_reports: Option<ShapedRecord>,
    pub total_reports: Option<ShapedRecord>,
}

impl ReportBundle {
    /// Shapes each query's rows and binds them to that query's own slot.
    pub fn assemble<I>(results: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (ReportQuery, Vec<RawRow>)>,
    {
        let mut bundle = Self::default();

        for (query, rows) in results {
            let shape = query.layout().shape;
            if rows.len() > 1 {
                tracing::warn!(
                    "Query {} returned {} rows, keeping the first",
                    query,
                    rows.len()
                );
            }

            let Some(row) = rows.first() else {
                tracing::warn!("Query {} returned no rows, slot left empty", query);
                continue;
            };

            if RowShape::infer(row) != shape {
                tracing::warn!(
                    "Query {} produced a row that looks like {:?}, shaping as {:?}",
                    query,
                    RowShape::infer(row),
                    shape
                );
            }

            let record =
                shape_row(shape, row).map_err(|source| ReportError::Shape { query, source })?;
            *bundle.slot_mut(query) = Some(record);
        }

        Ok(bundle)
    }

    /// Binds a flat list of records to slots by position, in query order.
    ///
    /// This is how the legacy report filled its template. A query that
    /// returned no rows shifts every later record one slot to the left.
    #[cfg(test)]
    pub fn from_positional(records: Vec<ShapedRecord>) -> Self {
        let mut bundle = Self::default();
        for (query, record) in ReportQuery::iter().zip(records) {
            *bundle.slot_mut(query) = Some(record);
        }
        bundle
    }

    pub fn slot(&self, query: ReportQuery) -> Option<&ShapedRecord> {
        match query {
            ReportQuery::YesterdayPayments => self.yesterday_payments.as_ref(),
            ReportQuery::LastMonthPayments => self.last_month_payments.as_ref(),
            ReportQuery::YesterdayUsers => self.yesterday_users.as_ref(),
            ReportQuery::TotalUsers => self.total_users.as_ref(),
            ReportQuery::YesterdayReports => self.yesterday_reports.as_ref(),
            ReportQuery::TotalReports => self.total_reports.as_ref(),
        }
    }

    fn slot_mut(&mut self, query: ReportQuery) -> &mut Option<ShapedRecord> {
        match query {
            ReportQuery::YesterdayPayments => &mut self.yesterday_payments,
            ReportQuery::LastMonthPayments => &mut self.last_month_payments,
            ReportQuery::YesterdayUsers => &mut self.yesterday_users,
            ReportQuery::TotalUsers => &mut self.total_users,
            ReportQuery::YesterdayReports => &mut self.yesterday_reports,
            ReportQuery::TotalReports => &mut self.total_reports,
        }
    }

    pub fn missing_slots(&self) -> Vec<ReportQuery> {
        ReportQuery::iter()
            .filter(|query| self.slot(*query).is_none())
            .collect()
    }
}
