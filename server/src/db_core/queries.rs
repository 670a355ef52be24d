use indoc::indoc;
use sea_orm::{
    prelude::Decimal, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, QueryResult,
    Statement,
};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{AppResult, ReportError},
    report::{Cell, RawRow, ReportBundle, RowShape},
};

/// The fixed aggregate queries behind the report, in template order. The
/// snake_case name of each variant is the template slot it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ReportQuery {
    YesterdayPayments,
    LastMonthPayments,
    YesterdayUsers,
    TotalUsers,
    YesterdayReports,
    TotalReports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalKind {
    Amount,
    Count,
}

/// Column layout of every row a query returns. Columns are aliased
/// `bucket` (Day) or `label` (Lifetime), then `total`, `not_paid`, `paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub shape: RowShape,
    pub total: TotalKind,
    pub columns: usize,
}

// Timestamps are stored in UTC; day and month buckets are cut at UTC+6.

const YESTERDAY_PAYMENTS_SQL: &str = indoc! {r#"
    SELECT
        DATE_TRUNC('day', p."createdAt" + INTERVAL '6 hours')::date AS "bucket",
        SUM(p."price")::numeric AS "total"
    FROM "payment" p
    WHERE p."status" = 'paid'
        AND DATE_TRUNC('day', p."createdAt" + INTERVAL '6 hours')
            = DATE_TRUNC('day', CURRENT_TIMESTAMP + INTERVAL '6 hours' - make_interval(days => $1))
    GROUP BY "bucket"
    ORDER BY "bucket" DESC
"#};

const LAST_MONTH_PAYMENTS_SQL: &str = indoc! {r#"
    SELECT
        DATE_TRUNC('month', p."createdAt" + INTERVAL '6 hours')::date AS "bucket",
        SUM(p."price")::numeric AS "total"
    FROM "payment" p
    WHERE p."status" = 'paid'
        AND DATE_TRUNC('month', p."createdAt" + INTERVAL '6 hours')
            = DATE_TRUNC('month', CURRENT_TIMESTAMP + INTERVAL '6 hours') - INTERVAL '1 month'
    GROUP BY "bucket"
    ORDER BY "bucket" DESC
"#};

const YESTERDAY_USERS_SQL: &str = indoc! {r#"
    SELECT
        DATE_TRUNC('day', u."createdAt" + INTERVAL '6 hours')::date AS "bucket",
        COUNT(DISTINCT u."id") AS "total",
        COUNT(DISTINCT CASE WHEN p."status" = 'not_paid' THEN p."id" END) AS "not_paid",
        COUNT(DISTINCT CASE WHEN p."status" = 'paid' THEN p."id" END) AS "paid"
    FROM "user" u
    LEFT JOIN "payment" p ON u."id" = p."userId"
    WHERE DATE_TRUNC('day', u."createdAt" + INTERVAL '6 hours')
        = DATE_TRUNC('day', CURRENT_TIMESTAMP + INTERVAL '6 hours' - make_interval(days => $1))
    GROUP BY "bucket"
    ORDER BY "bucket" DESC
"#};

const TOTAL_USERS_SQL: &str = indoc! {r#"
    SELECT
        COUNT(DISTINCT u."id")::text AS "label",
        COUNT(DISTINCT p."id") AS "total",
        COUNT(DISTINCT CASE WHEN p."status" = 'not_paid' THEN p."id" END) AS "not_paid",
        COUNT(DISTINCT CASE WHEN p."status" = 'paid' THEN p."id" END) AS "paid"
    FROM "user" u
    LEFT JOIN "payment" p ON u."id" = p."userId"
"#};

const YESTERDAY_REPORTS_SQL: &str = indoc! {r#"
    SELECT
        DATE_TRUNC('day', r."createdAt" + INTERVAL '6 hours')::date AS "bucket",
        COUNT(DISTINCT r."id") AS "total",
        COUNT(DISTINCT CASE WHEN p."status" = 'not_paid' THEN r."id" END) AS "not_paid",
        COUNT(DISTINCT CASE WHEN p."status" = 'paid' THEN r."id" END) AS "paid"
    FROM "report" r
    LEFT JOIN "payment" p ON r."userId" = p."userId"
    WHERE r."status" = 'done'
        AND DATE_TRUNC('day', r."createdAt" + INTERVAL '6 hours')
            = DATE_TRUNC('day', CURRENT_TIMESTAMP + INTERVAL '6 hours' - make_interval(days => $1))
    GROUP BY "bucket"
    ORDER BY "bucket" DESC
"#};

const TOTAL_REPORTS_SQL: &str = indoc! {r#"
    SELECT
        TO_CHAR(MIN(DATE_TRUNC('day', r."createdAt" + INTERVAL '6 hours')), 'YYYY-MM-DD') AS "label",
        COUNT(DISTINCT r."id") AS "total",
        COUNT(DISTINCT CASE WHEN p."status" = 'not_paid' THEN r."id" END) AS "not_paid",
        COUNT(DISTINCT CASE WHEN p."status" = 'paid' THEN r."id" END) AS "paid"
    FROM "report" r
    LEFT JOIN "payment" p ON r."userId" = p."userId"
    WHERE r."status" = 'done'
"#};

impl ReportQuery {
    pub fn slot_name(&self) -> &'static str {
        (*self).into()
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ReportQuery::YesterdayPayments => YESTERDAY_PAYMENTS_SQL,
            ReportQuery::LastMonthPayments => LAST_MONTH_PAYMENTS_SQL,
            ReportQuery::YesterdayUsers => YESTERDAY_USERS_SQL,
            ReportQuery::TotalUsers => TOTAL_USERS_SQL,
            ReportQuery::YesterdayReports => YESTERDAY_REPORTS_SQL,
            ReportQuery::TotalReports => TOTAL_REPORTS_SQL,
        }
    }

    pub fn layout(&self) -> RowLayout {
        match self {
            ReportQuery::YesterdayPayments | ReportQuery::LastMonthPayments => RowLayout {
                shape: RowShape::Day,
                total: TotalKind::Amount,
                columns: 2,
            },
            ReportQuery::YesterdayUsers | ReportQuery::YesterdayReports => RowLayout {
                shape: RowShape::Day,
                total: TotalKind::Count,
                columns: 4,
            },
            ReportQuery::TotalUsers | ReportQuery::TotalReports => RowLayout {
                shape: RowShape::Lifetime,
                total: TotalKind::Count,
                columns: 4,
            },
        }
    }

    /// Whether the statement takes the day offset as `$1`.
    fn uses_day_offset(&self) -> bool {
        matches!(
            self,
            ReportQuery::YesterdayPayments
                | ReportQuery::YesterdayUsers
                | ReportQuery::YesterdayReports
        )
    }

    pub fn statement(&self, day_offset_days: i32) -> Statement {
        if self.uses_day_offset() {
            Statement::from_sql_and_values(
                DbBackend::Postgres,
                self.sql(),
                [day_offset_days.into()],
            )
        } else {
            Statement::from_string(DbBackend::Postgres, self.sql())
        }
    }
}

pub struct ReportQueryCtrl;

impl ReportQueryCtrl {
    pub async fn fetch_rows(
        conn: &DatabaseConnection,
        query: ReportQuery,
        day_offset_days: i32,
    ) -> Result<Vec<RawRow>, DbErr> {
        let layout = query.layout();
        conn.query_all(query.statement(day_offset_days))
            .await?
            .iter()
            .map(|row| read_row(row, layout))
            .collect()
    }

    /// Runs every query in order and assembles the bundle.
    pub async fn collect_bundle(
        conn: &DatabaseConnection,
        day_offset_days: i32,
    ) -> AppResult<ReportBundle> {
        let mut results = Vec::new();
        for query in ReportQuery::iter() {
            let rows = Self::fetch_rows(conn, query, day_offset_days)
                .await
                .map_err(|source| ReportError::Query { query, source })?;
            tracing::debug!("Query {} returned {} rows", query, rows.len());
            results.push((query, rows));
        }

        ReportBundle::assemble(results)
    }
}

fn read_row(row: &QueryResult, layout: RowLayout) -> Result<RawRow, DbErr> {
    let mut cells = Vec::with_capacity(layout.columns);

    cells.push(match layout.shape {
        RowShape::Day => row
            .try_get::<Option<chrono::NaiveDate>>("", "bucket")?
            .map_or(Cell::Null, Cell::Date),
        RowShape::Lifetime => row
            .try_get::<Option<String>>("", "label")?
            .map_or(Cell::Null, Cell::Label),
    });

    cells.push(match layout.total {
        TotalKind::Amount => row
            .try_get::<Option<Decimal>>("", "total")?
            .map_or(Cell::Null, Cell::Amount),
        TotalKind::Count => row
            .try_get::<Option<i64>>("", "total")?
            .map_or(Cell::Null, Cell::Count),
    });

    for column in ["not_paid", "paid"].into_iter().take(layout.columns - 2) {
        cells.push(
            row.try_get::<Option<i64>>("", column)?
                .map_or(Cell::Null, Cell::Count),
        );
    }

    Ok(RawRow(cells))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use sea_orm::Value;

    use super::*;
    use crate::{db_core::test::mock_conn, report::ShapedRecord};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day_row(bucket: NaiveDate, total: Value) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("bucket", Value::from(bucket)), ("total", total)])
    }

    fn breakdown_row(
        first: (&'static str, Value),
        total: i64,
        not_paid: i64,
        paid: i64,
    ) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            first,
            ("total", Value::from(total)),
            ("not_paid", Value::from(not_paid)),
            ("paid", Value::from(paid)),
        ])
    }

    #[test]
    fn slot_names_match_template_keys() {
        let names = ReportQuery::iter()
            .map(|query| query.slot_name())
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            [
                "yesterday_payments",
                "last_month_payments",
                "yesterday_users",
                "total_users",
                "yesterday_reports",
                "total_reports",
            ]
        );
    }

    #[test]
    fn only_daily_queries_bind_the_day_offset() {
        for query in ReportQuery::iter() {
            let stmt = query.statement(1);
            assert_eq!(stmt.values.is_some(), query.sql().contains("$1"), "{query}");
            assert_eq!(stmt.db_backend, DbBackend::Postgres);
        }
    }

    #[test]
    fn sql_aliases_match_layout() {
        for query in ReportQuery::iter() {
            let layout = query.layout();
            let sql = query.sql();
            let first = match layout.shape {
                RowShape::Day => "AS \"bucket\"",
                RowShape::Lifetime => "AS \"label\"",
            };
            assert!(sql.contains(first), "{query}");
            assert!(sql.contains("AS \"total\""), "{query}");
            assert_eq!(sql.contains("AS \"not_paid\""), layout.columns > 2, "{query}");
            assert_eq!(sql.contains("AS \"paid\""), layout.columns > 3, "{query}");
        }
    }

    #[tokio::test]
    async fn collects_one_record_per_query() {
        let conn = mock_conn(vec![
            vec![day_row(date(2024, 5, 1), Value::from(Decimal::from(1000)))],
            vec![day_row(date(2024, 4, 1), Value::from(Decimal::from(30000)))],
            vec![breakdown_row(("bucket", Value::from(date(2024, 5, 1))), 5, 2, 3)],
            vec![breakdown_row(("label", Value::String(None)), 50, 10, 40)],
            vec![breakdown_row(("bucket", Value::from(date(2024, 5, 1))), 5, 2, 3)],
            vec![breakdown_row(
                ("label", Value::from("2023-01-01".to_string())),
                100,
                20,
                80,
            )],
        ]);

        let bundle = ReportQueryCtrl::collect_bundle(&conn, 1).await.unwrap();

        assert!(bundle.missing_slots().is_empty());
        let Some(ShapedRecord::Lifetime(total_reports)) = &bundle.total_reports else {
            panic!("total_reports should be a lifetime record");
        };
        assert_eq!(total_reports.label.as_deref(), Some("2023-01-01"));
        assert_eq!(total_reports.paid, Some(80));
        assert_eq!(conn.into_transaction_log().len(), 6);
    }

    #[tokio::test]
    async fn empty_result_set_does_not_shift_later_slots() {
        let conn = mock_conn(vec![
            vec![day_row(date(2024, 5, 1), Value::from(Decimal::from(1000)))],
            vec![],
            vec![breakdown_row(("bucket", Value::from(date(2024, 5, 1))), 5, 2, 3)],
            vec![breakdown_row(("label", Value::from("50".to_string())), 12, 4, 8)],
            vec![],
            vec![breakdown_row(("label", Value::String(None)), 0, 0, 0)],
        ]);

        let bundle = ReportQueryCtrl::collect_bundle(&conn, 1).await.unwrap();

        assert_eq!(
            bundle.missing_slots(),
            [ReportQuery::LastMonthPayments, ReportQuery::YesterdayReports]
        );
        let Some(ShapedRecord::Day(users)) = &bundle.yesterday_users else {
            panic!("yesterday_users should be a day record");
        };
        assert_eq!(users.date, date(2024, 5, 1));
    }
}
