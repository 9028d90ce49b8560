//! `Postgres` incident store.
//!
//! Every query is raw SQL issued through `query_raw_params()` against the
//! `crimes` table. Groupings are pushed down into `GROUP BY` with the same
//! bucketing rules as the in-memory tally: blank raw values collapse into
//! `UNKNOWN`, temporal features skip rows without `report_dat`.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use crime_insights_analytics_models::{
    GroupCount, GroupKey, GroupValue, TemporalFeature, UNKNOWN_LABEL,
};
use crime_insights_database_models::{IncidentFilter, PageRequest, Predicate};
use crime_insights_incident_models::{IncidentPatch, IncidentRecord, NewIncident};
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::{DbError, IncidentStore};

const COLUMNS: &str = "id, offense, report_dat, start_date, end_date, shift, method, \
     ward, psa, neighborhood_cluster, created_at, updated_at";

/// An incident store backed by the `crimes` table.
pub struct PgIncidentStore {
    db: Arc<dyn Database>,
}

impl PgIncidentStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

fn opt_string(value: Option<&String>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |s| DatabaseValue::String(s.clone()))
}

fn opt_datetime(value: Option<&DateTime<Utc>>) -> DatabaseValue {
    value.map_or(DatabaseValue::Null, |dt| DatabaseValue::DateTime(dt.naive_utc()))
}

fn to_utc(naive: Option<NaiveDateTime>) -> Option<DateTime<Utc>> {
    naive.map(|n| n.and_utc())
}

/// Parameter values for the nine data columns, in `COLUMNS` order after
/// `id`.
fn incident_params(incident: &NewIncident) -> Vec<DatabaseValue> {
    vec![
        opt_string(incident.offense.as_ref()),
        opt_datetime(incident.report_dat.as_ref()),
        opt_datetime(incident.start_date.as_ref()),
        opt_datetime(incident.end_date.as_ref()),
        opt_string(incident.shift.as_ref()),
        opt_string(incident.method.as_ref()),
        opt_string(incident.ward.as_ref()),
        opt_string(incident.psa.as_ref()),
        opt_string(incident.neighborhood_cluster.as_ref()),
    ]
}

/// Converts a `crimes` row into an [`IncidentRecord`].
fn row_to_record(row: &switchy_database::Row) -> Result<IncidentRecord, DbError> {
    let id: i64 = row.to_value("id").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse incident id: {e}"),
    })?;
    let created_at: NaiveDateTime = row.to_value("created_at").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse created_at for incident {id}: {e}"),
    })?;
    let updated_at: NaiveDateTime = row.to_value("updated_at").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse updated_at for incident {id}: {e}"),
    })?;

    Ok(IncidentRecord {
        id,
        offense: row.to_value("offense").unwrap_or(None),
        report_dat: to_utc(row.to_value("report_dat").unwrap_or(None)),
        start_date: to_utc(row.to_value("start_date").unwrap_or(None)),
        end_date: to_utc(row.to_value("end_date").unwrap_or(None)),
        shift: row.to_value("shift").unwrap_or(None),
        method: row.to_value("method").unwrap_or(None),
        ward: row.to_value("ward").unwrap_or(None),
        psa: row.to_value("psa").unwrap_or(None),
        neighborhood_cluster: row.to_value("neighborhood_cluster").unwrap_or(None),
        created_at: created_at.and_utc(),
        updated_at: updated_at.and_utc(),
    })
}

fn first_record(rows: &[switchy_database::Row]) -> Result<Option<IncidentRecord>, DbError> {
    rows.first().map(row_to_record).transpose()
}

/// Builds a `WHERE` clause and its parameters from a filter.
///
/// Returns `(where_clause, params, next_param_index)`. The clause is empty
/// when the filter has no predicates.
fn build_where(
    filter: &IncidentFilter,
    extra: &[&str],
    start_idx: u32,
) -> (String, Vec<DatabaseValue>, u32) {
    let mut frags: Vec<String> = extra.iter().map(ToString::to_string).collect();
    let mut params: Vec<DatabaseValue> = Vec::new();
    let mut idx = start_idx;

    for predicate in &filter.predicates {
        match predicate {
            Predicate::Equals(field, value) => {
                frags.push(format!("{} = ${idx}", field.column()));
                params.push(DatabaseValue::String(value.clone()));
                idx += 1;
            }
            Predicate::Present(field) => {
                frags.push(format!("{} <> ''", trimmed(field.column())));
            }
            Predicate::ReportedPresent => {
                frags.push("report_dat IS NOT NULL".to_string());
            }
            Predicate::ReportedInYear(year) => {
                frags.push(format!("EXTRACT(YEAR FROM report_dat)::int = ${idx}"));
                params.push(DatabaseValue::Int32(*year));
                idx += 1;
            }
        }
    }

    let clause = if frags.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", frags.join(" AND "))
    };

    (clause, params, idx)
}

/// `BTRIM` character set matching
/// [`crime_insights_incident_models::BLANK_CHARS`].
const BLANK_SQL: &str = r"E' \t\r\n'";

/// `col` with nulls as `''` and blank characters trimmed from both ends.
fn trimmed(col: &str) -> String {
    format!("BTRIM(COALESCE({col}, ''), {BLANK_SQL})")
}

/// SQL expression producing the group value for `key`.
fn group_expr(key: GroupKey) -> String {
    match key {
        GroupKey::Field(field) => {
            let col = field.column();
            let trimmed = trimmed(col);
            format!("CASE WHEN {trimmed} = '' THEN '{UNKNOWN_LABEL}' ELSE {col} END")
        }
        GroupKey::Feature(feature) => {
            let part = match feature {
                TemporalFeature::Year => "YEAR",
                TemporalFeature::Month => "MONTH",
                TemporalFeature::DayOfWeek => "DOW",
                TemporalFeature::Hour => "HOUR",
            };
            format!("EXTRACT({part} FROM report_dat)::int")
        }
    }
}

#[async_trait]
impl IncidentStore for PgIncidentStore {
    async fn create(&self, incident: &NewIncident) -> Result<IncidentRecord, DbError> {
        let sql = format!(
            "INSERT INTO crimes (
                offense, report_dat, start_date, end_date, shift, method,
                ward, psa, neighborhood_cluster
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        let rows = self
            .db
            .query_raw_params(&sql, &incident_params(incident))
            .await?;

        first_record(&rows)?.ok_or_else(|| DbError::Conversion {
            message: "Insert returned no row".to_string(),
        })
    }

    async fn get(&self, id: i64) -> Result<Option<IncidentRecord>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM crimes WHERE id = $1");
        let rows = self
            .db
            .query_raw_params(&sql, &[DatabaseValue::Int64(id)])
            .await?;
        first_record(&rows)
    }

    async fn update(
        &self,
        id: i64,
        patch: &IncidentPatch,
    ) -> Result<Option<IncidentRecord>, DbError> {
        let Some(mut record) = self.get(id).await? else {
            return Ok(None);
        };
        record.apply(patch, Utc::now());

        let sql = format!(
            "UPDATE crimes SET
                offense = $1, report_dat = $2, start_date = $3, end_date = $4,
                shift = $5, method = $6, ward = $7, psa = $8,
                neighborhood_cluster = $9, updated_at = $10
             WHERE id = $11
             RETURNING {COLUMNS}"
        );
        let rows = self
            .db
            .query_raw_params(
                &sql,
                &[
                    opt_string(record.offense.as_ref()),
                    opt_datetime(record.report_dat.as_ref()),
                    opt_datetime(record.start_date.as_ref()),
                    opt_datetime(record.end_date.as_ref()),
                    opt_string(record.shift.as_ref()),
                    opt_string(record.method.as_ref()),
                    opt_string(record.ward.as_ref()),
                    opt_string(record.psa.as_ref()),
                    opt_string(record.neighborhood_cluster.as_ref()),
                    DatabaseValue::DateTime(record.updated_at.naive_utc()),
                    DatabaseValue::Int64(id),
                ],
            )
            .await?;

        // A concurrent delete between the read and the write leaves no row.
        first_record(&rows)
    }

    async fn delete(&self, id: i64) -> Result<Option<IncidentRecord>, DbError> {
        let sql = format!("DELETE FROM crimes WHERE id = $1 RETURNING {COLUMNS}");
        let rows = self
            .db
            .query_raw_params(&sql, &[DatabaseValue::Int64(id)])
            .await?;
        first_record(&rows)
    }

    async fn count(&self, filter: &IncidentFilter) -> Result<u64, DbError> {
        let (wc, params, _) = build_where(filter, &[], 1);
        let sql = format!("SELECT COUNT(*) as total FROM crimes{wc}");

        let rows = self.db.query_raw_params(&sql, &params).await?;
        let total: i64 = rows.first().map_or(0, |r| r.to_value("total").unwrap_or(0));

        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn find(
        &self,
        filter: &IncidentFilter,
        page: &PageRequest,
    ) -> Result<Vec<IncidentRecord>, DbError> {
        let (wc, mut params, idx) = build_where(filter, &[], 1);
        let mut sql = format!("SELECT {COLUMNS} FROM crimes{wc}");
        write!(
            sql,
            " ORDER BY {} LIMIT ${idx} OFFSET ${}",
            page.sort.order_by(),
            idx + 1
        )
        .map_err(|e| DbError::Conversion {
            message: format!("Failed to build listing query: {e}"),
        })?;
        params.push(DatabaseValue::Int64(
            i64::try_from(page.limit).unwrap_or(i64::MAX),
        ));
        params.push(DatabaseValue::Int64(
            i64::try_from(page.skip).unwrap_or(i64::MAX),
        ));

        let rows = self.db.query_raw_params(&sql, &params).await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn aggregate(
        &self,
        filter: &IncidentFilter,
        key: GroupKey,
    ) -> Result<Vec<GroupCount>, DbError> {
        let extra: &[&str] = if key.is_temporal() {
            &["report_dat IS NOT NULL"]
        } else {
            &[]
        };
        let (wc, params, _) = build_where(filter, extra, 1);
        let sql = format!(
            "SELECT {} AS group_key, COUNT(*) AS cnt
             FROM crimes{wc}
             GROUP BY 1",
            group_expr(key)
        );

        let rows = self.db.query_raw_params(&sql, &params).await?;
        log::debug!("Aggregated {} groups by {key}", rows.len());

        rows.iter()
            .map(|row| {
                let key = if key.is_temporal() {
                    let n: i32 = row.to_value("group_key").map_err(|e| DbError::Conversion {
                        message: format!("Failed to parse group key: {e}"),
                    })?;
                    GroupValue::Number(n)
                } else {
                    let s: String = row.to_value("group_key").map_err(|e| DbError::Conversion {
                        message: format!("Failed to parse group key: {e}"),
                    })?;
                    GroupValue::Label(s)
                };
                let cnt: i64 = row.to_value("cnt").unwrap_or(0);
                Ok(GroupCount::new(key, u64::try_from(cnt).unwrap_or(0)))
            })
            .collect()
    }

    async fn insert_many(&self, incidents: &[NewIncident]) -> Result<u64, DbError> {
        let mut inserted = 0u64;

        for incident in incidents {
            inserted += self
                .db
                .exec_raw_params(
                    "INSERT INTO crimes (
                        offense, report_dat, start_date, end_date, shift, method,
                        ward, psa, neighborhood_cluster
                     ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                    &incident_params(incident),
                )
                .await?;
        }

        Ok(inserted)
    }

    async fn clear(&self) -> Result<u64, DbError> {
        Ok(self.db.exec_raw_params("DELETE FROM crimes", &[]).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crime_insights_incident_models::IncidentField;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let (wc, params, idx) = build_where(&IncidentFilter::all(), &[], 1);
        assert!(wc.is_empty());
        assert!(params.is_empty());
        assert_eq!(idx, 1);
    }

    #[test]
    fn predicates_number_their_parameters() {
        let filter = IncidentFilter::all()
            .equals(IncidentField::Ward, "2")
            .with(Predicate::Present(IncidentField::Psa))
            .with(Predicate::ReportedInYear(2025));

        let (wc, params, idx) = build_where(&filter, &["report_dat IS NOT NULL"], 1);

        assert_eq!(
            wc,
            " WHERE report_dat IS NOT NULL AND ward = $1 \
             AND BTRIM(COALESCE(psa, ''), E' \\t\\r\\n') <> '' \
             AND EXTRACT(YEAR FROM report_dat)::int = $2"
        );
        assert_eq!(params.len(), 2);
        assert_eq!(idx, 3);
    }

    #[test]
    fn group_expressions_match_key_kind() {
        assert_eq!(
            group_expr(GroupKey::Feature(TemporalFeature::DayOfWeek)),
            "EXTRACT(DOW FROM report_dat)::int"
        );
        let method = group_expr(GroupKey::Field(IncidentField::Method));
        assert_eq!(
            method,
            r"CASE WHEN BTRIM(COALESCE(method, ''), E' \t\r\n') = '' THEN 'UNKNOWN' ELSE method END"
        );
    }
}
