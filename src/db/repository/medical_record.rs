use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::decode::{date_or, parse_timestamp, tag_or};
use crate::db::schema::TIMESTAMP_FORMAT;
use crate::db::statement::{prepare_insert, PartialRecord};
use crate::db::DatabaseError;
use crate::models::*;

/// Save a record and replace its whole indicator set.
///
/// Dropping the previous indicators, upserting the row and inserting the
/// current indicators commit together or not at all.
pub fn add_medical_record(conn: &Connection, record: &MedicalRecord) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let mut row = PartialRecord::new()
        .with("id", record.id.clone())
        .with("user_id", record.user_id.clone())
        .with("title", record.title.clone())
        .with("hospital", record.hospital.clone())
        .with("type", record.record_type.as_str().to_string())
        .with("date", record.date.to_string())
        .with("image_uri", record.image_uri.clone())
        .with("description", record.description.clone())
        .with("is_abnormal", record.is_abnormal)
        .with("disease_id", record.disease_id.clone());
    if let Some(created_at) = record.created_at {
        row.set("created_at", created_at.format(TIMESTAMP_FORMAT).to_string());
    }

    let removed = tx.execute(
        "DELETE FROM key_indicators WHERE record_id = ?1",
        params![record.id],
    )?;
    prepare_insert(&tx, "medical_records", &row)?.execute(&tx)?;

    for indicator in &record.key_indicators {
        let row = PartialRecord::new()
            .with("record_id", record.id.clone())
            .with("name", indicator.name.clone())
            .with("value", indicator.value.clone())
            .with("unit", indicator.unit.clone())
            .with("normal_range", indicator.normal_range.clone())
            .with("is_abnormal", indicator.is_abnormal);
        prepare_insert(&tx, "key_indicators", &row)?.execute(&tx)?;
    }

    tx.commit()?;

    tracing::debug!(
        record_id = %record.id,
        replaced = removed,
        indicators = record.key_indicators.len(),
        "Saved medical record"
    );
    Ok(())
}

/// Records matching every supplied filter, newest date first, each with
/// its indicators in insertion order.
pub fn get_medical_records(
    conn: &Connection,
    filter: &RecordFilter,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(user_id) = &filter.user_id {
        values.push(Value::Text(user_id.clone()));
        conditions.push(format!("mr.user_id = ?{}", values.len()));
    }
    if let Some(record_type) = &filter.record_type {
        values.push(Value::Text(record_type.as_str().to_string()));
        conditions.push(format!("mr.type = ?{}", values.len()));
    }
    if let Some(disease_id) = &filter.disease_id {
        values.push(Value::Text(disease_id.clone()));
        conditions.push(format!("mr.disease_id = ?{}", values.len()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    query_records(conn, &where_clause, values)
}

/// Records linked to a chronic disease.
pub fn get_medical_records_by_disease(
    conn: &Connection,
    disease_id: &str,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    get_medical_records(conn, &RecordFilter::for_disease(disease_id))
}

pub fn get_medical_record(
    conn: &Connection,
    record_id: &str,
) -> Result<Option<MedicalRecord>, DatabaseError> {
    let mut records = query_records(
        conn,
        "WHERE mr.id = ?1",
        vec![Value::Text(record_id.to_string())],
    )?;
    Ok(records.pop())
}

pub fn get_key_indicators(
    conn: &Connection,
    record_id: &str,
) -> Result<Vec<KeyIndicator>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT name, value, unit, normal_range, is_abnormal
         FROM key_indicators WHERE record_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map(params![record_id], |row| {
        Ok(KeyIndicator {
            name: row.get(0)?,
            value: row.get(1)?,
            unit: row.get(2)?,
            normal_range: row.get(3)?,
            is_abnormal: row.get::<_, Option<bool>>(4)?.unwrap_or(false),
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(DatabaseError::from)
}

/// Delete a record and its indicators. `NotFound` (with nothing changed)
/// when the record does not exist.
pub fn delete_medical_record(conn: &Connection, record_id: &str) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    if delete_records_where(&tx, "id = ?1", record_id)? == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "MedicalRecord".into(),
            id: record_id.to_string(),
        });
    }
    tx.commit()?;

    tracing::info!(record_id, "Deleted medical record");
    Ok(())
}

/// Delete the records selected by `predicate` (one `?1` parameter) and
/// their indicators. Runs inside the caller's transaction.
pub(crate) fn delete_records_where(
    conn: &Connection,
    predicate: &str,
    param: &str,
) -> Result<usize, DatabaseError> {
    conn.execute(
        &format!(
            "DELETE FROM key_indicators WHERE record_id IN
             (SELECT id FROM medical_records WHERE {predicate})"
        ),
        params![param],
    )?;
    let deleted = conn.execute(
        &format!("DELETE FROM medical_records WHERE {predicate}"),
        params![param],
    )?;
    Ok(deleted)
}

// One row per (record, indicator); records without indicators appear once
// with NULL indicator columns.
struct RecordIndicatorRow {
    id: String,
    user_id: String,
    title: String,
    hospital: String,
    record_type: Option<String>,
    date: Option<String>,
    image_uri: Option<String>,
    description: Option<String>,
    is_abnormal: Option<bool>,
    created_at: Option<String>,
    disease_id: Option<String>,
    indicator: Option<KeyIndicator>,
}

fn record_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<RecordIndicatorRow, rusqlite::Error> {
    let indicator_name: Option<String> = row.get(11)?;
    let indicator = match indicator_name {
        Some(name) => Some(KeyIndicator {
            name,
            value: row.get(12)?,
            unit: row.get(13)?,
            normal_range: row.get(14)?,
            is_abnormal: row.get::<_, Option<bool>>(15)?.unwrap_or(false),
        }),
        None => None,
    };

    Ok(RecordIndicatorRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        hospital: row.get(3)?,
        record_type: row.get(4)?,
        date: row.get(5)?,
        image_uri: row.get(6)?,
        description: row.get(7)?,
        is_abnormal: row.get(8)?,
        created_at: row.get(9)?,
        disease_id: row.get(10)?,
        indicator,
    })
}

fn query_records(
    conn: &Connection,
    where_clause: &str,
    values: Vec<Value>,
) -> Result<Vec<MedicalRecord>, DatabaseError> {
    let sql = format!(
        "SELECT mr.id, mr.user_id, mr.title, mr.hospital, mr.type, mr.date,
                mr.image_uri, mr.description, mr.is_abnormal, mr.created_at, mr.disease_id,
                ki.name, ki.value, ki.unit, ki.normal_range, ki.is_abnormal
         FROM medical_records mr
         LEFT JOIN key_indicators ki ON ki.record_id = mr.id
         {where_clause}
         ORDER BY mr.date DESC, mr.created_at DESC, mr.id, ki.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), record_row_from_rusqlite)?;

    let mut records: Vec<MedicalRecord> = Vec::new();
    for row in rows {
        let row = row?;
        match records.last_mut() {
            Some(current) if current.id == row.id => {
                current.key_indicators.extend(row.indicator);
            }
            _ => records.push(record_from_row(row)),
        }
    }
    Ok(records)
}

fn record_from_row(row: RecordIndicatorRow) -> MedicalRecord {
    let created_at = row.created_at.as_deref().and_then(parse_timestamp);
    let date_fallback = created_at.map(|t| t.date()).unwrap_or_default();
    MedicalRecord {
        record_type: tag_or(row.record_type.as_deref(), RecordType::Other, "medical_records", &row.id),
        date: date_or(row.date.as_deref(), date_fallback, "medical_records", &row.id),
        id: row.id,
        user_id: row.user_id,
        title: row.title,
        hospital: row.hospital,
        image_uri: row.image_uri,
        description: row.description,
        key_indicators: row.indicator.into_iter().collect(),
        is_abnormal: row.is_abnormal.unwrap_or(false),
        created_at,
        disease_id: row.disease_id,
    }
}
