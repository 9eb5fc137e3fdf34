use rusqlite::{params, Connection};

use super::decode::{date_or, tag_or};
use crate::db::statement::{prepare_insert, PartialRecord};
use crate::db::DatabaseError;
use crate::models::*;

/// Save a disease with its indicator series and reminders.
///
/// The stored indicators, values and reminders are replaced by the ones on
/// `disease`, so saving the same disease twice does not duplicate series.
/// Everything commits in one transaction.
pub fn add_chronic_disease(conn: &Connection, disease: &ChronicDisease) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    delete_disease_children(&tx, "id = ?1", &disease.id)?;

    let row = PartialRecord::new()
        .with("id", disease.id.clone())
        .with("user_id", disease.user_id.clone())
        .with("name", disease.name.clone())
        .with("type", disease.disease_type.as_str().to_string());
    prepare_insert(&tx, "chronic_diseases", &row)?.execute(&tx)?;

    let mut value_count = 0;
    for indicator in &disease.indicators {
        let row = PartialRecord::new()
            .with("disease_id", disease.id.clone())
            .with("name", indicator.name.clone())
            .with("unit", indicator.unit.clone())
            .with("normal_range", indicator.normal_range.clone());
        let indicator_id = prepare_insert(&tx, "disease_indicators", &row)?.execute(&tx)?;

        for value in &indicator.values {
            let row = PartialRecord::new()
                .with("indicator_id", indicator_id)
                .with("date", value.date.to_string())
                .with("value", value.value)
                .with("is_abnormal", value.is_abnormal);
            prepare_insert(&tx, "indicator_values", &row)?.execute(&tx)?;
            value_count += 1;
        }
    }

    for reminder in &disease.reminders {
        let row = PartialRecord::new()
            .with("id", reminder.id.clone())
            .with("disease_id", disease.id.clone())
            .with("title", reminder.title.clone())
            .with("description", reminder.description.clone())
            .with("date", reminder.date.to_string())
            .with("type", reminder.reminder_type.as_str().to_string())
            .with("is_completed", reminder.is_completed)
            .with("is_repeating", reminder.is_repeating)
            .with("repeat_interval", reminder.repeat_interval);
        prepare_insert(&tx, "health_reminders", &row)?.execute(&tx)?;
    }

    tx.commit()?;

    tracing::debug!(
        disease_id = %disease.id,
        indicators = disease.indicators.len(),
        values = value_count,
        reminders = disease.reminders.len(),
        "Saved chronic disease"
    );
    Ok(())
}

/// Diseases (optionally for one user), newest first, fully populated.
///
/// Issues one query per disease and per indicator. Fine for a family
/// archive; a bulk join would be needed for large series.
pub fn get_chronic_diseases(
    conn: &Connection,
    user_id: Option<&str>,
) -> Result<Vec<ChronicDisease>, DatabaseError> {
    let base = "SELECT id, user_id, name, type FROM chronic_diseases";
    let order = "ORDER BY created_at DESC, rowid DESC";

    let mut stmt = match user_id {
        Some(_) => conn.prepare(&format!("{base} WHERE user_id = ?1 {order}"))?,
        None => conn.prepare(&format!("{base} {order}"))?,
    };
    let map_row = |row: &rusqlite::Row<'_>| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    };
    let rows = match user_id {
        Some(uid) => stmt.query_map(params![uid], map_row)?.collect::<Result<Vec<_>, _>>()?,
        None => stmt.query_map([], map_row)?.collect::<Result<Vec<_>, _>>()?,
    };

    let mut diseases = Vec::with_capacity(rows.len());
    for (id, user_id, name, disease_type) in rows {
        let indicators = get_disease_indicators(conn, &id)?;
        let reminders = get_health_reminders(conn, &id)?;
        diseases.push(ChronicDisease {
            disease_type: tag_or(disease_type.as_deref(), DiseaseType::Other, "chronic_diseases", &id),
            id,
            user_id,
            name,
            indicators,
            reminders,
        });
    }
    Ok(diseases)
}

fn get_disease_indicators(
    conn: &Connection,
    disease_id: &str,
) -> Result<Vec<DiseaseIndicator>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, unit, normal_range FROM disease_indicators
         WHERE disease_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![disease_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut values_stmt = conn.prepare(
        "SELECT id, date, value, is_abnormal FROM indicator_values
         WHERE indicator_id = ?1 ORDER BY date DESC, id DESC",
    )?;

    let mut indicators = Vec::with_capacity(rows.len());
    for (indicator_id, name, unit, normal_range) in rows {
        let values = values_stmt
            .query_map(params![indicator_id], |row| {
                let id: i64 = row.get(0)?;
                let date: Option<String> = row.get(1)?;
                Ok(IndicatorValue {
                    date: date_or(date.as_deref(), Default::default(), "indicator_values", &id.to_string()),
                    value: row.get(2)?,
                    is_abnormal: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        indicators.push(DiseaseIndicator {
            name,
            unit,
            normal_range,
            values,
        });
    }
    Ok(indicators)
}

fn get_health_reminders(
    conn: &Connection,
    disease_id: &str,
) -> Result<Vec<HealthReminder>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, date, type, is_completed, is_repeating, repeat_interval
         FROM health_reminders WHERE disease_id = ?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![disease_id], |row| {
        Ok(ReminderRow {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            date: row.get(3)?,
            reminder_type: row.get(4)?,
            is_completed: row.get(5)?,
            is_repeating: row.get(6)?,
            repeat_interval: row.get(7)?,
        })
    })?;

    let mut reminders = Vec::new();
    for row in rows {
        reminders.push(reminder_from_row(row?));
    }
    Ok(reminders)
}

/// Delete a disease with its indicators, values and reminders. Records that
/// referenced it stay, detached from the disease. `NotFound` (with nothing
/// changed) when the disease does not exist.
pub fn delete_chronic_disease(conn: &Connection, disease_id: &str) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    if delete_diseases_where(&tx, "id = ?1", disease_id)? == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "ChronicDisease".into(),
            id: disease_id.to_string(),
        });
    }
    tx.commit()?;

    tracing::info!(disease_id, "Deleted chronic disease");
    Ok(())
}

/// Mark a reminder done or pending again.
pub fn set_reminder_completed(
    conn: &Connection,
    reminder_id: &str,
    completed: bool,
) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE health_reminders SET is_completed = ?1 WHERE id = ?2",
        params![completed, reminder_id],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "HealthReminder".into(),
            id: reminder_id.to_string(),
        });
    }
    Ok(())
}

/// Delete the diseases selected by `predicate` (one `?1` parameter) with
/// all their dependents. Runs inside the caller's transaction.
pub(crate) fn delete_diseases_where(
    conn: &Connection,
    predicate: &str,
    param: &str,
) -> Result<usize, DatabaseError> {
    delete_disease_children(conn, predicate, param)?;
    conn.execute(
        &format!(
            "UPDATE medical_records SET disease_id = NULL WHERE disease_id IN
             (SELECT id FROM chronic_diseases WHERE {predicate})"
        ),
        params![param],
    )?;
    let deleted = conn.execute(
        &format!("DELETE FROM chronic_diseases WHERE {predicate}"),
        params![param],
    )?;
    Ok(deleted)
}

fn delete_disease_children(
    conn: &Connection,
    predicate: &str,
    param: &str,
) -> Result<(), DatabaseError> {
    let diseases = format!("SELECT id FROM chronic_diseases WHERE {predicate}");
    conn.execute(
        &format!(
            "DELETE FROM indicator_values WHERE indicator_id IN
             (SELECT id FROM disease_indicators WHERE disease_id IN ({diseases}))"
        ),
        params![param],
    )?;
    conn.execute(
        &format!("DELETE FROM disease_indicators WHERE disease_id IN ({diseases})"),
        params![param],
    )?;
    conn.execute(
        &format!("DELETE FROM health_reminders WHERE disease_id IN ({diseases})"),
        params![param],
    )?;
    Ok(())
}

struct ReminderRow {
    id: String,
    title: String,
    description: String,
    date: Option<String>,
    reminder_type: Option<String>,
    is_completed: Option<bool>,
    is_repeating: Option<bool>,
    repeat_interval: Option<i64>,
}

fn reminder_from_row(row: ReminderRow) -> HealthReminder {
    HealthReminder {
        date: date_or(row.date.as_deref(), Default::default(), "health_reminders", &row.id),
        reminder_type: tag_or(
            row.reminder_type.as_deref(),
            ReminderType::Checkup,
            "health_reminders",
            &row.id,
        ),
        id: row.id,
        title: row.title,
        description: row.description,
        is_completed: row.is_completed.unwrap_or(false),
        is_repeating: row.is_repeating.unwrap_or(false),
        repeat_interval: row.repeat_interval,
    }
}
