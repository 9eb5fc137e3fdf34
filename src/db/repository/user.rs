use rusqlite::{params, Connection};

use crate::db::statement::{prepare_insert, PartialRecord};
use crate::db::DatabaseError;
use crate::models::*;

use super::chronic_disease::delete_diseases_where;
use super::decode::tag_or;
use super::medical_record::delete_records_where;

pub fn add_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let row = PartialRecord::new()
        .with("id", user.id.clone())
        .with("name", user.name.clone())
        .with("avatar", user.avatar.clone())
        .with("relationship", user.relationship.as_str().to_string())
        .with("color", user.color.clone());
    prepare_insert(conn, "users", &row)?.execute(conn)?;
    Ok(())
}

/// All users, oldest first.
pub fn get_users(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, avatar, relationship, color
         FROM users ORDER BY created_at, rowid",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut users = Vec::new();
    for row in rows {
        let (id, name, avatar, relationship, color) = row?;
        users.push(User {
            relationship: tag_or(relationship.as_deref(), Relationship::Myself, "users", &id),
            id,
            name,
            avatar,
            color,
        });
    }
    Ok(users)
}

/// Update the editable columns of an existing user.
pub fn update_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    let affected = conn.execute(
        "UPDATE users SET name = ?1, avatar = ?2, relationship = ?3, color = ?4 WHERE id = ?5",
        params![
            user.name,
            user.avatar,
            user.relationship.as_str(),
            user.color,
            user.id,
        ],
    )?;
    if affected == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user.id.clone(),
        });
    }
    Ok(())
}

/// Delete a user together with everything recorded for them.
///
/// Records (with their indicators) and chronic diseases (with indicators,
/// values and reminders) go first so no row is left pointing at the user.
/// `NotFound` (with nothing changed) when the user does not exist.
pub fn delete_user(conn: &Connection, user_id: &str) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;

    let records = delete_records_where(&tx, "user_id = ?1", user_id)?;
    let diseases = delete_diseases_where(&tx, "user_id = ?1", user_id)?;
    if tx.execute("DELETE FROM users WHERE id = ?1", params![user_id])? == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "User".into(),
            id: user_id.to_string(),
        });
    }
    tx.commit()?;

    tracing::info!(
        user_id,
        records,
        diseases,
        "Deleted user and dependent data"
    );
    Ok(())
}
