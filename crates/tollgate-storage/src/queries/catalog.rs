// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model catalog entries.

use rusqlite::{Connection, OptionalExtension, params};
use tollgate_core::money;
use tollgate_core::{ModelEntry, TollgateError};

use crate::database::map_sqlite_err;
use crate::models::ModelRow;

/// Insert a model, or replace the pricing of an existing one.
pub fn put(conn: &Connection, model: &ModelEntry) -> Result<(), TollgateError> {
    let token_cost = money::check_tokens(model.token_cost, "token_cost")?;
    let cost_per_use = money::to_micros(model.cost_per_use, "cost_per_use")?;
    conn.execute(
        "INSERT INTO models (name, token_cost, cost_per_use_micros) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET
             token_cost = excluded.token_cost,
             cost_per_use_micros = excluded.cost_per_use_micros",
        params![model.name, token_cost, cost_per_use],
    )
    .map_err(map_sqlite_err)?;
    Ok(())
}

pub fn get(conn: &Connection, name: &str) -> Result<Option<ModelEntry>, TollgateError> {
    conn.query_row(
        "SELECT name, token_cost, cost_per_use_micros FROM models WHERE name = ?1",
        params![name],
        ModelRow::from_row,
    )
    .optional()
    .map_err(map_sqlite_err)?
    .map(ModelRow::into_model)
    .transpose()
}

pub fn list(conn: &Connection) -> Result<Vec<ModelEntry>, TollgateError> {
    let mut stmt = conn
        .prepare("SELECT name, token_cost, cost_per_use_micros FROM models ORDER BY name")
        .map_err(map_sqlite_err)?;
    let rows = stmt
        .query_map([], ModelRow::from_row)
        .map_err(map_sqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_sqlite_err)?;
    rows.into_iter().map(ModelRow::into_model).collect()
}
