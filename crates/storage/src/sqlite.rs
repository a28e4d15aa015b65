use std::collections::BTreeMap;
use std::rc::Rc;

use rusqlite::{Connection, OptionalExtension, ToSql, params_from_iter, types::Value};
use tracing::debug;

use wellguard_core::{
    ids::{ProjectId, WellId},
    well::{DataSource, IdentifierField, Scope, Well},
};

use crate::error::StorageError;
use crate::traits::{
    IdSet, IdentifierColumn, OwnershipRecord, Predicate, ProductionRecord, Projection,
    SideTablePatch, WellFilter, WellPatch, WellRow, WellStore, normalize_identifier,
};

/// Convert Vec<u8> to fixed-size array with proper error handling.
fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

fn read_scope(project: Option<Vec<u8>>) -> Result<Scope, StorageError> {
    match project {
        None => Ok(Scope::Company),
        Some(bytes) => Ok(Scope::Project(ProjectId::from_bytes(to_array::<16>(
            bytes,
            "project_id",
        )?))),
    }
}

fn scope_param(scope: Scope) -> Option<Vec<u8>> {
    scope.project().map(|p| p.as_bytes().to_vec())
}

/// Sets are bound through `rarray()` so batch size never runs into
/// SQLite's bound-parameter limit.
fn id_array<'a>(ids: impl IntoIterator<Item = &'a WellId>) -> Rc<Vec<Value>> {
    Rc::new(
        ids.into_iter()
            .map(|id| Value::Blob(id.as_bytes().to_vec()))
            .collect(),
    )
}

fn text_array<'a>(values: impl IntoIterator<Item = &'a str>) -> Rc<Vec<Value>> {
    Rc::new(
        values
            .into_iter()
            .map(|v| Value::Text(v.to_string()))
            .collect(),
    )
}

/// Positional `?` clauses; params are bound in push order.
#[derive(Default)]
struct Clauses {
    sql: Vec<String>,
    params: Vec<Box<dyn ToSql>>,
}

impl Clauses {
    fn raw(&mut self, sql: impl Into<String>) {
        self.sql.push(sql.into());
    }

    fn bind(&mut self, sql: impl Into<String>, param: impl ToSql + 'static) {
        self.sql.push(sql.into());
        self.params.push(Box::new(param));
    }

    fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql.join(" AND "))
        }
    }
}

fn filter_clauses(filter: &WellFilter) -> Clauses {
    let mut clauses = Clauses::default();

    match &filter.ids {
        IdSet::Any => {}
        IdSet::Only(ids) => clauses.bind("well_id IN rarray(?)", id_array(ids)),
        IdSet::Except(ids) if ids.is_empty() => {}
        IdSet::Except(ids) => clauses.bind("well_id NOT IN rarray(?)", id_array(ids)),
    }

    match &filter.scope {
        Predicate::Any => {}
        Predicate::Equals(Scope::Company) => clauses.raw("project_id IS NULL"),
        Predicate::Equals(Scope::Project(p)) => {
            clauses.bind("project_id = ?", p.as_bytes().to_vec())
        }
        Predicate::In(scopes) => {
            let projects: Vec<Value> = scopes
                .iter()
                .filter_map(Scope::project)
                .map(|p| Value::Blob(p.as_bytes().to_vec()))
                .collect();
            let company = scopes.contains(&Scope::Company);
            match (projects.is_empty(), company) {
                (true, true) => clauses.raw("project_id IS NULL"),
                (true, false) => clauses.raw("0"),
                (false, true) => clauses.bind(
                    "(project_id IN rarray(?) OR project_id IS NULL)",
                    Rc::new(projects),
                ),
                (false, false) => clauses.bind("project_id IN rarray(?)", Rc::new(projects)),
            }
        }
    }

    match &filter.data_source {
        Predicate::Any => {}
        Predicate::Equals(source) => clauses.bind("data_source = ?", source.as_str()),
        Predicate::In(sources) => clauses.bind(
            "data_source IN rarray(?)",
            text_array(sources.iter().map(DataSource::as_str)),
        ),
    }

    if let Some(identifier) = &filter.identifier {
        let column = identifier.column.column_name();
        match &identifier.predicate {
            Predicate::Any => {}
            Predicate::Equals(value) if value.is_empty() => clauses.raw("0"),
            Predicate::Equals(value) => clauses.bind(format!("{column} = ?"), value.clone()),
            Predicate::In(values) => {
                let values: Vec<&str> = values
                    .iter()
                    .map(String::as_str)
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    clauses.raw("0");
                } else {
                    clauses.bind(format!("{column} IN rarray(?)"), text_array(values));
                }
            }
        }
    }

    clauses
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        rusqlite::vtab::array::load_module(&conn)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

const WELL_COLUMNS: &str = "well_id, project_id, data_source, chosen_field, chosen_value, \
     inpt_id, api10, api12, api14, aries_id, phdwin_id, revision";

fn read_well(row: &rusqlite::Row) -> Result<Well, StorageError> {
    let id = WellId::from_bytes(to_array::<16>(row.get(0)?, "well_id")?);
    let scope = read_scope(row.get(1)?)?;
    let data_source = DataSource::parse(&row.get::<_, String>(2)?)?;
    let chosen_field = IdentifierField::parse(&row.get::<_, String>(3)?)?;
    let chosen_value: Option<String> = row.get(4)?;

    let mut candidates = BTreeMap::new();
    for (offset, field) in IdentifierField::ALL.into_iter().enumerate() {
        if let Some(value) = row.get::<_, Option<String>>(5 + offset)? {
            candidates.insert(field, value);
        }
    }
    let revision: i64 = row.get(11)?;

    Ok(Well {
        id,
        scope,
        data_source,
        chosen_field,
        chosen_value,
        candidates,
        revision: revision as u64,
    })
}

fn map_constraint(err: rusqlite::Error, what: impl FnOnce() -> String) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            StorageError::ConstraintViolation(what())
        }
        other => StorageError::Sqlite(other),
    }
}

impl WellStore for SqliteStorage {
    fn insert_well(&mut self, well: &Well) -> Result<(), StorageError> {
        let candidate = |field| well.candidates.get(&field).cloned();
        self.conn
            .execute(
                &format!("INSERT INTO wells ({WELL_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"),
                rusqlite::params![
                    well.id.as_bytes().as_slice(),
                    scope_param(well.scope),
                    well.data_source.as_str(),
                    well.chosen_field.as_str(),
                    well.chosen_value,
                    candidate(IdentifierField::InptId),
                    candidate(IdentifierField::Api10),
                    candidate(IdentifierField::Api12),
                    candidate(IdentifierField::Api14),
                    candidate(IdentifierField::AriesId),
                    candidate(IdentifierField::PhdwinId),
                    well.revision as i64,
                ],
            )
            .map_err(|e| map_constraint(e, || format!("well {} already exists", well.id)))?;
        Ok(())
    }

    fn get_well(&self, well_id: WellId) -> Result<Option<Well>, StorageError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {WELL_COLUMNS} FROM wells WHERE well_id = ?1"))?;
        let mut rows = stmt.query(rusqlite::params![well_id.as_bytes().as_slice()])?;
        match rows.next()? {
            Some(row) => Ok(Some(read_well(row)?)),
            None => Ok(None),
        }
    }

    fn well_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM wells", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn find_wells(
        &self,
        filter: &WellFilter,
        projection: &Projection,
    ) -> Result<Vec<WellRow>, StorageError> {
        if filter.is_unsatisfiable() {
            return Ok(Vec::new());
        }

        let mut columns = vec!["well_id", "revision"];
        if projection.scope {
            columns.push("project_id");
        }
        if projection.data_source {
            columns.push("data_source");
        }
        if let Some(column) = projection.identifier {
            columns.push(column.column_name());
        }

        let clauses = filter_clauses(filter);
        let sql = format!(
            "SELECT {} FROM wells{} ORDER BY well_id",
            columns.join(", "),
            clauses.where_sql()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(clauses.params.iter()))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let id = WellId::from_bytes(to_array::<16>(row.get(0)?, "well_id")?);
            let revision: i64 = row.get(1)?;
            let mut idx = 2;
            let scope = if projection.scope {
                idx += 1;
                Some(read_scope(row.get(idx - 1)?)?)
            } else {
                None
            };
            let data_source = if projection.data_source {
                idx += 1;
                Some(DataSource::parse(&row.get::<_, String>(idx - 1)?)?)
            } else {
                None
            };
            let identifier = match projection.identifier {
                Some(_) => normalize_identifier(row.get(idx)?),
                None => None,
            };
            result.push(WellRow {
                id,
                revision: revision as u64,
                scope,
                data_source,
                identifier,
            });
        }
        Ok(result)
    }

    fn update_wells(&mut self, ids: &[WellId], patch: &WellPatch) -> Result<usize, StorageError> {
        if ids.is_empty() || patch.is_empty() {
            return Ok(0);
        }

        let mut sets = Clauses::default();
        if let Some(scope) = patch.scope {
            sets.bind("project_id = ?", scope_param(scope));
        }
        if let Some(source) = patch.data_source {
            sets.bind("data_source = ?", source.as_str());
        }
        if let Some(field) = patch.chosen_identifier {
            sets.bind("chosen_field = ?", field.as_str());
            sets.raw(format!(
                "chosen_value = {}",
                IdentifierColumn::Candidate(field).column_name()
            ));
        }
        sets.raw("revision = revision + 1");
        sets.params.push(Box::new(id_array(ids)));

        let sql = format!(
            "UPDATE wells SET {} WHERE well_id IN rarray(?)",
            sets.sql.join(", ")
        );
        let tx = self.conn.transaction()?;
        let updated = tx.execute(&sql, params_from_iter(sets.params.iter()))?;
        tx.commit()?;
        debug!(requested = ids.len(), updated, "updated wells");
        Ok(updated)
    }

    fn attach_ownership(&mut self, well_id: WellId) -> Result<(), StorageError> {
        let inserted = self
            .conn
            .execute(
                "INSERT INTO ownership (well_id, data_source, chosen_value)
                 SELECT well_id, data_source, chosen_value FROM wells WHERE well_id = ?1",
                rusqlite::params![well_id.as_bytes().as_slice()],
            )
            .map_err(|e| map_constraint(e, || format!("ownership for {well_id} already exists")))?;
        if inserted == 0 {
            return Err(StorageError::NotFound(format!("well {well_id}")));
        }
        Ok(())
    }

    fn get_ownership(&self, well_id: WellId) -> Result<Option<OwnershipRecord>, StorageError> {
        let row = self
            .conn
            .query_row(
                "SELECT data_source, chosen_value FROM ownership WHERE well_id = ?1",
                rusqlite::params![well_id.as_bytes().as_slice()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;
        match row {
            Some((source, chosen_value)) => Ok(Some(OwnershipRecord {
                well_id,
                data_source: DataSource::parse(&source)?,
                chosen_value,
            })),
            None => Ok(None),
        }
    }

    fn update_side_table(
        &mut self,
        ids: &[WellId],
        patch: &SideTablePatch,
    ) -> Result<usize, StorageError> {
        if ids.is_empty() || patch.is_empty() {
            return Ok(0);
        }

        let mut sets = Clauses::default();
        if let Some(source) = patch.data_source {
            sets.bind("data_source = ?", source.as_str());
        }
        if patch.sync_chosen_identifier {
            sets.raw(
                "chosen_value = (SELECT w.chosen_value FROM wells w WHERE w.well_id = ownership.well_id)",
            );
        }
        sets.params.push(Box::new(id_array(ids)));

        let sql = format!(
            "UPDATE ownership SET {} WHERE well_id IN rarray(?)",
            sets.sql.join(", ")
        );
        let tx = self.conn.transaction()?;
        let updated = tx.execute(&sql, params_from_iter(sets.params.iter()))?;
        tx.commit()?;
        debug!(requested = ids.len(), updated, "updated ownership records");
        Ok(updated)
    }

    fn insert_production_record(&mut self, well_id: WellId) -> Result<i64, StorageError> {
        let inserted = self.conn.execute(
            "INSERT INTO production (well_id, project_id)
             SELECT well_id, project_id FROM wells WHERE well_id = ?1",
            rusqlite::params![well_id.as_bytes().as_slice()],
        )?;
        if inserted == 0 {
            return Err(StorageError::NotFound(format!("well {well_id}")));
        }
        Ok(self.conn.last_insert_rowid())
    }

    fn get_production_records(
        &self,
        well_id: WellId,
    ) -> Result<Vec<ProductionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT record_id, project_id FROM production WHERE well_id = ?1 ORDER BY record_id",
        )?;
        let rows = stmt.query_map(rusqlite::params![well_id.as_bytes().as_slice()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, Option<Vec<u8>>>(1)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (record_id, project) = row?;
            result.push(ProductionRecord {
                record_id,
                well_id,
                scope: read_scope(project)?,
            });
        }
        Ok(result)
    }

    fn update_denormalized_scope(
        &mut self,
        well_ids: &[WellId],
        scope: Scope,
    ) -> Result<usize, StorageError> {
        if well_ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            "UPDATE production SET project_id = ?1 WHERE well_id IN rarray(?2)",
            rusqlite::params![scope_param(scope), id_array(well_ids)],
        )?;
        tx.commit()?;
        debug!(wells = well_ids.len(), updated, "updated production scope");
        Ok(updated)
    }
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.conn.path())
            .finish()
    }
}
