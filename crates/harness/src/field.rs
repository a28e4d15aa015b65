use wellguard_core::{
    ids::{ProjectId, WellId},
    well::{DataSource, IdentifierField, Scope, Well},
};
use wellguard_engine::Engine;
use wellguard_storage::{SqliteStorage, StorageError, WellStore};

/// A fresh project scope.
pub fn project() -> Scope {
    Scope::Project(ProjectId::new())
}

/// A store seeded with wells, wrapped in an engine.
pub struct TestField<S = SqliteStorage> {
    pub engine: Engine<S>,
}

impl TestField<SqliteStorage> {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_store(SqliteStorage::open_in_memory()?))
    }
}

impl<S: WellStore> TestField<S> {
    pub fn with_store(store: S) -> Self {
        crate::init_tracing();
        Self {
            engine: Engine::new(store),
        }
    }

    /// Insert a well whose chosen identifier mirrors `chosen`.
    pub fn add_well(
        &mut self,
        scope: Scope,
        data_source: DataSource,
        chosen: IdentifierField,
        candidates: &[(IdentifierField, &str)],
    ) -> Result<WellId, StorageError> {
        let well = Well::new(
            scope,
            data_source,
            chosen,
            candidates.iter().map(|(f, v)| (*f, v.to_string())),
        );
        self.engine.store_mut().insert_well(&well)?;
        Ok(well.id)
    }

    /// Insert a well identified by its `api10`.
    pub fn add_api10_well(
        &mut self,
        scope: Scope,
        data_source: DataSource,
        api10: &str,
    ) -> Result<WellId, StorageError> {
        self.add_well(
            scope,
            data_source,
            IdentifierField::Api10,
            &[(IdentifierField::Api10, api10)],
        )
    }

    /// Give a well an ownership record and `production` production records.
    pub fn attach_records(&mut self, well_id: WellId, production: usize) -> Result<(), StorageError> {
        let store = self.engine.store_mut();
        store.attach_ownership(well_id)?;
        for _ in 0..production {
            store.insert_production_record(well_id)?;
        }
        Ok(())
    }

    pub fn well(&self, well_id: WellId) -> Result<Well, StorageError> {
        self.engine
            .store()
            .get_well(well_id)?
            .ok_or_else(|| StorageError::NotFound(format!("well {well_id}")))
    }
}
