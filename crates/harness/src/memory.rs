use std::collections::BTreeMap;

use wellguard_core::{
    ids::WellId,
    well::{Scope, Well},
};
use wellguard_storage::{
    OwnershipRecord, ProductionRecord, Projection, SideTablePatch, StorageError, WellFilter,
    WellPatch, WellRow, WellStore,
};

/// In-memory [`WellStore`] with switchable failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    wells: BTreeMap<WellId, Well>,
    ownership: BTreeMap<WellId, OwnershipRecord>,
    production: Vec<ProductionRecord>,
    fail_reads: bool,
    fail_side_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `find_*` read fail as if the store were down.
    pub fn fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make side-table and production-record writes fail.
    pub fn fail_side_writes(&mut self, fail: bool) {
        self.fail_side_writes = fail;
    }

    fn check_side_write(&self) -> Result<(), StorageError> {
        if self.fail_side_writes {
            return Err(StorageError::Unavailable("side table write refused".into()));
        }
        Ok(())
    }
}

impl WellStore for MemoryStore {
    fn insert_well(&mut self, well: &Well) -> Result<(), StorageError> {
        if self.wells.contains_key(&well.id) {
            return Err(StorageError::ConstraintViolation(format!(
                "well {} already exists",
                well.id
            )));
        }
        self.wells.insert(well.id, well.clone());
        Ok(())
    }

    fn get_well(&self, well_id: WellId) -> Result<Option<Well>, StorageError> {
        Ok(self.wells.get(&well_id).cloned())
    }

    fn well_count(&self) -> Result<u64, StorageError> {
        Ok(self.wells.len() as u64)
    }

    fn find_wells(
        &self,
        filter: &WellFilter,
        projection: &Projection,
    ) -> Result<Vec<WellRow>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable("read refused".into()));
        }
        Ok(self
            .wells
            .values()
            .filter(|well| filter.matches(well))
            .map(|well| projection.project(well))
            .collect())
    }

    fn update_wells(&mut self, ids: &[WellId], patch: &WellPatch) -> Result<usize, StorageError> {
        if patch.is_empty() {
            return Ok(0);
        }
        let mut updated = 0;
        for id in ids {
            if let Some(well) = self.wells.get_mut(id) {
                patch.apply_to(well);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn attach_ownership(&mut self, well_id: WellId) -> Result<(), StorageError> {
        let well = self
            .wells
            .get(&well_id)
            .ok_or_else(|| StorageError::NotFound(format!("well {well_id}")))?;
        if self.ownership.contains_key(&well_id) {
            return Err(StorageError::ConstraintViolation(format!(
                "ownership for {well_id} already exists"
            )));
        }
        let record = OwnershipRecord {
            well_id,
            data_source: well.data_source,
            chosen_value: well.chosen_value.clone(),
        };
        self.ownership.insert(well_id, record);
        Ok(())
    }

    fn get_ownership(&self, well_id: WellId) -> Result<Option<OwnershipRecord>, StorageError> {
        Ok(self.ownership.get(&well_id).cloned())
    }

    fn update_side_table(
        &mut self,
        ids: &[WellId],
        patch: &SideTablePatch,
    ) -> Result<usize, StorageError> {
        self.check_side_write()?;
        if patch.is_empty() {
            return Ok(0);
        }
        let mut updated = 0;
        for id in ids {
            let Some(record) = self.ownership.get_mut(id) else {
                continue;
            };
            if let Some(source) = patch.data_source {
                record.data_source = source;
            }
            if patch.sync_chosen_identifier {
                record.chosen_value = self.wells.get(id).and_then(|w| w.chosen_value.clone());
            }
            updated += 1;
        }
        Ok(updated)
    }

    fn insert_production_record(&mut self, well_id: WellId) -> Result<i64, StorageError> {
        let well = self
            .wells
            .get(&well_id)
            .ok_or_else(|| StorageError::NotFound(format!("well {well_id}")))?;
        let record_id = self.production.len() as i64 + 1;
        self.production.push(ProductionRecord {
            record_id,
            well_id,
            scope: well.scope,
        });
        Ok(record_id)
    }

    fn get_production_records(
        &self,
        well_id: WellId,
    ) -> Result<Vec<ProductionRecord>, StorageError> {
        Ok(self
            .production
            .iter()
            .filter(|r| r.well_id == well_id)
            .cloned()
            .collect())
    }

    fn update_denormalized_scope(
        &mut self,
        well_ids: &[WellId],
        scope: Scope,
    ) -> Result<usize, StorageError> {
        self.check_side_write()?;
        let mut updated = 0;
        for record in &mut self.production {
            if well_ids.contains(&record.well_id) {
                record.scope = scope;
                updated += 1;
            }
        }
        Ok(updated)
    }
}
