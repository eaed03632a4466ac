//! Exercise reconciliation
//!
//! Workouts reference exercises by their bundled catalog id, while storage
//! references durable catalog rows. Reconciliation maps one onto the other by
//! case-insensitive name, creating durable rows the first time a bundled
//! exercise is used.

use anyhow::Result;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    catalog::{self, CatalogEntry},
    models::{Exercise, PerformedExercise},
    repositories::FitnessStore,
};

/// A performed exercise bound to its durable row and bundled metadata
#[derive(Debug, Clone)]
pub struct ResolvedExercise {
    pub exercise_id: Uuid,
    pub entry: &'static CatalogEntry,
    pub performed: PerformedExercise,
}

/// Outcome of reconciling a workout's exercises, in input order
#[derive(Debug, Default)]
pub struct Reconciliation {
    pub resolved: Vec<ResolvedExercise>,
    pub dropped: usize,
}

/// Resolves bundled catalog ids against the durable catalog
pub struct Reconciler<'a> {
    store: &'a dyn FitnessStore,
    /// Lowercased name to durable id
    known: HashMap<String, Uuid>,
}

impl<'a> Reconciler<'a> {
    /// Read the durable catalog once up front
    pub async fn load(store: &'a dyn FitnessStore) -> Result<Self> {
        let known = store
            .list_exercises()
            .await?
            .into_iter()
            .map(|exercise| (exercise.name.to_lowercase(), exercise.id))
            .collect();

        Ok(Self { store, known })
    }

    /// Durable id for a bundled entry, creating the row if it is missing
    pub async fn ensure(&mut self, entry: &'static CatalogEntry) -> Result<Uuid> {
        let key = entry.name.to_lowercase();
        if let Some(id) = self.known.get(&key) {
            return Ok(*id);
        }

        let created = self.store.create_exercise(&entry.to_new_exercise()).await?;
        info!("Created catalog row for '{}' ({})", entry.name, created.id);
        self.known.insert(key, created.id);
        Ok(created.id)
    }

    /// Resolve every performed exercise, dropping the ones that cannot be matched
    pub async fn resolve(&mut self, performed: &[PerformedExercise]) -> Reconciliation {
        let mut outcome = Reconciliation::default();

        for exercise in performed {
            let Some(entry) = catalog::lookup(&exercise.exercise_id) else {
                warn!(
                    "Dropping unknown exercise '{}' from workout",
                    exercise.exercise_id
                );
                outcome.dropped += 1;
                continue;
            };

            match self.ensure(entry).await {
                Ok(exercise_id) => outcome.resolved.push(ResolvedExercise {
                    exercise_id,
                    entry,
                    performed: exercise.clone(),
                }),
                Err(e) => {
                    error!("Failed to create catalog row for '{}': {}", entry.name, e);
                    outcome.dropped += 1;
                }
            }
        }

        outcome
    }
}

/// Make sure every bundled exercise exists durably and return the durable catalog
pub async fn sync_catalog(store: &dyn FitnessStore) -> Result<Vec<Exercise>> {
    let mut reconciler = Reconciler::load(store).await?;
    for entry in catalog::entries() {
        reconciler.ensure(entry).await?;
    }

    store.list_exercises().await
}
