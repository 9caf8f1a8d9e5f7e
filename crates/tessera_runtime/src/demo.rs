//! Frame-loop workload driven against an entity store.
//!
//! Every entity moves by its velocity once per frame, page by page. Each
//! frame the oldest entities are destroyed and replaced, and a few switch
//! faction, which moves them between archetypes. After the last frame the
//! store is saved and reloaded into a second store with dense ids.

use crate::settings::RuntimeSettings;
use anyhow::{ensure, Context, Result};
use glam::Vec3;
use std::collections::HashMap;
use tessera_core::ecs::{
    EntityBuilder, EntityStore, IdIndex, ImmutableComponent, MutableComponent, StoreError,
    UnisonComponent,
};
use tessera_metrics::{time_pass, PassCount, PassTimer};
use tracing::{debug, info};

const DT: f32 = 1.0 / 60.0;
const BY_ID: &str = "by_id";

/// Register the demo's components and id index on an empty store.
pub fn register(store: &mut EntityStore, settings: &RuntimeSettings) -> Result<(), StoreError> {
    store.add_component(
        "position",
        MutableComponent::with_allocator(Vec3::ZERO, settings.allocator),
    )?;
    store.add_component(
        "velocity",
        MutableComponent::with_allocator(Vec3::ZERO, settings.allocator),
    )?;
    store.add_component("id", ImmutableComponent::<u64>::entity_id())?;
    store.add_component(
        "target",
        MutableComponent::with_allocator(0u64, settings.allocator).with_entity_refs(|target, map| {
            if let Some(mapped) = map(*target) {
                *target = mapped;
            }
        }),
    )?;
    store.add_component("faction", UnisonComponent::hashed(String::new()))?;
    store.add_index(BY_ID, IdIndex::new("id"))?;
    Ok(())
}

pub struct Demo {
    settings: RuntimeSettings,
    store: EntityStore,
    timer: PassTimer,
    next_id: u64,
    oldest_id: u64,
}

impl Demo {
    pub fn new(settings: RuntimeSettings) -> Result<Self> {
        ensure!(!settings.factions.is_empty(), "at least one faction is required");
        let mut store = EntityStore::with_config(settings.store.clone())?;
        register(&mut store, &settings)?;
        Ok(Self {
            timer: PassTimer::new(),
            settings,
            store,
            next_id: 0,
            oldest_id: 0,
        })
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    fn faction_for(&self, id: u64) -> String {
        let factions = &self.settings.factions;
        factions[id as usize % factions.len()].clone()
    }

    fn spawn_one(&mut self) -> Result<(), StoreError> {
        let id = self.next_id;
        self.next_id += 1;
        let velocity = Vec3::new((id % 7) as f32 - 3.0, (id % 5) as f32 - 2.0, 1.0);
        let builder = EntityBuilder::new()
            .with("id", id)
            .with("position", Vec3::ZERO)
            .with("velocity", velocity)
            .with("target", id.saturating_sub(1))
            .with("faction", self.faction_for(id));
        self.store.create(builder)?;
        Ok(())
    }

    pub fn populate(&mut self) -> Result<(), StoreError> {
        for _ in 0..self.settings.entities {
            self.spawn_one()?;
        }
        info!(
            entities = self.store.entity_count(),
            archetypes = self.store.archetypes().len(),
            "populated store"
        );
        Ok(())
    }

    /// Integrate positions one page at a time.
    fn step(&mut self) -> Result<PassCount, StoreError> {
        let mut count = PassCount::default();
        self.store
            .query()
            .with_components(&["position", "velocity"])?
            .try_for_each_page(|page| {
                count.add_page(page.len());
                let (position, velocity) = page.columns_mut::<Vec3, Vec3>("position", "velocity")?;
                for (p, v) in position.iter_mut().zip(velocity) {
                    *p += *v * DT;
                }
                page.mark_changed("position")
            })?;
        Ok(count)
    }

    /// Replace the oldest entities and move a few between factions.
    fn churn(&mut self, frame: usize) -> Result<(), StoreError> {
        let count = self.settings.churn.min(self.store.entity_count());
        for _ in 0..count {
            let id = self.oldest_id;
            self.oldest_id += 1;
            let key = self.store.index::<IdIndex>(BY_ID)?.get(id);
            if let Some(key) = key {
                self.store.destroy_entity(key)?;
            }
        }
        for _ in 0..count {
            self.spawn_one()?;
        }

        let switched = self.oldest_id + frame as u64;
        if let Some(key) = self.store.index::<IdIndex>(BY_ID)?.get(switched) {
            let faction = self.faction_for(switched + 1);
            self.store.entity(key)?.set("faction", faction)?;
        }
        debug!(frame, replaced = count, "churned entities");
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        self.populate()?;
        for frame in 0..self.settings.frames {
            time_pass!(self.timer, { self.step() })?;
            self.churn(frame)?;
        }

        let (min, max) = self.timer.range_ms();
        let visited = self.timer.visited();
        info!(
            passes = self.timer.passes(),
            avg_ms = self.timer.mean_ms(),
            min_ms = min,
            max_ms = max,
            pages = visited.pages,
            entities = visited.entities,
            entities_per_page = self.timer.entities_per_page(),
            entities_per_second = self.timer.entities_per_second(),
            "movement pass timing"
        );
        for (event, count) in self.store.counters().iter() {
            info!(event = event.name(), count, "structural counter");
        }
        Ok(())
    }

    /// Save the store with ids renumbered densely from zero and load the
    /// result into a fresh store.
    pub fn reload(&self) -> Result<EntityStore> {
        let mut ids: Vec<u64> = self
            .store
            .index::<IdIndex>(BY_ID)?
            .iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort_unstable();
        let dense: HashMap<u64, u64> = ids.iter().enumerate().map(|(n, &id)| (id, n as u64)).collect();

        let save = |id: u64| dense.get(&id).copied();
        let snapshot = self.store.to_json(Some(&save)).context("saving snapshot")?;

        let mut copy = EntityStore::with_config(self.settings.store.clone())?;
        register(&mut copy, &self.settings)?;
        copy.from_json(&snapshot, None).context("loading snapshot")?;
        ensure!(
            copy.entity_count() == self.store.entity_count(),
            "reloaded {} entities, expected {}",
            copy.entity_count(),
            self.store.entity_count()
        );
        info!(
            entities = copy.entity_count(),
            archetypes = copy.archetypes().len(),
            "reloaded snapshot"
        );
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::StoreConfig;

    fn small() -> RuntimeSettings {
        RuntimeSettings {
            store: StoreConfig::with_page_capacities(vec![4, 16]),
            entities: 40,
            frames: 3,
            churn: 5,
            ..RuntimeSettings::default()
        }
    }

    #[test]
    fn run_keeps_the_population_stable() {
        let mut demo = Demo::new(small()).unwrap();
        demo.run().unwrap();

        let store = demo.store();
        assert_eq!(store.entity_count(), 40);
        assert_eq!(store.index::<IdIndex>(BY_ID).unwrap().len(), 40);
        assert!(store.floating_groups().is_empty());
        // One archetype per faction.
        assert_eq!(store.archetypes().len(), 3);
    }

    #[test]
    fn settings_without_factions_are_rejected() {
        let settings = RuntimeSettings {
            factions: Vec::new(),
            ..small()
        };
        let err = Demo::new(settings).err().unwrap();
        assert!(err.to_string().contains("faction"));
    }

    #[test]
    fn positions_advance_each_frame() {
        let mut demo = Demo::new(RuntimeSettings {
            churn: 0,
            ..small()
        })
        .unwrap();
        demo.run().unwrap();

        let key = demo.store.index::<IdIndex>(BY_ID).unwrap().get(6).unwrap();
        let entity = demo.store.entity(key).unwrap();
        let position = *entity.get::<Vec3>("position").unwrap();
        // id 6 moves at (3, -1, 1) for three frames.
        let expected = Vec3::new(3.0, -1.0, 1.0) * DT * 3.0;
        assert!((position - expected).length() < 1e-5);
    }

    #[test]
    fn reload_renumbers_ids_and_targets() {
        let mut demo = Demo::new(small()).unwrap();
        demo.run().unwrap();
        let mut copy = demo.reload().unwrap();

        let index = copy.index::<IdIndex>(BY_ID).unwrap();
        assert_eq!(index.len(), 40);
        let keys: Vec<_> = (0..40u64).map(|id| index.get(id).unwrap()).collect();
        // Entity 1 pointed at entity 0 before renumbering, and still does.
        let entity = copy.entity(keys[1]).unwrap();
        assert_eq!(entity.get::<u64>("target").unwrap(), &0);
    }
}
