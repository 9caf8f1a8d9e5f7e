//! End-to-end scenarios through the public API only.

use proptest::prelude::*;
use tessera_core::config::StoreConfig;
use tessera_core::ecs::{
    ChangeKind, ComponentEvent, EntityBuilder, EntityKey, EntityStore, IdIndex,
    ImmutableComponent, MutableComponent, StoreError, UnisonComponent,
};
use tessera_core::pool::AllocatorKind;
use tessera_core::spawn;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
struct Position {
    x: f32,
    y: f32,
}

fn world(capacities: &[usize]) -> EntityStore {
    let config = StoreConfig::with_page_capacities(capacities.to_vec());
    let mut store = EntityStore::with_config(config).unwrap();
    store
        .add_component("position", MutableComponent::new(Position { x: 0.0, y: 0.0 }))
        .unwrap();
    store
        .add_component(
            "health",
            MutableComponent::with_allocator(100u32, AllocatorKind::Fixed { group: 32 }),
        )
        .unwrap();
    store
        .add_component("id", ImmutableComponent::<u64>::entity_id())
        .unwrap();
    store
        .add_component("faction", UnisonComponent::hashed(String::from("neutral")))
        .unwrap();
    store
}

fn total_in_pages(store: &EntityStore) -> usize {
    store
        .archetypes()
        .iter()
        .map(|archetype| store.archetype_len(archetype.id()))
        .sum()
}

#[test]
fn position_and_health_scenario() {
    let mut store = world(&[4]);
    let key = store
        .create(
            EntityBuilder::new()
                .with("position", Position { x: 1.0, y: 2.0 })
                .with("health", 50u32),
        )
        .unwrap();

    let mut entity = store.entity(key).unwrap();
    assert_eq!(entity.get::<Position>("position").unwrap(), &Position { x: 1.0, y: 2.0 });
    entity.set("health", 45u32).unwrap();
    assert_eq!(entity.get::<u32>("health").unwrap(), &45);
    assert!(!entity.has("id").unwrap());
    assert_eq!(entity.key(), key);
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct Health {
    value: u32,
}

#[test]
fn remove_detaches_a_component() {
    let mut store = EntityStore::new();
    store.add_component("position", MutableComponent::new([0.0f32; 3])).unwrap();
    store.add_component("health", MutableComponent::new(Health::default())).unwrap();

    let a = spawn!(store, "position" => [1.0f32, 2.0, 3.0], "health" => Health { value: 4 }).unwrap();
    let mut entity = store.entity(a).unwrap();
    assert_eq!(entity.get::<[f32; 3]>("position").unwrap(), &[1.0, 2.0, 3.0]);

    assert!(entity.remove("position").unwrap());
    assert!(!entity.has("position").unwrap());
    assert_eq!(entity.get::<Health>("health").unwrap(), &Health { value: 4 });
}

#[test]
fn forty_entities_fill_several_pages() {
    let mut store = world(&[1, 4, 16, 32]);
    for id in 0..40u64 {
        spawn!(store, "id" => id, "health" => 1u32).unwrap();
    }

    let archetype = &store.archetypes()[0];
    assert!(archetype.pages().len() >= 2);
    assert_eq!(store.archetype_len(archetype.id()), 40);
    let capacities: Vec<_> = archetype
        .pages()
        .iter()
        .map(|&group| store.group(group).unwrap().max_size())
        .collect();
    assert_eq!(capacities, vec![1, 4, 16, 32]);
}

#[test]
fn same_signature_shares_an_archetype() {
    let mut store = world(&[8]);
    let a = spawn!(store, "position" => Position { x: 0.0, y: 0.0 }, "health" => 1u32).unwrap();
    let b = spawn!(store, "health" => 2u32, "position" => Position { x: 1.0, y: 1.0 }).unwrap();
    let c = spawn!(store, "health" => 3u32).unwrap();

    let parent = |key: EntityKey| store.group(key.group()).unwrap().parent();
    assert_eq!(parent(a), parent(b));
    assert_ne!(parent(a), parent(c));
    assert_eq!(store.archetypes().len(), 2);
}

#[test]
fn unison_values_split_archetypes_and_hashes() {
    let mut store = world(&[8]);
    let red = spawn!(store, "faction" => String::from("red")).unwrap();
    let blue = spawn!(store, "faction" => String::from("blue")).unwrap();
    let parent = |key: EntityKey| store.group(key.group()).unwrap().parent().unwrap();

    let (red, blue) = (parent(red), parent(blue));
    assert_ne!(red, blue);
    let hashes: Vec<_> = [red, blue]
        .iter()
        .map(|&id| store.archetype(id).unwrap().hash())
        .collect();
    assert_ne!(hashes[0], hashes[1]);
}

#[test]
fn removal_keeps_the_survivors_intact() {
    let mut store = world(&[4]);
    let keys: Vec<_> = (0..4u64)
        .map(|id| spawn!(store, "id" => id, "position" => Position { x: id as f32, y: 0.0 }).unwrap())
        .collect();
    store.add_index("by_id", IdIndex::new("id")).unwrap();

    store.destroy_entity(keys[0]).unwrap();
    assert!(!store.contains(keys[0]));

    for id in 1..4u64 {
        let key = store.index::<IdIndex>("by_id").unwrap().get(id).unwrap();
        let entity = store.entity(key).unwrap();
        assert_eq!(entity.get::<Position>("position").unwrap().x, id as f32);
    }
    assert!(store.index::<IdIndex>("by_id").unwrap().get(0).is_none());
}

#[test]
fn adding_a_component_moves_between_archetypes() {
    let mut store = world(&[4]);
    let key = spawn!(store, "id" => 9u64, "health" => 12u32).unwrap();
    let before = store.group(key.group()).unwrap().parent();

    let mut entity = store.entity(key).unwrap();
    entity.set("position", Position { x: 5.0, y: 6.0 }).unwrap();
    let moved = entity.key();
    assert!(!entity.is_floating());
    assert_eq!(entity.get::<u64>("id").unwrap(), &9);
    assert_eq!(entity.get::<u32>("health").unwrap(), &12);

    assert_ne!(store.group(moved.group()).unwrap().parent(), before);
    assert!(!store.contains(key));
    assert_eq!(store.entity_count(), 1);
}

#[test]
fn explicit_float_then_unfloat_restores_batching() {
    let mut store = world(&[4]);
    let key = spawn!(store, "health" => 3u32, "faction" => String::from("red")).unwrap();
    let mut entity = store.entity(key).unwrap();

    entity.float().unwrap();
    assert!(entity.is_floating());
    entity.remove("faction").unwrap();
    entity.set("id", 77u64).unwrap();
    assert!(entity.is_floating());

    entity.unfloat().unwrap();
    assert!(!entity.is_floating());
    assert_eq!(entity.get::<u64>("id").unwrap(), &77);
    assert!(!entity.has("faction").unwrap());
    assert!(store.floating_groups().is_empty());
}

#[test]
fn listeners_see_moves() {
    let mut store = world(&[4]);
    let moves = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = std::rc::Rc::clone(&moves);
    store
        .subscribe("health", move |event: &ComponentEvent| {
            if event.kind == ChangeKind::Moved {
                sink.borrow_mut().push((event.start, event.size));
            }
        })
        .unwrap();

    let first = spawn!(store, "health" => 1u32).unwrap();
    spawn!(store, "health" => 2u32).unwrap();
    spawn!(store, "health" => 3u32).unwrap();
    store.destroy_entity(first).unwrap();

    assert_eq!(*moves.borrow(), vec![(0, 1)]);
}

#[test]
fn stale_keys_fail_loudly() {
    let mut store = world(&[4]);
    let key = spawn!(store, "health" => 1u32).unwrap();
    let mut entity = store.entity(key).unwrap();
    entity.set("id", 1u64).unwrap();

    let err = store.entity(key).unwrap_err();
    assert!(matches!(err, StoreError::StaleEntity { .. }));
    assert!(err.to_string().contains("stale"));
}

#[test]
fn snapshot_round_trip_between_stores() {
    let mut source = world(&[2, 8]);
    for id in 0..5u64 {
        spawn!(
            source,
            "id" => id,
            "health" => id as u32,
            "faction" => if id % 2 == 0 { String::from("even") } else { String::from("odd") }
        )
        .unwrap();
    }
    let snapshot = source.to_json(None).unwrap();

    let mut target = world(&[8]);
    target.add_index("by_id", IdIndex::new("id")).unwrap();
    target.from_json(&snapshot, None).unwrap();
    assert_eq!(target.entity_count(), 5);
    assert_eq!(target.archetypes().len(), 2);

    for id in 0..5u64 {
        let key = target.index::<IdIndex>("by_id").unwrap().get(id).unwrap();
        let entity = target.entity(key).unwrap();
        assert_eq!(entity.get::<u32>("health").unwrap(), &(id as u32));
        let faction = if id % 2 == 0 { "even" } else { "odd" };
        assert_eq!(entity.get::<String>("faction").unwrap(), faction);
    }
}

#[test]
fn page_iteration_updates_columns() {
    let mut store = world(&[2, 4]);
    for id in 0..6u64 {
        spawn!(store, "id" => id, "health" => 10u32).unwrap();
    }

    let mut query = store.query().with_components(&["health", "id"]).unwrap();
    query.for_each_page(|page| {
        let (health, ids) = page.columns_mut::<u32, u64>("health", "id").unwrap();
        for (hp, id) in health.iter_mut().zip(ids) {
            *hp += *id as u32;
        }
    });

    let mut total = 0;
    store.query().with_components(&["health"]).unwrap().for_each(|entity| {
        total += *entity.get::<u32>("health").unwrap();
    });
    assert_eq!(total, 60 + 15);
}

#[derive(Debug, Clone)]
enum Op {
    Create(u32),
    Destroy(usize),
    Toggle(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..1000).prop_map(Op::Create),
        any::<usize>().prop_map(Op::Destroy),
        any::<usize>().prop_map(Op::Toggle),
    ]
}

proptest! {
    #[test]
    fn page_sizes_always_sum_to_live_entities(ops in prop::collection::vec(op(), 1..120)) {
        let mut store = world(&[1, 3, 8]);
        let mut next_id = 0u64;
        for op in ops {
            let keys = store.entity_keys();
            match op {
                Op::Create(hp) => {
                    spawn!(store, "id" => next_id, "health" => hp).unwrap();
                    next_id += 1;
                }
                Op::Destroy(pick) if !keys.is_empty() => {
                    store.destroy_entity(keys[pick % keys.len()]).unwrap();
                }
                Op::Toggle(pick) if !keys.is_empty() => {
                    let mut entity = store.entity(keys[pick % keys.len()]).unwrap();
                    if entity.has("position").unwrap() {
                        entity.remove("position").unwrap();
                    } else {
                        entity.set("position", Position { x: 1.0, y: 1.0 }).unwrap();
                    }
                }
                _ => {}
            }

            prop_assert_eq!(total_in_pages(&store), store.entity_count());
            prop_assert_eq!(store.entity_keys().len(), store.entity_count());
            prop_assert!(store.floating_groups().is_empty());
            for archetype in store.archetypes() {
                for &group in archetype.pages() {
                    let page = store.group(group).unwrap();
                    prop_assert!(page.len() >= 1 && page.len() <= page.max_size());
                }
            }
        }
    }
}
