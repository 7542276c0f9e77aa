//! Integration tests for the commit algorithm.

use keystone_core::{
    CollisionComponent, CollisionShape, ComponentKind, EntityAddition, EntityStore, Light,
    LightComponent, PhysicsComponent, RenderComponent, StoreView,
};
use keystone_shared::{Transform, Vec3};

/// Checks that every component column is aligned with its flag bits, and
/// that counting lookups agree with positional iteration.
fn assert_aligned(view: &StoreView<'_>) {
    for kind in ComponentKind::ALL {
        let owners = view.flags().iter().filter(|flags| flags.contains(kind)).count();
        assert_eq!(owners, view.component_count(kind), "{kind:?} column misaligned");
    }
    for (slot, (entity, render)) in view.iter_with::<RenderComponent>().enumerate() {
        assert_eq!(view.component_slot(ComponentKind::Render, entity), slot);
        assert_eq!(view.component::<RenderComponent>(entity), render);
    }
    for (entity, light) in view.iter_with::<LightComponent>() {
        assert_eq!(view.component::<LightComponent>(entity), light);
    }
}

fn names(view: &StoreView<'_>) -> Vec<String> {
    view.infos().iter().map(|info| info.name().to_owned()).collect()
}

fn sphere(radius: f32) -> CollisionComponent {
    CollisionComponent::new(CollisionShape::Sphere { radius })
}

fn ambient() -> LightComponent {
    LightComponent::new(Light::Ambient {
        color: Vec3::new(0.2, 0.2, 0.2),
    })
}

#[test]
fn test_scenario_remove_b_add_d() {
    let mut store = EntityStore::new(1 << 20);
    store.add_entity(
        EntityAddition::new("A")
            .with_component(RenderComponent::new(0))
            .with_component(ambient()),
    );
    store.add_entity(EntityAddition::new("B").with_component(sphere(1.0)));
    store.add_entity(EntityAddition::new("C").with_component(RenderComponent::new(1)));
    store.commit().unwrap();

    store.modify(1).unwrap().remove_entity();
    store.add_entity(EntityAddition::new("D").with_component(PhysicsComponent::new(10.0)));
    let stats = store.commit().unwrap();

    let view = store.view();
    assert_eq!(names(&view), vec!["A", "C", "D"]);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.added, 1);

    let models: Vec<u32> = view
        .components::<RenderComponent>()
        .iter()
        .map(|render| render.model_index)
        .collect();
    assert_eq!(models, vec![0, 1]);
    assert_eq!(view.component_count(ComponentKind::Light), 1);
    assert_eq!(view.component_count(ComponentKind::Collision), 0);
    assert_eq!(view.component_count(ComponentKind::Physics), 1);
    assert_eq!(view.component::<PhysicsComponent>(2).mass, 10.0);
    assert_eq!(view.component::<RenderComponent>(1).model_index, 1);
    assert_aligned(&view);
}

#[test]
fn test_noop_commit_is_idempotent() {
    let mut store = EntityStore::new(1 << 20);
    for index in 0..10u8 {
        let mut addition = EntityAddition::new(&format!("entity {index}")).with_transform(
            Transform::from_translation(Vec3::new(f32::from(index), 0.0, 0.0)),
        );
        if index % 2 == 0 {
            addition = addition.with_component(RenderComponent::new(u32::from(index)));
        }
        if index % 3 == 0 {
            addition = addition.with_component(sphere(f32::from(index)));
        }
        if index % 4 == 0 {
            addition = addition.with_component(ambient());
        }
        store.add_entity(addition);
    }
    store.commit().unwrap();

    let before = store.view();
    let flags = before.flags().to_vec();
    let infos = before.infos().to_vec();
    let transforms = before.transforms().to_vec();
    let renders = before.components::<RenderComponent>().to_vec();
    let collisions = before.components::<CollisionComponent>().to_vec();
    let lights = before.components::<LightComponent>().to_vec();

    let stats = store.commit().unwrap();
    assert_eq!((stats.removed, stats.added), (0, 0));

    let after = store.view();
    assert_eq!(after.flags(), flags.as_slice());
    assert_eq!(after.infos(), infos.as_slice());
    assert_eq!(after.transforms(), transforms.as_slice());
    assert_eq!(after.components::<RenderComponent>(), renders.as_slice());
    assert_eq!(after.components::<CollisionComponent>(), collisions.as_slice());
    assert_eq!(after.components::<LightComponent>(), lights.as_slice());
    assert_aligned(&after);
}

#[test]
fn test_removal_keeps_order_and_alignment() {
    const COUNT: usize = 12;

    for removed in 0..COUNT {
        let mut store = EntityStore::new(1 << 20);
        for index in 0..COUNT {
            let mut addition = EntityAddition::new(&index.to_string());
            if index % 2 == 1 {
                addition = addition.with_component(RenderComponent::new(index as u32));
            }
            store.add_entity(addition);
        }
        store.commit().unwrap();

        store.modify(removed).unwrap().remove_entity();
        store.commit().unwrap();

        let view = store.view();
        assert_eq!(view.entity_count(), COUNT - 1);
        let expected: Vec<String> = (0..COUNT)
            .filter(|&index| index != removed)
            .map(|index| index.to_string())
            .collect();
        assert_eq!(names(&view), expected);
        for (entity, render) in view.iter_with::<RenderComponent>() {
            assert_eq!(view.infos()[entity].name(), render.model_index.to_string());
        }
        assert_aligned(&view);
    }
}

#[test]
fn test_additions_into_empty_store() {
    let mut store = EntityStore::new(1 << 20);
    let mut expected_counts = [0usize; ComponentKind::COUNT];
    for index in 0..7u32 {
        let mut addition = EntityAddition::new(&format!("new {index}"));
        if index % 2 == 0 {
            addition = addition.with_component(RenderComponent::new(index));
            expected_counts[ComponentKind::Render.index()] += 1;
        }
        if index == 3 {
            addition = addition.with_component(PhysicsComponent::new(1.0));
            expected_counts[ComponentKind::Physics.index()] += 1;
        }
        store.add_entity(addition);
    }
    let stats = store.commit().unwrap();

    let view = store.view();
    assert_eq!(view.entity_count(), 7);
    assert_eq!(stats.component_counts, expected_counts);
    let expected: Vec<String> = (0..7).map(|index| format!("new {index}")).collect();
    assert_eq!(names(&view), expected);
    assert!(store.additions().is_empty());
    assert_aligned(&view);
}

#[test]
fn test_mixed_component_edits() {
    let mut store = EntityStore::new(1 << 20);
    store.add_entity(EntityAddition::new("a").with_component(RenderComponent::new(0)));
    store.add_entity(EntityAddition::new("b"));
    store.add_entity(EntityAddition::new("c").with_component(RenderComponent::new(2)));
    store.commit().unwrap();

    store.modify(0).unwrap().remove_component(ComponentKind::Render);
    store.modify(1).unwrap().set_component(RenderComponent::new(1));
    store
        .modify(2)
        .unwrap()
        .set_component(sphere(0.5))
        .set_component(RenderComponent::new(22));
    store.commit().unwrap();

    let view = store.view();
    assert!(view.try_component::<RenderComponent>(0).is_none());
    assert_eq!(view.component::<RenderComponent>(1).model_index, 1);
    assert_eq!(view.component::<RenderComponent>(2).model_index, 22);
    assert_eq!(view.component::<CollisionComponent>(2), &sphere(0.5));
    assert_aligned(&view);
}

#[test]
fn test_cancelled_addition_is_not_committed() {
    let mut store = EntityStore::new(1 << 20);
    store.add_entity(EntityAddition::new("kept"));
    let dropped = store.add_entity(EntityAddition::new("dropped"));
    assert!(store.cancel_addition(dropped));
    store.commit().unwrap();

    assert_eq!(names(&store.view()), vec!["kept"]);
}

#[test]
fn test_addition_id_expires_at_commit() {
    let mut store = EntityStore::new(1 << 20);
    let first = store.add_entity(EntityAddition::new("first"));
    store.commit().unwrap();

    store.add_entity(EntityAddition::new("second"));
    assert!(!store.cancel_addition(first));
    store.commit().unwrap();

    assert_eq!(names(&store.view()), vec!["first", "second"]);
}

#[test]
fn test_many_generations() {
    let mut store = EntityStore::new(1 << 20);
    for frame in 0..50u32 {
        store.add_entity(EntityAddition::new(&frame.to_string()).with_component(RenderComponent::new(frame)));
        if store.entity_count() > 5 {
            store.modify(0).unwrap().remove_entity();
        }
        store.commit().unwrap();
        assert_aligned(&store.view());
    }
    assert_eq!(store.generation(), 50);
    assert_eq!(store.entity_count(), 6);
    assert_eq!(store.view().infos()[0].name(), "44");
}
