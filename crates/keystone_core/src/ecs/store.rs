//! # Entity Store
//!
//! Columnar storage for entities and their optional components, rebuilt
//! wholesale by every commit.
//!
//! ## Layout
//!
//! ```text
//!   entity    flags     info    transform   modification
//!     0       R . . L   "A"     ...         (pending edits)
//!     1       . C . .   "B"     ...
//!     2       R . . .   "C"     ...
//!
//!   render    [A, C]        collision [B]
//!   physics   []            light     [A]
//! ```
//!
//! Components carry no back-reference to their entity. The i-th entity with
//! a kind's flag bit set owns slot i of that kind's column, so finding a
//! component means counting flag bits: O(entity count) per lookup.
//!
//! ## Generations
//!
//! All columns of a generation live in one half of a [`DoubleBufferedArena`].
//! Commit N reads the published half and writes the other one, then flips.
//! The previous generation stays readable through [`EntityStore::previous`]
//! until the following commit recycles its half.

use bytemuck::Pod;
use keystone_shared::Transform;

use super::component::{
    CollisionComponent, Component, ComponentKind, LightComponent, PhysicsComponent,
    RenderComponent,
};
use super::entity::{ComponentFlags, EntityInfo};
use super::mutation::{AdditionId, AdditionQueue, EntityAddition, EntityModification};
use crate::error::{MemoryResult, StoreError, StoreResult};
use crate::memory::{Arena, ArenaSlice, DoubleBufferedArena};

/// Untyped location of a component column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct RawColumn {
    offset: usize,
    len: usize,
}

impl RawColumn {
    fn of<C>(slice: ArenaSlice<C>) -> Self {
        Self {
            offset: slice.offset(),
            len: slice.len(),
        }
    }

    fn typed<C>(self) -> ArenaSlice<C> {
        ArenaSlice::from_parts(self.offset, self.len)
    }
}

/// Every column of one generation.
#[derive(Clone, Copy, Debug, Default)]
struct Columns {
    entity_count: usize,
    flags: ArenaSlice<ComponentFlags>,
    infos: ArenaSlice<EntityInfo>,
    transforms: ArenaSlice<Transform>,
    modifications: ArenaSlice<EntityModification>,
    components: [RawColumn; ComponentKind::COUNT],
}

impl Columns {
    fn component<C: Component>(&self) -> ArenaSlice<C> {
        self.components[C::KIND.index()].typed()
    }
}

/// Summary of one commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Generation published by the commit.
    pub generation: u64,
    /// Entities after the commit.
    pub entity_count: usize,
    /// Entities dropped by removal edits.
    pub removed: usize,
    /// Entities appended from the addition queue.
    pub added: usize,
    /// Column length per component kind, in [`ComponentKind::ALL`] order.
    pub component_counts: [usize; ComponentKind::COUNT],
    /// Bytes used in the published arena half.
    pub bytes_used: usize,
}

/// The entity-component store.
///
/// # Example
///
/// ```rust
/// use keystone_core::{EntityAddition, EntityStore, RenderComponent};
///
/// let mut store = EntityStore::new(64 * 1024);
/// store.add_entity(EntityAddition::new("crate").with_component(RenderComponent::new(0)));
/// store.commit().unwrap();
///
/// let view = store.view();
/// assert_eq!(view.entity_count(), 1);
/// assert_eq!(view.component::<RenderComponent>(0).model_index, 0);
/// ```
#[derive(Debug)]
pub struct EntityStore {
    arenas: DoubleBufferedArena,
    live: Columns,
    previous: Option<Columns>,
    additions: AdditionQueue,
}

impl EntityStore {
    /// Creates an empty store with two arena halves of `capacity` bytes.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            arenas: DoubleBufferedArena::new(["entity components 0", "entity components 1"], capacity),
            live: Columns::default(),
            previous: None,
            additions: AdditionQueue::new(),
        }
    }

    /// Read access to the published generation.
    #[must_use]
    pub fn view(&self) -> StoreView<'_> {
        StoreView {
            arena: self.arenas.front(),
            columns: self.live,
        }
    }

    /// Read access to the generation before the last commit, if it is still
    /// intact.
    #[must_use]
    pub fn previous(&self) -> Option<StoreView<'_>> {
        self.previous.map(|columns| StoreView {
            arena: self.arenas.back(),
            columns,
        })
    }

    /// Number of published entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.live.entity_count
    }

    /// Number of published generations.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.arenas.generation()
    }

    /// Pending edits of entity `index`, applied by the next commit.
    ///
    /// # Errors
    ///
    /// [`StoreError::EntityOutOfRange`] if `index` is not a published entity.
    pub fn modify(&mut self, index: usize) -> StoreResult<&mut EntityModification> {
        self.check_entity(index)?;
        let column = self.live.modifications;
        Ok(&mut self.arenas.front_mut().get_mut(column)[index])
    }

    /// Queues a new entity for the next commit.
    pub fn add_entity(&mut self, addition: EntityAddition) -> AdditionId {
        self.additions.push(addition)
    }

    /// Unqueues an addition. Returns `false` if it was not queued.
    pub fn cancel_addition(&mut self, id: AdditionId) -> bool {
        self.additions.cancel(id)
    }

    /// Entities queued for the next commit.
    #[must_use]
    pub const fn additions(&self) -> &AdditionQueue {
        &self.additions
    }

    /// In-place access to a published transform.
    ///
    /// Used for per-frame updates (physics results) that do not change
    /// component membership.
    ///
    /// # Errors
    ///
    /// [`StoreError::EntityOutOfRange`] if `index` is not a published entity.
    pub fn transform_mut(&mut self, index: usize) -> StoreResult<&mut Transform> {
        self.check_entity(index)?;
        let column = self.live.transforms;
        Ok(&mut self.arenas.front_mut().get_mut(column)[index])
    }

    /// In-place access to a published component.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not own a component of kind `C`.
    pub fn component_mut<C: Component>(&mut self, entity: usize) -> &mut C {
        let slot = self.view().owned_slot(C::KIND, entity);
        let column = self.live.component::<C>();
        &mut self.arenas.front_mut().get_mut(column)[slot]
    }

    /// In-place access to a published component, if the entity owns one.
    pub fn try_component_mut<C: Component>(&mut self, entity: usize) -> Option<&mut C> {
        let view = self.view();
        if entity >= view.entity_count() || !view.flags()[entity].contains(C::KIND) {
            return None;
        }
        Some(self.component_mut(entity))
    }

    /// Applies every pending modification and addition.
    ///
    /// The new generation is built in the unpublished arena half and
    /// published as the last step, so readers never see a partial state.
    ///
    /// # Errors
    ///
    /// [`StoreError::Memory`] if the columns do not fit in an arena half. The
    /// published generation and all pending edits are left untouched, but the
    /// previous generation is lost.
    pub fn commit(&mut self) -> StoreResult<CommitStats> {
        let old = self.live;

        // Size pass.
        let (entity_count, component_counts, removed) = {
            let front = self.arenas.front();
            let mut entity_count = old.entity_count;
            let mut component_counts = old.components.map(|column| column.len);
            let mut removed = 0;

            for (&flags, modification) in front
                .get(old.flags)
                .iter()
                .zip(front.get(old.modifications))
            {
                if modification.is_removal() {
                    entity_count -= 1;
                    removed += 1;
                }
                for kind in ComponentKind::ALL {
                    let had = flags.contains(kind);
                    match (had, modification.keeps(kind, had)) {
                        (true, false) => component_counts[kind.index()] -= 1,
                        (false, true) => component_counts[kind.index()] += 1,
                        _ => {}
                    }
                }
            }
            for addition in self.additions.iter() {
                entity_count += 1;
                for kind in ComponentKind::ALL {
                    if addition.payloads.contains(kind) {
                        component_counts[kind.index()] += 1;
                    }
                }
            }
            (entity_count, component_counts, removed)
        };

        // The back half holds the previous generation; it is about to go.
        self.previous = None;
        let (front, back) = self.arenas.begin_swap();

        let new = Columns {
            entity_count,
            flags: allocate_column(back, entity_count)?,
            infos: allocate_column(back, entity_count)?,
            transforms: allocate_column(back, entity_count)?,
            // Zeroed records: no pending edits.
            modifications: allocate_column(back, entity_count)?,
            components: [
                RawColumn::of(allocate_column::<RenderComponent>(back, component_counts[0])?),
                RawColumn::of(allocate_column::<CollisionComponent>(back, component_counts[1])?),
                RawColumn::of(allocate_column::<PhysicsComponent>(back, component_counts[2])?),
                RawColumn::of(allocate_column::<LightComponent>(back, component_counts[3])?),
            ],
        };

        let old_modifications = front.get(old.modifications);
        let survivors = || {
            old_modifications
                .iter()
                .enumerate()
                .filter(|(_, modification)| !modification.is_removal())
        };
        let additions = &self.additions;

        let old_flags = front.get(old.flags);
        merge_column(
            back.get_mut(new.flags),
            survivors().map(|(i, modification)| modification.apply_to_flags(old_flags[i])),
            additions.iter().map(EntityAddition::committed_flags),
        );

        let old_infos = front.get(old.infos);
        merge_column(
            back.get_mut(new.infos),
            survivors().map(|(i, modification)| *modification.info().unwrap_or(&old_infos[i])),
            additions.iter().map(|addition| addition.info),
        );

        let old_transforms = front.get(old.transforms);
        merge_column(
            back.get_mut(new.transforms),
            survivors().map(|(i, modification)| {
                *modification.transform().unwrap_or(&old_transforms[i])
            }),
            additions.iter().map(|addition| addition.transform),
        );

        merge_components::<RenderComponent>(front, back, &old, &new, additions);
        merge_components::<CollisionComponent>(front, back, &old, &new, additions);
        merge_components::<PhysicsComponent>(front, back, &old, &new, additions);
        merge_components::<LightComponent>(front, back, &old, &new, additions);

        let bytes_used = back.used();

        // Publish.
        self.arenas.publish();
        self.previous = Some(old);
        self.live = new;
        let added = self.additions.len();
        self.additions.clear();

        let stats = CommitStats {
            generation: self.arenas.generation(),
            entity_count,
            removed,
            added,
            component_counts,
            bytes_used,
        };
        tracing::debug!(
            "Commit {}: {} entities (-{} +{}), components {:?}, {} bytes",
            stats.generation,
            stats.entity_count,
            stats.removed,
            stats.added,
            stats.component_counts,
            stats.bytes_used
        );
        Ok(stats)
    }

    fn check_entity(&self, index: usize) -> StoreResult<()> {
        if index < self.live.entity_count {
            Ok(())
        } else {
            Err(StoreError::EntityOutOfRange {
                index,
                count: self.live.entity_count,
            })
        }
    }
}

fn allocate_column<T: Pod>(arena: &mut Arena, count: usize) -> MemoryResult<ArenaSlice<T>> {
    if count == 0 {
        return Ok(ArenaSlice::empty());
    }
    arena.allocate(count)
}

/// Fills `out` with the surviving values followed by the added ones.
fn merge_column<T: Pod>(
    out: &mut [T],
    survivors: impl Iterator<Item = T>,
    added: impl Iterator<Item = T>,
) {
    let mut written = 0;
    for (slot, value) in out.iter_mut().zip(survivors.chain(added)) {
        *slot = value;
        written += 1;
    }
    debug_assert_eq!(written, out.len(), "size pass and merge pass disagree");
}

/// Rebuilds the column of kind `C`.
///
/// Walks the old entities in order with a running slot into the old column,
/// so each old component is found without a per-entity recount.
fn merge_components<C: Component>(
    front: &Arena,
    back: &mut Arena,
    old: &Columns,
    new: &Columns,
    additions: &AdditionQueue,
) {
    let old_column = front.get(old.component::<C>());
    let old_flags = front.get(old.flags);
    let old_modifications = front.get(old.modifications);
    let out = back.get_mut(new.component::<C>());

    let mut old_slot = 0;
    let mut written = 0;
    for (flags, modification) in old_flags.iter().zip(old_modifications) {
        let current = if flags.contains(C::KIND) {
            old_slot += 1;
            Some(&old_column[old_slot - 1])
        } else {
            None
        };
        if modification.is_removal() || modification.removes(C::KIND) {
            continue;
        }
        if let Some(&value) = modification.component::<C>().or(current) {
            out[written] = value;
            written += 1;
        }
    }
    for addition in additions.iter() {
        if let Some(&value) = addition.payloads.get::<C>() {
            out[written] = value;
            written += 1;
        }
    }
    debug_assert_eq!(written, out.len(), "{} column size mismatch", C::KIND.name());
}

/// Read access to one generation of the store.
#[derive(Clone, Copy, Debug)]
pub struct StoreView<'a> {
    arena: &'a Arena,
    columns: Columns,
}

impl<'a> StoreView<'a> {
    /// Number of entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.columns.entity_count
    }

    /// Column length for `kind`.
    #[inline]
    #[must_use]
    pub const fn component_count(&self, kind: ComponentKind) -> usize {
        self.columns.components[kind.index()].len
    }

    /// The flags column.
    #[must_use]
    pub fn flags(&self) -> &'a [ComponentFlags] {
        self.arena.get(self.columns.flags)
    }

    /// The name column.
    #[must_use]
    pub fn infos(&self) -> &'a [EntityInfo] {
        self.arena.get(self.columns.infos)
    }

    /// The transform column.
    #[must_use]
    pub fn transforms(&self) -> &'a [Transform] {
        self.arena.get(self.columns.transforms)
    }

    /// Pending edits, one record per entity.
    #[must_use]
    pub fn modifications(&self) -> &'a [EntityModification] {
        self.arena.get(self.columns.modifications)
    }

    /// The column of kind `C`, in owning-entity order.
    #[must_use]
    pub fn components<C: Component>(&self) -> &'a [C] {
        self.arena.get(self.columns.component::<C>())
    }

    /// The component of kind `C` owned by `entity`.
    ///
    /// O(entity) flag scan.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is out of range or does not own a `C`.
    #[must_use]
    pub fn component<C: Component>(&self, entity: usize) -> &'a C {
        &self.components::<C>()[self.owned_slot(C::KIND, entity)]
    }

    /// The component of kind `C` owned by `entity`, if any.
    #[must_use]
    pub fn try_component<C: Component>(&self, entity: usize) -> Option<&'a C> {
        let flags = self.flags().get(entity)?;
        flags
            .contains(C::KIND)
            .then(|| &self.components::<C>()[self.component_slot(C::KIND, entity)])
    }

    /// Column slot that belongs to `entity`: the number of lower entities
    /// owning a component of `kind`.
    #[must_use]
    pub fn component_slot(&self, kind: ComponentKind, entity: usize) -> usize {
        self.flags()[..entity]
            .iter()
            .filter(|flags| flags.contains(kind))
            .count()
    }

    /// The entity that owns slot `index` of the `kind` column.
    #[must_use]
    pub fn entity_of_component(&self, kind: ComponentKind, index: usize) -> Option<usize> {
        self.flags()
            .iter()
            .enumerate()
            .filter(|(_, flags)| flags.contains(kind))
            .nth(index)
            .map(|(entity, _)| entity)
    }

    /// Every `(entity, component)` pair of kind `C`, in entity order.
    pub fn iter_with<C: Component>(&self) -> impl Iterator<Item = (usize, &'a C)> + 'a {
        self.flags()
            .iter()
            .enumerate()
            .filter(|(_, flags)| flags.contains(C::KIND))
            .map(|(entity, _)| entity)
            .zip(self.components::<C>())
    }

    /// First entity named `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.infos().iter().position(|info| info.is_named(name))
    }

    fn owned_slot(&self, kind: ComponentKind, entity: usize) -> usize {
        let flags = self.flags();
        assert!(
            entity < flags.len(),
            "entity {entity} out of range (entity count {})",
            flags.len()
        );
        assert!(
            flags[entity].contains(kind),
            "entity {entity} has no {} component",
            kind.name()
        );
        self.component_slot(kind, entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{CollisionShape, Light};
    use crate::error::MemoryError;
    use keystone_shared::Vec3;

    fn store_with(names: &[&str]) -> EntityStore {
        let mut store = EntityStore::new(64 * 1024);
        for name in names {
            store.add_entity(EntityAddition::new(name));
        }
        store.commit().unwrap();
        store
    }

    #[test]
    fn test_empty_commit() {
        let mut store = EntityStore::new(1024);
        let stats = store.commit().unwrap();
        assert_eq!(stats.entity_count, 0);
        assert_eq!(stats.generation, 1);
        assert_eq!(store.view().entity_count(), 0);
    }

    #[test]
    fn test_modify_out_of_range() {
        let mut store = store_with(&["a"]);
        assert_eq!(
            store.modify(1).unwrap_err(),
            StoreError::EntityOutOfRange { index: 1, count: 1 }
        );
    }

    #[test]
    fn test_override_transform_and_info() {
        let mut store = store_with(&["a", "b"]);
        let moved = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        store
            .modify(1)
            .unwrap()
            .set_transform(moved)
            .set_info(EntityInfo::new("renamed"));
        store.commit().unwrap();

        let view = store.view();
        assert_eq!(view.transforms()[1], moved);
        assert_eq!(view.transforms()[0], Transform::IDENTITY);
        assert_eq!(view.find_by_name("renamed"), Some(1));
        assert_eq!(view.find_by_name("b"), None);
    }

    #[test]
    fn test_modifications_reset_after_commit() {
        let mut store = store_with(&["a"]);
        store.modify(0).unwrap().set_component(RenderComponent::new(4));
        store.commit().unwrap();
        assert!(store.view().modifications().iter().all(EntityModification::is_empty));
    }

    #[test]
    fn test_add_component_to_existing_entity() {
        let mut store = store_with(&["a", "b", "c"]);
        store.modify(2).unwrap().set_component(RenderComponent::new(2));
        store.modify(0).unwrap().set_component(RenderComponent::new(0));
        store.commit().unwrap();

        let view = store.view();
        assert_eq!(view.component_count(ComponentKind::Render), 2);
        assert_eq!(view.component::<RenderComponent>(0).model_index, 0);
        assert_eq!(view.component::<RenderComponent>(2).model_index, 2);
        assert!(view.try_component::<RenderComponent>(1).is_none());
    }

    #[test]
    fn test_replace_component_payload() {
        let mut store = EntityStore::new(64 * 1024);
        store.add_entity(
            EntityAddition::new("ball")
                .with_component(CollisionComponent::new(CollisionShape::Sphere { radius: 1.0 })),
        );
        store.commit().unwrap();

        let bigger = CollisionComponent::new(CollisionShape::Sphere { radius: 2.0 });
        store.modify(0).unwrap().set_component(bigger);
        store.commit().unwrap();

        assert_eq!(store.view().components::<CollisionComponent>(), &[bigger]);
    }

    #[test]
    fn test_remove_missing_component_is_noop() {
        let mut store = store_with(&["a"]);
        store.modify(0).unwrap().remove_component(ComponentKind::Light);
        let stats = store.commit().unwrap();
        assert_eq!(stats.component_counts, [0; ComponentKind::COUNT]);
        assert!(store.view().flags()[0].has_no_components());
    }

    #[test]
    fn test_user_flags_survive() {
        let mut store = EntityStore::new(64 * 1024);
        store.add_entity(
            EntityAddition::new("a")
                .with_user_bits(0b11)
                .with_component(LightComponent::new(Light::Ambient { color: Vec3::ONE })),
        );
        store.commit().unwrap();
        store.commit().unwrap();

        let flags = store.view().flags()[0];
        assert_eq!(flags.user_bits(), 0b11);
        assert!(flags.contains(ComponentKind::Light));
    }

    #[test]
    fn test_entity_of_component() {
        let mut store = EntityStore::new(64 * 1024);
        store.add_entity(EntityAddition::new("a"));
        store.add_entity(EntityAddition::new("b").with_component(PhysicsComponent::new(1.0)));
        store.add_entity(EntityAddition::new("c").with_component(PhysicsComponent::new(2.0)));
        store.commit().unwrap();

        let view = store.view();
        assert_eq!(view.entity_of_component(ComponentKind::Physics, 0), Some(1));
        assert_eq!(view.entity_of_component(ComponentKind::Physics, 1), Some(2));
        assert_eq!(view.entity_of_component(ComponentKind::Physics, 2), None);

        let masses: Vec<(usize, f32)> = view
            .iter_with::<PhysicsComponent>()
            .map(|(entity, physics)| (entity, physics.mass))
            .collect();
        assert_eq!(masses, vec![(1, 1.0), (2, 2.0)]);
    }

    #[test]
    fn test_component_mut() {
        let mut store = EntityStore::new(64 * 1024);
        store.add_entity(EntityAddition::new("a"));
        store.add_entity(EntityAddition::new("b").with_component(RenderComponent::new(1)));
        store.commit().unwrap();

        store.component_mut::<RenderComponent>(1).set_hidden(true);
        assert!(store.view().component::<RenderComponent>(1).is_hidden());
        assert!(store.try_component_mut::<RenderComponent>(0).is_none());
    }

    #[test]
    #[should_panic(expected = "has no render component")]
    fn test_component_without_flag_panics() {
        let store = store_with(&["a"]);
        let _ = store.view().component::<RenderComponent>(0);
    }

    #[test]
    fn test_previous_generation_window() {
        let mut store = store_with(&["a"]);
        store.add_entity(EntityAddition::new("b"));
        store.commit().unwrap();

        let previous = store.previous().unwrap();
        assert_eq!(previous.entity_count(), 1);
        assert_eq!(previous.infos()[0].name(), "a");
        assert_eq!(store.view().entity_count(), 2);
    }

    #[test]
    fn test_failed_commit_keeps_published_state() {
        let mut store = EntityStore::new(2048);
        store.add_entity(EntityAddition::new("a").with_component(RenderComponent::new(7)));
        store.commit().unwrap();

        for index in 0..64 {
            store.add_entity(EntityAddition::new(&format!("bulk {index}")));
        }
        let err = store.commit().unwrap_err();
        assert!(matches!(err, StoreError::Memory(MemoryError::ArenaExhausted { .. })));

        let view = store.view();
        assert_eq!(view.entity_count(), 1);
        assert_eq!(view.component::<RenderComponent>(0).model_index, 7);
        assert_eq!(store.additions().len(), 64);
        assert!(store.previous().is_none());
    }
}
