//! # Pending Mutations
//!
//! Edits are collected during a frame and applied once by
//! [`EntityStore::commit`](super::EntityStore::commit):
//!
//! - [`EntityModification`]: one record per existing entity, stored as an
//!   arena column next to the entity columns. A zeroed record keeps
//!   everything.
//! - [`AdditionQueue`]: new entities, linked in the order they were queued.

use bytemuck::{Pod, Zeroable};
use keystone_shared::Transform;

use super::component::{Component, ComponentKind, ComponentPayloads};
use super::entity::{ComponentFlags, EntityInfo};
use crate::collections::sllist::{self, Linked};

/// Pending overrides for one existing entity.
///
/// Every field is optional. For each component kind the last call wins:
/// [`set_component`](Self::set_component) cancels an earlier
/// [`remove_component`](Self::remove_component) and the other way around.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct EntityModification {
    edits: u32,
    removals: ComponentFlags,
    flags: ComponentFlags,
    info: EntityInfo,
    transform: Transform,
    payloads: ComponentPayloads,
}

impl EntityModification {
    const REMOVE: u32 = 1 << 0;
    const SET_FLAGS: u32 = 1 << 1;
    const SET_INFO: u32 = 1 << 2;
    const SET_TRANSFORM: u32 = 1 << 3;

    /// Marks the whole entity for removal.
    pub fn remove_entity(&mut self) -> &mut Self {
        self.edits |= Self::REMOVE;
        self
    }

    /// Overrides the flags. Only the host bits take effect: component bits
    /// always follow the components the entity ends up with.
    pub fn set_flags(&mut self, flags: ComponentFlags) -> &mut Self {
        self.flags = flags;
        self.edits |= Self::SET_FLAGS;
        self
    }

    /// Overrides the name record.
    pub fn set_info(&mut self, info: EntityInfo) -> &mut Self {
        self.info = info;
        self.edits |= Self::SET_INFO;
        self
    }

    /// Overrides the transform.
    pub fn set_transform(&mut self, transform: Transform) -> &mut Self {
        self.transform = transform;
        self.edits |= Self::SET_TRANSFORM;
        self
    }

    /// Adds or replaces a component.
    pub fn set_component<C: Component>(&mut self, component: C) -> &mut Self {
        self.payloads.set(component);
        self.removals.remove(C::KIND);
        self
    }

    /// Drops a component. Removing a component the entity lacks is a no-op.
    pub fn remove_component(&mut self, kind: ComponentKind) -> &mut Self {
        self.payloads.clear(kind);
        self.removals.insert(kind);
        self
    }

    /// Discards every pending edit.
    pub fn clear(&mut self) {
        *self = Self::zeroed();
    }

    /// Whether the entity is being removed.
    #[inline]
    #[must_use]
    pub const fn is_removal(&self) -> bool {
        self.edits & Self::REMOVE != 0
    }

    /// Whether the record carries no edit at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits == 0 && self.removals.bits() == 0 && self.payloads.present_bits() == 0
    }

    /// The flags override.
    #[must_use]
    pub const fn flags(&self) -> Option<ComponentFlags> {
        if self.edits & Self::SET_FLAGS != 0 {
            Some(self.flags)
        } else {
            None
        }
    }

    /// The name override.
    #[must_use]
    pub fn info(&self) -> Option<&EntityInfo> {
        (self.edits & Self::SET_INFO != 0).then_some(&self.info)
    }

    /// The transform override.
    #[must_use]
    pub fn transform(&self) -> Option<&Transform> {
        (self.edits & Self::SET_TRANSFORM != 0).then_some(&self.transform)
    }

    /// The replacement payload of kind `C`.
    #[must_use]
    pub fn component<C: Component>(&self) -> Option<&C> {
        self.payloads.get::<C>()
    }

    /// Whether the component of `kind` is being dropped.
    #[inline]
    #[must_use]
    pub const fn removes(&self, kind: ComponentKind) -> bool {
        self.removals.contains(kind)
    }

    /// Whether an entity that `had` a component of `kind` still has one after
    /// this record is applied.
    #[must_use]
    pub const fn keeps(&self, kind: ComponentKind, had: bool) -> bool {
        !self.is_removal() && !self.removes(kind) && (had || self.payloads.contains(kind))
    }

    /// Flags the entity ends up with, given its current flags.
    #[must_use]
    pub fn apply_to_flags(&self, current: ComponentFlags) -> ComponentFlags {
        let components = ComponentKind::ALL
            .into_iter()
            .filter(|&kind| self.keeps(kind, current.contains(kind)))
            .fold(0, |bits, kind| bits | kind.bit());
        self.flags()
            .unwrap_or(current)
            .with_component_bits(components)
    }
}

/// A brand new entity waiting for the next commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct EntityAddition {
    /// Initial flags. Component bits are derived from the payloads.
    pub flags: ComponentFlags,
    /// Name record.
    pub info: EntityInfo,
    /// Initial transform.
    pub transform: Transform,
    /// Initial components.
    pub payloads: ComponentPayloads,
}

impl EntityAddition {
    /// An entity with an identity transform and no components.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            flags: ComponentFlags::EMPTY,
            info: EntityInfo::new(name),
            transform: Transform::IDENTITY,
            payloads: ComponentPayloads::default(),
        }
    }

    /// Builder: sets the transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder: attaches a component.
    #[must_use]
    pub fn with_component<C: Component>(mut self, component: C) -> Self {
        self.payloads.set(component);
        self
    }

    /// Builder: sets the host bits of the flags.
    #[must_use]
    pub fn with_user_bits(mut self, bits: u32) -> Self {
        self.flags = self.flags.with_user_bits(bits);
        self
    }

    /// Flags the entity is committed with.
    #[must_use]
    pub fn committed_flags(&self) -> ComponentFlags {
        self.flags.with_component_bits(self.payloads.present_bits())
    }
}

/// Handle to a queued addition, valid until the next commit.
///
/// Carries the queue epoch it was issued in, so a handle from before a
/// commit never resolves to an addition queued after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AdditionId {
    index: usize,
    epoch: u64,
}

#[derive(Clone, Copy, Debug)]
struct AdditionNode {
    addition: EntityAddition,
    next: Option<usize>,
}

impl Linked for AdditionNode {
    fn next(&self) -> Option<usize> {
        self.next
    }

    fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }
}

/// Entities queued for the next commit, in link order.
///
/// Node storage is kept across commits, so a warmed-up queue does not
/// allocate.
#[derive(Debug, Default)]
pub struct AdditionQueue {
    nodes: Vec<AdditionNode>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    epoch: u64,
}

impl AdditionQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links an addition after every earlier one.
    pub fn push(&mut self, addition: EntityAddition) -> AdditionId {
        let index = self.nodes.len();
        self.nodes.push(AdditionNode {
            addition,
            next: None,
        });
        match self.tail {
            Some(tail) => sllist::splice_after(&mut self.nodes, tail, index),
            None => sllist::prepend(&mut self.nodes, &mut self.head, index),
        }
        self.tail = Some(index);
        self.len += 1;
        AdditionId {
            index,
            epoch: self.epoch,
        }
    }

    /// Unlinks a queued addition. Returns `false` if it was not queued.
    pub fn cancel(&mut self, id: AdditionId) -> bool {
        if id.epoch != self.epoch
            || id.index >= self.nodes.len()
            || !sllist::remove(&mut self.nodes, &mut self.head, id.index)
        {
            return false;
        }
        if self.tail == Some(id.index) {
            self.tail = sllist::iter(&self.nodes, self.head).last();
        }
        self.len -= 1;
        true
    }

    /// A queued addition.
    #[must_use]
    pub fn get(&self, id: AdditionId) -> Option<&EntityAddition> {
        if id.epoch != self.epoch {
            return None;
        }
        sllist::iter(&self.nodes, self.head)
            .find(|&index| index == id.index)
            .map(|index| &self.nodes[index].addition)
    }

    /// Iterates queued additions in link order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityAddition> + '_ {
        sllist::iter(&self.nodes, self.head).map(|index| &self.nodes[index].addition)
    }

    /// Number of queued additions.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is queued.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops every queued addition, keeping node storage. Handles issued
    /// before the clear stop resolving.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.epoch += 1;
        self.head = None;
        self.tail = None;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{LightComponent, PhysicsComponent, RenderComponent};

    #[test]
    fn test_zeroed_modification_is_empty() {
        let modification = EntityModification::zeroed();
        assert!(modification.is_empty());
        assert!(!modification.is_removal());
        assert!(modification.flags().is_none());
        assert!(modification.transform().is_none());
    }

    #[test]
    fn test_last_component_edit_wins() {
        let mut modification = EntityModification::default();
        modification
            .remove_component(ComponentKind::Render)
            .set_component(RenderComponent::new(2));
        assert!(!modification.removes(ComponentKind::Render));
        assert!(modification.keeps(ComponentKind::Render, false));

        modification.remove_component(ComponentKind::Render);
        assert!(modification.component::<RenderComponent>().is_none());
        assert!(!modification.keeps(ComponentKind::Render, true));
    }

    #[test]
    fn test_apply_to_flags() {
        let current = ComponentFlags::of(&[ComponentKind::Render, ComponentKind::Light]);
        let mut modification = EntityModification::default();
        modification
            .remove_component(ComponentKind::Light)
            .remove_component(ComponentKind::Collision)
            .set_component(PhysicsComponent::new(1.0))
            .set_flags(ComponentFlags::EMPTY.with(ComponentKind::Light).with_user_bits(3));

        let flags = modification.apply_to_flags(current);
        assert_eq!(
            flags.components(),
            ComponentFlags::of(&[ComponentKind::Render, ComponentKind::Physics])
        );
        assert_eq!(flags.user_bits(), 3);
    }

    #[test]
    fn test_addition_flags_follow_payloads() {
        let addition = EntityAddition::new("lamp")
            .with_component(LightComponent::default())
            .with_user_bits(1);
        let flags = addition.committed_flags();
        assert!(flags.contains(ComponentKind::Light));
        assert!(!flags.contains(ComponentKind::Render));
        assert_eq!(flags.user_bits(), 1);
    }

    #[test]
    fn test_queue_order_and_cancel() {
        let mut queue = AdditionQueue::new();
        let a = queue.push(EntityAddition::new("a"));
        let _b = queue.push(EntityAddition::new("b"));
        let c = queue.push(EntityAddition::new("c"));

        assert!(queue.cancel(c));
        assert!(!queue.cancel(c));
        queue.push(EntityAddition::new("d"));
        assert!(queue.cancel(a));

        let names: Vec<&str> = queue.iter().map(|addition| addition.info.name()).collect();
        assert_eq!(names, vec!["b", "d"]);
        assert_eq!(queue.len(), 2);
        assert!(queue.get(a).is_none());
    }

    #[test]
    fn test_queue_clear() {
        let mut queue = AdditionQueue::new();
        queue.push(EntityAddition::new("a"));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.iter().count(), 0);
    }

    #[test]
    fn test_stale_id_does_not_cancel_later_addition() {
        let mut queue = AdditionQueue::new();
        let stale = queue.push(EntityAddition::new("before"));
        queue.clear();

        let fresh = queue.push(EntityAddition::new("after"));
        assert_ne!(stale, fresh);
        assert!(queue.get(stale).is_none());
        assert!(!queue.cancel(stale));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get(fresh).unwrap().info.name(), "after");
        assert!(queue.cancel(fresh));
        assert!(queue.is_empty());
    }
}
