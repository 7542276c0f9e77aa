//! # Entity Records
//!
//! An entity has no identity beyond its index into the store columns. The
//! per-entity records here are the `flags` and `info` columns; the third
//! column is a plain [`Transform`](keystone_shared::Transform).
//!
//! Indices are only stable until the next commit.

use bytemuck::{Pod, Zeroable};
use keystone_shared::ENTITY_NAME_CAPACITY;

use super::component::ComponentKind;

/// Bitset of the components an entity owns, plus free user bits.
///
/// The low four bits are component bits (one per [`ComponentKind`]); the
/// store keeps them in sync with the component columns. Bits from
/// [`ComponentFlags::USER_SHIFT`] upward belong to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct ComponentFlags(u32);

impl ComponentFlags {
    /// No components, no user bits.
    pub const EMPTY: Self = Self(0);

    /// Mask of the component bits.
    pub const COMPONENT_MASK: u32 = (1 << ComponentKind::COUNT) - 1;

    /// First bit available to the host.
    pub const USER_SHIFT: u32 = ComponentKind::COUNT as u32;

    /// Wraps raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Flags with exactly the given component bits.
    #[must_use]
    pub fn of(kinds: &[ComponentKind]) -> Self {
        kinds.iter().fold(Self::EMPTY, |flags, &kind| flags.with(kind))
    }

    /// Whether the component bit for `kind` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Copy with the component bit for `kind` set.
    #[inline]
    #[must_use]
    pub const fn with(self, kind: ComponentKind) -> Self {
        Self(self.0 | kind.bit())
    }

    /// Copy with the component bit for `kind` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, kind: ComponentKind) -> Self {
        Self(self.0 & !kind.bit())
    }

    /// Sets the component bit for `kind`.
    #[inline]
    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    /// Clears the component bit for `kind`.
    #[inline]
    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    /// Only the component bits.
    #[inline]
    #[must_use]
    pub const fn components(self) -> Self {
        Self(self.0 & Self::COMPONENT_MASK)
    }

    /// The host bits, shifted down to bit zero.
    #[inline]
    #[must_use]
    pub const fn user_bits(self) -> u32 {
        self.0 >> Self::USER_SHIFT
    }

    /// Copy with the host bits replaced, component bits kept.
    #[inline]
    #[must_use]
    pub const fn with_user_bits(self, bits: u32) -> Self {
        Self((self.0 & Self::COMPONENT_MASK) | (bits << Self::USER_SHIFT))
    }

    /// Copy with the component bits replaced by `bits`, host bits kept.
    #[inline]
    #[must_use]
    pub const fn with_component_bits(self, bits: u32) -> Self {
        Self((self.0 & !Self::COMPONENT_MASK) | (bits & Self::COMPONENT_MASK))
    }

    /// Whether no component bit is set.
    #[inline]
    #[must_use]
    pub const fn has_no_components(self) -> bool {
        self.0 & Self::COMPONENT_MASK == 0
    }

    /// Iterates the component kinds present, in column order.
    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL.into_iter().filter(move |&kind| self.contains(kind))
    }
}

/// Fixed-size entity name record.
///
/// Holds up to 31 bytes of UTF-8 and a terminating zero, so a name can be
/// stored in an arena column without indirection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct EntityInfo {
    name: [u8; ENTITY_NAME_CAPACITY],
}

impl EntityInfo {
    /// Longest storable name in bytes.
    pub const MAX_NAME_LEN: usize = ENTITY_NAME_CAPACITY - 1;

    /// Creates a record, truncating `name` on a character boundary.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut len = name.len().min(Self::MAX_NAME_LEN);
        while !name.is_char_boundary(len) {
            len -= 1;
        }

        let mut info = Self::zeroed();
        info.name[..len].copy_from_slice(&name.as_bytes()[..len]);
        info
    }

    /// The stored name.
    #[must_use]
    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&byte| byte == 0)
            .unwrap_or(ENTITY_NAME_CAPACITY);
        let bytes = &self.name[..len];
        match std::str::from_utf8(bytes) {
            Ok(name) => name,
            // Column bytes can be written raw; keep the valid prefix.
            Err(error) => std::str::from_utf8(&bytes[..error.valid_up_to()]).unwrap_or_default(),
        }
    }

    /// Whether the stored name equals `name`.
    #[inline]
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == name
    }
}

impl Default for EntityInfo {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl std::fmt::Debug for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EntityInfo").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_component_bits() {
        let mut flags = ComponentFlags::of(&[ComponentKind::Render, ComponentKind::Light]);
        assert!(flags.contains(ComponentKind::Render));
        assert!(!flags.contains(ComponentKind::Physics));

        flags.remove(ComponentKind::Render);
        flags.insert(ComponentKind::Collision);
        let kinds: Vec<_> = flags.kinds().collect();
        assert_eq!(kinds, vec![ComponentKind::Collision, ComponentKind::Light]);
    }

    #[test]
    fn test_flags_user_bits_do_not_touch_components() {
        let flags = ComponentFlags::EMPTY
            .with(ComponentKind::Physics)
            .with_user_bits(0b101);
        assert_eq!(flags.user_bits(), 0b101);
        assert_eq!(flags.components(), ComponentFlags::EMPTY.with(ComponentKind::Physics));
    }

    #[test]
    fn test_info_name() {
        let info = EntityInfo::new("player");
        assert_eq!(info.name(), "player");
        assert!(info.is_named("player"));
        assert_eq!(EntityInfo::default().name(), "");
    }

    #[test]
    fn test_info_truncates_on_char_boundary() {
        let long = "é".repeat(20);
        let info = EntityInfo::new(&long);
        assert_eq!(info.name().len(), 30);
        assert!(long.starts_with(info.name()));
    }

    #[test]
    fn test_info_is_pod() {
        assert_eq!(std::mem::size_of::<EntityInfo>(), ENTITY_NAME_CAPACITY);
        let info = EntityInfo::new("crate");
        let bytes = bytemuck::bytes_of(&info);
        assert_eq!(&bytes[..5], b"crate");
    }
}
