use std::collections::BTreeMap;

use crate::layout::Pose;
use crate::motion::TimerId;

use super::surface::{EntityClass, EntityKey, RenderHandle, RenderState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Active,
    /// Fading out; destroyed when `timer` fires unless revived first.
    Removing { timer: TimerId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveEntity {
    pub key: EntityKey,
    pub handle: RenderHandle,
    pub state: RenderState,
    /// Pose the visual was built with; a different pose forces a rebuild.
    pub signature: Option<Pose>,
    pub phase: Phase,
}

impl LiveEntity {
    pub fn new(key: EntityKey, handle: RenderHandle, state: RenderState) -> Self {
        Self {
            key,
            handle,
            state,
            signature: None,
            phase: Phase::Active,
        }
    }

    pub fn is_removing(&self) -> bool {
        matches!(self.phase, Phase::Removing { .. })
    }
}

/// Visual superseded by a rebuild, kept alive only for its fade-out.
#[derive(Debug, Clone, PartialEq)]
pub struct RetiringEntity {
    pub entity: LiveEntity,
    pub timer: Option<TimerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Keyed,
    Retiring,
}

/// Live entities by diff identity, plus superseded visuals that are still fading.
#[derive(Debug, Default)]
pub struct LiveEntityStore {
    by_key: BTreeMap<EntityKey, LiveEntity>,
    retiring: BTreeMap<RenderHandle, RetiringEntity>,
    handles: BTreeMap<RenderHandle, (Slot, EntityKey)>,
}

impl LiveEntityStore {
    pub fn get(&self, key: &EntityKey) -> Option<&LiveEntity> {
        self.by_key.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut LiveEntity> {
        self.by_key.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Inserts or replaces the entity for its key. The replaced entity, if
    /// any, is returned and no longer tracked.
    pub fn insert(&mut self, entity: LiveEntity) -> Option<LiveEntity> {
        self.handles
            .insert(entity.handle, (Slot::Keyed, entity.key.clone()));
        let handle = entity.handle;
        let previous = self.by_key.insert(entity.key.clone(), entity);
        if let Some(previous) = previous.as_ref().filter(|previous| previous.handle != handle) {
            self.handles.remove(&previous.handle);
        }
        previous
    }

    pub fn remove(&mut self, key: &EntityKey) -> Option<LiveEntity> {
        let entity = self.by_key.remove(key)?;
        self.handles.remove(&entity.handle);
        Some(entity)
    }

    pub fn retire(&mut self, entity: LiveEntity, timer: Option<TimerId>) {
        self.handles
            .insert(entity.handle, (Slot::Retiring, entity.key.clone()));
        self.retiring
            .insert(entity.handle, RetiringEntity { entity, timer });
    }

    pub fn take_retiring(&mut self, handle: RenderHandle) -> Option<RetiringEntity> {
        let retiring = self.retiring.remove(&handle)?;
        self.handles.remove(&handle);
        Some(retiring)
    }

    pub fn drain_retiring(&mut self) -> Vec<RetiringEntity> {
        let handles = self.retiring.keys().copied().collect::<Vec<_>>();
        handles
            .into_iter()
            .filter_map(|handle| self.take_retiring(handle))
            .collect()
    }

    /// State of whichever entity currently owns `handle`.
    pub fn state_by_handle_mut(&mut self, handle: RenderHandle) -> Option<&mut RenderState> {
        let (slot, key) = self.handles.get(&handle)?;
        match slot {
            Slot::Keyed => self.by_key.get_mut(key).map(|entity| &mut entity.state),
            Slot::Retiring => self
                .retiring
                .get_mut(&handle)
                .map(|retiring| &mut retiring.entity.state),
        }
    }

    pub fn keys_of_class(&self, class: EntityClass) -> Vec<EntityKey> {
        self.by_key
            .keys()
            .filter(|key| key.class() == class)
            .cloned()
            .collect()
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.by_key.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveEntity> {
        self.by_key.values()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn retiring_len(&self) -> usize {
        self.retiring.len()
    }

    pub fn active_len(&self) -> usize {
        self.by_key
            .values()
            .filter(|entity| !entity.is_removing())
            .count()
    }

    pub fn clear(&mut self) -> Vec<RenderHandle> {
        let handles = self.handles.keys().copied().collect();
        self.by_key.clear();
        self.retiring.clear();
        self.handles.clear();
        handles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RenderPos;
    use crate::scenario::Side;
    use crate::stage::surface::Visual;

    fn entity(key: EntityKey, raw: u64) -> LiveEntity {
        LiveEntity::new(
            key,
            RenderHandle::from_raw(raw),
            RenderState::new(RenderPos::default(), Visual::Ball),
        )
    }

    #[test]
    fn handles_resolve_to_keyed_and_retiring_entities() {
        let mut store = LiveEntityStore::default();
        let key = EntityKey::player(Side::Attacking, "fly");
        store.insert(entity(key.clone(), 1));

        let old = store.remove(&key).expect("old");
        store.retire(old, None);
        store.insert(entity(key.clone(), 2));

        store
            .state_by_handle_mut(RenderHandle::from_raw(1))
            .expect("retiring state")
            .opacity = 0.25;
        store
            .state_by_handle_mut(RenderHandle::from_raw(2))
            .expect("keyed state")
            .opacity = 0.75;

        assert_eq!(store.len(), 1);
        assert_eq!(store.retiring_len(), 1);
        assert_eq!(store.get(&key).map(|entity| entity.state.opacity), Some(0.75));
        let retired = store
            .take_retiring(RenderHandle::from_raw(1))
            .expect("retired");
        assert_eq!(retired.entity.state.opacity, 0.25);
        assert!(store.state_by_handle_mut(RenderHandle::from_raw(1)).is_none());
    }

    #[test]
    fn keys_of_class_filters() {
        let mut store = LiveEntityStore::default();
        store.insert(entity(EntityKey::Zone(0), 1));
        store.insert(entity(EntityKey::Zone(1), 2));
        store.insert(entity(EntityKey::Ball, 3));
        assert_eq!(
            store.keys_of_class(EntityClass::Zone),
            vec![EntityKey::Zone(0), EntityKey::Zone(1)]
        );
        assert_eq!(store.clear().len(), 3);
        assert!(store.is_empty());
    }
}
