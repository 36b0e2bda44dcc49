use std::collections::BTreeMap;

use crate::scenario::CameraRect;

use super::surface::{
    EntityClass, EntityKey, HandleAllocator, RenderHandle, RenderState, RenderSurface,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SurfaceCall {
    Create(RenderHandle, EntityKey),
    Update(RenderHandle),
    Destroy(RenderHandle),
    Camera(CameraRect, bool),
}

/// Records every collaborator call and mirrors the visible entity set.
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    handles: HandleAllocator,
    pub calls: Vec<SurfaceCall>,
    pub live: BTreeMap<RenderHandle, (EntityKey, RenderState)>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn creates(&self) -> Vec<EntityKey> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Create(_, key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn destroys(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, SurfaceCall::Destroy(_)))
            .count()
    }

    pub fn visible(&self, key: &EntityKey) -> Vec<&RenderState> {
        self.live
            .values()
            .filter(|(live_key, _)| live_key == key)
            .map(|(_, state)| state)
            .collect()
    }

    pub fn state_of(&self, key: &EntityKey) -> Option<&RenderState> {
        let visible = self.visible(key);
        visible.last().copied()
    }

    pub fn count_class(&self, class: EntityClass) -> usize {
        self.live
            .values()
            .filter(|(key, _)| key.class() == class)
            .count()
    }
}

impl RenderSurface for RecordingSurface {
    fn create_entity(
        &mut self,
        _class: EntityClass,
        key: &EntityKey,
        state: &RenderState,
    ) -> RenderHandle {
        let handle = self.handles.allocate();
        self.calls.push(SurfaceCall::Create(handle, key.clone()));
        self.live.insert(handle, (key.clone(), state.clone()));
        handle
    }

    fn update_entity(&mut self, handle: RenderHandle, state: &RenderState) {
        self.calls.push(SurfaceCall::Update(handle));
        if let Some(entry) = self.live.get_mut(&handle) {
            entry.1 = state.clone();
        }
    }

    fn destroy_entity(&mut self, handle: RenderHandle) {
        self.calls.push(SurfaceCall::Destroy(handle));
        self.live.remove(&handle);
    }

    fn set_camera_rect(&mut self, rect: CameraRect, animate: bool) {
        self.calls.push(SurfaceCall::Camera(rect, animate));
    }
}
