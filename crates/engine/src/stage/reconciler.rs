use std::collections::BTreeSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::layout::{FormationLayout, Pose, RenderAxis};
use crate::motion::{Animator, Easing, Property, TimerQueue, TweenSpec};
use crate::scenario::{CameraRect, DeclaredPlayer, EntityError, Frame, Side, Vec2};

use super::config::{role_display_name, zone_opacity, StageConfig};
use super::store::{LiveEntity, LiveEntityStore, Phase};
use super::surface::{EntityClass, EntityKey, RenderHandle, RenderState, RenderSurface, Visual};

const POSITION_PROPERTIES: [Property; 3] = [
    Property::PositionX,
    Property::PositionY,
    Property::PositionZ,
];

/// One animated channel of one rendered visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TweenKey {
    pub handle: RenderHandle,
    pub property: Property,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DestroyTarget {
    Keyed(EntityKey),
    Retiring(RenderHandle),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntity {
    pub key: EntityKey,
    pub error: EntityError,
}

/// What a single reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub recreated: usize,
    pub revived: usize,
    pub removed: usize,
    /// Zones, arrows, annotations and labels built fresh this pass.
    pub replaced: usize,
    pub skipped: Vec<SkippedEntity>,
    pub formation: bool,
    /// The frame matched the previous pass; nothing was touched.
    pub unchanged: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub updated: usize,
    pub destroyed: usize,
}

#[derive(Debug, Clone, Copy)]
struct Entrance {
    property: Property,
    duration: Duration,
    delay: Duration,
    easing: Easing,
}

/// How a diffed entity class enters, moves and leaves.
#[derive(Debug, Clone, Copy)]
struct KeyedMotion {
    presence: Property,
    enter: Duration,
    exit: Duration,
    movement: Duration,
    hop: f32,
}

/// Inputs and accumulated results of one reconcile pass.
struct Pass<'s> {
    animate: bool,
    now: Duration,
    surface: &'s mut dyn RenderSurface,
    report: ReconcileReport,
}

struct PlacedPlayer {
    side: Side,
    role: String,
    position: Vec2,
    highlighted: bool,
}

/// Sole owner of the live entity set. Diffs each selected frame against what
/// is on screen and drives the render collaborator towards it.
#[derive(Debug)]
pub struct Reconciler {
    config: StageConfig,
    store: LiveEntityStore,
    animator: Animator<TweenKey>,
    timers: TimerQueue<DestroyTarget>,
    last_frame: Option<Frame>,
    camera: Option<CameraRect>,
}

impl Reconciler {
    pub fn new(config: StageConfig) -> Self {
        Self {
            config,
            store: LiveEntityStore::default(),
            animator: Animator::new(),
            timers: TimerQueue::new(),
            last_frame: None,
            camera: None,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn store(&self) -> &LiveEntityStore {
        &self.store
    }

    pub fn is_animating(&self) -> bool {
        !self.animator.is_empty() || !self.timers.is_empty()
    }

    pub fn reconcile(
        &mut self,
        frame: &Frame,
        animate: bool,
        now: Duration,
        surface: &mut dyn RenderSurface,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if self.last_frame.as_ref() == Some(frame) {
            report.unchanged = true;
            debug!("reconcile_skipped_unchanged");
            return report;
        }
        if !animate {
            self.settle_transients(surface);
        }

        let formation = FormationLayout::solve(frame, &self.config.formation);
        report.formation = formation.is_active();
        let mut pass = Pass {
            animate,
            now,
            surface,
            report,
        };

        let placed = self.reconcile_players(frame, &formation, &mut pass);
        self.reconcile_ball(frame, &mut pass);
        self.reconcile_zones(frame, &mut pass);
        self.reconcile_arrows(frame, &mut pass);
        self.reconcile_annotations(frame, &mut pass);
        self.reconcile_labels(&placed, &mut pass);

        let camera = frame.camera.unwrap_or(CameraRect::FULL_PITCH);
        if self.camera != Some(camera) {
            pass.surface
                .set_camera_rect(camera, animate && self.camera.is_some());
            self.camera = Some(camera);
        }
        let report = pass.report;

        self.last_frame = Some(frame.clone());
        debug!(
            animate,
            created = report.created,
            updated = report.updated,
            recreated = report.recreated,
            revived = report.revived,
            removed = report.removed,
            replaced = report.replaced,
            skipped = report.skipped.len(),
            formation = report.formation,
            active = self.store.active_len(),
            retiring = self.store.retiring_len(),
            "reconcile_pass"
        );
        report
    }

    /// Applies in-flight tweens and fires due destroy timers.
    pub fn tick(&mut self, now: Duration, surface: &mut dyn RenderSurface) -> TickReport {
        let mut report = TickReport::default();

        let mut touched = BTreeSet::new();
        for (key, value) in self.animator.sample(now) {
            if let Some(state) = self.store.state_by_handle_mut(key.handle) {
                state.set(key.property, value);
                touched.insert(key.handle);
            }
        }
        for handle in touched {
            if let Some(state) = self.store.state_by_handle_mut(handle) {
                surface.update_entity(handle, state);
                report.updated += 1;
            }
        }

        for (_, timer, target) in self.timers.drain_due(now) {
            let handle = match target {
                DestroyTarget::Keyed(key) => {
                    let expired = self
                        .store
                        .get(&key)
                        .is_some_and(|entity| entity.phase == Phase::Removing { timer });
                    if !expired {
                        continue;
                    }
                    self.store.remove(&key).map(|entity| entity.handle)
                }
                DestroyTarget::Retiring(handle) => self
                    .store
                    .take_retiring(handle)
                    .map(|retiring| retiring.entity.handle),
            };
            if let Some(handle) = handle {
                self.cancel_tweens(handle);
                surface.destroy_entity(handle);
                report.destroyed += 1;
            }
        }
        report
    }

    /// Destroys every visual and forgets the last frame.
    pub fn reset(&mut self, surface: &mut dyn RenderSurface) {
        for handle in self.store.clear() {
            surface.destroy_entity(handle);
        }
        self.animator = Animator::new();
        self.timers.clear();
        self.last_frame = None;
        self.camera = None;
    }

    fn reconcile_players(
        &mut self,
        frame: &Frame,
        formation: &FormationLayout,
        pass: &mut Pass<'_>,
    ) -> Vec<PlacedPlayer> {
        let ball = frame.ball.and_then(|point| point.resolve().ok());
        let mut declared = BTreeSet::new();
        let mut placed = Vec::new();

        for player in frame.players() {
            let key = EntityKey::player(player.side, player.role);
            let (position, target, pose) = match self.player_target(&player, formation, ball) {
                Ok(target) => target,
                Err(error) => {
                    skip(&mut pass.report, key, error);
                    continue;
                }
            };
            declared.insert(key.clone());
            placed.push(PlacedPlayer {
                side: player.side,
                role: player.role.to_string(),
                position,
                highlighted: player.state.highlighted,
            });
            self.place_keyed(key, target, Some(pose), pass);
        }

        for key in self.store.keys_of_class(EntityClass::Player) {
            if !declared.contains(&key) {
                self.begin_removal(&key, pass);
            }
        }
        placed
    }

    fn player_target(
        &self,
        player: &DeclaredPlayer<'_>,
        formation: &FormationLayout,
        ball: Option<Vec2>,
    ) -> Result<(Vec2, RenderState, Pose), EntityError> {
        let (position, facing, in_formation) = match formation.assignment(player.side, player.role)
        {
            Some(assignment) => (assignment.position(), assignment.facing, true),
            None => (player.state.position()?, player.side.facing(), false),
        };
        let pose = Pose::infer(
            player.side,
            in_formation,
            position,
            ball,
            self.config.possession_threshold,
        );
        let mut state = RenderState::new(
            self.config
                .mapper
                .map(position, self.config.elevations.player),
            Visual::Player {
                side: player.side,
                role: player.role.to_string(),
                label: player.state.label.clone(),
                caption: player.state.caption.clone(),
                pose,
                highlighted: player.state.highlighted,
                sneaking: player.state.sneaking,
                cornering: player.state.cornering,
                highlight_part: player.state.highlight_part.clone(),
            },
        );
        state.rotation = self.config.mapper.facing(facing);
        Ok((position, state, pose))
    }

    fn reconcile_ball(&mut self, frame: &Frame, pass: &mut Pass<'_>) {
        let target = match frame.ball.map(|point| point.resolve()) {
            Some(Ok(position)) => Some(RenderState::new(
                self.config.mapper.map(position, self.config.elevations.ball),
                Visual::Ball,
            )),
            Some(Err(error)) => {
                skip(&mut pass.report, EntityKey::Ball, error);
                None
            }
            None => None,
        };
        match target {
            Some(target) => self.place_keyed(EntityKey::Ball, target, None, pass),
            None => self.begin_removal(&EntityKey::Ball, pass),
        }
    }

    fn reconcile_zones(&mut self, frame: &Frame, pass: &mut Pass<'_>) {
        let mut items = Vec::new();
        for (index, zone) in frame.zones.iter().enumerate() {
            let key = EntityKey::Zone(index);
            let rect = match zone.rect() {
                Ok(rect) => rect,
                Err(error) => {
                    skip(&mut pass.report, key, error);
                    continue;
                }
            };
            let mut state = RenderState::new(
                self.config
                    .mapper
                    .map(rect.center(), self.config.elevations.zone),
                Visual::Zone {
                    kind: zone.kind,
                    width: rect.width,
                    height: rect.height,
                },
            );
            state.opacity = zone_opacity(zone.kind);
            let entrance = Entrance {
                property: Property::Opacity,
                duration: self.config.timings.zone_fade,
                delay: Duration::ZERO,
                easing: Easing::OutCubic,
            };
            items.push((key, state, Some(entrance)));
        }
        self.replace_class(EntityClass::Zone, items, pass);
    }

    fn reconcile_arrows(&mut self, frame: &Frame, pass: &mut Pass<'_>) {
        let elevation = self.config.elevations.arrow;
        let mut items = Vec::new();
        for (index, arrow) in frame.arrows.iter().enumerate() {
            let key = EntityKey::Arrow(index);
            let (from, to) = match arrow.segment() {
                Ok(segment) => segment,
                Err(error) => {
                    skip(&mut pass.report, key, error);
                    continue;
                }
            };
            let state = RenderState::new(
                self.config.mapper.map(from, elevation),
                Visual::Arrow {
                    to: self.config.mapper.map(to, elevation),
                    color: arrow.color.clone(),
                    label: arrow.label.clone(),
                    animated: arrow.animated,
                },
            );
            let entrance = Entrance {
                property: Property::Scale,
                duration: self.config.timings.arrow_grow,
                delay: self.config.timings.arrow_stagger * index as u32,
                easing: Easing::OutCubic,
            };
            items.push((key, state, Some(entrance)));
        }
        self.replace_class(EntityClass::Arrow, items, pass);
    }

    fn reconcile_annotations(&mut self, frame: &Frame, pass: &mut Pass<'_>) {
        let mut items = Vec::new();
        for (index, annotation) in frame.annotations.iter().enumerate() {
            let key = EntityKey::Annotation(index);
            let position = match annotation.position() {
                Ok(position) => position,
                Err(error) => {
                    skip(&mut pass.report, key, error);
                    continue;
                }
            };
            let state = RenderState::new(
                self.config
                    .mapper
                    .map(position, self.config.elevations.annotation),
                Visual::Annotation {
                    kind: annotation.kind,
                    text: annotation.text.clone(),
                },
            );
            let entrance = Entrance {
                property: Property::Scale,
                duration: self.config.timings.annotation_pop,
                delay: self.config.timings.annotation_stagger * index as u32,
                easing: Easing::OutElastic,
            };
            items.push((key, state, Some(entrance)));
        }
        self.replace_class(EntityClass::Annotation, items, pass);
    }

    fn reconcile_labels(
        &mut self,
        placed: &[PlacedPlayer],
        pass: &mut Pass<'_>,
    ) {
        let items: Vec<(EntityKey, RenderState, Option<Entrance>)> = if self.config.show_labels {
            placed
                .iter()
                .map(|player| {
                    let state = RenderState::new(
                        self.config
                            .mapper
                            .map(player.position, self.config.elevations.label),
                        Visual::Label {
                            text: role_display_name(&player.role),
                            side: player.side,
                            highlighted: player.highlighted,
                        },
                    );
                    (EntityKey::label(player.side, &player.role), state, None)
                })
                .collect()
        } else {
            Vec::new()
        };
        self.replace_class(EntityClass::Label, items, pass);
    }

    fn motion_for(&self, key: &EntityKey) -> KeyedMotion {
        let timings = &self.config.timings;
        match key {
            EntityKey::Ball => KeyedMotion {
                presence: Property::Scale,
                enter: timings.ball_scale,
                exit: timings.ball_scale,
                movement: timings.ball_move,
                hop: self.config.ball_hop,
            },
            _ => KeyedMotion {
                presence: Property::Opacity,
                enter: timings.player_fade_in,
                exit: timings.player_fade_out,
                movement: timings.player_move,
                hop: 0.0,
            },
        }
    }

    fn place_keyed(
        &mut self,
        key: EntityKey,
        target: RenderState,
        signature: Option<Pose>,
        pass: &mut Pass<'_>,
    ) {
        let motion = self.motion_for(&key);
        let Some(existing) = self.store.get_mut(&key) else {
            self.create_keyed(key, target, signature, motion, pass);
            pass.report.created += 1;
            return;
        };

        if let Phase::Removing { timer } = existing.phase {
            existing.phase = Phase::Active;
            self.timers.cancel(timer);
            pass.report.revived += 1;
        }

        if existing.signature != signature {
            self.recreate_keyed(key, target, signature, motion, pass);
            pass.report.recreated += 1;
            return;
        }

        let handle = existing.handle;
        if !pass.animate {
            existing.state = target;
            let state = existing.state.clone();
            self.cancel_tweens(handle);
            pass.surface.update_entity(handle, &state);
            pass.report.updated += 1;
            return;
        }

        existing.state.visual = target.visual.clone();
        let current = existing.state.clone();
        self.animate_towards(handle, &current, &target, motion, pass.now);
        let presence = target.get(motion.presence);
        self.tween_or_settle(handle, motion.presence, &current, presence, motion.enter, pass.now);
        pass.surface.update_entity(handle, &current);
        pass.report.updated += 1;
    }

    fn create_keyed(
        &mut self,
        key: EntityKey,
        target: RenderState,
        signature: Option<Pose>,
        motion: KeyedMotion,
        pass: &mut Pass<'_>,
    ) {
        let mut initial = target.clone();
        if pass.animate {
            initial.set(motion.presence, 0.0);
        }
        let handle = pass.surface.create_entity(key.class(), &key, &initial);
        if pass.animate {
            self.animator.animate(
                TweenKey {
                    handle,
                    property: motion.presence,
                },
                TweenSpec::new(0.0, target.get(motion.presence), motion.enter),
                pass.now,
            );
        }
        let mut entity = LiveEntity::new(key, handle, initial);
        entity.signature = signature;
        self.store.insert(entity);
    }

    /// Rebuilds the visual for a new pose, cross-fading from the old one.
    fn recreate_keyed(
        &mut self,
        key: EntityKey,
        target: RenderState,
        signature: Option<Pose>,
        motion: KeyedMotion,
        pass: &mut Pass<'_>,
    ) {
        let Some(old) = self.store.remove(&key) else {
            return;
        };
        self.cancel_tweens(old.handle);

        if !pass.animate {
            pass.surface.destroy_entity(old.handle);
            let handle = pass.surface.create_entity(key.class(), &key, &target);
            let mut entity = LiveEntity::new(key, handle, target);
            entity.signature = signature;
            self.store.insert(entity);
            return;
        }

        let cross_fade = self.config.timings.pose_cross_fade;
        let mut initial = target.clone();
        initial.position = old.state.position;
        initial.rotation = old.state.rotation;
        initial.set(motion.presence, 0.0);

        let handle = pass.surface.create_entity(key.class(), &key, &initial);
        self.animate_towards(handle, &initial, &target, motion, pass.now);
        self.animator.animate(
            TweenKey {
                handle,
                property: motion.presence,
            },
            TweenSpec::new(0.0, target.get(motion.presence), cross_fade),
            pass.now,
        );
        let mut entity = LiveEntity::new(key, handle, initial);
        entity.signature = signature;
        self.store.insert(entity);

        self.animator.animate(
            TweenKey {
                handle: old.handle,
                property: motion.presence,
            },
            TweenSpec::new(old.state.get(motion.presence), 0.0, cross_fade),
            pass.now,
        );
        let timer = self.timers.schedule(
            pass.now + cross_fade,
            DestroyTarget::Retiring(old.handle),
        );
        self.store.retire(old, Some(timer));
    }

    fn begin_removal(&mut self, key: &EntityKey, pass: &mut Pass<'_>) {
        let Some(entity) = self.store.get(key) else {
            return;
        };
        if entity.is_removing() {
            return;
        }
        let handle = entity.handle;
        pass.report.removed += 1;

        if !pass.animate {
            self.store.remove(key);
            self.cancel_tweens(handle);
            pass.surface.destroy_entity(handle);
            return;
        }

        let motion = self.motion_for(key);
        let current = entity.state.get(motion.presence);
        self.animator.animate(
            TweenKey {
                handle,
                property: motion.presence,
            },
            TweenSpec::new(current, 0.0, motion.exit),
            pass.now,
        );
        let timer = self
            .timers
            .schedule(pass.now + motion.exit, DestroyTarget::Keyed(key.clone()));
        if let Some(entity) = self.store.get_mut(key) {
            entity.phase = Phase::Removing { timer };
        }
    }

    /// Clears every entity of a replace-every-frame class and builds `items` fresh.
    fn replace_class(
        &mut self,
        class: EntityClass,
        items: Vec<(EntityKey, RenderState, Option<Entrance>)>,
        pass: &mut Pass<'_>,
    ) {
        for key in self.store.keys_of_class(class) {
            if let Some(old) = self.store.remove(&key) {
                if let Phase::Removing { timer } = old.phase {
                    self.timers.cancel(timer);
                }
                self.cancel_tweens(old.handle);
                pass.surface.destroy_entity(old.handle);
            }
        }

        for (key, target, entrance) in items {
            let entrance = entrance.filter(|_| pass.animate);
            let mut initial = target.clone();
            if let Some(entrance) = entrance {
                initial.set(entrance.property, 0.0);
            }
            let handle = pass.surface.create_entity(class, &key, &initial);
            if let Some(entrance) = entrance {
                self.animator.animate(
                    TweenKey {
                        handle,
                        property: entrance.property,
                    },
                    TweenSpec::new(0.0, target.get(entrance.property), entrance.duration)
                        .with_delay(entrance.delay)
                        .with_easing(entrance.easing),
                    pass.now,
                );
            }
            self.store.insert(LiveEntity::new(key, handle, initial));
            pass.report.replaced += 1;
        }
    }

    /// Starts movement tweens from `current` towards `target`. Properties
    /// already at their target have any stale tween cancelled.
    fn animate_towards(
        &mut self,
        handle: RenderHandle,
        current: &RenderState,
        target: &RenderState,
        motion: KeyedMotion,
        now: Duration,
    ) {
        let vertical = vertical_property(self.config.mapper.vertical_axis());
        let moved = POSITION_PROPERTIES.iter().any(|property| {
            *property != vertical && current.get(*property) != target.get(*property)
        });

        for property in POSITION_PROPERTIES {
            let from = current.get(property);
            let to = target.get(property);
            let key = TweenKey { handle, property };
            if property == vertical && motion.hop > 0.0 && moved && from == to {
                self.animator.animate(
                    key,
                    TweenSpec::new(to, to + motion.hop, motion.movement).with_easing(Easing::Arc),
                    now,
                );
            } else {
                self.tween_or_settle(handle, property, current, to, motion.movement, now);
            }
        }

        let key = TweenKey {
            handle,
            property: Property::Rotation,
        };
        if current.rotation != target.rotation {
            self.animator.animate_angle(
                key,
                TweenSpec::new(current.rotation, target.rotation, motion.movement),
                now,
            );
        } else {
            self.animator.cancel_key(&key);
        }
    }

    fn tween_or_settle(
        &mut self,
        handle: RenderHandle,
        property: Property,
        current: &RenderState,
        to: f32,
        duration: Duration,
        now: Duration,
    ) {
        let key = TweenKey { handle, property };
        let from = current.get(property);
        if from != to {
            self.animator
                .animate(key, TweenSpec::new(from, to, duration), now);
        } else {
            self.animator.cancel_key(&key);
        }
    }

    fn cancel_tweens(&mut self, handle: RenderHandle) {
        self.animator.cancel_where(|key| key.handle == handle);
    }

    /// Finishes every pending fade at once; used before instant passes.
    fn settle_transients(&mut self, surface: &mut dyn RenderSurface) {
        for retiring in self.store.drain_retiring() {
            surface.destroy_entity(retiring.entity.handle);
        }
        let removing = self
            .store
            .iter()
            .filter(|entity| entity.is_removing())
            .map(|entity| entity.key.clone())
            .collect::<Vec<_>>();
        for key in removing {
            if let Some(entity) = self.store.remove(&key) {
                surface.destroy_entity(entity.handle);
            }
        }
        self.animator = Animator::new();
        self.timers.clear();
    }
}

fn vertical_property(axis: RenderAxis) -> Property {
    match axis {
        RenderAxis::X => Property::PositionX,
        RenderAxis::Y => Property::PositionY,
        RenderAxis::Z => Property::PositionZ,
    }
}

fn skip(report: &mut ReconcileReport, key: EntityKey, error: EntityError) {
    warn!(entity = %key, error = %error, "entity_skipped");
    report.skipped.push(SkippedEntity { key, error });
}
