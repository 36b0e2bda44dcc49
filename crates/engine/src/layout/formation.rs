use std::collections::BTreeMap;

use tracing::debug;

use crate::scenario::{Frame, Side, Vec2, ZoneKind};

/// Front row, left to right along the lateral axis. `post` sits on the zone center line.
pub const FRONT_ROW_ORDER: [&str; 5] = ["c1", "sp1", "post", "sp2", "c2"];
pub const RESERVE_ROLE: &str = "bup";
pub const MIN_FORMATION_ROLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationConfig {
    /// Lateral distance between adjacent front-row slots.
    pub player_spacing: f32,
    /// Gap between the two front rows.
    pub front_row_gap: f32,
    /// Distance of the reserve behind its own front row.
    pub reserve_offset: f32,
    /// Extra pull-back of the attacking row, leaving room for the engaged pose.
    pub engagement_offset: f32,
}

impl Default for FormationConfig {
    fn default() -> Self {
        Self {
            player_spacing: 4.0,
            front_row_gap: 3.0,
            reserve_offset: 6.0,
            engagement_offset: 1.5,
        }
    }
}

/// Layout override for one formation role. `z` is the lateral (authored y) axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationAssignment {
    pub x: f32,
    pub z: f32,
    pub facing: f32,
}

impl FormationAssignment {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.z)
    }
}

pub fn is_formation_role(role: &str) -> bool {
    role == RESERVE_ROLE || FRONT_ROW_ORDER.contains(&role)
}

/// Per-frame overrides for bully formation roles. Empty when the frame has no formation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormationLayout {
    center: Option<Vec2>,
    assignments: BTreeMap<(Side, String), FormationAssignment>,
}

impl FormationLayout {
    pub fn solve(frame: &Frame, config: &FormationConfig) -> Self {
        let Some(zone) = frame
            .zones
            .iter()
            .find(|zone| zone.kind == ZoneKind::Bully)
        else {
            return Self::default();
        };
        let center = match zone.rect() {
            Ok(rect) => rect.center(),
            Err(error) => {
                debug!(error = %error, "formation_zone_unusable");
                return Self::default();
            }
        };

        let qualifies = Side::ALL.into_iter().all(|side| {
            frame
                .side(side)
                .keys()
                .filter(|role| is_formation_role(role))
                .count()
                >= MIN_FORMATION_ROLES
        });
        if !qualifies {
            return Self::default();
        }

        let mut assignments = BTreeMap::new();
        for side in Side::ALL {
            let front_row_x = front_row_x(side, center.x, config);
            for role in frame.side(side).keys() {
                let assignment = if role == RESERVE_ROLE {
                    let behind = match side {
                        Side::Attacking => -config.reserve_offset,
                        Side::Defending => config.reserve_offset,
                    };
                    FormationAssignment {
                        x: front_row_x + behind,
                        z: center.y,
                        facing: side.facing(),
                    }
                } else if let Some(slot) = FRONT_ROW_ORDER.iter().position(|name| name == role) {
                    FormationAssignment {
                        x: front_row_x,
                        z: center.y + (slot as f32 - 2.0) * config.player_spacing,
                        facing: side.facing(),
                    }
                } else {
                    continue;
                };
                assignments.insert((side, role.clone()), assignment);
            }
        }

        debug!(
            center_x = center.x,
            center_z = center.y,
            assigned = assignments.len(),
            "formation_solved"
        );
        Self {
            center: Some(center),
            assignments,
        }
    }

    pub fn is_active(&self) -> bool {
        self.center.is_some()
    }

    pub fn center(&self) -> Option<Vec2> {
        self.center
    }

    pub fn assignment(&self, side: Side, role: &str) -> Option<&FormationAssignment> {
        self.assignments.get(&(side, role.to_string()))
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

fn front_row_x(side: Side, center_x: f32, config: &FormationConfig) -> f32 {
    match side {
        Side::Attacking => center_x - config.front_row_gap * 0.5 - config.engagement_offset,
        Side::Defending => center_x + config.front_row_gap * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use crate::scenario::{PlayerState, Zone};

    fn bully_frame(roles: &[&str]) -> Frame {
        let mut frame = Frame::default();
        frame
            .zones
            .push(Zone::new(ZoneKind::Bully, 48.0, 30.0, 14.0, 14.0));
        for side in Side::ALL {
            for role in roles {
                frame
                    .side_mut(side)
                    .insert(role.to_string(), PlayerState::at(10.0, 10.0));
            }
        }
        frame
    }

    #[test]
    fn full_front_rows_are_spaced_and_symmetric() {
        let frame = bully_frame(&["c1", "sp1", "post", "sp2", "c2", "bup"]);
        let layout = FormationLayout::solve(&frame, &FormationConfig::default());
        assert!(layout.is_active());
        assert_eq!(layout.center(), Some(Vec2::new(55.0, 37.0)));

        let lateral = FRONT_ROW_ORDER
            .iter()
            .map(|role| {
                layout
                    .assignment(Side::Attacking, role)
                    .expect("assigned")
                    .z
            })
            .collect::<Vec<_>>();
        assert_eq!(lateral, vec![29.0, 33.0, 37.0, 41.0, 45.0]);
        assert_eq!(lateral[0] + lateral[4], 2.0 * 37.0);

        for role in FRONT_ROW_ORDER {
            let attacking = layout.assignment(Side::Attacking, role).expect("atk");
            let defending = layout.assignment(Side::Defending, role).expect("def");
            assert_eq!(attacking.x, 55.0 - (1.5 + 1.5));
            assert_eq!(defending.x, 55.0 + 1.5);
            assert_eq!(attacking.z, defending.z);
            assert_eq!(defending.facing, attacking.facing + PI);
        }

        let attacking_bup = layout.assignment(Side::Attacking, "bup").expect("bup");
        let defending_bup = layout.assignment(Side::Defending, "bup").expect("bup");
        assert_eq!(attacking_bup.position(), Vec2::new(52.0 - 6.0, 37.0));
        assert_eq!(defending_bup.position(), Vec2::new(56.5 + 6.0, 37.0));
    }

    #[test]
    fn partial_rows_keep_fixed_slots() {
        let frame = bully_frame(&["c1", "post", "c2"]);
        let layout = FormationLayout::solve(&frame, &FormationConfig::default());
        assert_eq!(layout.len(), 6);
        let c1 = layout.assignment(Side::Defending, "c1").expect("c1");
        let c2 = layout.assignment(Side::Defending, "c2").expect("c2");
        assert_eq!((c1.z, c2.z), (29.0, 45.0));
        assert!(layout.assignment(Side::Defending, "sp1").is_none());
    }

    #[test]
    fn reserve_without_post_still_uses_zone_center_line() {
        let frame = bully_frame(&["c1", "sp1", "bup"]);
        let layout = FormationLayout::solve(&frame, &FormationConfig::default());
        let bup = layout.assignment(Side::Attacking, "bup").expect("bup");
        assert_eq!(bup.z, 37.0);
    }

    #[test]
    fn non_formation_roles_keep_authored_coordinates() {
        let mut frame = bully_frame(&["c1", "sp1", "post"]);
        frame
            .attacking
            .insert("fly".to_string(), PlayerState::at(20.0, 20.0));
        let layout = FormationLayout::solve(&frame, &FormationConfig::default());
        assert!(layout.assignment(Side::Attacking, "fly").is_none());
    }

    #[test]
    fn detection_requires_zone_and_three_roles_per_side() {
        let mut frame = bully_frame(&["c1", "sp1", "post"]);
        frame.defending.remove("post");
        assert!(!FormationLayout::solve(&frame, &FormationConfig::default()).is_active());

        let mut frame = bully_frame(&["c1", "sp1", "post"]);
        frame.zones[0].kind = ZoneKind::Sneaking;
        assert!(!FormationLayout::solve(&frame, &FormationConfig::default()).is_active());
    }

    #[test]
    fn first_bully_zone_wins() {
        let mut frame = bully_frame(&["c1", "sp1", "post"]);
        frame
            .zones
            .push(Zone::new(ZoneKind::Bully, 0.0, 0.0, 10.0, 10.0));
        let layout = FormationLayout::solve(&frame, &FormationConfig::default());
        assert_eq!(layout.center(), Some(Vec2::new(55.0, 37.0)));
    }
}
