//! Threat-avoiding route planning for the trip home
//!
//! Tries the direct path first. If it passes through an avoidance zone,
//! looks for the cheapest detour through a single nav node. Nodes are
//! tried in order of straight-line detour length, so the scan stops as soon
//! as no remaining node can beat the best real path found.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use glam::Vec3;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::flat_distance;
use crate::providers::MovementProvider;

/// Keeps a shrunk zone's edge just inside the origin
const ZONE_EDGE_SLACK: f32 = 1e-3;

/// Circle the route must stay out of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvoidZone {
    pub center: Vec3,
    pub radius: f32,
}

impl AvoidZone {
    pub fn contains(&self, point: Vec3) -> bool {
        flat_distance(point, self.center) < self.radius
    }

    /// Does the segment `a..b` pass through the zone?
    pub fn intersects_segment(&self, a: Vec3, b: Vec3) -> bool {
        let (a2, b2, c2) = (a.truncate_y(), b.truncate_y(), self.center.truncate_y());
        let ab = b2 - a2;
        let len_sq = ab.length_squared();
        let t = if len_sq <= f32::EPSILON {
            0.0
        } else {
            ((c2 - a2).dot(ab) / len_sq).clamp(0.0, 1.0)
        };
        (a2 + ab * t).distance(c2) < self.radius
    }
}

trait FlatVec {
    fn truncate_y(self) -> glam::Vec2;
}

impl FlatVec for Vec3 {
    fn truncate_y(self) -> glam::Vec2 {
        glam::Vec2::new(self.x, self.z)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafeRoute {
    /// Intermediate stop, `None` for the direct path
    pub waypoint: Option<Vec3>,
    pub destination: Vec3,
    /// Total path length
    pub length: f32,
}

impl SafeRoute {
    /// Where to walk next
    pub fn next_target(&self) -> Vec3 {
        self.waypoint.unwrap_or(self.destination)
    }
}

/// Corners of a path from `from` to `to` that avoids every zone
fn clear_leg<W: MovementProvider + ?Sized>(world: &W, from: Vec3, to: Vec3, zones: &[AvoidZone]) -> Option<f32> {
    let length = world.is_valid_path(from, to)?;
    let corners = world.path_corners(from, to)?;
    let blocked = corners.windows(2).any(|leg| {
        zones
            .iter()
            .any(|zone| zone.intersects_segment(leg[0], leg[1]))
    }) || corners.iter().any(|c| zones.iter().any(|z| z.contains(*c)));
    (!blocked).then_some(length)
}

/// Zones that already hold `origin` shrink to its distance from their centre
///
/// A route may then leave such a zone but never cut deeper into it.
fn shrink_around(origin: Vec3, zones: &[AvoidZone]) -> Vec<AvoidZone> {
    zones
        .iter()
        .map(|zone| {
            let distance = flat_distance(origin, zone.center);
            AvoidZone {
                center: zone.center,
                radius: zone.radius.min((distance - ZONE_EDGE_SLACK).max(0.0)),
            }
        })
        .collect()
}

/// Plan a route from `from` to `to` that stays out of `zones`
///
/// Returns `None` when neither the direct path nor any one-node detour is
/// clear.
pub fn plan_safe_route<W: MovementProvider + ?Sized>(
    world: &W,
    from: Vec3,
    to: Vec3,
    zones: &[AvoidZone],
) -> Option<SafeRoute> {
    let zones = &shrink_around(from, zones)[..];
    if let Some(length) = clear_leg(world, from, to, zones) {
        return Some(SafeRoute {
            waypoint: None,
            destination: to,
            length,
        });
    }

    let mut open = BinaryHeap::new();
    for (index, node) in world.nav_nodes().iter().enumerate() {
        if zones.iter().any(|z| z.contains(node.position)) {
            continue;
        }
        let estimate = flat_distance(from, node.position) + flat_distance(node.position, to);
        open.push(Reverse((OrderedFloat(estimate), index)));
    }

    let mut best: Option<SafeRoute> = None;
    while let Some(Reverse((OrderedFloat(estimate), index))) = open.pop() {
        if best.as_ref().is_some_and(|b| estimate >= b.length) {
            break;
        }
        let waypoint = world.nav_nodes()[index].position;
        let Some(first) = clear_leg(world, from, waypoint, zones) else {
            continue;
        };
        let Some(second) = clear_leg(world, waypoint, to, zones) else {
            continue;
        };
        let length = first + second;
        if best.as_ref().map_or(true, |b| length < b.length) {
            best = Some(SafeRoute {
                waypoint: Some(waypoint),
                destination: to,
                length,
            });
        }
    }

    if best.is_none() {
        debug!(?from, ?to, zones = zones.len(), "no safe route");
    }
    best
}
