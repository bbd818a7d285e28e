//! Group-move targeting that keeps a selection's shape.
//!
//! A [`GroupMove`] is planned once per command from every selected unit, then
//! asked for the target of each unit that actually takes the order:
//!
//! - click strictly inside the group's bounding box: each unit keeps its own
//!   position, pulled to within a small spread of the target;
//! - click outside and the group compact enough: every unit moves by the same
//!   offset, `click - centroid`;
//! - otherwise: every unit heads for the click itself.
//!
//! Collision-enabled units aim at the destination, which falls back to the
//! nearest point of a long-range corridor when the click is unreachable, and
//! have their target walked back toward it until it is reachable.

use crate::config::FormationRules;
use crate::env::PathOracle;
use crate::state::{Rect, UnitHandle, Xy};

/// One unit taking part in a group move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Member {
    pub unit: UnitHandle,
    pub position: Xy,
    /// Collision-enabled (ground) units are subject to reachability checks.
    pub collides: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    /// Click inside the group; units gather around it.
    Gather,
    /// Compact group; every unit shifts by the same offset.
    Shift(Xy),
    Converge,
}

/// Group-wide part of a point order, shared by every unit that takes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupMove {
    click: Xy,
    /// Where collision-enabled units aim.
    destination: Xy,
    shape: Shape,
}

impl GroupMove {
    /// Plans a move of `members` toward `click`. `obstructable` orders route
    /// ground units around unreachable clicks.
    pub fn plan<P>(
        path: &P,
        rules: &FormationRules,
        members: &[Member],
        click: Xy,
        obstructable: bool,
    ) -> Self
    where
        P: PathOracle + ?Sized,
    {
        let mut plan = Self {
            click,
            destination: click,
            shape: Shape::Converge,
        };
        let Some(bounds) = Rect::bounding(members.iter().map(|m| m.position)) else {
            return plan;
        };
        let centroid = centroid(members);
        let collides = members.iter().any(|m| m.collides);

        if collides && obstructable {
            plan.destination = path.clamp_to_map(reachable_destination(path, centroid, click));
        }
        if members.len() >= 2 {
            let limit = if collides {
                rules.ground_span
            } else {
                rules.air_span
            };
            if bounds.contains_inner(click) {
                plan.shape = Shape::Gather;
            } else if bounds.width() <= limit && bounds.height() <= limit {
                plan.shape = Shape::Shift(click - centroid);
            }
        }
        plan
    }

    /// Target point of one member.
    pub fn target_for<P>(&self, path: &P, rules: &FormationRules, member: &Member) -> Xy
    where
        P: PathOracle + ?Sized,
    {
        let base = if member.collides {
            self.destination
        } else {
            self.click
        };
        let target = match self.shape {
            Shape::Gather => {
                let spread = Xy::new(rules.inner_spread, rules.inner_spread);
                member.position.clamp(base - spread, base + spread)
            }
            Shape::Shift(offset) => member.position + offset,
            Shape::Converge => self.click,
        };
        settle(path, rules, member, path.clamp_to_map(target), base)
    }
}

/// Targets of every member of a group move, in input order.
pub fn plan_targets<P>(path: &P, rules: &FormationRules, members: &[Member], click: Xy) -> Vec<Xy>
where
    P: PathOracle + ?Sized,
{
    let plan = GroupMove::plan(path, rules, members, click, true);
    members
        .iter()
        .map(|member| plan.target_for(path, rules, member))
        .collect()
}

/// Unweighted integer mean of the member positions.
fn centroid(members: &[Member]) -> Xy {
    let n = members.len() as i64;
    let (sx, sy) = members.iter().fold((0i64, 0i64), |(sx, sy), m| {
        (sx + m.position.x as i64, sy + m.position.y as i64)
    });
    Xy::new((sx / n) as i32, (sy / n) as i32)
}

/// Click, or the corridor point closest to it when it cannot be reached from
/// the group's centre.
fn reachable_destination<P>(path: &P, centroid: Xy, click: Xy) -> Xy
where
    P: PathOracle + ?Sized,
{
    if path.is_reachable(centroid, click) {
        return click;
    }
    path.long_path(centroid, click)
        .and_then(|corridor| {
            corridor
                .into_iter()
                .min_by_key(|point| point.distance_squared(click))
        })
        .unwrap_or(click)
}

/// Local obstruction fix-up: step from `target` toward `base` in bounded
/// increments until a point reachable from `base` is found.
fn settle<P>(path: &P, rules: &FormationRules, member: &Member, target: Xy, base: Xy) -> Xy
where
    P: PathOracle + ?Sized,
{
    if !member.collides || path.is_reachable(base, target) {
        return target;
    }
    let steps = rules.obstruction_steps.max(1) as i32;
    let delta = base - target;
    (1..=steps)
        .map(|k| target + Xy::new(delta.x * k / steps, delta.y * k / steps))
        .find(|&candidate| path.is_reachable(base, candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubPath;

    fn member(unit: u16, x: i32, y: i32, collides: bool) -> Member {
        Member {
            unit: UnitHandle(unit),
            position: Xy::new(x, y),
            collides,
        }
    }

    #[test]
    fn compact_group_moves_by_uniform_offset() {
        let path = StubPath::open(4096);
        let members = [
            member(0, 100, 100, true),
            member(1, 160, 100, true),
            member(2, 130, 190, true),
        ];
        let click = Xy::new(1000, 1000);

        let targets = plan_targets(&path, &FormationRules::default(), &members, click);

        let centroid = Xy::new(130, 130);
        let offset = click - centroid;
        assert_eq!(
            targets,
            members.iter().map(|m| m.position + offset).collect::<Vec<_>>()
        );
    }

    #[test]
    fn click_inside_box_pulls_own_positions_near_target() {
        let path = StubPath::open(4096);
        let members = [
            member(0, 0, 0, true),
            member(1, 200, 200, true),
            member(2, 90, 110, true),
        ];
        let targets = plan_targets(
            &path,
            &FormationRules::default(),
            &members,
            Xy::new(100, 100),
        );
        assert_eq!(
            targets,
            vec![Xy::new(68, 68), Xy::new(132, 132), Xy::new(90, 110)]
        );
    }

    #[test]
    fn click_on_box_edge_is_not_inside() {
        let path = StubPath::open(4096);
        let members = [member(0, 0, 0, true), member(1, 100, 100, true)];
        let targets = plan_targets(&path, &FormationRules::default(), &members, Xy::new(100, 50));
        // Offset from the centroid (50, 50) rather than a gather.
        assert_eq!(targets, vec![Xy::new(50, 0), Xy::new(150, 100)]);
    }

    #[test]
    fn spread_out_group_converges_on_click() {
        let path = StubPath::open(4096);
        let members = [member(0, 0, 0, true), member(1, 1000, 0, true)];
        let click = Xy::new(500, 2000);
        let targets = plan_targets(&path, &FormationRules::default(), &members, click);
        assert_eq!(targets, vec![click, click]);
    }

    #[test]
    fn ground_limit_applies_when_any_member_collides() {
        let path = StubPath::open(4096);
        let rules = FormationRules::default();
        let click = Xy::new(2000, 2000);

        // 200 px apart fits the air limit but not the ground one.
        let mixed = [member(0, 0, 0, true), member(1, 200, 0, false)];
        assert_eq!(plan_targets(&path, &rules, &mixed, click), vec![click, click]);

        let air = [member(0, 0, 0, false), member(1, 200, 0, false)];
        assert_eq!(
            plan_targets(&path, &rules, &air, click),
            vec![Xy::new(1900, 2000), Xy::new(2100, 2000)]
        );

        let wide_air = [member(0, 0, 0, false), member(1, 300, 0, false)];
        assert_eq!(plan_targets(&path, &rules, &wide_air, click), vec![click, click]);
    }

    #[test]
    fn plan_covers_units_that_do_not_take_the_order() {
        let path = StubPath::open(4096);
        let rules = FormationRules::default();
        let members = [member(0, 0, 0, true), member(1, 100, 0, true)];
        let plan = GroupMove::plan(&path, &rules, &members, Xy::new(1050, 500), true);
        assert_eq!(
            plan.target_for(&path, &rules, &members[1]),
            Xy::new(1100, 500)
        );
    }

    #[test]
    fn obstructed_targets_walk_back_toward_click() {
        // Columns 2000..2900 form a wall splitting the map in two.
        let path = StubPath::open(4096).with_wall(2000, 2900);
        let members = [member(0, 0, 0, true), member(1, 100, 0, true)];
        let click = Xy::new(1950, 500);
        let targets = plan_targets(&path, &FormationRules::default(), &members, click);
        assert_eq!(targets[0], Xy::new(1900, 500));
        assert!(path.is_walkable(targets[1]));
        assert!(targets[1].x < 2000);
    }

    #[test]
    fn collision_disabled_units_skip_obstruction() {
        let path = StubPath::open(4096).with_wall(2000, 2900);
        let members = [member(0, 0, 0, false), member(1, 100, 0, false)];
        let click = Xy::new(1950, 500);
        let targets = plan_targets(&path, &FormationRules::default(), &members, click);
        assert_eq!(targets[1], Xy::new(2000, 500));
    }
}
