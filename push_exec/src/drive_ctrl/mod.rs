//! # Drive control module
//!
//! Drive control keeps a vehicle on a queue of path segments. Every tick it produces a steering
//! angle and a longitudinal speed for the segment at the head of the queue, and pops segments off
//! the queue as the vehicle passes their ends.
//!
//! Steering is made of a feed-forward term, which for turns is the steering angle that holds the
//! segment's radius, plus a PD controller on the heading error. The heading the controller aims
//! for is the ideal heading of the segment at the vehicle's position, offset in proportion to the
//! lateral error so that the vehicle converges back onto the segment. Signs are flipped when
//! reversing so the same gains work in both directions.
//!
//! Speed is the vehicle's maximum for the direction of travel, limited in turns by the angular
//! velocity and centripetal acceleration limits, and limited near the next stop (a reversal or
//! the end of the route) so the vehicle can stop at its normal deceleration.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::Vector2;
use serde::Serialize;

// Internal
pub use params::Params;
use crate::{
    loc::Pose,
    path::{PathSegment, SegQueue},
    veh::{ang_vel_speed_limit, VehProfile},
};
use util::maths::{clamp_abs, dir2hdg, hdg2dir, rel_hdg, right_normal, steer_for_radius};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Segment follower.
///
/// Holds the heading error of the previous tick for the derivative term, so each vehicle
/// following a queue needs its own instance.
#[derive(Debug, Clone)]
pub struct DriveCtrl {
    params: Params,

    last_hdg_err_deg: Option<f64>,
}

/// Steering and speed demand for one tick.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DriveCmd {
    /// Steering angle, positive right
    pub steer_deg: f64,

    /// Longitudinal speed, negative when reversing
    pub spd_ms: f64,

    /// True if the speed is being limited so the vehicle can stop at the next stop point
    pub decelerating: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of one tick of the segment follower.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveStatus {
    /// Follow the included command
    Driving(DriveCmd),

    /// The head segment was completed and popped. Call again to get a command for the next one.
    SegComplete(PathSegment),

    /// The queue is empty
    Finished,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            last_hdg_err_deg: None,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Forget the derivative history.
    pub fn reset(&mut self) {
        self.last_hdg_err_deg = None;
    }

    /// Compute the demand for the head of `segs`, popping it if it has been completed.
    ///
    /// `pose` is the pose of the vehicle's reference point, `d_t` the time since the last call.
    pub fn drive_segs(
        &mut self,
        pose: &Pose,
        veh: &VehProfile,
        segs: &mut SegQueue,
        d_t: f64,
    ) -> DriveStatus {
        let pos = if veh.use_rear_pos {
            pose.fwd_point(veh.fixed_axle_fwd_m)
        } else {
            pose.pos_m
        };
        let hdg = pose.hdg_deg;

        let seg = match segs.peek_head() {
            Some(s) => *s,
            None => {
                self.reset();
                return DriveStatus::Finished;
            }
        };

        // Passed the end of the segment
        if (pos - seg.end_pos()).dot(&seg.travel_dir_at_end()) >= 0.0 {
            trace!("Segment complete at ({:.2}, {:.2})", pos.x, pos.y);
            self.reset();
            segs.pop_head();
            return DriveStatus::SegComplete(seg);
        }

        let dir_sign = seg.dir_sign();
        let (ideal_hdg, lat_err_m, ff_steer_deg) = self.seg_errors(&seg, &pos, veh);

        // Aim off the ideal heading to close the lateral error
        let hdg_corr = clamp_abs(
            self.params.lat_k_p_dpm * lat_err_m,
            self.params.max_hdg_corr_deg,
        );
        let desired_hdg = ideal_hdg - dir_sign * hdg_corr;
        let hdg_err_deg = rel_hdg(desired_hdg, hdg);

        let d_err_dps = match self.last_hdg_err_deg {
            Some(last) if d_t > 0.0 => (hdg_err_deg - last) / d_t,
            _ => 0.0,
        };
        self.last_hdg_err_deg = Some(hdg_err_deg);

        let mut steer_deg = ff_steer_deg
            - dir_sign * (self.params.hdg_k_p * hdg_err_deg + self.params.hdg_k_d * d_err_dps);
        steer_deg = clamp_abs(steer_deg, veh.max_steer_deg);

        // Base speed, limited by the turn radius for turns
        let mut spd_ms = if seg.is_backward() {
            -veh.max_rev_spd_ms
        } else {
            veh.max_fwd_spd_ms
        };
        if !seg.is_straight() {
            spd_ms = ang_vel_speed_limit(veh, ff_steer_deg, spd_ms);
        }

        // Leave room to stop at the next stop point
        let stop_dist_m = dist_to_stop(&seg, &pos, segs);
        let stop_spd_ms = (2.0 * veh.max_decel_mss * stop_dist_m.max(0.0)).sqrt();
        let mut decelerating = false;
        if stop_spd_ms < spd_ms.abs() {
            spd_ms = stop_spd_ms * dir_sign;
            decelerating = true;
        }

        if spd_ms.abs() < self.params.min_creep_spd_ms {
            spd_ms = self.params.min_creep_spd_ms * dir_sign;
        }

        if self.nearing_end(&seg, &pos, segs) {
            steer_deg = 0.0;
        }

        trace!(
            "drive_segs: lat {:.3} m, hdg err {:.2} deg, steer {:.2} deg, spd {:.2} m/s, stop in \
            {:.1} m",
            lat_err_m,
            hdg_err_deg,
            steer_deg,
            spd_ms,
            stop_dist_m
        );

        DriveStatus::Driving(DriveCmd {
            steer_deg,
            spd_ms,
            decelerating,
        })
    }

    /// Ideal facing heading at `pos`, lateral error (positive right of the ideal line) and the
    /// feed-forward steering angle for a segment.
    fn seg_errors(
        &self,
        seg: &PathSegment,
        pos: &Vector2<f64>,
        veh: &VehProfile,
    ) -> (f64, f64, f64) {
        match *seg {
            PathSegment::Straight {
                start_m, hdg_deg, ..
            } => {
                let lat = (pos - start_m).dot(&right_normal(&hdg2dir(hdg_deg)));
                (hdg_deg, lat, 0.0)
            }
            PathSegment::Turn {
                center_m,
                radius_m,
                ..
            } => {
                let side = seg.turn_side();
                let from_centre = pos - center_m;
                let ideal = dir2hdg(&from_centre) + 90.0 * side;
                let lat = -side * (from_centre.norm() - radius_m);
                let ff = side
                    * steer_for_radius(veh.wheelbase_m, radius_m)
                        .abs()
                        .min(self.params.seg_turn_mult * veh.max_steer_deg);
                (ideal, lat, ff)
            }
        }
    }

    /// True once the vehicle is on the final straight and within the threshold of its end.
    pub fn nearing_end(&self, seg: &PathSegment, pos: &Vector2<f64>, segs: &SegQueue) -> bool {
        segs.len() == 1
            && seg.is_straight()
            && seg.remaining_m(pos) < self.params.nearing_end_thresh_m
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Distance from `pos` to the next point the vehicle must stop at: the end of the last segment
/// before a change of direction, or the end of the route.
///
/// `seg` must be the head of `segs`.
fn dist_to_stop(seg: &PathSegment, pos: &Vector2<f64>, segs: &SegQueue) -> f64 {
    let mut dist_m = seg.remaining_m(pos);

    for next in segs.iter().skip(1) {
        if next.is_backward() != seg.is_backward() {
            break;
        }
        dist_m += next.len_m();
    }

    dist_m
}

#[cfg(test)]
mod test {
    use super::*;
    use util::maths::turn_radius;

    fn test_veh() -> VehProfile {
        VehProfile {
            wheelbase_m: 5.0,
            max_steer_deg: 60.0,
            max_fwd_spd_ms: 4.0,
            max_rev_spd_ms: 1.11,
            max_fwd_ang_vel_dps: 6.0,
            max_rev_ang_vel_dps: 4.0,
            max_centr_accel_mss: 0.1,
            max_accel_mss: 0.25,
            max_decel_mss: 0.17,
            use_rear_pos: false,
            fixed_axle_fwd_m: 0.0,
        }
    }

    /// Drive a kinematic bicycle (reference point on the fixed axle) along the queue, returning
    /// the final pose, every command issued and the queue length after each tick.
    fn run(
        veh: &VehProfile,
        mut pose: Pose,
        segs: &mut SegQueue,
        max_time_s: f64,
    ) -> (Pose, Vec<DriveCmd>, Vec<usize>) {
        let d_t = 0.05;
        let mut ctrl = DriveCtrl::new(Params::default());
        let mut cmds = Vec::new();
        let mut lens = Vec::new();
        let mut t = 0.0;

        while t < max_time_s {
            match ctrl.drive_segs(&pose, veh, segs, d_t) {
                DriveStatus::Driving(cmd) => {
                    let r = turn_radius(veh.wheelbase_m, cmd.steer_deg);
                    pose.hdg_deg = util::maths::normalize_hdg(
                        pose.hdg_deg + (cmd.spd_ms / r).to_degrees() * d_t,
                    );
                    pose.pos_m += pose.dir() * cmd.spd_ms * d_t;
                    pose.spd_ms = cmd.spd_ms;
                    cmds.push(cmd);
                    t += d_t;
                }
                DriveStatus::SegComplete(_) => (),
                DriveStatus::Finished => break,
            }
            lens.push(segs.len());
        }

        (pose, cmds, lens)
    }

    #[test]
    fn test_empty_queue() {
        let mut ctrl = DriveCtrl::new(Params::default());
        let mut segs = SegQueue::new();
        assert_eq!(
            ctrl.drive_segs(&Pose::default(), &test_veh(), &mut segs, 0.05),
            DriveStatus::Finished
        );
    }

    #[test]
    fn test_reverse_straight_converges() {
        let veh = test_veh();
        let mut segs = SegQueue::from(vec![PathSegment::Straight {
            start_m: Vector2::new(0.0, 0.0),
            end_m: Vector2::new(0.0, -50.0),
            hdg_deg: 0.0,
            backward: true,
        }]);

        // Start 1 m to the right of the line
        let start = Pose::new(Vector2::new(1.0, 0.0), 0.0, 0.0);
        let (end, cmds, _) = run(&veh, start, &mut segs, 200.0);

        assert!(segs.is_empty());
        assert!(end.pos_m.x.abs() < 0.3);
        assert!(end.pos_m.y <= -50.0 && end.pos_m.y > -50.5);

        // Never faster than the reverse limit, never forwards
        assert!(cmds.iter().all(|c| c.spd_ms < 0.0 && c.spd_ms >= -veh.max_rev_spd_ms));

        // Slowing down for the end of the route
        let last = cmds.last().unwrap();
        assert!(last.decelerating);
        assert!(last.spd_ms.abs() < 0.3);
    }

    #[test]
    fn test_steer_bounded() {
        let veh = test_veh();
        let seg = PathSegment::Turn {
            center_m: Vector2::new(10.0, 0.0),
            radius_m: 10.0,
            start_hdg_deg: 0.0,
            end_hdg_deg: 90.0,
            backward: false,
        };

        // Poses well off the path in every direction
        for i in 0..36 {
            for off in &[-8.0, -2.0, 0.0, 3.0, 7.0] {
                let mut ctrl = DriveCtrl::new(Params::default());
                let mut segs = SegQueue::from(vec![seg]);
                let pose = Pose::new(Vector2::new(*off, -1.0), i as f64 * 10.0, 0.0);

                if let DriveStatus::Driving(cmd) = ctrl.drive_segs(&pose, &veh, &mut segs, 0.05)
                {
                    assert!(cmd.steer_deg.abs() <= veh.max_steer_deg);
                }
            }
        }
    }

    #[test]
    fn test_queue_pops_in_order() {
        let veh = test_veh();
        let route = vec![
            PathSegment::Straight {
                start_m: Vector2::new(0.0, 0.0),
                end_m: Vector2::new(0.0, 20.0),
                hdg_deg: 0.0,
                backward: false,
            },
            PathSegment::Turn {
                center_m: Vector2::new(15.0, 20.0),
                radius_m: 15.0,
                start_hdg_deg: 0.0,
                end_hdg_deg: 90.0,
                backward: false,
            },
            PathSegment::Straight {
                start_m: Vector2::new(15.0, 35.0),
                end_m: Vector2::new(35.0, 35.0),
                hdg_deg: 90.0,
                backward: false,
            },
        ];
        let mut segs = SegQueue::from(route);

        let (end, cmds, lens) = run(&veh, Pose::default(), &mut segs, 300.0);

        assert!(segs.is_empty());
        assert!(lens.windows(2).all(|w| w[1] <= w[0]));
        assert!((end.pos_m.y - 35.0).abs() < 0.5);
        assert!(end.pos_m.x >= 35.0);

        // In the turn the centripetal limit binds: sqrt(0.1 * 15) m/s
        assert!(cmds.iter().any(|c| (c.spd_ms - 1.5f64.sqrt()).abs() < 1e-6));
        assert!(cmds.iter().all(|c| c.spd_ms <= veh.max_fwd_spd_ms));
    }

    #[test]
    fn test_stops_before_reversal() {
        let veh = test_veh();
        let mut segs = SegQueue::from(vec![
            PathSegment::Straight {
                start_m: Vector2::new(0.0, 0.0),
                end_m: Vector2::new(0.0, 30.0),
                hdg_deg: 0.0,
                backward: false,
            },
            PathSegment::Straight {
                start_m: Vector2::new(0.0, 30.0),
                end_m: Vector2::new(0.0, 10.0),
                hdg_deg: 0.0,
                backward: true,
            },
        ]);
        let mut ctrl = DriveCtrl::new(Params::default());

        // 0.5 m before the reversal point the speed must allow stopping
        let pose = Pose::new(Vector2::new(0.0, 29.5), 0.0, 1.0);
        match ctrl.drive_segs(&pose, &veh, &mut segs, 0.05) {
            DriveStatus::Driving(cmd) => {
                assert!(cmd.decelerating);
                assert!((cmd.spd_ms - (2.0 * 0.17 * 0.5f64).sqrt()).abs() < 1e-6);
            }
            s => panic!("Unexpected status {:?}", s),
        }

        // Past it the segment is popped and the next one is reversing
        let pose = Pose::new(Vector2::new(0.0, 30.01), 0.0, 0.0);
        assert!(matches!(
            ctrl.drive_segs(&pose, &veh, &mut segs, 0.05),
            DriveStatus::SegComplete(_)
        ));
        match ctrl.drive_segs(&pose, &veh, &mut segs, 0.05) {
            DriveStatus::Driving(cmd) => assert!(cmd.spd_ms < 0.0),
            s => panic!("Unexpected status {:?}", s),
        }
    }

    #[test]
    fn test_nearing_end_neutralises_steering() {
        let veh = test_veh();
        let mut segs = SegQueue::from(vec![PathSegment::Straight {
            start_m: Vector2::new(0.0, 0.0),
            end_m: Vector2::new(0.0, 10.0),
            hdg_deg: 0.0,
            backward: false,
        }]);
        let mut ctrl = DriveCtrl::new(Params::default());

        let pose = Pose::new(Vector2::new(0.5, 9.5), 10.0, 0.5);
        match ctrl.drive_segs(&pose, &veh, &mut segs, 0.05) {
            DriveStatus::Driving(cmd) => {
                assert_eq!(cmd.steer_deg, 0.0);
                assert!(cmd.spd_ms >= 0.1);
            }
            s => panic!("Unexpected status {:?}", s),
        }
    }
}
