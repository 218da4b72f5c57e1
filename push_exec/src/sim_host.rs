//! # Simulated host
//!
//! A point-mass kinematic stand-in for the host, so the pushback core can be run closed-loop
//! without a simulator. The body moves along its heading under the axial force the core requests,
//! against rolling resistance and its brakes, and yaws about its main gear according to the nose
//! gear steering angle. Heading corrections are added directly to the heading.
//!
//! Nothing here models tires, suspension or the tug's own dynamics.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::acf::{HostInputs, HostRequests};
use log::trace;
use util::maths::{hdg2dir, normalize_hdg, sign, G_MSS};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Rolling resistance as a fraction of the body's weight.
const ROLLING_RESIST_COEF: f64 = 0.002;

/// Deceleration given by fully applied brakes.
const BRAKE_DECEL_MSS: f64 = 3.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SimHost {
    /// Inputs the core reads on the next tick
    pub inputs: HostInputs,

    /// Requests applied on the last step
    pub last_requests: HostRequests,

    nw_steer_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimHost {
    pub fn new(inputs: HostInputs) -> Self {
        Self {
            inputs,
            last_requests: HostRequests::default(),
            nw_steer_deg: 0.0,
        }
    }

    pub fn nw_steer_deg(&self) -> f64 {
        self.nw_steer_deg
    }

    /// Apply the core's requests and advance the body by `d_t`.
    pub fn step(&mut self, req: &HostRequests, d_t: f64) {
        let inp = &mut self.inputs;

        if let Some(b) = req.brakes {
            inp.park_brake = b;
        }
        if req.override_steer {
            if let Some(s) = req.nw_steer_deg {
                self.nw_steer_deg = s;
            }
        }

        // ---- LONGITUDINAL ----

        let mass_kg = inp.mass_kg.max(1.0);
        let brake = inp.park_brake.max(inp.brake_pedal);
        let resist_n = ROLLING_RESIST_COEF * mass_kg * G_MSS + brake * BRAKE_DECEL_MSS * mass_kg;
        let force_n = req.axial_force_n;
        let v = inp.spd_ms;

        let new_v = if v == 0.0 {
            // Static until the push beats the resistance
            if force_n.abs() <= resist_n {
                0.0
            } else {
                (force_n - sign(force_n) * resist_n) / mass_kg * d_t
            }
        } else {
            let v1 = v + (force_n - sign(v) * resist_n) / mass_kg * d_t;
            // Resistance stops the body, it never reverses it
            if v1 * v < 0.0 {
                0.0
            } else {
                v1
            }
        };

        // ---- KINEMATICS ----

        let (nw_fwd_m, main_fwd_m) = gear_offsets(inp);
        let wb_m = nw_fwd_m - main_fwd_m;

        let main_pos = inp.pos_m + hdg2dir(inp.hdg_deg) * main_fwd_m
            + hdg2dir(inp.hdg_deg) * new_v * d_t;
        let yaw_dps = if wb_m > 0.0 {
            (new_v * self.nw_steer_deg.to_radians().tan() / wb_m).to_degrees()
        } else {
            0.0
        };
        let hdg = normalize_hdg(inp.hdg_deg + yaw_dps * d_t + req.hdg_corr_deg);

        inp.pos_m = main_pos - hdg2dir(hdg) * main_fwd_m;
        inp.hdg_deg = hdg;
        inp.spd_ms = new_v;
        inp.time_s += d_t;

        trace!(
            "SimHost: t {:.2} s, pos ({:.2}, {:.2}), hdg {:.2}, spd {:.3}, force {:.0} N",
            inp.time_s,
            inp.pos_m.x,
            inp.pos_m.y,
            inp.hdg_deg,
            inp.spd_ms,
            force_n
        );

        self.last_requests = *req;
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Offsets of the most forward steerable gear and the mean of the others.
fn gear_offsets(inputs: &HostInputs) -> (f64, f64) {
    let nw = inputs
        .deployed_gears()
        .filter(|(_, g)| g.steerable)
        .map(|(_, g)| g.fwd_m)
        .fold(f64::NEG_INFINITY, f64::max);

    let mains: Vec<f64> = inputs
        .deployed_gears()
        .filter(|(_, g)| !g.steerable)
        .map(|(_, g)| g.fwd_m)
        .collect();

    if !nw.is_finite() || mains.is_empty() {
        return (0.0, 0.0);
    }

    (nw, mains.iter().sum::<f64>() / mains.len() as f64)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::veh::test::test_inputs;

    #[test]
    fn test_static_until_force_beats_resistance() {
        let mut sim = SimHost::new(test_inputs());
        let mut req = HostRequests::default();

        req.axial_force_n = -1000.0;
        sim.step(&req, 0.05);
        assert_eq!(sim.inputs.spd_ms, 0.0);

        req.axial_force_n = -50_000.0;
        sim.step(&req, 0.05);
        assert!(sim.inputs.spd_ms < 0.0);
        assert!(sim.inputs.pos_m.y < 0.0);
        assert!((sim.inputs.time_s - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_brakes_stop_the_body() {
        let mut inputs = test_inputs();
        inputs.spd_ms = -0.5;
        let mut sim = SimHost::new(inputs);

        let req = HostRequests {
            brakes: Some(0.9),
            ..Default::default()
        };
        for _ in 0..10 {
            sim.step(&req, 0.05);
        }

        assert_eq!(sim.inputs.spd_ms, 0.0);
        assert_eq!(sim.inputs.park_brake, 0.9);
    }

    #[test]
    fn test_steering_yaws_about_the_main_gear() {
        let mut inputs = test_inputs();
        inputs.spd_ms = 1.0;
        let main_before = inputs.pos_m + hdg2dir(inputs.hdg_deg) * -5.0;
        let mut sim = SimHost::new(inputs);

        // Enough force to hold the speed against rolling resistance
        let req = HostRequests {
            override_steer: true,
            nw_steer_deg: Some(20.0),
            axial_force_n: ROLLING_RESIST_COEF * 70_000.0 * G_MSS,
            ..Default::default()
        };
        sim.step(&req, 0.1);

        // Turning right going forwards
        assert!(sim.inputs.hdg_deg > 0.0);
        assert_eq!(sim.nw_steer_deg(), 20.0);

        // The main gear moved along the old heading
        let main_after = sim.inputs.pos_m + hdg2dir(sim.inputs.hdg_deg) * -5.0;
        assert!((main_after - main_before - hdg2dir(0.0) * 0.1).norm() < 1e-6);
    }
}
