//! # Push control module
//!
//! Push control converts a target speed into a push force on the towed body's nose gear. The
//! force is not computed from a model of the body: it is nudged up or down every tick depending on
//! whether the body is accelerating faster or slower than allowed. The nudge is sized to the
//! acceleration error and capped at a fixed increment, so a full force swing takes about one
//! second and the acceleration settles on the allowance without overshooting it.
//!
//! The force is limited in proportion to the body's mass, and the controller also watches the
//! nose gear's ground contact. If the nose lifts, the weight of the tug is progressively applied
//! as a nose-down moment and the push force is bled away.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::acf::FrictionTier;
use log::{debug, trace};
use serde::Serialize;

// Internal
pub use params::Params;
use util::maths::{clamp_abs, hdg2dir, G_MSS};
use nalgebra::Vector2;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Fraction of the force needed to cancel the acceleration error that is applied in one tick.
const FORCE_STEP_GAIN: f64 = 0.5;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Force controller, persistent across the ticks of one session.
#[derive(Debug, Clone)]
pub struct PushCtrl {
    params: Params,

    /// Force applied on the last tick, positive forwards
    last_force_n: f64,

    /// Virtual weight of the tug hanging off a lifting nose gear
    tug_weight_force_n: f64,
}

/// What the caller wants from the controller this tick.
#[derive(Debug, Clone, Copy)]
pub struct PushInput {
    /// Target speed of the tug, negative when reversing
    pub tgt_spd_ms: f64,

    /// Acceleration allowance
    pub max_accel_mss: f64,

    /// If true the tug's engine sound intensity is computed
    pub sound: bool,

    /// True if the speed is being reduced to stop, in which case the approach to the target is
    /// not softened
    pub decelerating: bool,
}

/// State of the body and the tug the controller reads.
#[derive(Debug, Clone, Copy)]
pub struct PushEnv {
    pub d_t: f64,

    /// Body longitudinal speed
    pub spd_ms: f64,

    /// Change in body speed since the last tick
    pub d_spd_ms: f64,

    /// Change in body heading since the last tick
    pub d_hdg_deg: f64,

    /// Nose gear steering angle currently commanded
    pub steer_deg: f64,

    pub mass_kg: f64,

    pub friction: FrictionTier,

    pub nw_on_ground: bool,

    pub nw_fwd_m: f64,

    pub nw_leg_len_m: f64,

    pub acf_wb_m: f64,

    pub tug_mass_kg: f64,

    pub tug_max_te_n: f64,

    pub tug_max_fwd_spd_ms: f64,
}

/// Forces and moments to request of the host.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct PushOutput {
    /// Target speed after the friction ceiling
    pub tgt_spd_ms: f64,

    /// Push force along the nose gear's steering direction
    pub force_n: f64,

    pub axial_force_n: f64,

    pub yaw_moment_nm: f64,

    /// Total pitch moment, nose up positive
    pub pitch_moment_nm: f64,

    /// Nose-down part of the pitch moment caused by a lifting nose gear
    pub safety_moment_nm: f64,

    /// Tug engine sound intensity in `0..1`, if sound was requested
    pub engine_snd: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PushCtrl {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            last_force_n: 0.0,
            tug_weight_force_n: 0.0,
        }
    }

    pub fn last_force_n(&self) -> f64 {
        self.last_force_n
    }

    pub fn tug_weight_force_n(&self) -> f64 {
        self.tug_weight_force_n
    }

    /// Drop the force immediately, for example when the brakes are applied.
    pub fn zero_force(&mut self) {
        self.last_force_n = 0.0;
    }

    /// Largest force that may be applied to a body of the given mass.
    pub fn force_lim_n(&self, mass_kg: f64) -> f64 {
        self.params.force_per_ton_n * mass_kg / 1000.0
    }

    /// Update the push force to drive the tug at the target speed.
    pub fn push_at_speed(&mut self, input: &PushInput, env: &PushEnv) -> PushOutput {
        let p = &self.params;

        let tgt_spd_ms = clamp_abs(input.tgt_spd_ms, p.max_spd_ms.get(env.friction));

        let force_lim = self.force_lim_n(env.mass_kg);
        let force_incr = force_lim * env.d_t;

        // Control the speed of the tug, which is the body's longitudinal speed plus the nose's
        // lateral speed from yawing, seen along the nose gear
        let yaw_rate_rads = if env.d_t > 0.0 {
            (env.d_hdg_deg / env.d_t).to_radians()
        } else {
            0.0
        };
        let cur_spd_ms = hdg2dir(env.steer_deg)
            .dot(&Vector2::new(yaw_rate_rads * env.acf_wb_m, env.spd_ms));
        let accel_now = if env.d_t > 0.0 {
            (env.d_spd_ms / env.steer_deg.to_radians().cos().abs().max(0.1)) / env.d_t
        } else {
            0.0
        };

        let mut force = self.last_force_n;
        let mut max_accel = input.max_accel_mss;
        let d_v = tgt_spd_ms - cur_spd_ms;

        // Allow a much larger acceleration until the body starts moving, otherwise heavy bodies
        // never break away
        if cur_spd_ms.abs() < p.breakaway_thresh_ms {
            max_accel *= p.breakaway_accel_mult;
        }
        let broken_away = env.spd_ms.abs() >= p.breakaway_thresh_ms;

        if d_v < 0.0 {
            max_accel = -max_accel;
            if d_v > max_accel && !input.decelerating && broken_away {
                max_accel = d_v;
            }
        } else if d_v > 0.0 && d_v < max_accel && !input.decelerating && broken_away {
            max_accel = d_v;
        }
        if d_v != 0.0 {
            let accel_err = max_accel - accel_now;
            force += clamp_abs(accel_err * env.mass_kg * FORCE_STEP_GAIN, force_incr);
        }

        let mut safety_moment_nm = 0.0;
        if !env.nw_on_ground {
            let tug_weight_n = env.tug_mass_kg * G_MSS;
            self.tug_weight_force_n = (self.tug_weight_force_n + tug_weight_n * env.d_t)
                .min(tug_weight_n);
            safety_moment_nm = -self.tug_weight_force_n * env.nw_fwd_m;

            if force < 0.0 {
                force += 2.0 * force_incr;
            } else {
                force -= 2.0 * force_incr;
            }
            debug!(
                "Nose gear off the ground, tug weight {:.0} N, force {:.0} N",
                self.tug_weight_force_n, force
            );
        } else {
            self.tug_weight_force_n = 0.0;
        }

        force = clamp_abs(force, force_lim);
        self.last_force_n = force;

        let (sin_s, cos_s) = env.steer_deg.to_radians().sin_cos();
        let fx = force * sin_s;
        let fz = force * cos_s;

        let engine_snd = if input.sound {
            if (env.spd_ms > 0.0 && force > 0.0) || (env.spd_ms < 0.0 && force < 0.0) {
                let force_fract = (force / env.tug_max_te_n).abs();
                let spd_fract = env.spd_ms.abs() / env.tug_max_fwd_spd_ms;
                Some(((force_fract + spd_fract) / 2.0).min(1.0))
            } else {
                Some(0.0)
            }
        } else {
            None
        };

        trace!(
            "push_at_speed: tgt {:.2} m/s, cur {:.2} m/s, accel {:.3} m/s^2, force {:.0} N",
            tgt_spd_ms,
            cur_spd_ms,
            accel_now,
            force
        );

        PushOutput {
            tgt_spd_ms,
            force_n: force,
            axial_force_n: fz,
            yaw_moment_nm: fx * env.nw_fwd_m,
            pitch_moment_nm: fz * env.nw_leg_len_m + safety_moment_nm,
            safety_moment_nm,
            engine_snd,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn env(mass_kg: f64) -> PushEnv {
        PushEnv {
            d_t: 0.05,
            spd_ms: 0.0,
            d_spd_ms: 0.0,
            d_hdg_deg: 0.0,
            steer_deg: 0.0,
            mass_kg,
            friction: FrictionTier::Good,
            nw_on_ground: true,
            nw_fwd_m: 15.0,
            nw_leg_len_m: 1.5,
            acf_wb_m: 20.0,
            tug_mass_kg: 20_000.0,
            tug_max_te_n: 200_000.0,
            tug_max_fwd_spd_ms: 8.0,
        }
    }

    fn input(tgt_spd_ms: f64) -> PushInput {
        PushInput {
            tgt_spd_ms,
            max_accel_mss: 0.25,
            sound: true,
            decelerating: false,
        }
    }

    #[test]
    fn test_force_bounded_by_mass() {
        for mass_t in &[1.0, 10.0, 70.0, 250.0, 400.0] {
            let mut ctrl = PushCtrl::new(Params::default());
            let lim = 5000.0 * mass_t;
            let mut e = env(mass_t * 1000.0);

            // Body stuck in place, so the controller keeps pushing harder
            for i in 0..200 {
                let tgt = if i < 100 { -1.11 } else { 4.0 };
                let out = ctrl.push_at_speed(&input(tgt), &e);
                assert!(out.force_n.abs() <= lim + 1e-9);
                assert!(out.axial_force_n.abs() <= lim + 1e-9);
                e.steer_deg = (i as f64 * 7.0) % 120.0 - 60.0;
            }
            assert!((ctrl.last_force_n().abs() - lim).abs() < 1e-6);
        }
    }

    #[test]
    fn test_components_from_clamped_force() {
        let mut ctrl = PushCtrl::new(Params::default());
        let mut e = env(70_000.0);
        let lim = ctrl.force_lim_n(70_000.0);

        // Saturate, then keep pushing against the stuck body
        for _ in 0..40 {
            let out = ctrl.push_at_speed(&input(-1.11), &e);
            assert_eq!(out.axial_force_n, out.force_n);
            assert!(out.axial_force_n.abs() <= lim);
        }
        assert_eq!(ctrl.last_force_n(), -lim);

        e.steer_deg = 30.0;
        let out = ctrl.push_at_speed(&input(-1.11), &e);
        assert_eq!(out.force_n, -lim);
        assert!((out.axial_force_n + lim * 30f64.to_radians().cos()).abs() < 1e-6);
        assert!((out.yaw_moment_nm + lim * 0.5 * 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_accel_settles_without_overshoot() {
        let mut ctrl = PushCtrl::new(Params::default());
        let mut e = env(70_000.0);
        e.spd_ms = 2.0;

        // Frictionless body driven by the axial force alone
        let step = |ctrl: &mut PushCtrl, e: &mut PushEnv, tgt: f64| {
            let out = ctrl.push_at_speed(&input(tgt), e);
            let accel = out.axial_force_n / e.mass_kg;
            e.d_spd_ms = accel * e.d_t;
            e.spd_ms += e.d_spd_ms;
            (out, accel)
        };

        for _ in 0..200 {
            let (_, accel) = step(&mut ctrl, &mut e, 4.0);
            assert!(accel > 0.0 && accel <= 0.25 + 1e-9);
        }
        assert!(e.spd_ms > 3.5);

        // Surface turns icy, the target drops at once and the body slows at the allowed rate
        e.friction = FrictionTier::Poor;
        let (out, _) = step(&mut ctrl, &mut e, 4.0);
        assert_eq!(out.tgt_spd_ms, 1.11);
        for _ in 0..400 {
            let (out, accel) = step(&mut ctrl, &mut e, 4.0);
            assert_eq!(out.tgt_spd_ms, 1.11);
            assert!(accel.abs() <= 0.25 + 1e-9);
        }
        assert!((e.spd_ms - 1.11).abs() < 0.01);
    }

    #[test]
    fn test_force_ramps_over_one_second() {
        let mut ctrl = PushCtrl::new(Params::default());
        let e = env(70_000.0);

        let out = ctrl.push_at_speed(&input(-1.11), &e);
        assert!((out.force_n + 350_000.0 * 0.05).abs() < 1e-6);
        assert!(out.force_n < 0.0);
        assert_eq!(out.axial_force_n, out.force_n);
        assert_eq!(out.yaw_moment_nm, 0.0);
    }

    #[test]
    fn test_poor_friction_clamps_target() {
        let mut ctrl = PushCtrl::new(Params::default());
        let mut e = env(70_000.0);
        e.friction = FrictionTier::Poor;

        let out = ctrl.push_at_speed(&input(4.0), &e);
        assert_eq!(out.tgt_spd_ms, 1.11);

        e.friction = FrictionTier::Medium;
        let out = ctrl.push_at_speed(&input(-4.0), &e);
        assert_eq!(out.tgt_spd_ms, -2.0);
    }

    #[test]
    fn test_nose_lift_safety() {
        let mut ctrl = PushCtrl::new(Params::default());
        let mut e = env(70_000.0);
        let tug_weight_n = 20_000.0 * G_MSS;

        // Build up some force first
        for _ in 0..20 {
            ctrl.push_at_speed(&input(-1.11), &e);
        }
        let built_up = ctrl.last_force_n();
        assert!(built_up < 0.0);

        // Nose gear leaves the ground for 3 seconds
        e.nw_on_ground = false;
        let mut last_moment = 0.0;
        for _ in 0..60 {
            let out = ctrl.push_at_speed(&input(-1.11), &e);
            assert!(out.safety_moment_nm <= last_moment);
            assert!(ctrl.tug_weight_force_n() <= tug_weight_n + 1e-6);
            assert!(out.force_n.abs() <= 350_000.0);
            last_moment = out.safety_moment_nm;
        }

        // The tug's full weight is applied nose down and the push has been bled off
        assert!((ctrl.tug_weight_force_n() - tug_weight_n).abs() < 1e-6);
        assert!((last_moment + tug_weight_n * 15.0).abs() < 1e-3);
        assert!(ctrl.last_force_n().abs() < built_up.abs());

        // Contact restored
        e.nw_on_ground = true;
        let out = ctrl.push_at_speed(&input(-1.11), &e);
        assert_eq!(ctrl.tug_weight_force_n(), 0.0);
        assert_eq!(out.safety_moment_nm, 0.0);
    }

    #[test]
    fn test_engine_sound() {
        let mut ctrl = PushCtrl::new(Params::default());
        let mut e = env(70_000.0);
        e.spd_ms = -1.0;

        // Pushing in the direction of travel
        let out = ctrl.push_at_speed(&input(-1.11), &e);
        let snd = out.engine_snd.unwrap();
        assert!(snd > 0.0 && snd <= 1.0);

        // No sound requested
        let mut i = input(-1.11);
        i.sound = false;
        assert_eq!(ctrl.push_at_speed(&i, &e).engine_snd, None);

        // Braking against the motion
        let mut ctrl = PushCtrl::new(Params::default());
        let out = ctrl.push_at_speed(&input(1.0), &e);
        assert_eq!(out.engine_snd, Some(0.0));
    }
}
