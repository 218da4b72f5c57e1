//! # Tug catalog
//!
//! Descriptions of the tugs available for a push, and selection of the tug for a given body.
//!
//! Offsets in a tug description are longitudinal, in the tug's frame, positive forwards of the
//! tug's origin. The tug faces away from the body while connected, so the cradle and the winch
//! platform sit behind the origin.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use thiserror::Error;

use crate::veh::VehProfile;
use comms_if::net::validate_tug_name;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Description of one tug model.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TugInfo {
    /// Name of the tug, a bare `.tug` file name
    pub name: String,

    pub mass_kg: f64,

    /// Maximum tractive effort
    pub max_te_n: f64,

    /// Kinematic limits of the tug when driving itself
    pub veh: VehProfile,

    /// Rate limit on the tug's own steering
    pub max_steer_rate_dps: f64,

    /// Position of the wall the nose gear tire rests against when lifted
    pub lift_wall_fwd_m: f64,

    pub lift_wall_loc: LiftWallLoc,

    pub lift_type: LiftType,

    /// Height the nose gear is raised by when the lift is fully up
    pub lift_height_m: f64,

    /// Rear edge of the winch platform, winch tugs only
    #[serde(default)]
    pub plat_fwd_m: f64,

    /// Height of the winch platform, winch tugs only
    #[serde(default)]
    pub plat_h_m: f64,

    /// Distance in front of the connected position the tug stops at before backing in
    pub apch_dist_m: f64,

    /// Range of body maximum takeoff masses the tug can handle
    pub min_mtow_kg: f64,
    pub max_mtow_kg: f64,
}

/// All tugs available.
#[derive(Debug, Clone, Deserialize)]
pub struct TugCatalog {
    pub tugs: Vec<TugInfo>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the lift wall sits relative to the nose gear tire when connected.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum LiftWallLoc {
    /// The wall is in front of the tire
    Front,

    /// The wall is at the tire's centre
    Centre,

    /// The wall is behind the tire
    Back,
}

/// How the tug gets hold of the nose gear.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum LiftType {
    /// A cradle closes around the tire and lifts it
    Grab,

    /// The body is winched onto a platform
    Winch,
}

#[derive(Debug, Error, PartialEq)]
pub enum TugError {
    #[error("No tug is able to push a body with an MTOW of {0:.0} kg")]
    NoSuitableTug(f64),

    #[error("Invalid tug name: {0}")]
    InvalidTugName(String),

    #[error("Unknown tug {0}")]
    UnknownTug(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TugInfo {
    /// Longitudinal position of the nose gear's centre when seated on the tug.
    pub fn nw_seat_fwd_m(&self, nw_tire_radius_m: f64) -> f64 {
        match self.lift_wall_loc {
            LiftWallLoc::Front => self.lift_wall_fwd_m - nw_tire_radius_m,
            LiftWallLoc::Centre => self.lift_wall_fwd_m,
            LiftWallLoc::Back => self.lift_wall_fwd_m + nw_tire_radius_m,
        }
    }

    /// Distance from the tug's fixed axle back to the seated nose gear's centre.
    pub fn rear2nw_m(&self, nw_tire_radius_m: f64) -> f64 {
        self.veh.fixed_axle_fwd_m - self.nw_seat_fwd_m(nw_tire_radius_m)
    }

    /// Distance the body is winched to move its nose gear from the platform edge to the seat.
    pub fn winch_dist_m(&self, nw_tire_radius_m: f64) -> f64 {
        (self.nw_seat_fwd_m(nw_tire_radius_m) - self.plat_fwd_m).max(0.0)
    }

    pub fn handles_mtow(&self, mtow_kg: f64) -> bool {
        mtow_kg >= self.min_mtow_kg && mtow_kg <= self.max_mtow_kg
    }
}

impl TugCatalog {
    /// Pick the first tug able to push a body of the given MTOW.
    pub fn select_by_mtow(&self, mtow_kg: f64) -> Result<&TugInfo, TugError> {
        self.tugs
            .iter()
            .find(|t| t.handles_mtow(mtow_kg))
            .ok_or(TugError::NoSuitableTug(mtow_kg))
    }

    /// Find a tug by a name received from another instance.
    ///
    /// The name is validated before the lookup so a malformed name is reported as such rather
    /// than as an unknown tug.
    pub fn by_name(&self, name: &str) -> Result<&TugInfo, TugError> {
        let name = validate_tug_name(name)
            .map_err(|e| TugError::InvalidTugName(e.to_string()))?;

        self.tugs
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| TugError::UnknownTug(name.to_string()))
    }
}

impl Default for TugCatalog {
    /// Built in catalog, a light grab tug and a heavy winch tug.
    fn default() -> Self {
        Self {
            tugs: vec![
                TugInfo {
                    name: "GT35.tug".into(),
                    mass_kg: 12_000.0,
                    max_te_n: 90_000.0,
                    veh: VehProfile {
                        wheelbase_m: 3.2,
                        max_steer_deg: 50.0,
                        max_fwd_spd_ms: 8.0,
                        max_rev_spd_ms: 2.0,
                        max_fwd_ang_vel_dps: 30.0,
                        max_rev_ang_vel_dps: 20.0,
                        max_centr_accel_mss: 1.0,
                        max_accel_mss: 1.0,
                        max_decel_mss: 1.0,
                        use_rear_pos: true,
                        fixed_axle_fwd_m: -1.2,
                    },
                    max_steer_rate_dps: 40.0,
                    lift_wall_fwd_m: -2.6,
                    lift_wall_loc: LiftWallLoc::Front,
                    lift_type: LiftType::Grab,
                    lift_height_m: 0.3,
                    plat_fwd_m: 0.0,
                    plat_h_m: 0.0,
                    apch_dist_m: 5.0,
                    min_mtow_kg: 0.0,
                    max_mtow_kg: 120_000.0,
                },
                TugInfo {
                    name: "WT100.tug".into(),
                    mass_kg: 30_000.0,
                    max_te_n: 250_000.0,
                    veh: VehProfile {
                        wheelbase_m: 4.5,
                        max_steer_deg: 45.0,
                        max_fwd_spd_ms: 8.0,
                        max_rev_spd_ms: 2.0,
                        max_fwd_ang_vel_dps: 20.0,
                        max_rev_ang_vel_dps: 15.0,
                        max_centr_accel_mss: 1.0,
                        max_accel_mss: 0.8,
                        max_decel_mss: 0.8,
                        use_rear_pos: true,
                        fixed_axle_fwd_m: -1.8,
                    },
                    max_steer_rate_dps: 30.0,
                    lift_wall_fwd_m: -2.4,
                    lift_wall_loc: LiftWallLoc::Back,
                    lift_type: LiftType::Winch,
                    lift_height_m: 0.45,
                    plat_fwd_m: -4.2,
                    plat_h_m: 0.45,
                    apch_dist_m: 6.0,
                    min_mtow_kg: 120_000.0,
                    max_mtow_kg: 600_000.0,
                },
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_select_by_mtow() {
        let cat = TugCatalog::default();

        assert_eq!(cat.select_by_mtow(78_000.0).unwrap().name, "GT35.tug");
        assert_eq!(cat.select_by_mtow(350_000.0).unwrap().name, "WT100.tug");
        assert_eq!(
            cat.select_by_mtow(900_000.0),
            Err(TugError::NoSuitableTug(900_000.0))
        );
    }

    #[test]
    fn test_catalog_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../params/tugs.toml");
        let cat: TugCatalog = util::params::load_from(path).unwrap();

        assert_eq!(cat.tugs, TugCatalog::default().tugs);
    }

    #[test]
    fn test_by_name() {
        let cat = TugCatalog::default();

        assert_eq!(cat.by_name("WT100.tug").unwrap().lift_type, LiftType::Winch);
        assert_eq!(
            cat.by_name("GT110.tug"),
            Err(TugError::UnknownTug("GT110.tug".into()))
        );
        assert!(matches!(
            cat.by_name("../GT35.tug"),
            Err(TugError::InvalidTugName(_))
        ));
        assert!(matches!(cat.by_name("GT35"), Err(TugError::InvalidTugName(_))));
    }

    #[test]
    fn test_seat_offsets() {
        let cat = TugCatalog::default();
        let grab = cat.by_name("GT35.tug").unwrap();
        let winch = cat.by_name("WT100.tug").unwrap();

        // Wall in front of a 0.5 m tire puts the tire centre 0.5 m further back
        assert!((grab.nw_seat_fwd_m(0.5) + 3.1).abs() < 1e-9);
        assert!((grab.rear2nw_m(0.5) - 1.9).abs() < 1e-9);

        assert!((winch.nw_seat_fwd_m(0.5) + 1.9).abs() < 1e-9);
        assert!((winch.winch_dist_m(0.5) - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_catalog_from_toml() {
        let toml_str = r#"
            [[tugs]]
            name = "GT35.tug"
            mass_kg = 12000.0
            max_te_n = 90000.0
            max_steer_rate_dps = 40.0
            lift_wall_fwd_m = -2.6
            lift_wall_loc = "Centre"
            lift_type = "Grab"
            lift_height_m = 0.3
            apch_dist_m = 5.0
            min_mtow_kg = 0.0
            max_mtow_kg = 120000.0

            [tugs.veh]
            wheelbase_m = 3.2
            max_steer_deg = 50.0
            max_fwd_spd_ms = 8.0
            max_rev_spd_ms = 2.0
            max_fwd_ang_vel_dps = 30.0
            max_rev_ang_vel_dps = 20.0
            max_centr_accel_mss = 1.0
            max_accel_mss = 1.0
            max_decel_mss = 1.0
            use_rear_pos = true
            fixed_axle_fwd_m = -1.2
        "#;

        let cat: TugCatalog = util::params::from_str(toml_str).unwrap();
        assert_eq!(cat.tugs.len(), 1);
        assert_eq!(cat.tugs[0].lift_wall_loc, LiftWallLoc::Centre);
        assert_eq!(cat.tugs[0].plat_fwd_m, 0.0);
    }
}
