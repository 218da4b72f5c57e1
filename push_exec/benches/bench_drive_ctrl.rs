//! # Drive Control Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use nalgebra::Vector2;
use push_lib::{
    drive_ctrl::{DriveCtrl, Params},
    loc::Pose,
    path::{plan_to_point, SegQueue},
    veh::VehProfile,
};

fn drive_ctrl_benchmark(c: &mut Criterion) {
    // Narrowbody profile, steering about its main gear
    let veh = VehProfile {
        wheelbase_m: 20.0,
        max_steer_deg: 70.0,
        max_fwd_spd_ms: 4.0,
        max_rev_spd_ms: 1.11,
        max_fwd_ang_vel_dps: 6.0,
        max_rev_ang_vel_dps: 4.0,
        max_centr_accel_mss: 0.1,
        max_accel_mss: 0.25,
        max_decel_mss: 0.17,
        use_rear_pos: true,
        fixed_axle_fwd_m: -5.0,
    };

    // Back out of the stand to the west, finishing facing east
    let route: SegQueue = plan_to_point(
        Vector2::new(0.0, -5.0),
        0.0,
        Vector2::new(-60.0, -45.0),
        90.0,
        30.0,
    )
    .unwrap()
    .into();

    let pose = Pose::new(Vector2::new(0.3, -2.0), 2.0, -1.0);

    c.bench_function("DriveCtrl::drive_segs", |b| {
        let mut ctrl = DriveCtrl::new(Params::default());
        b.iter(|| {
            let mut segs = route.clone();
            ctrl.drive_segs(&pose, &veh, &mut segs, 0.05)
        })
    });

    c.bench_function("path::plan_to_point", |b| {
        b.iter(|| {
            plan_to_point(
                Vector2::new(0.0, -5.0),
                0.0,
                Vector2::new(-60.0, -45.0),
                90.0,
                30.0,
            )
        })
    });
}

criterion_group!(benches, drive_ctrl_benchmark);
criterion_main!(benches);
