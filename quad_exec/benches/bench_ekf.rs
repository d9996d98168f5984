//! # EKF Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nalgebra::Vector2;
use quad_lib::{
    kin_sim::{fly_course, KinSim, SimParams},
    loc::{predict_measurement, EkfLoc, LocParams},
    markers::MarkerRegistry,
    quad_ctrl::QuadCtrl,
    telem::NullSink,
    traj_ctrl,
};

fn ekf_benchmark(c: &mut Criterion) {
    let vel = Vector2::new(1.0, 0.2);
    let marker = Vector2::new(3.8, 0.0);

    c.bench_function("EkfLoc::predict", |b| {
        let mut loc = EkfLoc::new(LocParams::default());
        b.iter(|| loc.predict(black_box(0.005), black_box(&vel), black_box(0.1)))
    });

    c.bench_function("EkfLoc::correct", |b| {
        let mut loc = EkfLoc::new(LocParams::default());
        let z = predict_measurement(loc.state(), &marker, 0.0) + nalgebra::Vector3::new(0.01, -0.01, 0.0);
        b.iter(|| {
            loc.correct(
                black_box(&marker),
                0.0,
                black_box(&Vector2::new(z[0], z[1])),
                z[2],
            )
            .unwrap()
        })
    });

    c.bench_function("fly_course", |b| {
        b.iter(|| {
            let mut ctrl = QuadCtrl::new(
                LocParams::default(),
                &traj_ctrl::Params::default(),
                MarkerRegistry::default_course(),
                Box::new(NullSink),
            );
            let mut sim = KinSim::new(SimParams::default());
            fly_course(&mut ctrl, &mut sim, 120.0).unwrap()
        })
    });
}

criterion_group!(benches, ekf_benchmark);
criterion_main!(benches);
