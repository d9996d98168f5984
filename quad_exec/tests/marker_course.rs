//! Closed loop tests flying the marker course on the kinematic simulation.

use approx::assert_relative_eq;
use nalgebra::Vector2;

use quad_lib::{
    kin_sim::{fly_course, KinSim, SimParams},
    loc::{CovUpdate, LocParams},
    markers::MarkerRegistry,
    quad_ctrl::QuadCtrl,
    telem::NullSink,
    traj_ctrl,
};

fn default_ctrl(loc_params: LocParams) -> QuadCtrl {
    QuadCtrl::new(
        loc_params,
        &traj_ctrl::Params::default(),
        MarkerRegistry::default_course(),
        Box::new(NullSink),
    )
}

#[test]
fn test_course_perfect_odometry() {
    let mut ctrl = default_ctrl(LocParams::default());
    let mut sim = KinSim::new(SimParams::default());

    let summary = fly_course(&mut ctrl, &mut sim, 120.0).unwrap();

    assert!(summary.finish_time_s.is_some());
    assert_eq!(ctrl.report().target_index, 12);
    assert!(summary.num_sightings > 0);
    assert!(summary.max_pos_error_m < 1e-6);

    // Ends up within reach of the final marker
    let final_pos = Vector2::new(summary.final_pose[0], summary.final_pose[1]);
    assert!((final_pos - Vector2::new(6.0, 11.5)).norm() < 1.2);
}

#[test]
fn test_course_odometry_scale_error() {
    let mut ctrl = default_ctrl(LocParams::default());
    let mut sim = KinSim::new(SimParams {
        odom_scale: 1.05,
        ..Default::default()
    });

    let summary = fly_course(&mut ctrl, &mut sim, 120.0).unwrap();

    assert!(summary.finish_time_s.is_some());

    // Marker sightings keep the drift bounded
    assert!(summary.max_pos_error_m < 0.5, "max error {}", summary.max_pos_error_m);
    assert_relative_eq!(
        Vector2::new(summary.final_estimate[0], summary.final_estimate[1]),
        Vector2::new(summary.final_pose[0], summary.final_pose[1]),
        epsilon = 0.1
    );
}

#[test]
fn test_course_joseph_form() {
    let mut ctrl = default_ctrl(LocParams {
        cov_update: CovUpdate::Joseph,
        ..Default::default()
    });
    let mut sim = KinSim::new(SimParams {
        odom_scale: 0.97,
        ..Default::default()
    });

    let summary = fly_course(&mut ctrl, &mut sim, 120.0).unwrap();
    assert!(summary.finish_time_s.is_some());

    // Covariance stays symmetric with positive variances
    let cov = ctrl.loc().cov();
    assert_relative_eq!(*cov, cov.transpose(), epsilon = 1e-12);
    assert!((0..3).all(|i| cov[(i, i)] > 0.0));
}
