//! Post-step time correction for optical photons.
//!
//! The engine can report a first-step `delta_time` for optical photons
//! (PDG code 0) that disagrees with the velocity it reports for the track.
//! When the two velocities differ by more than the tolerance, the post-step
//! time is rebuilt from the reported velocity:
//!
//! ```text
//! t_post' = t_post - delta_time + step_length / velocity
//! ```

use lineage_env::StepInfo;

/// PDG code the engine uses for optical photons.
pub const OPTICAL_PHOTON_PDG: i32 = 0;

/// Post-step global time (engine units), corrected when needed.
pub fn corrected_post_step_time(step: &StepInfo, tolerance: f64) -> f64 {
    let global_time = step.post.global_time;
    if step.pdg_code != OPTICAL_PHOTON_PDG || step.velocity <= 0.0 {
        return global_time;
    }

    let step_velocity = step.step_length / step.delta_time;
    if (step.velocity - step_velocity).abs() > tolerance {
        global_time - step.delta_time + step.step_length / step.velocity
    } else {
        global_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use lineage_env::StepPoint;
    use nalgebra::Vector3;

    fn step(pdg_code: i32, step_length: f64, delta_time: f64, velocity: f64, post_time: f64) -> StepInfo {
        let point = |t: f64| StepPoint {
            position: Vector3::zeros(),
            global_time: t,
            momentum: Vector3::zeros(),
            total_energy: 0.0,
        };
        StepInfo {
            pre: point(post_time - delta_time),
            post: point(post_time),
            post_process: "Transportation".to_string(),
            step_length,
            delta_time,
            velocity,
            pdg_code,
        }
    }

    #[test]
    fn test_consistent_photon_untouched() {
        // 200 mm/ns over 100 mm is 0.5 ns
        let s = step(OPTICAL_PHOTON_PDG, 100.0, 0.5, 200.0, 10.5);
        assert_eq!(corrected_post_step_time(&s, 1e-4), 10.5);
    }

    #[test]
    fn test_inconsistent_photon_corrected() {
        // Engine claims 2 ns for 100 mm at 200 mm/ns
        let s = step(OPTICAL_PHOTON_PDG, 100.0, 2.0, 200.0, 12.0);
        assert_relative_eq!(corrected_post_step_time(&s, 1e-4), 10.5);
    }

    #[test]
    fn test_massive_particle_untouched() {
        let s = step(13, 100.0, 2.0, 200.0, 12.0);
        assert_eq!(corrected_post_step_time(&s, 1e-4), 12.0);
    }

    #[test]
    fn test_zero_velocity_untouched() {
        let s = step(OPTICAL_PHOTON_PDG, 100.0, 2.0, 0.0, 12.0);
        assert_eq!(corrected_post_step_time(&s, 1e-4), 12.0);
    }
}
