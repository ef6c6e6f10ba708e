//! Transit geometry: a supersampled projection of the stellar disk and of
//! the planetary ray paths through it.
//!
//! The grid spans the stellar disk in coordinates of stellar radii. Each
//! pixel is subdivided `supersampling²` times to soften the discretization
//! error of pixelating circular disks; cost grows with the square of the
//! supersampling factor.

use crate::error::ModelError;

use ndarray::Array2;

/// Per-phase projected maps plus the continuum (opaque-disk) transit depth.
#[derive(Clone, Debug)]
pub struct TransitGeometry {
    /// Occulted stellar flux map, normalized so the unocculted disk sums
    /// to 1. Its sum equals `1 - continuum_depth`.
    pub flux_map: Array2<f64>,
    /// Column-density basis: projected distance of each pixel's ray from
    /// the planet center [m]. Radiative transfer integrates the radial
    /// number-density profile along each such ray.
    pub ray_radii: Array2<f64>,
    /// Fraction of stellar flux blocked by the opaque planetary disk.
    pub continuum_depth: f64,
}

/// Planet center in stellar-radius coordinates at a given orbital phase.
///
/// Phase ±0.5 corresponds to first/fourth contact (disks externally
/// tangent), phase 0 to mid-transit.
fn planet_center(phase: f64, radius_ratio: f64, impact_parameter: f64) -> (f64, f64) {
    let reach = ((1.0 + radius_ratio).powi(2) - impact_parameter.powi(2)).sqrt();
    (2.0 * phase * reach, impact_parameter)
}

/// Build the per-phase transit geometry. Deterministic: identical inputs
/// always produce identical maps.
pub fn build_transit_geometry(
    phase: f64,
    radius_ratio: f64,
    impact_parameter: f64,
    planet_radius_m: f64,
    grid_size: usize,
    supersampling: usize,
) -> Result<TransitGeometry, ModelError> {
    if !(0.0..1.0).contains(&radius_ratio) || radius_ratio == 0.0 {
        return Err(ModelError::InvalidGeometry(format!(
            "radius ratio {radius_ratio} outside (0, 1)"
        )));
    }
    if !(-0.5..=0.5).contains(&phase) {
        return Err(ModelError::InvalidGeometry(format!(
            "orbital phase {phase} outside [-0.5, 0.5]"
        )));
    }
    if impact_parameter.abs() >= 1.0 + radius_ratio {
        return Err(ModelError::InvalidGeometry(format!(
            "impact parameter {impact_parameter} never intersects the stellar disk"
        )));
    }
    if supersampling == 0 || grid_size < supersampling {
        return Err(ModelError::InvalidGeometry(format!(
            "grid size {grid_size} must be at least the supersampling factor {supersampling}"
        )));
    }
    if !(planet_radius_m > 0.0) {
        return Err(ModelError::InvalidGeometry(
            "planetary radius must be positive".into(),
        ));
    }

    let (x_planet, y_planet) = planet_center(phase, radius_ratio, impact_parameter);
    let stellar_radius_m = planet_radius_m / radius_ratio;
    let pixel = 2.0 / grid_size as f64;
    let sub = pixel / supersampling as f64;
    let ratio_sq = radius_ratio * radius_ratio;

    let mut flux_map = Array2::<f64>::zeros((grid_size, grid_size));
    let mut ray_radii = Array2::<f64>::zeros((grid_size, grid_size));
    let mut stellar_total = 0.0_f64;
    let mut blocked_total = 0.0_f64;

    for row in 0..grid_size {
        let y0 = -1.0 + row as f64 * pixel;
        for col in 0..grid_size {
            let x0 = -1.0 + col as f64 * pixel;

            let x_center = x0 + 0.5 * pixel;
            let y_center = y0 + 0.5 * pixel;
            let dx = x_center - x_planet;
            let dy = y_center - y_planet;
            ray_radii[[row, col]] = (dx * dx + dy * dy).sqrt() * stellar_radius_m;

            let mut stellar = 0_u32;
            let mut blocked = 0_u32;
            for sub_row in 0..supersampling {
                let y = y0 + (sub_row as f64 + 0.5) * sub;
                for sub_col in 0..supersampling {
                    let x = x0 + (sub_col as f64 + 0.5) * sub;
                    if x * x + y * y > 1.0 {
                        continue;
                    }
                    stellar += 1;
                    let px = x - x_planet;
                    let py = y - y_planet;
                    if px * px + py * py <= ratio_sq {
                        blocked += 1;
                    }
                }
            }
            stellar_total += f64::from(stellar);
            blocked_total += f64::from(blocked);
            flux_map[[row, col]] = f64::from(stellar - blocked);
        }
    }

    if stellar_total == 0.0 {
        return Err(ModelError::InvalidGeometry(
            "stellar disk does not intersect the pixel grid".into(),
        ));
    }

    flux_map /= stellar_total;
    Ok(TransitGeometry {
        flux_map,
        ray_radii,
        continuum_depth: blocked_total / stellar_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    const PLANET_RADIUS: f64 = 9.4e7;

    #[test]
    fn mid_transit_depth_converges_with_supersampling() {
        let ratio = 0.2;
        let exact = ratio * ratio;
        let depth = |supersampling| {
            build_transit_geometry(0.0, ratio, 0.0, PLANET_RADIUS, 101, supersampling)
                .unwrap()
                .continuum_depth
        };
        let coarse = depth(1);
        let fine = depth(10);
        let finest = depth(50);
        assert_abs_diff_eq!(coarse, exact, epsilon = 0.15 * exact);
        assert_abs_diff_eq!(fine, exact, epsilon = 0.03 * exact);
        assert_abs_diff_eq!(finest, exact, epsilon = 0.01 * exact);
        // coarse pixelation deviates at least as much as the converged grid
        assert!((finest - exact).abs() <= (coarse - exact).abs() + 5e-4);
    }

    #[test]
    fn flux_map_sum_complements_depth() {
        let geometry =
            build_transit_geometry(0.1, 0.15, 0.3, PLANET_RADIUS, 60, 4).unwrap();
        assert_abs_diff_eq!(
            geometry.flux_map.sum(),
            1.0 - geometry.continuum_depth,
            epsilon = 1e-12
        );
        assert!(geometry.continuum_depth > 0.0);
    }

    #[test]
    fn contact_phase_geometry_is_not_degenerate() {
        // fourth contact: disks externally tangent, zero overlap
        let geometry = build_transit_geometry(0.5, 0.1, 0.0, PLANET_RADIUS, 80, 4).unwrap();
        assert!(geometry.continuum_depth < 1e-3);
        assert_abs_diff_eq!(geometry.flux_map.sum(), 1.0, epsilon = 1e-3);
        assert!(geometry.ray_radii.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn geometry_is_deterministic() {
        let a = build_transit_geometry(0.2, 0.12, 0.4, PLANET_RADIUS, 50, 5).unwrap();
        let b = build_transit_geometry(0.2, 0.12, 0.4, PLANET_RADIUS, 50, 5).unwrap();
        assert_eq!(a.flux_map, b.flux_map);
        assert_eq!(a.ray_radii, b.ray_radii);
        assert_eq!(a.continuum_depth, b.continuum_depth);
    }

    #[test]
    fn ray_radii_vanish_under_the_planet() {
        let geometry = build_transit_geometry(0.0, 0.2, 0.0, PLANET_RADIUS, 101, 1).unwrap();
        // mid-transit with b = 0: the central pixel's ray passes through the
        // planet center
        let center = geometry.ray_radii[[50, 50]];
        assert!(center < 0.05 * PLANET_RADIUS, "central ray radius {center}");
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let build = |phase, ratio, b, grid, sup| {
            build_transit_geometry(phase, ratio, b, PLANET_RADIUS, grid, sup)
        };
        assert!(build(0.6, 0.1, 0.0, 50, 5).is_err());
        assert!(build(0.0, 1.2, 0.0, 50, 5).is_err());
        assert!(build(0.0, 0.1, 1.2, 50, 5).is_err());
        assert!(build(0.0, 0.1, 0.0, 4, 5).is_err());
        assert!(build(0.0, 0.1, 0.0, 50, 0).is_err());
    }
}
