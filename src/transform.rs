use macroquad::math::{vec2, Affine2};

/// Ground-plane shadow matrix `[1, 0, shear_x, scale_y, 0, 0]` in canvas
/// order (`x' = x + shear_x·y`, `y' = scale_y·y`). Rows at local `y = 0` are
/// fixed points.
pub fn shear(shear_x: f32, scale_y: f32) -> Affine2 {
    Affine2::from_cols_array(&[1.0, 0.0, shear_x, scale_y, 0.0, 0.0])
}

pub fn translate(x: f32, y: f32) -> Affine2 {
    Affine2::from_translation(vec2(x, y))
}

/// None when the matrix collapses the plane (e.g. `scale_y == 0`).
pub fn checked_inverse(m: &Affine2) -> Option<Affine2> {
    let det = m.matrix2.determinant();
    if det.abs() <= f32::EPSILON || !det.is_finite() {
        return None;
    }
    Some(m.inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::math::Vec2;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn pivot_row_is_fixed_under_any_shear() {
        for shear_x in [-1.3, -0.8, 0.0, 0.4, 1.2] {
            for scale_y in [0.25, 0.4, 0.7, 1.0] {
                let m = shear(shear_x, scale_y);
                for x in [-64.0, -1.0, 0.0, 3.5, 100.0] {
                    assert_eq!(m.transform_point2(vec2(x, 0.0)), vec2(x, 0.0));
                }
            }
        }
    }

    #[test]
    fn points_above_pivot_are_sheared_and_flattened() {
        let p = shear(0.8, 0.4).transform_point2(vec2(0.0, -50.0));
        assert!(close(p, vec2(-40.0, -20.0)));
    }

    #[test]
    fn translated_shear_moves_the_pivot_only() {
        let m = translate(100.0, 200.0) * shear(-1.1, 0.35);
        assert!(close(m.transform_point2(vec2(7.0, -30.0)), vec2(140.0, 189.5)));
        assert!(close(m.transform_point2(vec2(7.0, 0.0)), vec2(107.0, 200.0)));
    }

    #[test]
    fn inverse_round_trips_and_rejects_degenerate() {
        let m = translate(12.0, -4.0) * shear(0.6, 0.5);
        let inv = checked_inverse(&m).unwrap();
        let p = vec2(3.0, 9.0);
        assert!(close(inv.transform_point2(m.transform_point2(p)), p));

        assert!(checked_inverse(&shear(1.0, 0.0)).is_none());
    }
}
