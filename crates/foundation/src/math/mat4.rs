use super::Vec3;

/// 4x4 matrix in column-major order, the layout GL uniforms and the host
/// renderer use.
///
/// Element `(row, col)` lives at index `col * 4 + row`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    cols: [f64; 16],
}

impl Mat4 {
    pub const IDENTITY: Self = Self {
        cols: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    pub const fn from_cols_array(cols: [f64; 16]) -> Self {
        Self { cols }
    }

    pub const fn to_cols_array(&self) -> [f64; 16] {
        self.cols
    }

    /// Narrow to `f32` for uniform upload.
    pub fn to_cols_array_f32(&self) -> [f32; 16] {
        self.cols.map(|v| v as f32)
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col * 4 + row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cols[col * 4 + row] = value;
    }

    /// Non-uniform scale on the diagonal, translation in the last column.
    pub fn from_scale_translation(scale: Vec3, translation: Vec3) -> Self {
        Self::from_cols_array([
            scale.x,
            0.0,
            0.0,
            0.0,
            0.0,
            scale.y,
            0.0,
            0.0,
            0.0,
            0.0,
            scale.z,
            0.0,
            translation.x,
            translation.y,
            translation.z,
            1.0,
        ])
    }

    /// GL-style orthographic projection (clip z in `[-1, 1]`).
    pub fn orthographic(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> Self {
        let rl = right - left;
        let tb = top - bottom;
        let fnr = far - near;
        Self::from_cols_array([
            2.0 / rl,
            0.0,
            0.0,
            0.0,
            0.0,
            2.0 / tb,
            0.0,
            0.0,
            0.0,
            0.0,
            -2.0 / fnr,
            0.0,
            -(right + left) / rl,
            -(top + bottom) / tb,
            -(far + near) / fnr,
            1.0,
        ])
    }

    pub fn mul_vec4(&self, v: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        for (row, slot) in out.iter_mut().enumerate() {
            *slot = (0..4).map(|col| self.get(row, col) * v[col]).sum();
        }
        out
    }

    /// Transform a point and apply the perspective divide.
    ///
    /// Returns `None` when the point lies on or behind the camera plane
    /// (`w <= 0`) or the result is not finite.
    pub fn project_point(&self, p: Vec3) -> Option<Vec3> {
        let [x, y, z, w] = self.mul_vec4([p.x, p.y, p.z, 1.0]);
        if w.is_nan() || w <= 0.0 {
            return None;
        }
        let out = Vec3::new(x / w, y / w, z / w);
        out.is_finite().then_some(out)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::Mat4;
    use crate::math::Vec3;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn translation_lives_in_last_column() {
        let m = Mat4::from_scale_translation(Vec3::new(2.0, 3.0, 4.0), Vec3::new(10.0, 20.0, 30.0));
        let cols = m.to_cols_array();
        assert_eq!(&cols[12..15], &[10.0, 20.0, 30.0]);
        assert_eq!(m.get(0, 0), 2.0);
        assert_eq!(m.get(1, 1), 3.0);
        assert_eq!(m.get(2, 2), 4.0);
        assert_eq!(m.get(0, 3), 10.0);

        let p = m.mul_vec4([1.0, 1.0, 1.0, 1.0]);
        assert_eq!(p, [12.0, 23.0, 34.0, 1.0]);
    }

    #[test]
    fn identity_is_the_default() {
        assert_eq!(Mat4::default(), Mat4::IDENTITY);
        let p = Mat4::default().project_point(Vec3::new(3.0, -4.0, 5.0)).expect("finite");
        assert_eq!(p, Vec3::new(3.0, -4.0, 5.0));
    }

    #[test]
    fn project_point_divides_by_w() {
        let mut m = Mat4::IDENTITY;
        m.set(3, 3, 2.0);
        let p = m.project_point(Vec3::new(4.0, -2.0, 1.0)).expect("in front");
        assert_eq!(p, Vec3::new(2.0, -1.0, 0.5));
    }

    #[test]
    fn project_point_rejects_points_behind_camera() {
        let mut m = Mat4::IDENTITY;
        m.set(3, 3, 0.0);
        assert!(m.project_point(Vec3::new(1.0, 1.0, 1.0)).is_none());

        m.set(3, 3, -1.0);
        assert!(m.project_point(Vec3::new(1.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn orthographic_maps_box_to_unit_cube() {
        let m = Mat4::orthographic(100.0, 200.0, 300.0, 250.0, -1.0, 1.0);
        let lo = m.project_point(Vec3::new(100.0, 300.0, 0.0)).expect("lo");
        let hi = m.project_point(Vec3::new(200.0, 250.0, 0.0)).expect("hi");
        let mid = m.project_point(Vec3::new(150.0, 275.0, 0.0)).expect("mid");
        assert_close(lo.x, -1.0, 1e-12);
        assert_close(lo.y, -1.0, 1e-12);
        assert_close(hi.x, 1.0, 1e-12);
        assert_close(hi.y, 1.0, 1e-12);
        assert_close(mid.x, 0.0, 1e-12);
        assert_close(mid.y, 0.0, 1e-12);
    }

    #[test]
    fn f32_narrowing_keeps_layout() {
        let m = Mat4::from_scale_translation(Vec3::new(1.5, 1.0, 1.0), Vec3::new(0.0, 0.0, 7.0));
        let f = m.to_cols_array_f32();
        assert_eq!(f[0], 1.5);
        assert_eq!(f[14], 7.0);
        assert_eq!(f[15], 1.0);
    }
}
