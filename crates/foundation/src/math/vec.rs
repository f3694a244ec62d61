#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn as_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Uniform scale.
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::Vec3;

    #[test]
    fn vec3_scaling() {
        let a = Vec3::new(1.0, -2.0, 4.0);
        assert_eq!(a.scale(0.5), Vec3::new(0.5, -1.0, 2.0));
        assert_eq!(Vec3::from_array(a.as_array()), a);
        assert_eq!(Vec3::ZERO, Vec3::default());
    }

    #[test]
    fn finiteness_checks_every_axis() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(1.0, f64::NAN, 3.0).is_finite());
        assert!(!Vec3::new(1.0, 2.0, f64::INFINITY).is_finite());
    }
}
