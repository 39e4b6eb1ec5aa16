// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// Color type for visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    /// Red color.
    pub const RED: Color = Color(255, 0, 0);
    /// White color.
    pub const WHITE: Color = Color(255, 255, 255);

    /// Create a new color from RGB values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Convert HSV components in `0.0..=1.0` to RGB.
    #[must_use]
    pub fn from_hsv(h: f64, s: f64, v: f64) -> Self {
        let (r, g, b) = hsv_to_rgb(h, s, v);
        Self(to_channel(r), to_channel(g), to_channel(b))
    }

    /// Convert to an `image` RGB pixel.
    #[must_use]
    pub const fn to_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.0, self.1, self.2])
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(unit: f64) -> u8 {
    (unit * 255.0).clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (f64, f64, f64) {
    if s == 0.0 {
        return (v, v, v);
    }
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (sector as i64).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Deterministic color for keypoint `index` in a schema of `total` keypoints.
///
/// Hues run from 0° to 200° across the schema. A schema with at most one
/// keypoint always gets red.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn keypoint_color(index: usize, total: usize) -> Color {
    if total <= 1 {
        return Color::RED;
    }
    let position = index as f64 / (total - 1) as f64;
    Color::from_hsv(position * 200.0 / 360.0, 0.85, 0.95)
}

/// Line color for a connection between two keypoint colors.
#[must_use]
pub fn blend(a: Color, b: Color) -> Color {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let mix = |x: u8, y: u8| ((f64::from(x) + f64::from(y)) / 1.5).min(255.0) as u8;
    Color(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_keypoint_is_red() {
        assert_eq!(keypoint_color(0, 1), Color::RED);
        assert_eq!(keypoint_color(0, 0), Color::RED);
    }

    #[test]
    fn test_gradient_endpoints() {
        // hue 0: pure red at S=0.85, V=0.95
        assert_eq!(keypoint_color(0, 5), Color(242, 36, 36));
        // hue 200°: blue-cyan
        let last = keypoint_color(4, 5);
        assert!(last.2 > last.1 && last.1 > last.0);
        assert_eq!(keypoint_color(2, 5), keypoint_color(2, 5));
    }

    #[test]
    fn test_blend_saturates() {
        assert_eq!(blend(Color(255, 0, 30), Color(255, 0, 30)), Color(255, 0, 40));
        assert_eq!(blend(Color(90, 60, 3), Color(60, 0, 0)), Color(100, 40, 2));
    }
}
