//! Pixel ↔ point conversion. One converter is calibrated per section and then
//! used for every coordinate of that section.

pub const PX_PER_INCH: f32 = 96.0;
pub const PT_PER_INCH: f32 = 72.0;
pub const PT_PER_MM: f32 = 72.0 / 25.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitConverter {
    pt_per_px: f32,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::natural()
    }
}

impl UnitConverter {
    /// CSS reference pixel: 96px to the inch.
    pub fn natural() -> Self {
        Self {
            pt_per_px: PT_PER_INCH / PX_PER_INCH,
        }
    }

    /// Scale so that `source_px` device pixels exactly span `target_pt` points.
    /// Degenerate inputs fall back to the natural ratio.
    pub fn fit(source_px: f32, target_pt: f32) -> Self {
        if source_px > 0.0 && target_pt > 0.0 && source_px.is_finite() && target_pt.is_finite() {
            Self {
                pt_per_px: target_pt / source_px,
            }
        } else {
            Self::natural()
        }
    }

    pub fn pt_per_px(&self) -> f32 {
        self.pt_per_px
    }

    pub fn to_pt(&self, px: f32) -> f32 {
        px * self.pt_per_px
    }

    pub fn to_px(&self, pt: f32) -> f32 {
        pt / self.pt_per_px
    }
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * PT_PER_MM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn natural_ratio_is_three_quarters() {
        let u = UnitConverter::natural();
        assert!((u.to_pt(96.0) - 72.0).abs() < 1e-4);
        assert!((u.to_px(72.0) - 96.0).abs() < 1e-4);
    }

    #[test]
    fn fit_maps_source_onto_target() {
        let u = UnitConverter::fit(800.0, 515.0);
        assert!((u.to_pt(800.0) - 515.0).abs() < 1e-3);
        assert!((u.to_px(u.to_pt(123.0)) - 123.0).abs() < 1e-3);
    }

    #[test]
    fn fit_rejects_zero_width() {
        assert_eq!(UnitConverter::fit(0.0, 500.0), UnitConverter::natural());
    }

    #[test]
    fn a4_width_in_points() {
        assert!((mm_to_pt(210.0) - 595.28).abs() < 0.01);
    }
}
