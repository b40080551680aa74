//! Perspective transform between quadrilaterals.
//!
//! Built by composing two quad-to-unit-square maps (Heckbert's
//! formulation), so skewed and keystoned symbols sample correctly.

/// 3x3 projective transform.
pub struct PerspectiveTransform {
    a11: f32,
    a21: f32,
    a31: f32,
    a12: f32,
    a22: f32,
    a32: f32,
    a13: f32,
    a23: f32,
    a33: f32,
}

impl PerspectiveTransform {
    #[allow(clippy::too_many_arguments)]
    fn new(
        a11: f32,
        a21: f32,
        a31: f32,
        a12: f32,
        a22: f32,
        a32: f32,
        a13: f32,
        a23: f32,
        a33: f32,
    ) -> Self {
        Self {
            a11,
            a21,
            a31,
            a12,
            a22,
            a32,
            a13,
            a23,
            a33,
        }
    }

    /// Transform mapping one quadrilateral onto another. Corners pair up in
    /// the order given.
    #[allow(clippy::too_many_arguments)]
    pub fn quadrilateral_to_quadrilateral(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
        x0p: f32,
        y0p: f32,
        x1p: f32,
        y1p: f32,
        x2p: f32,
        y2p: f32,
        x3p: f32,
        y3p: f32,
    ) -> Self {
        let q_to_s = Self::quadrilateral_to_square(x0, y0, x1, y1, x2, y2, x3, y3);
        let s_to_q = Self::square_to_quadrilateral(x0p, y0p, x1p, y1p, x2p, y2p, x3p, y3p);
        s_to_q.times(&q_to_s)
    }

    /// Map the unit square (0,0)-(1,0)-(1,1)-(0,1) onto the quadrilateral.
    #[allow(clippy::too_many_arguments)]
    pub fn square_to_quadrilateral(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Self {
        let dx3 = x0 - x1 + x2 - x3;
        let dy3 = y0 - y1 + y2 - y3;
        if dx3 == 0.0 && dy3 == 0.0 {
            // Affine case: the quadrilateral is a parallelogram.
            Self::new(x1 - x0, x2 - x1, x0, y1 - y0, y2 - y1, y0, 0.0, 0.0, 1.0)
        } else {
            let dx1 = x1 - x2;
            let dx2 = x3 - x2;
            let dy1 = y1 - y2;
            let dy2 = y3 - y2;
            let denominator = dx1 * dy2 - dx2 * dy1;
            let a13 = (dx3 * dy2 - dx2 * dy3) / denominator;
            let a23 = (dx1 * dy3 - dx3 * dy1) / denominator;
            Self::new(
                x1 - x0 + a13 * x1,
                x3 - x0 + a23 * x3,
                x0,
                y1 - y0 + a13 * y1,
                y3 - y0 + a23 * y3,
                y0,
                a13,
                a23,
                1.0,
            )
        }
    }

    /// Map the quadrilateral onto the unit square (the adjugate of the
    /// opposite map; a scalar factor cancels in the projective division).
    #[allow(clippy::too_many_arguments)]
    pub fn quadrilateral_to_square(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Self {
        Self::square_to_quadrilateral(x0, y0, x1, y1, x2, y2, x3, y3).build_adjoint()
    }

    fn build_adjoint(&self) -> Self {
        Self::new(
            self.a22 * self.a33 - self.a23 * self.a32,
            self.a23 * self.a31 - self.a21 * self.a33,
            self.a21 * self.a32 - self.a22 * self.a31,
            self.a13 * self.a32 - self.a12 * self.a33,
            self.a11 * self.a33 - self.a13 * self.a31,
            self.a12 * self.a31 - self.a11 * self.a32,
            self.a12 * self.a23 - self.a13 * self.a22,
            self.a13 * self.a21 - self.a11 * self.a23,
            self.a11 * self.a22 - self.a12 * self.a21,
        )
    }

    fn times(&self, other: &Self) -> Self {
        Self::new(
            self.a11 * other.a11 + self.a21 * other.a12 + self.a31 * other.a13,
            self.a11 * other.a21 + self.a21 * other.a22 + self.a31 * other.a23,
            self.a11 * other.a31 + self.a21 * other.a32 + self.a31 * other.a33,
            self.a12 * other.a11 + self.a22 * other.a12 + self.a32 * other.a13,
            self.a12 * other.a21 + self.a22 * other.a22 + self.a32 * other.a23,
            self.a12 * other.a31 + self.a22 * other.a32 + self.a32 * other.a33,
            self.a13 * other.a11 + self.a23 * other.a12 + self.a33 * other.a13,
            self.a13 * other.a21 + self.a23 * other.a22 + self.a33 * other.a23,
            self.a13 * other.a31 + self.a23 * other.a32 + self.a33 * other.a33,
        )
    }

    /// Transform interleaved (x, y) pairs in place.
    pub fn transform_points(&self, points: &mut [f32]) {
        let max = points.len() & !1;
        for i in (0..max).step_by(2) {
            let x = points[i];
            let y = points[i + 1];
            let denominator = self.a13 * x + self.a23 * y + self.a33;
            points[i] = (self.a11 * x + self.a21 * y + self.a31) / denominator;
            points[i + 1] = (self.a12 * x + self.a22 * y + self.a32) / denominator;
        }
    }
}
