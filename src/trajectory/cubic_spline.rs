// https://github.com/AtsushiSakai/PythonRobotics/tree/master/PathPlanning/CubicSpline
// https://github.com/onlytailei/CppRobotics/blob/master/include/cubic_spline.h
// Natural cubic spline y = f(x) through strictly increasing knots
//
// Author: Atsushi Sakai(@Atsushi_twi)
//         TAI Lei
//         Ryohei Sasaki(@rsasaki0109)

extern crate nalgebra as na;

use itertools::Itertools;

use crate::common::{PlannerError, PlannerResult};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl CubicSpline {
    pub fn new(x: &[f64], y: &[f64]) -> PlannerResult<CubicSpline> {
        if x.len() != y.len() {
            return Err(PlannerError::invalid_parameter(format!(
                "spline needs as many x as y values ({} != {})",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(PlannerError::invalid_parameter("spline needs at least 2 knots"));
        }
        if !x.iter().tuple_windows().all(|(x0, x1)| x1 > x0) {
            return Err(PlannerError::NumericalError(
                "spline knots must be strictly increasing".to_string(),
            ));
        }

        let nx = x.len();
        let h: Vec<f64> = x.iter().tuple_windows().map(|(x0, x1)| x1 - x0).collect();
        let a = y.to_vec();
        let a_mat = CubicSpline::calc_a(&h);
        let b_mat = CubicSpline::calc_b(&h, &a);

        let c_na = a_mat
            .lu()
            .solve(&b_mat)
            .ok_or_else(|| PlannerError::NumericalError("singular spline system".to_string()))?;
        let c: Vec<f64> = c_na.iter().copied().collect();

        let mut b: Vec<f64> = Vec::with_capacity(nx - 1);
        let mut d: Vec<f64> = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3. * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(CubicSpline { a, b, c, d, x: x.to_vec() })
    }

    /// Evaluate f(t). Outside the knot range the end polynomials are extended.
    pub fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    fn search_index(&self, t: f64) -> usize {
        let upper = self.x.partition_point(|&xi| xi <= t);
        upper.saturating_sub(1).min(self.x.len() - 2)
    }

    fn calc_a(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.;
        a[(nx - 1, nx - 2)] = 0.;
        a[(nx - 1, nx - 1)] = 1.;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx - 2 {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}
