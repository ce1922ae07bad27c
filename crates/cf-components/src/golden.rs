//! Golden-section search for the maximum of a unimodal function on an interval.

/// The golden ratio: φ = (1 + √5) / 2
const PHI: f64 = 1.618_033_988_749_895;

/// The inverse golden ratio: 1/φ = φ - 1
const INV_PHI: f64 = PHI - 1.0;

/// Search settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GoldenConfig {
    pub max_iters: usize,
    /// Stop once the bracket is narrower than `x_abs_tol + x_rel_tol·|centre|`.
    pub x_abs_tol: f64,
    pub x_rel_tol: f64,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            x_abs_tol: 1e-12,
            x_rel_tol: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    left: f64,
    right: f64,
    inner_left: f64,
    inner_right: f64,
}

impl Bracket {
    fn new([a, b]: [f64; 2]) -> Self {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        let width = right - left;
        Self {
            left,
            right,
            inner_left: left + (1.0 - INV_PHI) * width,
            inner_right: left + INV_PHI * width,
        }
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }

    fn shrink_right(&mut self) {
        self.right = self.inner_right;
        self.inner_right = self.inner_left;
        self.inner_left = self.left + (1.0 - INV_PHI) * self.width();
    }

    fn shrink_left(&mut self) {
        self.left = self.inner_left;
        self.inner_left = self.inner_right;
        self.inner_right = self.left + INV_PHI * self.width();
    }
}

/// Locate the maximum of `f` on `bracket`, returning `(x, f(x))`.
///
/// The bracket endpoints are candidates too, so a monotone function yields
/// the better endpoint.
pub fn maximize<F>(f: F, bracket: [f64; 2], config: &GoldenConfig) -> (f64, f64)
where
    F: Fn(f64) -> f64,
{
    let mut b = Bracket::new(bracket);
    let (left_end, right_end) = (b.left, b.right);
    let mut f_left = f(b.inner_left);
    let mut f_right = f(b.inner_right);

    for _ in 0..config.max_iters {
        let centre = 0.5 * (b.left + b.right);
        if b.width() <= config.x_abs_tol + config.x_rel_tol * centre.abs() {
            break;
        }
        if f_left >= f_right {
            b.shrink_right();
            f_right = f_left;
            f_left = f(b.inner_left);
        } else {
            b.shrink_left();
            f_left = f_right;
            f_right = f(b.inner_right);
        }
    }

    let interior = if f_left >= f_right {
        (b.inner_left, f_left)
    } else {
        (b.inner_right, f_right)
    };
    [(left_end, f(left_end)), (right_end, f(right_end))]
        .into_iter()
        .fold(interior, |best, cand| if cand.1 > best.1 { cand } else { best })
}
