//! Pairwise complex arithmetic on `(re, im)` pairs.
//!
//! The DSP core works in `f64` throughout (see `DESIGN.md`), so complex
//! values here are plain `(f64, f64)` tuples rather than a `num_complex`
//! wrapper — the operations needed are exactly these six, and nothing else
//! in the crate builds on a richer complex-number API.

pub type Complex = (f64, f64);

/// `c = a + b`. Operands may alias.
pub fn add(a: Complex, b: Complex) -> Complex {
    (a.0 + b.0, a.1 + b.1)
}

/// `c = a - b`. Operands may alias.
pub fn sub(a: Complex, b: Complex) -> Complex {
    (a.0 - b.0, a.1 - b.1)
}

/// `c = a * b`.
pub fn mul(a: Complex, b: Complex) -> Complex {
    (a.0 * b.0 - a.1 * b.1, a.0 * b.1 + a.1 * b.0)
}

/// `c = a / b`. Division by zero yields non-finite components; callers
/// that pass a possibly-zero divisor must guard the result themselves.
pub fn div(a: Complex, b: Complex) -> Complex {
    let denom = b.0 * b.0 + b.1 * b.1;
    (
        (a.0 * b.0 + a.1 * b.1) / denom,
        (a.1 * b.0 - a.0 * b.1) / denom,
    )
}

/// `a *= b`
pub fn mul_by(a: &mut Complex, b: Complex) {
    *a = mul(*a, b);
}

/// `a /= b`
pub fn div_by(a: &mut Complex, b: Complex) {
    *a = div(*a, b);
}

/// Product of `(-v[i])` over the whole slice, the way
/// `lingot_filter_vector_product` builds a polynomial from its roots.
pub fn product_of_negated(values: &[Complex]) -> Complex {
    let mut result: Complex = (1.0, 0.0);
    for &v in values {
        mul_by(&mut result, (-v.0, -v.1));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn add_sub_are_inverses() {
        let a = (1.5, -2.25);
        let b = (0.25, 4.0);
        let s = add(a, b);
        assert_relative_eq!(sub(s, b).0, a.0);
        assert_relative_eq!(sub(s, b).1, a.1);
    }

    #[test]
    fn mul_div_round_trip() {
        let a = (3.0, -1.0);
        let b = (0.5, 2.0);
        let p = mul(a, b);
        let back = div(p, b);
        assert_relative_eq!(back.0, a.0, epsilon = 1e-9);
        assert_relative_eq!(back.1, a.1, epsilon = 1e-9);
    }

    #[test]
    fn mul_by_matches_mul() {
        let mut a = (2.0, 3.0);
        let b = (1.0, -1.0);
        let expected = mul(a, b);
        mul_by(&mut a, b);
        assert_eq!(a, expected);
    }

    #[test]
    fn product_of_negated_empty_is_one() {
        assert_eq!(product_of_negated(&[]), (1.0, 0.0));
    }

    #[test]
    fn product_of_negated_single_root() {
        let roots = [(2.0, 0.0)];
        assert_eq!(product_of_negated(&roots), (-2.0, 0.0));
    }
}
