//! GF(27) field arithmetic
//!
//! Elements are identified with three unbalanced trit digits `(d0, d1, d2)`, each in
//! `{0, 1, 2}`, with integer form `d0 + 3*d1 + 9*d2` in `0..27`. Addition is digit-wise
//! mod 3 (i.e. polynomial addition over GF(3)); multiplication is polynomial
//! multiplication reduced modulo the fixed primitive polynomial
//! `p(x) = x^3 + 2x + 1` over GF(3).
//!
//! [`Gf27`] precomputes `exp`/`log`/`mul`/`inv` tables around the smallest primitive
//! element `alpha` of multiplicative order 26, found by brute-force search at
//! construction time (§4.2). The tables are read-only after construction and `Sync`.

const FIELD_SIZE: usize = 27;
const GROUP_ORDER: usize = 26;

/// A single GF(27) element, stored as its integer form in `0..27`.
pub type Gf27Elem = u8;

/// Digit-wise decomposition of an element into its three base-3 digits.
fn to_digits(e: Gf27Elem) -> [u8; 3] {
    let e = e as u16;
    [(e % 3) as u8, ((e / 3) % 3) as u8, ((e / 9) % 3) as u8]
}

fn from_digits(d: [u8; 3]) -> Gf27Elem {
    (d[0] as u16 + 3 * d[1] as u16 + 9 * d[2] as u16) as Gf27Elem
}

/// Digit-wise addition mod 3 (also serves as subtraction: GF(3) negation of `x` is
/// `(3 - x) % 3`, and `x + (3-y) = x - y` mod 3 for each digit).
pub fn add(a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
    let da = to_digits(a);
    let db = to_digits(b);
    from_digits([
        (da[0] + db[0]) % 3,
        (da[1] + db[1]) % 3,
        (da[2] + db[2]) % 3,
    ])
}

/// Subtraction is identical to addition in characteristic 3 applied to `(a, neg(b))`,
/// but is provided directly for clarity at call sites.
pub fn sub(a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
    let da = to_digits(a);
    let db = to_digits(b);
    from_digits([
        (da[0] + 3 - db[0]) % 3,
        (da[1] + 3 - db[1]) % 3,
        (da[2] + 3 - db[2]) % 3,
    ])
}

/// Polynomial multiplication of two degree-<=2 GF(3) polynomials, reduced modulo
/// `p(x) = x^3 + 2x + 1`, i.e. `x^3 = x + 2`, `x^4 = x^2 + 2x` (mod 3).
fn poly_mul_reduce(a: [u8; 3], b: [u8; 3]) -> [u8; 3] {
    // Full product has degree <= 4: c[0..=4]
    let mut c = [0u16; 5];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            c[i + j] += ai as u16 * bj as u16;
        }
    }
    for v in c.iter_mut() {
        *v %= 3;
    }
    // Reduce x^3 -> x + 2, x^4 -> x^2 + 2x
    let mut r = [c[0] as u8, c[1] as u8, c[2] as u8];
    let c3 = c[3] as u8;
    let c4 = c[4] as u8;
    // x^3 term contributes c3 * (x + 2)
    r[1] = (r[1] + c3) % 3;
    r[0] = (r[0] + 2 * c3) % 3;
    // x^4 term contributes c4 * (x^2 + 2x)
    r[2] = (r[2] + c4) % 3;
    r[1] = (r[1] + 2 * c4) % 3;
    r
}

/// Multiply two GF(27) elements directly via polynomial reduction (used only to seed
/// the log/exp tables; steady-state multiplication goes through [`Gf27::mul`]).
fn mul_raw(a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
    from_digits(poly_mul_reduce(to_digits(a), to_digits(b)))
}

/// Order of a nonzero element under `mul_raw` (1..=26), or 0 if `e == 0`.
fn multiplicative_order(e: Gf27Elem) -> usize {
    if e == 0 {
        return 0;
    }
    let mut acc = e;
    for k in 1..=GROUP_ORDER {
        if acc == 1 {
            return k;
        }
        acc = mul_raw(acc, e);
    }
    0
}

/// Precomputed GF(27) arithmetic tables, seeded from the smallest primitive element.
#[derive(Debug, Clone)]
pub struct Gf27 {
    /// `alpha^i` for `i` in `0..2*GROUP_ORDER`, so callers can index `exp[e1 + e2]`
    /// without a modulo when multiplying via logs.
    exp: [Gf27Elem; 2 * GROUP_ORDER],
    /// `log[e]` is the discrete log of `e` base `alpha`, for `e` in `1..27`; `log[0]`
    /// is an unused sentinel (0).
    log: [u16; FIELD_SIZE],
    mul_table: [[Gf27Elem; FIELD_SIZE]; FIELD_SIZE],
    inv_table: [Gf27Elem; FIELD_SIZE],
    alpha: Gf27Elem,
}

impl Gf27 {
    /// Build the field context: locate the smallest `alpha >= 2` of multiplicative
    /// order 26 and derive all tables from it. Panics only if GF(27) as defined here
    /// has no primitive element, which would mean the fixed polynomial `p(x)` is not
    /// actually irreducible - an internal invariant violation, never user-reachable.
    pub fn new() -> Self {
        let alpha = (2..FIELD_SIZE as Gf27Elem)
            .find(|&cand| multiplicative_order(cand) == GROUP_ORDER)
            .expect("GF(27) modulus x^3+2x+1 has no primitive element of order 26");

        let mut exp = [0u8; 2 * GROUP_ORDER];
        let mut acc: Gf27Elem = 1;
        for slot in exp.iter_mut() {
            *slot = acc;
            acc = mul_raw(acc, alpha);
        }

        let mut log = [0u16; FIELD_SIZE];
        for i in 0..GROUP_ORDER {
            log[exp[i] as usize] = i as u16;
        }

        let mut mul_table = [[0u8; FIELD_SIZE]; FIELD_SIZE];
        for (a, row) in mul_table.iter_mut().enumerate() {
            for (b, slot) in row.iter_mut().enumerate() {
                *slot = mul_raw(a as Gf27Elem, b as Gf27Elem);
            }
        }

        let mut inv_table = [0u8; FIELD_SIZE];
        for e in 1..FIELD_SIZE {
            let le = log[e] as usize;
            let inv_log = (GROUP_ORDER - le) % GROUP_ORDER;
            inv_table[e] = exp[inv_log];
        }

        Gf27 {
            exp,
            log,
            mul_table,
            inv_table,
            alpha,
        }
    }

    pub fn alpha(&self) -> Gf27Elem {
        self.alpha
    }

    pub fn add(&self, a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
        add(a, b)
    }

    pub fn sub(&self, a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
        sub(a, b)
    }

    pub fn mul(&self, a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
        self.mul_table[a as usize][b as usize]
    }

    /// Multiplicative inverse. `inv(0) = 0` is a sentinel; callers must not rely on
    /// it as a mathematically meaningful inverse (zero has none).
    pub fn inv(&self, a: Gf27Elem) -> Gf27Elem {
        if a == 0 {
            0
        } else {
            self.inv_table[a as usize]
        }
    }

    pub fn div(&self, a: Gf27Elem, b: Gf27Elem) -> Gf27Elem {
        self.mul(a, self.inv(b))
    }

    /// `alpha^e`, exponent taken mod the group order 26.
    pub fn pow_alpha(&self, e: i64) -> Gf27Elem {
        let m = GROUP_ORDER as i64;
        let reduced = ((e % m) + m) % m;
        self.exp[reduced as usize]
    }

    /// Discrete log base alpha; undefined (returns 0) for input 0.
    pub fn log(&self, a: Gf27Elem) -> u16 {
        self.log[a as usize]
    }
}

impl Default for Gf27 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_has_order_26() {
        let gf = Gf27::new();
        assert_eq!(multiplicative_order(gf.alpha()), GROUP_ORDER);
    }

    #[test]
    fn alpha_is_smallest_primitive() {
        let gf = Gf27::new();
        for cand in 2..gf.alpha() {
            assert_ne!(multiplicative_order(cand), GROUP_ORDER);
        }
    }

    #[test]
    fn mul_matches_log_exp() {
        let gf = Gf27::new();
        for a in 1..FIELD_SIZE as Gf27Elem {
            for b in 1..FIELD_SIZE as Gf27Elem {
                let via_table = gf.mul(a, b);
                let via_log = gf.pow_alpha(gf.log(a) as i64 + gf.log(b) as i64);
                assert_eq!(via_table, via_log, "mismatch at a={a} b={b}");
            }
        }
    }

    #[test]
    fn mul_by_zero_is_zero() {
        let gf = Gf27::new();
        for a in 0..FIELD_SIZE as Gf27Elem {
            assert_eq!(gf.mul(a, 0), 0);
            assert_eq!(gf.mul(0, a), 0);
        }
    }

    #[test]
    fn inv_roundtrips_nonzero() {
        let gf = Gf27::new();
        for a in 1..FIELD_SIZE as Gf27Elem {
            assert_eq!(gf.mul(a, gf.inv(a)), 1);
        }
        assert_eq!(gf.inv(0), 0);
    }

    #[test]
    fn add_sub_are_inverse() {
        let gf = Gf27::new();
        for a in 0..FIELD_SIZE as Gf27Elem {
            for b in 0..FIELD_SIZE as Gf27Elem {
                assert_eq!(gf.sub(gf.add(a, b), b), a);
            }
        }
    }

    #[test]
    fn exp_cycles_through_all_nonzero_elements() {
        let gf = Gf27::new();
        let mut seen = [false; FIELD_SIZE];
        for i in 0..GROUP_ORDER {
            seen[gf.exp[i] as usize] = true;
        }
        for e in 1..FIELD_SIZE {
            assert!(seen[e], "alpha^i never produced {e}");
        }
    }
}
