//! Reed-Solomon codec over GF(27)
//!
//! Codewords are `RS(26, k)` for `k` in `{24, 22, 20, 18}`, plus a degenerate `RAW`
//! "profile" that is a pass-through with no parity. Codeword arrays are stored
//! ascending: `codeword[i]` is the coefficient of `x^i`. The generator
//! `g(x) = Π_{i=1..r}(x - alpha^i)` is monic of degree `r = n - k`; systematic
//! encoding places the `k` data symbols at the high-degree end (`x^r .. x^{n-1}`)
//! and the `r` parity symbols at the low-degree end (`x^0 .. x^{r-1}`), computed as
//! `message*x^r mod g(x)` per §4.3.
//!
//! Decoding follows syndromes -> Berlekamp-Massey -> Chien search -> Forney, with
//! the characteristic-3 formal derivative of the error locator (§4.3e).

use crate::error::{CodecError, Result};
use crate::gf27::{Gf27, Gf27Elem};

pub const N: usize = 26;

/// A fixed RS(26, k) profile, or a no-ECC pass-through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// RS(26, 24), t = 1
    P1,
    /// RS(26, 22), t = 2
    P2,
    /// RS(26, 20), t = 3
    P3,
    /// RS(26, 18), t = 4. Also used for the header transport (`Hdr`).
    P4,
    /// No error correction; `k = n = 26`.
    Raw,
}

impl Profile {
    pub fn k(self) -> usize {
        match self {
            Profile::P1 => 24,
            Profile::P2 => 22,
            Profile::P3 => 20,
            Profile::P4 => 18,
            Profile::Raw => 26,
        }
    }

    pub fn r(self) -> usize {
        N - self.k()
    }

    pub fn t(self) -> usize {
        self.r() / 2
    }

    pub fn id(self) -> u8 {
        match self {
            Profile::P1 => 0,
            Profile::P2 => 1,
            Profile::P3 => 2,
            Profile::P4 => 3,
            Profile::Raw => 4,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Profile::P1),
            1 => Ok(Profile::P2),
            2 => Ok(Profile::P3),
            3 => Ok(Profile::P4),
            4 => Ok(Profile::Raw),
            _ => Err(CodecError::InvalidProfile(id)),
        }
    }
}

/// Result of a successful decode: recovered data symbols plus the codeword
/// positions (ascending array indices) that were corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub data: Vec<Gf27Elem>,
    pub corrected_positions: Vec<usize>,
}

/// A constructed RS(26, k) encoder/decoder bound to a particular [`Gf27`] field.
pub struct Rs27 {
    profile: Profile,
    generator: Vec<Gf27Elem>, // ascending, degree r, generator[r] == 1 (monic)
}

fn poly_mul(gf: &Gf27, a: &[Gf27Elem], b: &[Gf27Elem]) -> Vec<Gf27Elem> {
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            if bj == 0 {
                continue;
            }
            let term = gf.mul(ai, bj);
            result[i + j] = gf.add(result[i + j], term);
        }
    }
    result
}

/// Divide `dividend` (ascending, index = degree) by the monic `divisor` and return
/// the remainder (length `divisor.len() - 1`, ascending).
fn poly_mod(gf: &Gf27, dividend: &[Gf27Elem], divisor: &[Gf27Elem]) -> Vec<Gf27Elem> {
    let div_deg = divisor.len() - 1;
    let dvd_deg = dividend.len() - 1;
    let mut rem = dividend.to_vec();
    if dvd_deg < div_deg {
        rem.resize(div_deg, 0);
        return rem;
    }
    for deg in (div_deg..=dvd_deg).rev() {
        let coef = rem[deg];
        if coef != 0 {
            let shift = deg - div_deg;
            for (j, &dv) in divisor.iter().enumerate() {
                let idx = shift + j;
                let term = gf.mul(dv, coef);
                rem[idx] = gf.sub(rem[idx], term);
            }
        }
    }
    rem[0..div_deg].to_vec()
}

fn eval_poly(gf: &Gf27, poly: &[Gf27Elem], x: Gf27Elem) -> Gf27Elem {
    let mut acc = 0u8;
    let mut xp = 1u8;
    for &c in poly {
        acc = gf.add(acc, gf.mul(c, xp));
        xp = gf.mul(xp, x);
    }
    acc
}

/// `c(x) - coef * x^m * b(x)`, growing the result as needed.
fn sub_shifted(gf: &Gf27, c: &[Gf27Elem], b: &[Gf27Elem], coef: Gf27Elem, m: usize) -> Vec<Gf27Elem> {
    let needed_len = (b.len() + m).max(c.len());
    let mut result = vec![0u8; needed_len];
    result[..c.len()].copy_from_slice(c);
    for (i, &v) in b.iter().enumerate() {
        let idx = i + m;
        let term = gf.mul(coef, v);
        result[idx] = gf.sub(result[idx], term);
    }
    result
}

/// Berlekamp-Massey over GF(27): find the error locator `sigma(x)` (ascending,
/// `sigma[0] = 1`) of minimal degree satisfying the syndrome recurrence.
fn berlekamp_massey(gf: &Gf27, syndromes: &[Gf27Elem]) -> Vec<Gf27Elem> {
    let mut c: Vec<Gf27Elem> = vec![1];
    let mut b: Vec<Gf27Elem> = vec![1];
    let mut l = 0usize;
    let mut m = 1usize;
    let mut b_coef: Gf27Elem = 1;

    for n in 0..syndromes.len() {
        let mut delta = syndromes[n];
        for i in 1..=l {
            if i < c.len() {
                delta = gf.add(delta, gf.mul(c[i], syndromes[n - i]));
            }
        }
        if delta == 0 {
            m += 1;
        } else if 2 * l <= n {
            let t = c.clone();
            let coef = gf.mul(delta, gf.inv(b_coef));
            c = sub_shifted(gf, &c, &b, coef, m);
            l = n + 1 - l;
            b = t;
            b_coef = delta;
            m = 1;
        } else {
            let coef = gf.mul(delta, gf.inv(b_coef));
            c = sub_shifted(gf, &c, &b, coef, m);
            m += 1;
        }
    }
    c
}

/// Scalar multiply a GF(27) element by a small non-negative integer via repeated
/// addition (the meaning of "multiply digit-wise by n" in characteristic 3: `n=0`
/// gives 0, `n=1` is the identity, `n=2` is `e + e`).
fn scale_by_small_int(gf: &Gf27, e: Gf27Elem, n: usize) -> Gf27Elem {
    match n % 3 {
        0 => 0,
        1 => e,
        _ => gf.add(e, e),
    }
}

/// Characteristic-3 formal derivative of `sigma(x)` (§4.3e).
fn formal_derivative(gf: &Gf27, sigma: &[Gf27Elem]) -> Vec<Gf27Elem> {
    if sigma.len() <= 1 {
        return vec![0];
    }
    let mut prime = vec![0u8; sigma.len() - 1];
    for i in 1..sigma.len() {
        prime[i - 1] = scale_by_small_int(gf, sigma[i], i % 3);
    }
    prime
}

impl Rs27 {
    pub fn new(gf: &Gf27, profile: Profile) -> Self {
        let r = profile.r();
        let mut generator: Vec<Gf27Elem> = vec![1];
        for i in 1..=r {
            let factor = [gf.sub(0, gf.pow_alpha(i as i64)), 1];
            generator = poly_mul(gf, &generator, &factor);
        }
        Rs27 { profile, generator }
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Systematic encode: `data.len()` must equal `profile.k()`. Returns a codeword
    /// of length 26 (ascending, data at indices `r..26`, parity at `0..r`).
    pub fn encode(&self, gf: &Gf27, data: &[Gf27Elem]) -> Result<Vec<Gf27Elem>> {
        let k = self.profile.k();
        if data.len() != k {
            return Err(crate::error::out_of_range("rs_data_len", data.len(), k));
        }
        if matches!(self.profile, Profile::Raw) {
            return Ok(data.to_vec());
        }
        let r = self.profile.r();
        let mut shifted = vec![0u8; N];
        shifted[r..N].copy_from_slice(data);
        let remainder = poly_mod(gf, &shifted, &self.generator);
        let mut codeword = shifted;
        for i in 0..r {
            codeword[i] = gf.sub(0, remainder[i]);
        }
        Ok(codeword)
    }

    /// Decode a length-26 received codeword, correcting up to `t = r/2` symbol
    /// errors. Does not mutate `received` on failure.
    pub fn decode(&self, gf: &Gf27, received: &[Gf27Elem]) -> Result<Decoded> {
        if received.len() != N {
            return Err(crate::error::out_of_range("rs_codeword_len", received.len(), N));
        }
        let k = self.profile.k();
        let r = self.profile.r();

        if matches!(self.profile, Profile::Raw) {
            return Ok(Decoded {
                data: received.to_vec(),
                corrected_positions: Vec::new(),
            });
        }

        let syndromes: Vec<Gf27Elem> = (0..r)
            .map(|j| {
                let mut s = 0u8;
                for (i, &c) in received.iter().enumerate() {
                    if c != 0 {
                        s = gf.add(s, gf.mul(c, gf.pow_alpha((j as i64 + 1) * i as i64)));
                    }
                }
                s
            })
            .collect();

        if syndromes.iter().all(|&s| s == 0) {
            return Ok(Decoded {
                data: received[r..N].to_vec(),
                corrected_positions: Vec::new(),
            });
        }

        let t = self.profile.t();
        let sigma = berlekamp_massey(gf, &syndromes);
        let l = sigma.len() - 1;
        if l == 0 || l > t {
            return Err(CodecError::RsUncorrectable {
                positions_found: l,
                max_correctable: t,
            });
        }

        let mut positions = Vec::new();
        for pos in 0..N {
            let x_inv = gf.pow_alpha(-(pos as i64));
            if eval_poly(gf, &sigma, x_inv) == 0 {
                positions.push(pos);
            }
        }
        if positions.len() != l {
            return Err(CodecError::RsUncorrectable {
                positions_found: positions.len(),
                max_correctable: t,
            });
        }

        // Omega(x) = (S(x) * sigma(x)) mod x^r
        let s_sigma = poly_mul(gf, &syndromes, &sigma);
        let omega: Vec<Gf27Elem> = s_sigma.iter().take(r).copied().collect();
        let sigma_prime = formal_derivative(gf, &sigma);

        let mut corrected = received.to_vec();
        for &pos in &positions {
            let x_inv = gf.pow_alpha(-(pos as i64));
            let omega_val = eval_poly(gf, &omega, x_inv);
            let denom = eval_poly(gf, &sigma_prime, x_inv);
            if denom == 0 {
                return Err(CodecError::RsUncorrectable {
                    positions_found: positions.len(),
                    max_correctable: t,
                });
            }
            let mag = gf.mul(gf.sub(0, omega_val), gf.inv(denom));
            corrected[pos] = gf.add(corrected[pos], mag);
        }

        // Sanity check: corrected codeword must now have all-zero syndromes.
        for j in 0..r {
            let mut s = 0u8;
            for (i, &c) in corrected.iter().enumerate() {
                if c != 0 {
                    s = gf.add(s, gf.mul(c, gf.pow_alpha((j as i64 + 1) * i as i64)));
                }
            }
            if s != 0 {
                return Err(CodecError::RsUncorrectable {
                    positions_found: positions.len(),
                    max_correctable: t,
                });
            }
        }

        let _ = k;
        Ok(Decoded {
            data: corrected[r..N].to_vec(),
            corrected_positions: positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn field() -> Gf27 {
        Gf27::new()
    }

    #[test]
    fn encode_all_zero_is_all_zero() {
        let gf = field();
        for p in [Profile::P1, Profile::P2, Profile::P3, Profile::P4] {
            let rs = Rs27::new(&gf, p);
            let data = vec![0u8; p.k()];
            let cw = rs.encode(&gf, &data).unwrap();
            assert!(cw.iter().all(|&x| x == 0));
        }
    }

    #[test]
    fn codeword_is_divisible_by_generator() {
        let gf = field();
        for p in [Profile::P1, Profile::P2, Profile::P3, Profile::P4] {
            let rs = Rs27::new(&gf, p);
            let data: Vec<u8> = (0..p.k() as u8).map(|i| i % 27).collect();
            let cw = rs.encode(&gf, &data).unwrap();
            let rem = poly_mod(&gf, &cw, &rs.generator);
            assert!(rem.iter().all(|&x| x == 0), "profile {:?} not divisible", p);
        }
    }

    #[test]
    fn decode_without_errors_recovers_data() {
        let gf = field();
        for p in [Profile::P1, Profile::P2, Profile::P3, Profile::P4] {
            let rs = Rs27::new(&gf, p);
            let data: Vec<u8> = (0..p.k() as u8).map(|i| (i * 7 + 3) % 27).collect();
            let cw = rs.encode(&gf, &data).unwrap();
            let decoded = rs.decode(&gf, &cw).unwrap();
            assert_eq!(decoded.data, data);
            assert!(decoded.corrected_positions.is_empty());
        }
    }

    #[test]
    fn decode_at_exactly_t_errors_corrects() {
        let gf = field();
        for p in [Profile::P1, Profile::P2, Profile::P3, Profile::P4] {
            let rs = Rs27::new(&gf, p);
            let data = vec![0u8; p.k()];
            let mut cw = rs.encode(&gf, &data).unwrap();
            let t = p.t();
            let mut rng = StdRng::seed_from_u64(42);
            let mut positions: Vec<usize> = (0..N).collect();
            // deterministic shuffle-lite: pick first t distinct positions via rng
            positions.sort_by_key(|_| rng.gen::<u32>());
            let err_positions = &positions[..t];
            for &pos in err_positions {
                let err = gf.pow_alpha(rng.gen_range(1..26));
                cw[pos] = gf.add(cw[pos], err);
            }
            let decoded = rs.decode(&gf, &cw).expect("should correct at t errors");
            assert_eq!(decoded.data, data);
            let mut got = decoded.corrected_positions.clone();
            got.sort_unstable();
            let mut want = err_positions.to_vec();
            want.sort_unstable();
            assert_eq!(got, want, "profile {:?}", p);
        }
    }

    #[test]
    fn decode_at_t_plus_one_errors_is_rejected() {
        let gf = field();
        let p = Profile::P2; // t = 2
        let rs = Rs27::new(&gf, p);
        let data = vec![0u8; p.k()];
        let mut cw = rs.encode(&gf, &data).unwrap();
        let before = cw.clone();
        for (i, pos) in [1usize, 5, 9].iter().enumerate() {
            cw[*pos] = gf.add(cw[*pos], gf.pow_alpha((i + 2) as i64));
        }
        let result = rs.decode(&gf, &cw);
        assert!(result.is_err());
        assert_eq!(cw, {
            let mut c = before;
            for (i, pos) in [1usize, 5, 9].iter().enumerate() {
                c[*pos] = gf.add(c[*pos], gf.pow_alpha((i + 2) as i64));
            }
            c
        });
    }

    #[test]
    fn scenario_two_specific_positions() {
        let gf = field();
        let p = Profile::P2; // RS(26, 22)
        let rs = Rs27::new(&gf, p);
        let data = vec![0u8; p.k()];
        let mut cw = rs.encode(&gf, &data).unwrap();
        assert!(cw.iter().all(|&x| x == 0));
        cw[3] = gf.add(cw[3], gf.pow_alpha(5));
        cw[17] = gf.add(cw[17], gf.pow_alpha(11));
        let decoded = rs.decode(&gf, &cw).unwrap();
        assert_eq!(decoded.data, data);
        let mut positions = decoded.corrected_positions;
        positions.sort_unstable();
        assert_eq!(positions, vec![3, 17]);
    }

    #[test]
    fn raw_profile_is_passthrough() {
        let gf = field();
        let rs = Rs27::new(&gf, Profile::Raw);
        let data: Vec<u8> = (0..26u8).collect();
        let cw = rs.encode(&gf, &data).unwrap();
        assert_eq!(cw, data);
        let decoded = rs.decode(&gf, &cw).unwrap();
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn profile_id_roundtrip() {
        for p in [Profile::P1, Profile::P2, Profile::P3, Profile::P4, Profile::Raw] {
            assert_eq!(Profile::from_id(p.id()).unwrap(), p);
        }
        assert!(Profile::from_id(99).is_err());
    }
}
