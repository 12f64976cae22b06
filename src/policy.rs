//! Access-policy overlay: metadata-only read gating and the two-round
//! PREP/ACCEPT redirect protocol (§4.8).
//!
//! The overlay decides whether a container reader may proceed to the payload
//! from meta alone - the payload bytes are never touched before a decision is
//! reached (the `approve` callback wired into `container::t3p`/`t3v` is meant
//! to be backed by exactly this). State here (the rotor tick and the prep
//! cache) is scoped to one [`PolicyOverlay`] instance, never a process
//! singleton (§9 "Global mutable state").

use std::collections::HashMap;

use crate::error::{CodecError, Result};
use crate::meta;

/// Coarse distance bucket carried in meta, used by the coexistence rule and
/// the redirect rotor's proximity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityClass {
    Local,
    Near,
    Far,
    Unknown,
}

impl ProximityClass {
    fn parse(s: &str) -> Self {
        match s {
            "local" => ProximityClass::Local,
            "near" => ProximityClass::Near,
            "far" => ProximityClass::Far,
            _ => ProximityClass::Unknown,
        }
    }

    /// A balanced {-1, 0, +1} proximity score, closer is higher, used as one
    /// input to the redirect rotor (§4.8).
    fn balanced_score(self) -> i8 {
        match self {
            ProximityClass::Local => 1,
            ProximityClass::Near => 0,
            ProximityClass::Far => -1,
            ProximityClass::Unknown => 0,
        }
    }
}

/// The `route_{ttl,hops,phase,origin}` group parsed from meta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTag {
    pub ttl: u32,
    pub hops: u32,
    pub phase: u32,
    pub origin: String,
}

/// Everything the overlay reads out of one request's meta (§4.8 "Inputs
/// parsed from meta").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub domain: String,
    pub build_hash: String,
    pub type_hash: String,
    pub version: String,
    pub class: ProximityClass,
    /// `radius_m`, stored as millimetres so the struct can derive `Eq` (`f64` cannot).
    pub radius_m_milli: i64,
    pub route: RouteTag,
}

impl RequestMeta {
    /// Parse from a meta JSON blob via the tolerant `meta` scanner (§6).
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| CodecError::InvalidRoute("meta is not valid UTF-8".to_string()))?;
        let domain = meta::get_str(text, "domain")
            .ok_or_else(|| CodecError::InvalidRoute("missing domain".to_string()))?;
        let build_hash = meta::get_str(text, "build_hash").unwrap_or_default();
        let type_hash = meta::get_str(text, "type_hash").unwrap_or_default();
        let version = meta::get_str(text, "version").unwrap_or_default();
        let class = meta::get_str(text, "class")
            .map(|s| ProximityClass::parse(&s))
            .unwrap_or(ProximityClass::Unknown);
        let radius_m = meta::get_f64(text, "radius_m").unwrap_or(0.0);
        let route = RouteTag {
            ttl: meta::get_u32(text, "route_ttl").unwrap_or(0),
            hops: meta::get_u32(text, "route_hops").unwrap_or(0),
            phase: meta::get_u32(text, "route_phase").unwrap_or(0),
            origin: meta::get_str(text, "route_origin").unwrap_or_default(),
        };
        Ok(RequestMeta {
            domain,
            build_hash,
            type_hash,
            version,
            class,
            radius_m_milli: (radius_m * 1000.0).round() as i64,
            route,
        })
    }

    fn radius_m(&self) -> f64 {
        self.radius_m_milli as f64 / 1000.0
    }

    fn depth(&self) -> usize {
        self.domain.split('/').filter(|s| !s.is_empty()).count()
    }
}

/// A candidate neighbour domain visible to the overlay for redirect
/// purposes - the caller supplies these (the overlay does not discover
/// topology itself); see `DESIGN.md` for this open-question resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub domain: String,
    pub build_hash: String,
    pub radius_m: f64,
}

/// One `(domain_prefix, hash_prefix)` membership rule.
#[derive(Debug, Clone)]
pub struct Membership {
    pub domain_prefix: String,
    pub hash_prefix: String,
}

/// Per-proximity-class coexistence radius limit.
#[derive(Debug, Clone)]
pub struct CoexistRule {
    pub class: ProximityClass,
    pub max_radius_m: f64,
}

/// Static configuration for one [`PolicyOverlay`] instance.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub allowed_roots: Vec<String>,
    pub max_depth: usize,
    pub memberships: Vec<Membership>,
    pub internal_allowlist: Vec<String>,
    pub coexist_rules: Vec<CoexistRule>,
    pub visual_whitelist: Vec<String>,
    pub ttl_max: u32,
    pub hops_max: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig {
            allowed_roots: Vec::new(),
            max_depth: usize::MAX,
            memberships: Vec::new(),
            internal_allowlist: Vec::new(),
            coexist_rules: Vec::new(),
            visual_whitelist: Vec::new(),
            ttl_max: 16,
            hops_max: 8,
        }
    }
}

/// The overlay's decision for one request (§4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Membership or internal allow-list match; payload read is granted.
    Internal,
    /// Coexistence rule, visual whitelist, or neighbour-query approval; payload read is granted.
    CoexistAccepted,
    /// Round 1 of PREP/ACCEPT: a target was prepared and cached; no redirect yet.
    /// The caller must advance `route_phase`/`route_ttl`/`route_hops` and re-present.
    Prepared,
    /// Round 2 of PREP/ACCEPT: the accept callback approved a cached target.
    Redirect { target: String, ttl_after: u32 },
    /// Domain root/depth check failed outright.
    Reject,
    /// No rule matched; the audit hook is invoked. Payload read is refused.
    UnknownSandbox,
}

impl Decision {
    /// Per §4.8: "Any result in {Internal, CoexistAccepted} grants payload read."
    pub fn grants_read(&self) -> bool {
        matches!(self, Decision::Internal | Decision::CoexistAccepted)
    }
}

#[derive(Debug, Clone)]
struct PrepEntry {
    target: String,
    ttl: u32,
    window: u8,
}

/// FNV-1a over the UTF-8 bytes of `s`, folded into the running hash.
fn fnv1a_fold(mut hash: u64, s: &str) -> u64 {
    const PRIME: u64 = 0x100000001b3;
    for b in s.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Deterministic FNV-1a seed over domain/version/radius (§4.8 redirect rotor input a).
fn fnv_seed(req: &RequestMeta) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    let mut h = fnv1a_fold(OFFSET_BASIS, &req.domain);
    h = fnv1a_fold(h, &req.version);
    h = fnv1a_fold(h, &format!("{:.3}", req.radius_m()));
    h
}

/// Mutable overlay instance: owns the rotor tick and prep cache, both scoped
/// here rather than process-global (§9).
pub struct PolicyOverlay {
    config: PolicyConfig,
    rotor_tick: u8,
    prep_cache: HashMap<String, PrepEntry>,
}

impl PolicyOverlay {
    pub fn new(config: PolicyConfig) -> Self {
        PolicyOverlay {
            config,
            rotor_tick: 0,
            prep_cache: HashMap::new(),
        }
    }

    fn advance_rotor(&mut self) -> u8 {
        let tick = self.rotor_tick;
        self.rotor_tick = (self.rotor_tick + 1) % 3;
        tick
    }

    /// Decrement every cached entry's validity window, dropping any that were
    /// already at zero (§9 "the prep cache is pruned by window decrement").
    /// Called at the start of every `decide`, before entries created by the
    /// current call exist, so a fresh entry (window 1) survives exactly one
    /// subsequent call - the round 2 that is meant to consume it - and is
    /// swept on the call after that if nothing claimed it.
    fn prune_cache(&mut self) {
        self.prep_cache.retain(|_, entry| {
            if entry.window == 0 {
                false
            } else {
                entry.window -= 1;
                true
            }
        });
    }

    fn passes_root_and_depth(&self, req: &RequestMeta) -> bool {
        if !self.config.allowed_roots.is_empty()
            && !self.config.allowed_roots.iter().any(|root| req.domain.starts_with(root.as_str()))
        {
            return false;
        }
        req.depth() <= self.config.max_depth
    }

    fn matches_membership_or_allowlist(&self, req: &RequestMeta) -> bool {
        if self.config.internal_allowlist.iter().any(|d| d == &req.domain) {
            return true;
        }
        self.config.memberships.iter().any(|m| {
            req.domain.starts_with(m.domain_prefix.as_str())
                && req.build_hash.starts_with(m.hash_prefix.as_str())
        })
    }

    fn matches_coexist_and_whitelist(&self, req: &RequestMeta) -> bool {
        let radius_ok = self
            .config
            .coexist_rules
            .iter()
            .any(|rule| rule.class == req.class && req.radius_m() <= rule.max_radius_m);
        if !radius_ok {
            return false;
        }
        self.config.visual_whitelist.iter().any(|d| req.domain.starts_with(d.as_str()))
    }

    /// Candidates sharing the deepest depth among those under the requester's
    /// root that a radius/membership check permits - the "bottom tier"
    /// (§4.8).
    fn bottom_tier<'a>(&self, req: &RequestMeta, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
        let requester_root = self
            .config
            .allowed_roots
            .iter()
            .find(|root| req.domain.starts_with(root.as_str()));
        let Some(root) = requester_root else {
            return Vec::new();
        };
        let radius_rules: Vec<&CoexistRule> =
            self.config.coexist_rules.iter().filter(|rule| rule.class == req.class).collect();
        let permitted: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| {
                c.domain.starts_with(root.as_str())
                    && (radius_rules.is_empty()
                        || radius_rules.iter().any(|rule| c.radius_m <= rule.max_radius_m))
            })
            .collect();
        let Some(max_depth) = permitted
            .iter()
            .map(|c| c.domain.split('/').filter(|s| !s.is_empty()).count())
            .max()
        else {
            return Vec::new();
        };
        permitted
            .into_iter()
            .filter(|c| c.domain.split('/').filter(|s| !s.is_empty()).count() == max_depth)
            .collect()
    }

    /// Pick one candidate deterministically from the FNV seed, rotor tick,
    /// and proximity score (§4.8 redirect rotor inputs a/b/c).
    fn pick_rotor_neighbour<'a>(&self, req: &RequestMeta, tier: &[&'a Candidate]) -> Option<&'a Candidate> {
        if tier.is_empty() {
            return None;
        }
        let seed = fnv_seed(req);
        let tick = self.rotor_tick as u64;
        let score = req.class.balanced_score() as i64 + 1; // shift to {0,1,2}
        let combined = seed.wrapping_add(tick).wrapping_add(score as u64);
        Some(tier[(combined as usize) % tier.len()])
    }

    /// Decide access for one request. `candidates` lists domains visible to
    /// the overlay under the requester's root, for redirect purposes only.
    /// `prepare`, `accept`, and `sandbox_hook` are the side-effect-only
    /// callbacks named in §4.8/§9; none may mutate `req`.
    #[allow(clippy::too_many_arguments)]
    pub fn decide<FN, FA, FH, FP>(
        &mut self,
        req: &RequestMeta,
        candidates: &[Candidate],
        mut neighbour_query: FN,
        mut prepare: FP,
        mut accept: FA,
        mut sandbox_hook: FH,
    ) -> Decision
    where
        FN: FnMut(&RequestMeta) -> bool,
        FP: FnMut(&RequestMeta, &Candidate, &RouteTag) -> Option<String>,
        FA: FnMut(&RequestMeta, &str) -> bool,
        FH: FnMut(&RequestMeta),
    {
        self.prune_cache();

        if !self.passes_root_and_depth(req) {
            self.advance_rotor();
            return Decision::Reject;
        }
        if self.matches_membership_or_allowlist(req) {
            self.advance_rotor();
            return Decision::Internal;
        }
        if self.matches_coexist_and_whitelist(req) {
            self.advance_rotor();
            return Decision::CoexistAccepted;
        }
        if neighbour_query(req) {
            self.advance_rotor();
            return Decision::CoexistAccepted;
        }

        let tier = self.bottom_tier(req, candidates);
        if !tier.is_empty() {
            if req.route.phase < 1 {
                if let Some(neighbour) = self.pick_rotor_neighbour(req, &tier) {
                    let tag = req.route.clone();
                    if let Some(target) = prepare(req, neighbour, &tag) {
                        if !target.is_empty() {
                            self.prep_cache.insert(
                                req.domain.clone(),
                                PrepEntry { target, ttl: req.route.ttl, window: 1 },
                            );
                        }
                    }
                }
                self.advance_rotor();
                return Decision::Prepared;
            } else if let Some(entry) = self.prep_cache.get(&req.domain).cloned() {
                if accept(req, &entry.target) {
                    let ttl_after = entry.ttl.min(self.config.ttl_max).saturating_sub(1);
                    self.prep_cache.remove(&req.domain);
                    self.advance_rotor();
                    return Decision::Redirect { target: entry.target, ttl_after };
                }
                self.prep_cache.remove(&req.domain);
            }
        }

        sandbox_hook(req);
        self.advance_rotor();
        Decision::UnknownSandbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(domain: &str, phase: u32, ttl: u32) -> RequestMeta {
        RequestMeta {
            domain: domain.to_string(),
            build_hash: "abcd1234".to_string(),
            type_hash: String::new(),
            version: "1".to_string(),
            class: ProximityClass::Near,
            radius_m_milli: 5000,
            route: RouteTag { ttl, hops: 0, phase, origin: String::new() },
        }
    }

    fn base_config() -> PolicyConfig {
        PolicyConfig {
            allowed_roots: vec!["x/".to_string()],
            max_depth: 10,
            coexist_rules: vec![CoexistRule { class: ProximityClass::Near, max_radius_m: 50.0 }],
            ..Default::default()
        }
    }

    #[test]
    fn rejects_domain_outside_allowed_roots() {
        let mut overlay = PolicyOverlay::new(base_config());
        let r = req("z/y", 0, 0);
        let d = overlay.decide(&r, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d, Decision::Reject);
    }

    #[test]
    fn scenario_four_domain_meta_parse_and_reject() {
        let meta = br#"{"domain":"x/y","route_ttl":0}"#;
        let parsed = RequestMeta::parse(meta).unwrap();
        assert_eq!(parsed.domain, "x/y");

        // A policy whose membership rule covers root "x/" with any hash
        // grants read for the matching domain ...
        let permissive = PolicyConfig {
            allowed_roots: vec!["x/".to_string()],
            memberships: vec![Membership { domain_prefix: "x/".to_string(), hash_prefix: String::new() }],
            ..Default::default()
        };
        let mut allow = PolicyOverlay::new(permissive);
        let d1 = allow.decide(&parsed, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d1, Decision::Internal);
        assert!(d1.grants_read());

        // ... while a policy restricted to a disjoint root refuses at the
        // root/depth check before any payload is touched.
        let restrictive = PolicyConfig { allowed_roots: vec!["z/".to_string()], ..Default::default() };
        let mut deny = PolicyOverlay::new(restrictive);
        let d2 = deny.decide(&parsed, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d2, Decision::Reject);
        assert!(!d2.grants_read());
    }

    #[test]
    fn membership_grants_internal() {
        let config = PolicyConfig {
            allowed_roots: vec!["x/".to_string()],
            memberships: vec![Membership { domain_prefix: "x/".to_string(), hash_prefix: "abcd".to_string() }],
            ..Default::default()
        };
        let mut overlay = PolicyOverlay::new(config);
        let r = req("x/y", 0, 0);
        let d = overlay.decide(&r, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d, Decision::Internal);
    }

    #[test]
    fn coexist_rule_and_whitelist_grants_coexist_accepted() {
        let config = PolicyConfig {
            allowed_roots: vec!["x/".to_string()],
            coexist_rules: vec![CoexistRule { class: ProximityClass::Near, max_radius_m: 50.0 }],
            visual_whitelist: vec!["x/".to_string()],
            ..Default::default()
        };
        let mut overlay = PolicyOverlay::new(config);
        let r = req("x/y", 0, 0);
        let d = overlay.decide(&r, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d, Decision::CoexistAccepted);
    }

    #[test]
    fn neighbour_query_callback_grants_coexist_accepted() {
        let mut overlay = PolicyOverlay::new(base_config());
        let r = req("x/y", 0, 0);
        let d = overlay.decide(&r, &[], |_| true, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d, Decision::CoexistAccepted);
    }

    #[test]
    fn scenario_six_prep_then_accept_redirects() {
        let config = PolicyConfig { allowed_roots: vec!["a/".to_string()], max_depth: 10, ..Default::default() };
        let mut overlay = PolicyOverlay::new(config);
        let candidates = vec![
            Candidate { domain: "a/b/c1".to_string(), build_hash: String::new(), radius_m: 1.0 },
            Candidate { domain: "a/b/c2".to_string(), build_hash: String::new(), radius_m: 1.0 },
        ];
        let requester = req("a/b/c", 0, 10);

        let d1 = overlay.decide(
            &requester,
            &candidates,
            |_| false,
            |_, _neighbour, _tag| Some("a/b/c1".to_string()),
            |_, _| false,
            |_| {},
        );
        assert_eq!(d1, Decision::Prepared);

        let requester_round2 = req("a/b/c", 1, 10);
        let d2 = overlay.decide(
            &requester_round2,
            &candidates,
            |_| false,
            |_, _, _| None,
            |_, target| target == "a/b/c1",
            |_| {},
        );
        assert_eq!(d2, Decision::Redirect { target: "a/b/c1".to_string(), ttl_after: 9 });
    }

    #[test]
    fn scenario_six_round_two_reject_yields_sandbox() {
        let config = PolicyConfig { allowed_roots: vec!["a/".to_string()], max_depth: 10, ..Default::default() };
        let mut overlay = PolicyOverlay::new(config);
        let candidates = vec![Candidate { domain: "a/b/c1".to_string(), build_hash: String::new(), radius_m: 1.0 }];
        let requester = req("a/b/c", 0, 10);
        let _ = overlay.decide(&requester, &candidates, |_| false, |_, _, _| Some("a/b/c1".to_string()), |_, _| false, |_| {});

        let requester_round2 = req("a/b/c", 1, 10);
        let mut hook_called = false;
        let d2 = overlay.decide(
            &requester_round2,
            &candidates,
            |_| false,
            |_, _, _| None,
            |_, _| false,
            |_| hook_called = true,
        );
        assert_eq!(d2, Decision::UnknownSandbox);
        assert!(hook_called);
    }

    #[test]
    fn no_candidates_and_no_other_match_is_unknown_sandbox() {
        let config = PolicyConfig { allowed_roots: vec!["a/".to_string()], max_depth: 10, ..Default::default() };
        let mut overlay = PolicyOverlay::new(config);
        let r = req("a/q", 0, 0);
        let d = overlay.decide(&r, &[], |_| false, |_, _, _| None, |_, _| false, |_| {});
        assert_eq!(d, Decision::UnknownSandbox);
    }

    #[test]
    fn decision_grants_read_only_for_internal_and_coexist() {
        assert!(Decision::Internal.grants_read());
        assert!(Decision::CoexistAccepted.grants_read());
        assert!(!Decision::Reject.grants_read());
        assert!(!Decision::UnknownSandbox.grants_read());
        assert!(!Decision::Prepared.grants_read());
    }
}
