//! Request-scoped generation of bound parameter names.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Hands out unique placeholder names within one compilation.
pub trait ParamNamer: Send {
    /// `base` is a hint such as `price_gte`; the result is unique for this namer.
    fn name(&mut self, base: &str) -> String;
}

/// Keep `[A-Za-z0-9_]`, replace everything else with `_`.
pub fn sanitize(base: &str) -> String {
    let mut out: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, 'p');
    }
    out
}

/// Deterministic `base_1`, `base_2`, ... naming.
#[derive(Debug, Default)]
pub struct SequentialNamer {
    next: usize,
}

impl SequentialNamer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParamNamer for SequentialNamer {
    fn name(&mut self, base: &str) -> String {
        self.next += 1;
        format!("{}_{}", sanitize(base), self.next)
    }
}

/// `base_3fa9c1` style naming with a random hex suffix.
///
/// Not cryptographic; the issued set only guarantees no clash inside one request.
#[derive(Debug)]
pub struct RandomSuffixNamer {
    rng: StdRng,
    issued: HashSet<String>,
}

impl RandomSuffixNamer {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
        }
    }
}

impl Default for RandomSuffixNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamNamer for RandomSuffixNamer {
    fn name(&mut self, base: &str) -> String {
        let base = sanitize(base);
        loop {
            let candidate = format!("{}_{:06x}", base, self.rng.random_range(0..0x100_0000u32));
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Configurable choice of namer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamerKind {
    #[default]
    Sequential,
    Random,
}

impl NamerKind {
    pub fn namer(self) -> Box<dyn ParamNamer> {
        match self {
            NamerKind::Sequential => Box::new(SequentialNamer::new()),
            NamerKind::Random => Box::new(RandomSuffixNamer::new()),
        }
    }
}
