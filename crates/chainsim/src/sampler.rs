//! Chain Sampler
//!
//! Draws a random chain of distinct member addresses from the current
//! membership snapshot. The caller owns the RNG: one `StdRng` seeded
//! per process lifetime, so successive trials stay statistically
//! independent without reseeding artifacts.

use crate::error::ConfigError;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// How the chain length for a trial is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Use every available member (k = N).
    All,
    /// Uniformly random length in [1, N].
    Uniform,
    /// Fixed length k. Fatal if k exceeds the membership size.
    Exact(usize),
}

impl LengthPolicy {
    /// Resolve the policy to a concrete length for a membership of
    /// size `n`.
    pub fn resolve(&self, n: usize, rng: &mut impl Rng) -> Result<usize, ConfigError> {
        if n == 0 {
            return Err(ConfigError::EmptyMembership);
        }

        match *self {
            LengthPolicy::All => Ok(n),
            LengthPolicy::Uniform => Ok(rng.gen_range(1..=n)),
            LengthPolicy::Exact(k) if k > n => Err(ConfigError::ChainTooLong {
                requested: k,
                available: n,
            }),
            LengthPolicy::Exact(k) => Ok(k),
        }
    }
}

impl FromStr for LengthPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(LengthPolicy::All),
            "random" => Ok(LengthPolicy::Uniform),
            other => match other.parse::<usize>() {
                Ok(k) if k > 0 => Ok(LengthPolicy::Exact(k)),
                _ => Err(ConfigError::InvalidLengthPolicy(s.to_string())),
            },
        }
    }
}

impl fmt::Display for LengthPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LengthPolicy::All => write!(f, "all"),
            LengthPolicy::Uniform => write!(f, "random"),
            LengthPolicy::Exact(k) => write!(f, "{k}"),
        }
    }
}

/// Draw `k` distinct members uniformly without replacement.
///
/// The returned indices from `index::sample` are already in random
/// order, so the chain needs no separate shuffle.
pub fn sample_chain(
    members: &[String],
    k: usize,
    rng: &mut impl Rng,
) -> Result<Vec<String>, ConfigError> {
    if k > members.len() {
        return Err(ConfigError::ChainTooLong {
            requested: k,
            available: members.len(),
        });
    }

    let chain = rand::seq::index::sample(rng, members.len(), k)
        .into_iter()
        .map(|i| members[i].clone())
        .collect();

    Ok(chain)
}
