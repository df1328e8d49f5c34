//! Experiment Driver
//!
//! Repeatedly samples a chain from the membership snapshot, issues the
//! root chain request, and emits one CSV record per trial. A failed
//! trial records the `-1` sentinel and the run continues.

use crate::config::LoaderConfig;
use crate::relay::client::fetch_chain_payload;
use crate::sampler::{sample_chain, LengthPolicy};
use anyhow::{Context, Result};
use rand::rngs::StdRng;
use std::io::Write;
use std::time::Instant;
use tracing::warn;

/// Duration recorded for a failed trial.
const FAILURE_SENTINEL: f64 = -1.0;

/// Run the configured number of trials against the given membership
/// snapshot, writing one CSV record per trial to `out`.
pub async fn run_trials(
    http: &reqwest::Client,
    members: &[String],
    policy: LengthPolicy,
    config: &LoaderConfig,
    rng: &mut StdRng,
    out: &mut impl Write,
) -> Result<()> {
    if config.show_chain {
        writeln!(out, "chain,chain_length,duration")?;
    } else {
        writeln!(out, "chain_length,duration")?;
    }

    for trial in 0..config.count {
        let k = policy.resolve(members.len(), rng)?;
        let chain = sample_chain(members, k, rng)?;

        let start = Instant::now();
        let result = fetch_chain_payload(http, &chain, config.payload_size).await;
        let elapsed = start.elapsed().as_secs_f64();

        let duration = match result {
            Ok(payload) => {
                if payload.len() as u64 != config.payload_size {
                    warn!(
                        trial = trial,
                        expected = config.payload_size,
                        got = payload.len(),
                        "Payload length mismatch"
                    );
                }
                elapsed
            }
            Err(e) => {
                warn!(trial = trial, error = %e, "Trial failed");
                FAILURE_SENTINEL
            }
        };

        if config.show_chain {
            // Space-separated hops inside one quoted field; URLs carry
            // no quotes or commas, so the record stays plain CSV.
            writeln!(out, "\"{}\",{},{:.6}", chain.join(" "), chain.len(), duration)?;
        } else {
            writeln!(out, "{},{:.6}", chain.len(), duration)?;
        }
    }

    out.flush().context("Failed to flush trial output")?;
    Ok(())
}
