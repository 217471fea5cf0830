//! Encoding of oracle price updates for price-sensitive actions
//!
//! Prices are sent on-chain as 24-bit logarithmic ticks alongside a 24-bit
//! publish time diff per asset, both packed ten to a `bytes32` word. The
//! position of an entry is the asset index the contract binds it to, so the
//! builder never reorders or deduplicates observations.

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::B256;

use crate::{
    constants::{
        ENTRIES_PER_WORD, MAX_PUBLISH_TIME_DIFF, MAX_TICK, MIN_TICK, NUM_BYTES_PRICE_ENTRY,
        TICK_BASE,
    },
    errors::ScriptError,
};

/// A single encoded `int24` or `uint24`, big-endian
pub type PriceEntry = [u8; NUM_BYTES_PRICE_ENTRY];

/// A price observed for one asset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    /// The index of the asset in the oracle's asset list
    pub symbol_index: usize,
    /// The price in USD
    pub price: f64,
    /// The offset of the price's publish time from the minimum publish time, in seconds
    pub publish_time_diff: u32,
}

impl PriceObservation {
    /// Create an observation
    pub fn new(symbol_index: usize, price: f64, publish_time_diff: u32) -> Self {
        Self {
            symbol_index,
            price,
            publish_time_diff,
        }
    }
}

/// The encoded price update consumed by price-sensitive contract calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricePayload {
    /// One encoded tick per observation, in observation order
    price_updates: Vec<PriceEntry>,
    /// One encoded publish time diff per observation, in observation order
    publish_time_diffs: Vec<PriceEntry>,
    /// The minimum publish time, in seconds since the Unix epoch
    min_publish_time: u64,
}

impl PricePayload {
    /// Encode a sequence of observations against the time `now`
    pub fn build(observations: &[PriceObservation], now: SystemTime) -> Result<Self, ScriptError> {
        if observations.is_empty() {
            return Err(ScriptError::EmptyObservationSet);
        }

        let min_publish_time = now
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ScriptError::InvalidPrice(e.to_string()))?
            .as_secs();

        let mut price_updates = Vec::with_capacity(observations.len());
        let mut publish_time_diffs = Vec::with_capacity(observations.len());
        for obs in observations {
            let tick = price_to_tick(obs.price).map_err(|e| {
                ScriptError::InvalidPrice(format!("asset {}: {}", obs.symbol_index, e))
            })?;
            price_updates.push(encode_tick(tick));
            publish_time_diffs.push(encode_publish_time_diff(obs.publish_time_diff).map_err(
                |e| ScriptError::InvalidPrice(format!("asset {}: {}", obs.symbol_index, e)),
            )?);
        }

        Ok(Self {
            price_updates,
            publish_time_diffs,
            min_publish_time,
        })
    }

    /// The encoded ticks, aligned with the observations
    pub fn price_updates(&self) -> &[PriceEntry] {
        &self.price_updates
    }

    /// The encoded publish time diffs, aligned with the observations
    pub fn publish_time_diffs(&self) -> &[PriceEntry] {
        &self.publish_time_diffs
    }

    /// The minimum publish time, in seconds since the Unix epoch
    pub fn min_publish_time(&self) -> u64 {
        self.min_publish_time
    }

    /// The number of assets in the payload
    pub fn len(&self) -> usize {
        self.price_updates.len()
    }

    /// Whether the payload is empty, which `build` never produces
    pub fn is_empty(&self) -> bool {
        self.price_updates.is_empty()
    }

    /// The ticks packed into `bytes32` words for the `priceData` argument
    pub fn packed_price_updates(&self) -> Vec<B256> {
        pack_entries(&self.price_updates)
    }

    /// The publish time diffs packed into `bytes32` words for the `publishTimeData` argument
    pub fn packed_publish_time_diffs(&self) -> Vec<B256> {
        pack_entries(&self.publish_time_diffs)
    }
}

/// Convert a USD price to its logarithmic tick
pub fn price_to_tick(price: f64) -> Result<i32, String> {
    if !price.is_finite() || price <= 0. {
        return Err(format!("price {price} is not a positive number"));
    }

    let tick = (price.ln() / TICK_BASE.ln()).round();
    if tick < MIN_TICK as f64 || tick > MAX_TICK as f64 {
        return Err(format!("price {price} is outside the int24 tick range"));
    }

    Ok(tick as i32)
}

/// Convert a tick back to the USD price it encodes
pub fn tick_to_price(tick: i32) -> f64 {
    TICK_BASE.powi(tick)
}

/// Encode a tick as a big-endian `int24`
fn encode_tick(tick: i32) -> PriceEntry {
    let bytes = tick.to_be_bytes();
    [bytes[1], bytes[2], bytes[3]]
}

/// Encode a publish time diff as a big-endian `uint24`
fn encode_publish_time_diff(diff: u32) -> Result<PriceEntry, String> {
    if diff > MAX_PUBLISH_TIME_DIFF {
        return Err(format!("publish time diff {diff} exceeds uint24"));
    }

    let bytes = diff.to_be_bytes();
    Ok([bytes[1], bytes[2], bytes[3]])
}

/// Pack entries into words, filling each word from its most significant byte
fn pack_entries(entries: &[PriceEntry]) -> Vec<B256> {
    entries
        .chunks(ENTRIES_PER_WORD)
        .map(|chunk| {
            let mut word = B256::ZERO;
            for (i, entry) in chunk.iter().enumerate() {
                let offset = i * NUM_BYTES_PRICE_ENTRY;
                word[offset..offset + NUM_BYTES_PRICE_ENTRY].copy_from_slice(entry);
            }
            word
        })
        .collect()
}
