//! Price oracle clients supplying observations to price-sensitive actions

use std::{
    collections::HashMap,
    fmt::{self, Display},
    str::FromStr,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy::transports::http::reqwest::{Client, Url};
use serde::Deserialize;
use tracing::info;

use crate::{errors::ScriptError, price::PriceObservation};

/// The assets whose prices the oracle publishes, in on-chain index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSymbol {
    /// Ether
    Eth,
    /// Bitcoin
    Btc,
    /// USD Coin
    Usdc,
    /// Tether
    Usdt,
    /// Dai
    Dai,
    /// Apple equity
    Aapl,
    /// Japanese yen
    Jpy,
}

impl PriceSymbol {
    /// Every asset, in on-chain index order
    pub const ALL: [PriceSymbol; 7] = [
        PriceSymbol::Eth,
        PriceSymbol::Btc,
        PriceSymbol::Usdc,
        PriceSymbol::Usdt,
        PriceSymbol::Dai,
        PriceSymbol::Aapl,
        PriceSymbol::Jpy,
    ];

    /// The index of the asset in the on-chain price feed
    pub fn index(&self) -> usize {
        match self {
            PriceSymbol::Eth => 0,
            PriceSymbol::Btc => 1,
            PriceSymbol::Usdc => 2,
            PriceSymbol::Usdt => 3,
            PriceSymbol::Dai => 4,
            PriceSymbol::Aapl => 5,
            PriceSymbol::Jpy => 6,
        }
    }

    /// The Pyth price feed ID of the asset, hex without the `0x` prefix
    pub fn pyth_feed_id(&self) -> &'static str {
        match self {
            PriceSymbol::Eth => "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
            PriceSymbol::Btc => "e62df6c8b4a85fe1a67db44dc12de5db330f7ac66b72dc658afedf0f4a415b43",
            PriceSymbol::Usdc => "eaa020c61cc479712813461ce153894a96a6c00b21ed0cfc2798d1f9a9e9c94a",
            PriceSymbol::Usdt => "2b89b9dc8fdf9f34709a5b106b472f0f39bb6ca9ce04b0fd7f2e971688e2e53b",
            PriceSymbol::Dai => "b0948a5e5313200c632b51bb5ca32f6de0d36e9950a942d19751e833f70dabfd",
            PriceSymbol::Aapl => "49f6b65cb1de6b10eaf75e7c03ca029c306d0357e91b5311b175084a5ad55688",
            PriceSymbol::Jpy => "ef2c98c804ba503c6a707e38be4dfbb16683775f195b091252bf24693042fd52",
        }
    }

    /// The price the liquidity scripts use when none is supplied
    pub fn default_price(&self) -> f64 {
        match self {
            PriceSymbol::Eth => 1900.02,
            PriceSymbol::Btc => 20000.29,
            PriceSymbol::Usdc | PriceSymbol::Usdt | PriceSymbol::Dai => 1.,
            PriceSymbol::Aapl => 137.3,
            PriceSymbol::Jpy => 198.2,
        }
    }
}

impl Display for PriceSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceSymbol::Eth => write!(f, "ETH"),
            PriceSymbol::Btc => write!(f, "BTC"),
            PriceSymbol::Usdc => write!(f, "USDC"),
            PriceSymbol::Usdt => write!(f, "USDT"),
            PriceSymbol::Dai => write!(f, "DAI"),
            PriceSymbol::Aapl => write!(f, "AAPL"),
            PriceSymbol::Jpy => write!(f, "JPY"),
        }
    }
}

impl FromStr for PriceSymbol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PriceSymbol::ALL
            .into_iter()
            .find(|sym| sym.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown price symbol `{s}`"))
    }
}

/// A source of current prices
#[allow(async_fn_in_trait)]
pub trait PriceOracle {
    /// Fetch one observation per symbol, in the order the symbols are given
    async fn observe(&self, symbols: &[PriceSymbol])
        -> Result<Vec<PriceObservation>, ScriptError>;
}

/// An oracle serving operator-supplied prices
#[derive(Debug, Clone, Default)]
pub struct FixedPriceOracle {
    /// Prices overriding the defaults
    prices: HashMap<PriceSymbol, f64>,
}

impl FixedPriceOracle {
    /// An oracle serving the default price of every asset
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the price of an asset
    pub fn with_price(mut self, symbol: PriceSymbol, price: f64) -> Self {
        self.prices.insert(symbol, price);
        self
    }
}

impl PriceOracle for FixedPriceOracle {
    async fn observe(
        &self,
        symbols: &[PriceSymbol],
    ) -> Result<Vec<PriceObservation>, ScriptError> {
        Ok(symbols
            .iter()
            .map(|sym| {
                let price = self
                    .prices
                    .get(sym)
                    .copied()
                    .unwrap_or_else(|| sym.default_price());
                PriceObservation::new(sym.index(), price, 0)
            })
            .collect())
    }
}

/// The response of the Hermes latest price endpoint
#[derive(Debug, Deserialize)]
struct HermesResponse {
    /// The parsed price updates
    parsed: Vec<HermesPriceFeed>,
}

/// A single price feed in a Hermes response
#[derive(Debug, Deserialize)]
struct HermesPriceFeed {
    /// The feed ID, hex without the `0x` prefix
    id: String,
    /// The latest price
    price: HermesPrice,
}

/// A Pyth price with its exponent and publish time
#[derive(Debug, Deserialize)]
struct HermesPrice {
    /// The mantissa, as a decimal string
    price: String,
    /// The base 10 exponent
    expo: i32,
    /// The publish time, in seconds since the Unix epoch
    publish_time: u64,
}

impl HermesPrice {
    /// The price as a float
    fn to_f64(&self) -> Result<f64, ScriptError> {
        let mantissa = self
            .price
            .parse::<i64>()
            .map_err(|e| ScriptError::OracleUnavailable(e.to_string()))?;
        Ok(mantissa as f64 * 10f64.powi(self.expo))
    }
}

/// An oracle reading the latest Pyth prices from a Hermes endpoint
#[derive(Debug, Clone)]
pub struct HermesPriceOracle {
    /// The HTTP client, carrying the request timeout
    client: Client,
    /// The base URL of the Hermes service
    base_url: Url,
    /// The maximum age of an accepted quote
    max_age: Duration,
}

impl HermesPriceOracle {
    /// Create a client for the given Hermes service
    pub fn new(base_url: &str, timeout: Duration, max_age: Duration) -> Result<Self, ScriptError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            max_age,
        })
    }
}

impl PriceOracle for HermesPriceOracle {
    async fn observe(
        &self,
        symbols: &[PriceSymbol],
    ) -> Result<Vec<PriceObservation>, ScriptError> {
        let mut url = self
            .base_url
            .join("v2/updates/price/latest")
            .map_err(|e| ScriptError::OracleUnavailable(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for sym in symbols {
                query.append_pair("ids[]", sym.pyth_feed_id());
            }
            query.append_pair("parsed", "true");
        }

        let resp = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScriptError::UpstreamTimeout(format!("hermes: {e}"))
            } else {
                ScriptError::OracleUnavailable(e.to_string())
            }
        })?;
        if !resp.status().is_success() {
            return Err(ScriptError::OracleUnavailable(format!(
                "hermes responded with {}",
                resp.status()
            )));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ScriptError::OracleUnavailable(e.to_string()))?;
        let parsed: HermesResponse =
            serde_json::from_str(&body).map_err(|e| ScriptError::OracleUnavailable(e.to_string()))?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ScriptError::OracleUnavailable(e.to_string()))?
            .as_secs();
        let feeds: HashMap<String, HermesPrice> = parsed
            .parsed
            .into_iter()
            .map(|feed| (feed.id.trim_start_matches("0x").to_lowercase(), feed.price))
            .collect();

        symbols
            .iter()
            .map(|sym| {
                let quote = feeds.get(sym.pyth_feed_id()).ok_or_else(|| {
                    ScriptError::OracleUnavailable(format!("no price returned for {sym}"))
                })?;

                let age = now.saturating_sub(quote.publish_time);
                if age > self.max_age.as_secs() {
                    return Err(ScriptError::OracleUnavailable(format!(
                        "{sym} price is {age}s old"
                    )));
                }

                let price = quote.to_f64()?;
                info!("{sym}: {price} ({age}s old)");
                Ok(PriceObservation::new(sym.index(), price, 0))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_indices_match_order() {
        for (i, sym) in PriceSymbol::ALL.iter().enumerate() {
            assert_eq!(sym.index(), i);
        }
    }

    #[test]
    fn test_parse_symbol() {
        assert_eq!("eth".parse::<PriceSymbol>().unwrap(), PriceSymbol::Eth);
        assert_eq!("USDC".parse::<PriceSymbol>().unwrap(), PriceSymbol::Usdc);
        assert!("doge".parse::<PriceSymbol>().is_err());
    }

    #[tokio::test]
    async fn test_fixed_oracle_preserves_order() {
        let oracle = FixedPriceOracle::new()
            .with_price(PriceSymbol::Eth, 2500.);

        let obs = oracle
            .observe(&[PriceSymbol::Usdc, PriceSymbol::Eth])
            .await
            .unwrap();
        assert_eq!(
            obs,
            vec![
                PriceObservation::new(2, 1., 0),
                PriceObservation::new(0, 2500., 0)
            ]
        );
    }

    #[test]
    fn test_hermes_price_conversion() {
        let json = r#"{
            "binary": { "encoding": "hex", "data": [] },
            "parsed": [{
                "id": "ff61491a931112ddf1bd8147cd1b641375f79f5825126d665480874634fd0ace",
                "price": { "price": "190002000000", "conf": "1", "expo": -8, "publish_time": 1700000000 },
                "ema_price": { "price": "190000000000", "conf": "1", "expo": -8, "publish_time": 1700000000 }
            }]
        }"#;

        let resp: HermesResponse = serde_json::from_str(json).unwrap();
        let price = resp.parsed[0].price.to_f64().unwrap();
        assert!((price - 1900.02).abs() < 1e-9);
        assert_eq!(resp.parsed[0].price.publish_time, 1_700_000_000);
    }
}
