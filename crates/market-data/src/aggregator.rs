//! Two-sided chain aggregation
//!
//! Upstream only returns one side per request, so a logical chain request is
//! split into legs, dispatched concurrently through the shared
//! [`FetchClient`], joined under one timeout and merged.
//!
//! # Merge precedence
//!
//! The header (symbol, underlying price, volatility, interest rate) comes
//! from the first leg in dispatch order. For each side, the legs requested
//! for that side win when their union is non-empty; otherwise the first
//! other leg carrying data for that side supplies it. Within a group the
//! first leg wins per expiration key.

use crate::chain::{ExpirationMap, OptionChain};
use crate::credentials::Credentials;
use crate::error::{MarketDataError, Result};
use crate::fetch::{FetchClient, FetchResponse};
use crate::metrics::AggregationMetrics;
use crate::request::{ChainLeg, ChainRequest, DEFAULT_CHAIN_URL};
use common::OptionSide;
use futures::future::try_join_all;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use url::Url;

/// Aggregator settings
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Chains endpoint
    pub base_url: Url,
    /// Bound on the whole leg join
    pub timeout: Duration,
}

impl AggregatorConfig {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MarketDataError::InvalidRequest(format!("bad base url {}: {}", base_url, e)))?;
        Ok(Self { base_url, timeout })
    }

    /// Default endpoint with a 5000 ms join bound
    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_CHAIN_URL, Duration::from_millis(5000))
    }
}

/// One deserialized leg, tagged with the side it was requested for
#[derive(Debug, Clone)]
pub struct PartialChain {
    pub side: Option<OptionSide>,
    pub chain: OptionChain,
}

/// Fetches and merges two-sided option chains
pub struct ChainAggregator {
    client: FetchClient,
    credentials: Credentials,
    config: AggregatorConfig,
    halted: AtomicBool,
    metrics: AggregationMetrics,
}

impl ChainAggregator {
    pub fn new(client: FetchClient, credentials: Credentials, config: AggregatorConfig) -> Self {
        Self {
            client,
            credentials,
            config,
            halted: AtomicBool::new(false),
            metrics: AggregationMetrics::new(),
        }
    }

    /// True once upstream has rejected the credential
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Fetch both sides of a chain and merge them.
    ///
    /// Fails as a whole if any leg fails or the join exceeds the configured
    /// timeout; a partial chain is never returned.
    pub async fn get_chain(&self, request: &ChainRequest) -> Result<OptionChain> {
        self.ensure_live()?;
        let legs = request.split_legs(&self.config.base_url, self.credentials.api_key())?;
        let start = Instant::now();

        let result = self.collect(&legs).await.and_then(merge_legs);
        self.finish(request, legs.len(), start, result)
    }

    /// Fetch both sides in a single `contractType=ALL` request
    pub async fn get_chain_combined(&self, request: &ChainRequest) -> Result<OptionChain> {
        self.ensure_live()?;
        let leg = request.combined_leg(&self.config.base_url, self.credentials.api_key())?;
        let start = Instant::now();

        let result = self
            .collect(std::slice::from_ref(&leg))
            .await
            .and_then(merge_legs);
        self.finish(request, 1, start, result)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_halted() {
            return Err(MarketDataError::UpstreamAuth(
                "aggregator halted after credential rejection".to_string(),
            ));
        }
        Ok(())
    }

    fn finish(
        &self,
        request: &ChainRequest,
        legs: usize,
        start: Instant,
        result: Result<OptionChain>,
    ) -> Result<OptionChain> {
        let elapsed = start.elapsed();
        self.metrics
            .record(elapsed, legs, result.as_ref().err().map(MarketDataError::kind));

        match &result {
            Ok(chain) => info!(
                ticker = %request.ticker,
                legs,
                calls = chain.contract_count(OptionSide::Call),
                puts = chain.contract_count(OptionSide::Put),
                elapsed_ms = elapsed.as_millis() as u64,
                "Chain aggregated"
            ),
            Err(err) if err.is_fatal() => {
                self.halted.store(true, Ordering::SeqCst);
                error!(ticker = %request.ticker, error = %err, "Credential rejected, halting aggregator");
            }
            Err(err) => warn!(ticker = %request.ticker, error = %err, "Chain aggregation failed"),
        }
        result
    }

    /// Dispatch every leg and join them under the aggregation timeout
    async fn collect(&self, legs: &[ChainLeg]) -> Result<Vec<PartialChain>> {
        let headers = self.credentials.headers().await;
        let completed = Arc::new(AtomicUsize::new(0));

        let pending: Vec<_> = legs
            .iter()
            .map(|leg| {
                let (tx, rx) = oneshot::channel();
                let done = completed.clone();
                debug!(side = ?leg.side, expiration = ?leg.expiration, "Dispatching chain leg");

                self.client.get_with(leg.url.as_str(), headers.clone(), move |result| {
                    done.fetch_add(1, Ordering::SeqCst);
                    // Receiver is gone once the join has timed out or failed
                    let _ = tx.send(result);
                });

                let side = leg.side;
                async move {
                    let response = rx
                        .await
                        .map_err(|_| MarketDataError::Network("leg completion dropped".to_string()))??;
                    let chain = decode_leg(side, response)?;
                    Ok::<_, MarketDataError>(PartialChain { side, chain })
                }
            })
            .collect();

        let aggregation_timeout = || MarketDataError::AggregationTimeout {
            timeout_ms: self.config.timeout.as_millis() as u64,
            completed: completed.load(Ordering::SeqCst),
            legs: legs.len(),
        };

        match tokio::time::timeout(self.config.timeout, try_join_all(pending)).await {
            Ok(Ok(partials)) => Ok(partials),
            Ok(Err(MarketDataError::Timeout { .. })) | Err(_) => Err(aggregation_timeout()),
            Ok(Err(err)) => Err(err),
        }
    }
}

/// Classify an upstream response and parse it into a partial chain
fn decode_leg(side: Option<OptionSide>, response: FetchResponse) -> Result<OptionChain> {
    let leg = side.map(|s| s.as_str()).unwrap_or("ALL");

    let rejected =
        response.status == 401 || (!response.is_success() && response.body.contains("InvalidApiKey"));
    if rejected {
        return Err(MarketDataError::UpstreamAuth(format!(
            "HTTP {} on {} leg: {}",
            response.status,
            leg,
            response.body.trim()
        )));
    }
    if !response.is_success() {
        return Err(MarketDataError::UpstreamData(format!(
            "HTTP {} on {} leg",
            response.status, leg
        )));
    }

    let chain = OptionChain::from_json(&response.body)?;
    chain.validate()?;
    Ok(chain)
}

/// Merge partial chains into one, in dispatch order
pub fn merge_legs(legs: Vec<PartialChain>) -> Result<OptionChain> {
    let mut merged = legs
        .first()
        .map(|leg| leg.chain.scaffold())
        .ok_or_else(|| MarketDataError::UpstreamData("no legs to merge".to_string()))?;

    let mut requested: [ExpirationMap; 2] = Default::default();
    let mut other: [ExpirationMap; 2] = Default::default();

    for mut leg in legs {
        for (idx, side) in OptionSide::BOTH.into_iter().enumerate() {
            let target = if leg.side == Some(side) {
                &mut requested[idx]
            } else {
                &mut other[idx]
            };
            for (key, strikes) in leg.chain.take(side) {
                target.entry(key).or_insert(strikes);
            }
        }
    }

    for (idx, side) in OptionSide::BOTH.into_iter().enumerate() {
        let own = std::mem::take(&mut requested[idx]);
        let foreign = std::mem::take(&mut other[idx]);

        if !own.is_empty() {
            if !foreign.is_empty() {
                warn!(
                    symbol = %merged.symbol,
                    %side,
                    "Multiple legs returned data for the same side, keeping the leg requested for it"
                );
            }
            merged.set(side, own);
        } else {
            merged.set(side, foreign);
        }
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchConfig, MockReply, MockTransport};
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use serde_json::json;

    fn leg_body(price: f64, side: OptionSide, key: &str, strikes: &[f64]) -> String {
        let days: i64 = key.rsplit_once(':').unwrap().1.parse().unwrap();
        let mut strike_map = serde_json::Map::new();
        for s in strikes {
            strike_map.insert(
                format!("{:.1}", s),
                json!([{
                    "putCall": side.as_str(),
                    "symbol": format!("SPY_{}{}", side.as_str(), s),
                    "strikePrice": s,
                    "daysToExpiration": days,
                    "mark": 1.0
                }]),
            );
        }
        let map = json!({ key: strike_map });
        let (calls, puts) = match side {
            OptionSide::Call => (map, json!({})),
            OptionSide::Put => (json!({}), map),
        };
        json!({
            "symbol": "SPY",
            "status": "SUCCESS",
            "underlyingPrice": price,
            "interestRate": 5.0,
            "volatility": 29.0,
            "callExpDateMap": calls,
            "putExpDateMap": puts
        })
        .to_string()
    }

    fn aggregator(transport: MockTransport, request_timeout: Duration) -> (ChainAggregator, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let client = FetchClient::new(
            transport.clone(),
            FetchConfig {
                request_timeout,
                max_in_flight: 8,
            },
        );
        let config = AggregatorConfig::new("https://api.test/chains", Duration::from_millis(5000)).unwrap();
        (
            ChainAggregator::new(client, Credentials::none().with_bearer("tok"), config),
            transport,
        )
    }

    fn partial(side: Option<OptionSide>, price: f64, calls: &[(&str, f64)], puts: &[(&str, f64)]) -> PartialChain {
        let mut chain = OptionChain::new("SPY");
        chain.underlying_price = price;
        for (s, entries) in [(OptionSide::Call, calls), (OptionSide::Put, puts)] {
            let mut map = ExpirationMap::new();
            for (key, strike) in entries {
                let body = leg_body(price, s, key, &[*strike]);
                let leg = OptionChain::from_json(&body).unwrap();
                map.extend(leg.get(s).clone());
            }
            chain.set(s, map);
        }
        PartialChain { side, chain }
    }

    #[tokio::test]
    async fn test_get_chain_merges_sides() {
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::ok(leg_body(301.0, OptionSide::Call, "2024-09-20:30", &[300.0, 305.0])),
            )
            .with_route(
                "contractType=PUT",
                MockReply::ok(leg_body(302.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
            );
        let (aggregator, transport) = aggregator(transport, Duration::from_secs(5));

        let chain = aggregator.get_chain(&ChainRequest::new("SPY")).await.unwrap();

        assert_eq!(chain.symbol, "SPY");
        assert_eq!(chain.underlying_price, 301.0);
        assert_eq!(chain.contract_count(OptionSide::Call), 2);
        assert_eq!(chain.contract_count(OptionSide::Put), 1);

        let seen = transport.requests();
        assert_eq!(seen.len(), 2);
        assert!(seen[0]
            .headers
            .contains(&("Authorization".to_string(), "Bearer tok".to_string())));
    }

    #[tokio::test]
    async fn test_get_chain_per_expiration_legs() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 9, d).unwrap();
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL&fromDate=2024-09-20",
                MockReply::ok(leg_body(301.0, OptionSide::Call, "2024-09-20:30", &[300.0])),
            )
            .with_route(
                "contractType=CALL&fromDate=2024-09-27",
                MockReply::ok(leg_body(301.5, OptionSide::Call, "2024-09-27:37", &[300.0])),
            )
            .with_route(
                "contractType=PUT",
                MockReply::ok(leg_body(302.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
            );
        let (aggregator, transport) = aggregator(transport, Duration::from_secs(5));

        let request = ChainRequest::new("SPY").expirations([date(20), date(27)]);
        let chain = aggregator.get_chain(&request).await.unwrap();

        assert_eq!(transport.request_count(), 4);
        assert_eq!(
            chain.expiration_keys(OptionSide::Call).collect::<Vec<_>>(),
            vec!["2024-09-20:30", "2024-09-27:37"]
        );
        assert_eq!(chain.expiration_keys(OptionSide::Put).count(), 1);
        assert_eq!(chain.underlying_price, 301.0);
    }

    #[tokio::test]
    async fn test_get_chain_combined() {
        let transport = MockTransport::new().with_route(
            "contractType=ALL",
            MockReply::ok(leg_body(301.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
        );
        let (aggregator, transport) = aggregator(transport, Duration::from_secs(5));

        let chain = aggregator
            .get_chain_combined(&ChainRequest::new("SPY"))
            .await
            .unwrap();
        assert_eq!(transport.request_count(), 1);
        assert!(chain.is_empty(OptionSide::Call));
        assert_eq!(chain.contract_count(OptionSide::Put), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_leg_times_out_aggregation() {
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::ok(leg_body(301.0, OptionSide::Call, "2024-09-20:30", &[300.0]))
                    .with_delay(Duration::from_secs(10)),
            )
            .with_route(
                "contractType=PUT",
                MockReply::ok(leg_body(301.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
            );
        let (aggregator, transport) = aggregator(transport, Duration::from_secs(30));

        let result = aggregator.get_chain(&ChainRequest::new("SPY")).await;
        assert_matches!(
            result,
            Err(MarketDataError::AggregationTimeout {
                timeout_ms: 5000,
                completed: 1,
                legs: 2
            })
        );
        assert!(!aggregator.is_halted());

        // Let the abandoned call leg finish into its dropped receiver
        tokio::time::advance(Duration::from_secs(11)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(transport.request_count(), 2);

        transport.route(
            "contractType=ALL",
            MockReply::ok(leg_body(303.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
        );
        let chain = aggregator
            .get_chain_combined(&ChainRequest::new("SPY"))
            .await
            .unwrap();
        assert_eq!(chain.underlying_price, 303.0);
        assert_eq!(chain.contract_count(OptionSide::Put), 1);
        assert_eq!(transport.request_count(), 3);
        assert!(!aggregator.is_halted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_leg_request_timeout_reported_as_aggregation_timeout() {
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::ok("{}").with_delay(Duration::from_secs(10)),
            )
            .with_route("contractType=PUT", MockReply::ok("{}"));
        let (aggregator, _) = aggregator(transport, Duration::from_millis(100));

        let result = aggregator.get_chain(&ChainRequest::new("SPY")).await;
        assert_matches!(result, Err(MarketDataError::AggregationTimeout { legs: 2, .. }));
    }

    #[tokio::test]
    async fn test_invalid_credential_halts_aggregator() {
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::status(401, r#"{"error":"InvalidApiKey"}"#),
            )
            .with_route(
                "contractType=PUT",
                MockReply::ok(leg_body(301.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
            );
        let (aggregator, transport) = aggregator(transport, Duration::from_secs(5));

        let first = aggregator.get_chain(&ChainRequest::new("SPY")).await;
        assert_matches!(first, Err(MarketDataError::UpstreamAuth(_)));
        assert!(aggregator.is_halted());

        let sent = transport.request_count();
        let second = aggregator.get_chain(&ChainRequest::new("SPY")).await;
        assert_matches!(second, Err(ref e) if e.is_fatal());
        assert_eq!(transport.request_count(), sent);
    }

    #[tokio::test]
    async fn test_invalid_api_key_text_in_success_body_is_data() {
        let mut body: serde_json::Value =
            serde_json::from_str(&leg_body(301.0, OptionSide::Put, "2024-09-20:30", &[295.0])).unwrap();
        body["putExpDateMap"]["2024-09-20:30"]["295.0"][0]["description"] = json!("SPY InvalidApiKey Put");
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::ok(leg_body(301.0, OptionSide::Call, "2024-09-20:30", &[300.0])),
            )
            .with_route("contractType=PUT", MockReply::ok(body.to_string()));
        let (aggregator, _) = aggregator(transport, Duration::from_secs(5));

        let chain = aggregator.get_chain(&ChainRequest::new("SPY")).await.unwrap();
        assert_eq!(chain.contract_count(OptionSide::Put), 1);
        assert!(!aggregator.is_halted());
    }

    #[test]
    fn test_invalid_api_key_on_error_status_is_fatal() {
        let err = decode_leg(
            Some(OptionSide::Put),
            FetchResponse::new(403, r#"{"error":"InvalidApiKey"}"#),
        )
        .unwrap_err();
        assert!(err.is_fatal());
        assert_matches!(
            decode_leg(None, FetchResponse::new(500, "InvalidApiKey")),
            Err(MarketDataError::UpstreamAuth(_))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_leg_fails_fast() {
        let transport = MockTransport::new()
            .with_route(
                "contractType=CALL",
                MockReply::ok("{}").with_delay(Duration::from_secs(2)),
            )
            .with_route("contractType=PUT", MockReply::status(500, "internal error"));
        let (aggregator, _) = aggregator(transport, Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        let result = aggregator.get_chain(&ChainRequest::new("SPY")).await;

        assert_matches!(result, Err(MarketDataError::UpstreamData(_)));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!aggregator.is_halted());
    }

    #[tokio::test]
    async fn test_malformed_leg_is_upstream_data() {
        let transport = MockTransport::new()
            .with_route("contractType=CALL", MockReply::ok("not json"))
            .with_route(
                "contractType=PUT",
                MockReply::ok(leg_body(301.0, OptionSide::Put, "2024-09-20:30", &[295.0])),
            );
        let (aggregator, _) = aggregator(transport, Duration::from_secs(5));

        let result = aggregator.get_chain(&ChainRequest::new("SPY")).await;
        assert_matches!(result, Err(MarketDataError::UpstreamData(_)));
    }

    #[test]
    fn test_merge_takes_non_empty_side_per_leg() {
        let legs = vec![
            partial(Some(OptionSide::Call), 301.0, &[("2024-09-20:30", 300.0)], &[]),
            partial(Some(OptionSide::Put), 302.0, &[], &[("2024-09-20:30", 295.0)]),
        ];
        let expected_calls = legs[0].chain.get(OptionSide::Call).clone();
        let expected_puts = legs[1].chain.get(OptionSide::Put).clone();

        let merged = merge_legs(legs).unwrap();
        assert_eq!(merged.get(OptionSide::Call), &expected_calls);
        assert_eq!(merged.get(OptionSide::Put), &expected_puts);
        assert_eq!(merged.underlying_price, 301.0);
    }

    #[test]
    fn test_merge_same_side_conflict_prefers_requested_leg() {
        let legs = vec![
            partial(
                Some(OptionSide::Call),
                301.0,
                &[("2024-09-20:30", 300.0)],
                &[("2024-09-27:37", 290.0)],
            ),
            partial(Some(OptionSide::Put), 301.0, &[], &[("2024-09-20:30", 295.0)]),
        ];
        let merged = merge_legs(legs).unwrap();
        assert_eq!(
            merged.expiration_keys(OptionSide::Put).collect::<Vec<_>>(),
            vec!["2024-09-20:30"]
        );
    }

    #[test]
    fn test_merge_falls_back_to_other_leg() {
        let legs = vec![
            partial(
                Some(OptionSide::Call),
                301.0,
                &[("2024-09-20:30", 300.0)],
                &[("2024-09-27:37", 290.0)],
            ),
            partial(Some(OptionSide::Put), 301.0, &[], &[]),
        ];
        let merged = merge_legs(legs).unwrap();
        assert_eq!(
            merged.expiration_keys(OptionSide::Put).collect::<Vec<_>>(),
            vec!["2024-09-27:37"]
        );
    }

    #[test]
    fn test_merge_empty_sides_are_values() {
        let legs = vec![
            partial(Some(OptionSide::Call), 301.0, &[], &[]),
            partial(Some(OptionSide::Put), 301.0, &[], &[]),
        ];
        let merged = merge_legs(legs).unwrap();
        assert!(merged.is_empty(OptionSide::Call));
        assert!(merged.is_empty(OptionSide::Put));
        assert!(merge_legs(Vec::new()).is_err());
    }
}
