//! REST-backed market feed client.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::FeedError;
use crate::orderbook::{OrderBook, PriceLevel};
use crate::retry::RetryPolicy;

use super::feed::MarketFeed;
use super::types::{Market, Outcome};

/// Market feed over the venue's metadata and CLOB HTTP APIs.
#[derive(Debug, Clone)]
pub struct HttpMarketFeed {
    http: reqwest::Client,
    gamma_url: String,
    clob_url: String,
    retry: RetryPolicy,
}

/// Market record as returned by the metadata API.
#[derive(Debug, Clone, Deserialize)]
struct MarketDto {
    id: Option<String>,
    question: Option<String>,
    #[serde(rename = "conditionId", alias = "condition_id")]
    condition_id: Option<String>,
    /// The API encodes the token pair as a JSON string like `"[\"a\",\"b\"]"`.
    #[serde(rename = "clobTokenIds", alias = "clob_token_ids")]
    clob_token_ids: Option<String>,
    #[serde(rename = "endDate", alias = "end_date")]
    end_date: Option<String>,
    volume: Option<String>,
    category: Option<String>,
}

/// Order book response from the CLOB API.
#[derive(Debug, Clone, Deserialize)]
struct BookDto {
    bids: Option<Vec<LevelDto>>,
    asks: Option<Vec<LevelDto>>,
}

/// Single price level on the wire; prices and sizes are decimal strings.
#[derive(Debug, Clone, Deserialize)]
struct LevelDto {
    price: String,
    size: String,
}

impl HttpMarketFeed {
    /// Create a feed client from configuration.
    pub fn new(config: &Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.http_timeout_ms))
            .connect_timeout(std::time::Duration::from_millis(500))
            .tcp_nodelay(true)
            .tcp_keepalive(std::time::Duration::from_secs(30))
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .build()
            .expect("failed to create HTTP client");

        Self {
            http,
            gamma_url: config.gamma_api_url.clone(),
            clob_url: config.clob_api_url.clone(),
            retry: RetryPolicy::from_config(config),
        }
    }

    /// GET with retries for transient transport failures.
    async fn get_with_retry<T>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = self.http.get(url).query(query).send().await;
            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    if !self.retry.has_attempts_left(attempt) || !RetryPolicy::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.retry.pause(attempt, &err).await;
                    continue;
                }
            };

            if !response.status().is_success() {
                return Err(FeedError::FetchFailed {
                    resource: url.to_string(),
                    reason: format!("HTTP {}", response.status()),
                });
            }

            match response.json::<T>().await {
                Ok(parsed) => return Ok(parsed),
                Err(err) => {
                    if !self.retry.has_attempts_left(attempt) || !RetryPolicy::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.retry.pause(attempt, &err).await;
                }
            }
        }
    }

    fn parse_market(dto: MarketDto) -> Option<Market> {
        let id = dto.id?;

        let token_ids: Vec<String> =
            serde_json::from_str(dto.clob_token_ids.as_deref()?).ok()?;
        if token_ids.len() < 2 {
            debug!(market = %id, "market has fewer than two outcome tokens");
            return None;
        }
        let yes_token_id = token_ids[0].clone();
        let no_token_id = token_ids[1].clone();
        if yes_token_id.is_empty() || no_token_id.is_empty() || yes_token_id == no_token_id {
            debug!(market = %id, "market token ids missing or not distinct");
            return None;
        }

        let end_date = dto
            .end_date
            .as_deref()
            .and_then(|s| OffsetDateTime::parse(s, &Rfc3339).ok())?;

        let volume = dto
            .volume
            .as_deref()
            .and_then(|v| v.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);

        Some(Market {
            condition_id: dto.condition_id.unwrap_or_else(|| id.clone()),
            id,
            title: dto.question.unwrap_or_else(|| "unknown".to_string()),
            yes_token_id,
            no_token_id,
            end_date,
            volume,
            category: dto.category,
        })
    }

    fn parse_levels(levels: Option<Vec<LevelDto>>) -> Vec<PriceLevel> {
        levels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|level| {
                let price: Decimal = level.price.parse().ok()?;
                let size: Decimal = level.size.parse().ok()?;
                (size > Decimal::ZERO).then_some(PriceLevel { price, size })
            })
            .collect()
    }
}

#[async_trait]
impl MarketFeed for HttpMarketFeed {
    #[instrument(skip(self))]
    async fn list_active_markets(
        &self,
        min_volume: Decimal,
        max_days_to_resolution: i64,
        limit: usize,
    ) -> Result<Vec<Market>, FeedError> {
        let url = format!("{}/markets", self.gamma_url);
        let query = [
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("limit", limit.to_string()),
        ];

        let raw: Vec<MarketDto> = self.get_with_retry(&url, &query).await?;
        let now = OffsetDateTime::now_utc();

        let markets: Vec<Market> = raw
            .into_iter()
            .filter_map(Self::parse_market)
            .filter(|m| {
                if m.volume < min_volume {
                    debug!(market = %m.id, volume = %m.volume, "skipping low-volume market");
                    return false;
                }
                if m.days_to_resolution(now) > max_days_to_resolution {
                    debug!(market = %m.id, "skipping market resolving too far out");
                    return false;
                }
                if !m.is_active(now) {
                    debug!(market = %m.id, "skipping inactive market");
                    return false;
                }
                true
            })
            .collect();

        debug!(count = markets.len(), "listed active markets");
        Ok(markets)
    }

    #[instrument(skip(self), fields(token_id = %token_id))]
    async fn get_order_book(
        &self,
        token_id: &str,
        outcome: Outcome,
    ) -> Result<OrderBook, FeedError> {
        let url = format!("{}/book", self.clob_url);
        let query = [("token_id", token_id.to_string())];

        let dto: BookDto = self.get_with_retry(&url, &query).await?;

        let mut bids = Self::parse_levels(dto.bids);
        let mut asks = Self::parse_levels(dto.asks);
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));

        if bids.is_empty() && asks.is_empty() {
            warn!(token_id = %token_id, "order book has no resting liquidity");
        }

        Ok(OrderBook {
            token_id: token_id.to_string(),
            outcome,
            bids,
            asks,
            updated_at: OffsetDateTime::now_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_market_requires_distinct_tokens() {
        let dto = MarketDto {
            id: Some("m1".to_string()),
            question: Some("q".to_string()),
            condition_id: Some("c1".to_string()),
            clob_token_ids: Some(r#"["tok-a","tok-a"]"#.to_string()),
            end_date: Some("2026-12-01T00:00:00Z".to_string()),
            volume: Some("500".to_string()),
            category: None,
        };

        assert!(HttpMarketFeed::parse_market(dto).is_none());
    }

    #[test]
    fn parse_market_reads_encoded_token_pair() {
        let dto = MarketDto {
            id: Some("m1".to_string()),
            question: Some("Will it happen?".to_string()),
            condition_id: None,
            clob_token_ids: Some(r#"["tok-yes","tok-no"]"#.to_string()),
            end_date: Some("2026-12-01T00:00:00Z".to_string()),
            volume: Some("1234.5".to_string()),
            category: Some("politics".to_string()),
        };

        let market = HttpMarketFeed::parse_market(dto).unwrap();
        assert_eq!(market.yes_token_id, "tok-yes");
        assert_eq!(market.no_token_id, "tok-no");
        assert_eq!(market.condition_id, "m1");
        assert_eq!(market.volume, dec!(1234.5));
    }

    #[test]
    fn parse_levels_drops_zero_size() {
        let levels = Some(vec![
            LevelDto {
                price: "0.50".to_string(),
                size: "0".to_string(),
            },
            LevelDto {
                price: "0.51".to_string(),
                size: "25".to_string(),
            },
            LevelDto {
                price: "bad".to_string(),
                size: "10".to_string(),
            },
        ]);

        let parsed = HttpMarketFeed::parse_levels(levels);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].price, dec!(0.51));
    }
}
