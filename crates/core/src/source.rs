use binance::{api::Binance, config::Config as BinanceClientConfig, market::Market};
use tracing::{debug, instrument};

use crate::{config::BinanceConfig, error::QuoteUnavailable, quote::Quote};

/// Anything that can answer "what is the best bid/ask for this symbol right now".
///
/// Implementations may block; callers on an async runtime should call them from a blocking
/// thread.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait QuoteSource: Send + Sync {
    fn best_prices(&self, symbol: &str) -> Result<Quote, QuoteUnavailable>;
}

/// Reads the top of book from Binance's REST order book ticker.
///
/// The underlying HTTP client is blocking: create and drop this type outside of an async
/// context.
pub struct BinanceQuoteSource {
    market: Market,
}

impl BinanceQuoteSource {
    pub fn new(cfg: &BinanceConfig) -> Self {
        let market: Market = match &cfg.api_url {
            Some(url) => Binance::new_with_config(
                cfg.api_key.clone(),
                cfg.secret_key.clone(),
                &BinanceClientConfig::default().set_rest_api_endpoint(url.clone()),
            ),
            None => Binance::new(cfg.api_key.clone(), cfg.secret_key.clone()),
        };

        Self { market }
    }
}

impl QuoteSource for BinanceQuoteSource {
    #[instrument(skip(self))]
    fn best_prices(&self, symbol: &str) -> Result<Quote, QuoteUnavailable> {
        let unavailable = |reason: String| QuoteUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let ticker = self
            .market
            .get_book_ticker(symbol)
            .map_err(|e| unavailable(e.to_string()))?;

        if ticker.symbol != symbol {
            return Err(unavailable(format!(
                "exchange answered for {}",
                ticker.symbol
            )));
        }

        let quote = Quote::new(symbol, ticker.bid_price, ticker.ask_price);
        debug!(%quote, "fetched best prices");

        Ok(quote)
    }
}
