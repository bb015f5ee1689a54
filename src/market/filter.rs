/// Memoized search filter over the quote cache.
///
/// Pure derivation of (cache, settled query): quotes whose name or symbol
/// contains the query as a case-insensitive substring, cache order
/// preserved. The single-slot memo is keyed on cache pointer identity and
/// query equality, so unchanged inputs hand back the same allocation.
use parking_lot::Mutex;
use std::sync::Arc;

use crate::apis::coingecko::types::Quote;

struct Memo {
    quotes: Arc<Vec<Quote>>,
    query: String,
    result: Arc<Vec<Quote>>,
}

#[derive(Default)]
pub struct SearchFilter {
    memo: Mutex<Option<Memo>>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self, quotes: &Arc<Vec<Quote>>, query: &str) -> Arc<Vec<Quote>> {
        // Identity on the empty query: the full cache, same allocation.
        if query.is_empty() {
            return Arc::clone(quotes);
        }

        let mut memo = self.memo.lock();
        if let Some(memo) = memo.as_ref() {
            if Arc::ptr_eq(&memo.quotes, quotes) && memo.query == query {
                return Arc::clone(&memo.result);
            }
        }

        let needle = query.to_lowercase();
        let result: Arc<Vec<Quote>> = Arc::new(
            quotes
                .iter()
                .filter(|quote| {
                    quote.name.to_lowercase().contains(&needle)
                        || quote.symbol.to_lowercase().contains(&needle)
                })
                .cloned()
                .collect(),
        );

        *memo = Some(Memo {
            quotes: Arc::clone(quotes),
            query: query.to_string(),
            result: Arc::clone(&result),
        });

        result
    }
}
