//! Randomized request headers
//!
//! Each outbound request carries a plausible browser header set. User agent,
//! accept-language and referer are drawn independently from small pools.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// User agents for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.7; rv:137.0) Gecko/20100101 Firefox/137.0",
];

const ACCEPT_LANGUAGES: &[&str] = &[
    "en-US,en;q=0.9",
    "en-GB,en;q=0.8",
    "en-US,en;q=0.5",
    "en-CA,en;q=0.7,fr;q=0.3",
];

const REFERERS: &[&str] = &[
    "https://duckduckgo.com/",
    "https://www.google.com/",
    "https://www.bing.com/",
    "https://search.yahoo.com/",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Headers for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSet {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub referer: &'static str,
}

impl HeaderSet {
    /// Header name/value pairs in send order
    pub fn pairs(&self) -> [(&'static str, &'static str); 4] {
        [
            ("User-Agent", self.user_agent),
            ("Accept", ACCEPT),
            ("Accept-Language", self.accept_language),
            ("Referer", self.referer),
        ]
    }
}

/// Draws header sets from the fixed pools
pub struct HeaderRotator {
    rng: Mutex<StdRng>,
}

impl HeaderRotator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible rotation for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn next_headers(&self) -> HeaderSet {
        let mut rng = self.rng.lock();
        HeaderSet {
            user_agent: pick(USER_AGENTS, &mut *rng),
            accept_language: pick(ACCEPT_LANGUAGES, &mut *rng),
            referer: pick(REFERERS, &mut *rng),
        }
    }
}

impl Default for HeaderRotator {
    fn default() -> Self {
        Self::new()
    }
}

fn pick(pool: &'static [&'static str], rng: &mut StdRng) -> &'static str {
    pool.choose(rng).copied().unwrap_or(pool[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_rotation_is_reproducible() {
        let a = HeaderRotator::seeded(7);
        let b = HeaderRotator::seeded(7);

        for _ in 0..10 {
            assert_eq!(a.next_headers(), b.next_headers());
        }
    }

    #[test]
    fn test_headers_come_from_pools() {
        let rotator = HeaderRotator::new();
        let headers = rotator.next_headers();

        assert!(headers.user_agent.contains("Mozilla"));
        assert!(ACCEPT_LANGUAGES.contains(&headers.accept_language));
        assert!(REFERERS.contains(&headers.referer));
        assert_eq!(headers.pairs()[0], ("User-Agent", headers.user_agent));
    }
}
