//! Synthetic post generator used when the live feed is disabled.
//!
//! Selected by the `enable_mock_stream` config flag. Generates posts whose
//! text always contains one of the tracked keywords, with a length drawn
//! between the configured bounds, one post per sleep interval.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::model::PostEvent;
use crate::source::{EventCallback, IngestionSource, Subscription};
use crate::Result;

const WORDS: &[&str] = &[
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi", "aliquip",
    "commodo",
];

/// Synthetic event source.
pub struct SyntheticSource {
    config: StreamConfig,
}

impl SyntheticSource {
    /// Create a generator from stream configuration.
    pub fn new(config: StreamConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl IngestionSource for SyntheticSource {
    async fn subscribe(
        &mut self,
        keywords: &[String],
        on_event: EventCallback,
    ) -> Result<Subscription> {
        let min = self.config.mock_min_post_length;
        let max = self.config.mock_max_post_length;
        if min == 0 || min > max {
            return Err(StreamError::InvalidConfig(format!(
                "post length bounds {min}..{max} are not usable"
            ))
            .into());
        }

        let sleep = std::time::Duration::from_millis(self.config.mock_sleep_ms);
        let keywords = keywords.to_vec();
        let mut rng = XorShift64::from_entropy()
            .map_err(|e| StreamError::Connect(format!("entropy source unavailable: {e}")))?;

        info!(
            keywords = ?keywords,
            min_length = min,
            max_length = max,
            sleep_ms = self.config.mock_sleep_ms,
            "Synthetic stream started"
        );

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.wait_for(|stop| *stop) => {
                        debug!("Synthetic stream subscription released");
                        break;
                    }
                    _ = tokio::time::sleep(sleep) => {
                        let event =
                            generate_post(&mut rng, &keywords, min, max, Utc::now().timestamp());
                        on_event(event);
                    }
                }
            }
        });

        Ok(Subscription::new(stop_tx, task))
    }
}

/// Build one synthetic post.
///
/// The text starts with a tracked keyword and grows word by word until the
/// drawn target length is reached.
fn generate_post(
    rng: &mut XorShift64,
    keywords: &[String],
    min_length: usize,
    max_length: usize,
    created_at: i64,
) -> PostEvent {
    let target = rng.gen_range(min_length as u64, max_length as u64) as usize;

    let mut text = String::new();
    if !keywords.is_empty() {
        let keyword = &keywords[rng.gen_range(0, keywords.len() as u64 - 1) as usize];
        text.push_str(keyword);
    }
    while text.len() < target {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(WORDS[rng.gen_range(0, WORDS.len() as u64 - 1) as usize]);
    }

    PostEvent {
        id: (rng.next() >> 1) as i64,
        author_id: rng.gen_range(1, 100_000) as i64,
        text,
        created_at,
    }
}

/// Xorshift64 generator, seeded once from the OS entropy source.
///
/// Not cryptographic; only has to make generated posts vary.
struct XorShift64(u64);

impl XorShift64 {
    fn from_entropy() -> std::result::Result<Self, getrandom::Error> {
        let mut seed = [0u8; 8];
        getrandom::fill(&mut seed)?;
        Ok(Self::from_seed(u64::from_le_bytes(seed)))
    }

    fn from_seed(seed: u64) -> Self {
        // Xorshift state must be nonzero.
        Self(seed.max(1))
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform draw from the inclusive range `lo..=hi`.
    fn gen_range(&mut self, lo: u64, hi: u64) -> u64 {
        debug_assert!(lo <= hi);
        lo + self.next() % (hi - lo + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(min: usize, max: usize, sleep_ms: u64) -> StreamConfig {
        StreamConfig {
            keywords: vec!["rust".into(), "kafka".into()],
            enable_mock_stream: true,
            live_endpoint: None,
            bearer_token: None,
            mock_min_post_length: min,
            mock_max_post_length: max,
            mock_sleep_ms: sleep_ms,
        }
    }

    #[test]
    fn test_generated_post_length_within_bounds() {
        let mut rng = XorShift64::from_seed(7);
        let keywords = vec!["rust".to_string()];

        for _ in 0..200 {
            let event = generate_post(&mut rng, &keywords, 10, 120, 0);
            assert!(event.text.len() >= 10, "text too short: {:?}", event.text);
            assert!(event.id >= 0);
            assert!(event.author_id >= 1);
        }
    }

    #[test]
    fn test_generated_post_contains_a_keyword() {
        let mut rng = XorShift64::from_seed(42);
        let keywords = vec!["rust".to_string(), "kafka".to_string()];

        for _ in 0..50 {
            let event = generate_post(&mut rng, &keywords, 20, 40, 0);
            assert!(
                keywords.iter().any(|keyword| event.text.contains(keyword)),
                "no keyword in {:?}",
                event.text
            );
        }
    }

    #[test]
    fn test_generation_is_deterministic_for_a_seed() {
        let keywords = vec!["rust".to_string()];
        let mut a = XorShift64::from_seed(99);
        let mut b = XorShift64::from_seed(99);

        for _ in 0..20 {
            let left = generate_post(&mut a, &keywords, 10, 60, 5);
            let right = generate_post(&mut b, &keywords, 10, 60, 5);
            assert_eq!(left, right);
        }
    }

    #[test]
    fn test_gen_range_stays_inclusive() {
        let mut rng = XorShift64::from_seed(3);
        for _ in 0..1000 {
            let value = rng.gen_range(5, 9);
            assert!((5..=9).contains(&value));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_delivers_events_on_the_interval() {
        let mut source = SyntheticSource::new(config(10, 40, 1_000));
        let events: Arc<Mutex<Vec<PostEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: EventCallback = Arc::new(move |event| sink.lock().push(event));

        let subscription = source
            .subscribe(&["rust".to_string()], callback)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(3_050)).await;
        subscription.close().await;

        let events = events.lock();
        assert_eq!(events.len(), 3);
        for event in events.iter() {
            assert!(event.text.contains("rust"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_rejects_bad_bounds() {
        let mut source = SyntheticSource::new(config(50, 10, 1_000));
        let callback: EventCallback = Arc::new(|_event| {});

        assert!(source
            .subscribe(&["rust".to_string()], callback)
            .await
            .is_err());
    }
}
