use std::time::{Duration, Instant};

/// Decides when a hot loop should hand control back to the runtime: after
/// `every_items` ticks or `every` elapsed, whichever comes first.
#[derive(Debug)]
pub struct Cadence {
    every_items: usize,
    every: Duration,
    count: usize,
    last: Instant,
    yields: usize,
}

impl Cadence {
    /// A zero threshold disables that trigger.
    pub fn new(every_items: usize, every_ms: u64) -> Self {
        Self {
            every_items,
            every: Duration::from_millis(every_ms),
            count: 0,
            last: Instant::now(),
            yields: 0,
        }
    }

    fn due(&mut self) -> bool {
        self.count += 1;
        let by_count = self.every_items > 0 && self.count >= self.every_items;
        let by_time = !self.every.is_zero() && self.last.elapsed() >= self.every;
        if by_count || by_time {
            self.count = 0;
            self.last = Instant::now();
            self.yields += 1;
            true
        } else {
            false
        }
    }

    pub async fn tick(&mut self) {
        if self.due() {
            tokio::task::yield_now().await;
        }
    }

    pub fn yields(&self) -> usize {
        self.yields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_trigger() {
        let mut c = Cadence::new(3, 0);
        let fired: Vec<bool> = (0..7).map(|_| c.due()).collect();
        assert_eq!(fired, vec![false, false, true, false, false, true, false]);
        assert_eq!(c.yields(), 2);
    }

    #[test]
    fn disabled_never_fires() {
        let mut c = Cadence::new(0, 0);
        assert!((0..1000).all(|_| !c.due()));
    }

    #[tokio::test]
    async fn tick_yields_on_schedule() {
        let mut c = Cadence::new(2, 0);
        for _ in 0..4 {
            c.tick().await;
        }
        assert_eq!(c.yields(), 2);
    }
}
