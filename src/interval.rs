//! Retry interval policies: attempt number in, delay-or-stop out
//!
//! A policy maps a 1-based attempt number to the delay before the next
//! attempt, or `None` to stop retrying. Policies are pure; the only shared
//! state is the memoized Fibonacci table. All four shipped generators stop
//! once `attempt >= max_tries`, so a retry wrapped around a perpetually
//! failing callee invokes it exactly `max_tries` times.

use std::sync::Mutex;
use std::time::Duration;

use once_cell::sync::Lazy;

/// Maps a retry attempt (starting at 1) to the delay before the next
/// attempt; `None` means stop and re-raise the failure.
pub trait IntervalPolicy: Send + Sync {
    fn delay(&self, attempt: u32) -> Option<Duration>;
}

impl<F> IntervalPolicy for F
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Option<Duration> {
        self(attempt)
    }
}

/// Constant delay between attempts.
pub fn fixed(interval: Duration, max_tries: u32) -> Fixed {
    Fixed {
        interval,
        max_tries,
    }
}

/// Delay grows linearly: `start * attempt`.
pub fn incrementing(start: Duration, max_tries: u32) -> Incrementing {
    Incrementing { start, max_tries }
}

/// Delay doubles each attempt: `start * 2^(attempt - 1)`.
pub fn doubling(start: Duration, max_tries: u32) -> Doubling {
    Doubling { start, max_tries }
}

/// Delay follows the Fibonacci sequence scaled by `start`: the sequence
/// begins 1, 1, 2, 3, 5, 8, …
pub fn fibonacci(start: Duration, max_tries: u32) -> Fibonacci {
    Fibonacci { start, max_tries }
}

#[derive(Debug, Clone, Copy)]
pub struct Fixed {
    interval: Duration,
    max_tries: u32,
}

impl IntervalPolicy for Fixed {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_tries {
            return None;
        }
        Some(self.interval)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Incrementing {
    start: Duration,
    max_tries: u32,
}

impl IntervalPolicy for Incrementing {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_tries {
            return None;
        }
        Some(self.start.saturating_mul(attempt.max(1)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Doubling {
    start: Duration,
    max_tries: u32,
}

impl IntervalPolicy for Doubling {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_tries {
            return None;
        }
        let factor = 1u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        Some(self.start.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Fibonacci {
    start: Duration,
    max_tries: u32,
}

impl IntervalPolicy for Fibonacci {
    fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_tries {
            return None;
        }
        let factor = fib(attempt.saturating_sub(1) as usize).min(u64::from(u32::MAX)) as u32;
        Some(self.start.saturating_mul(factor))
    }
}

// Memoized table shared across all fibonacci policies.
static FIB: Lazy<Mutex<Vec<u64>>> = Lazy::new(|| Mutex::new(vec![1, 1]));

fn fib(n: usize) -> u64 {
    let mut table = FIB.lock().unwrap();
    while table.len() <= n {
        let next = table[table.len() - 1].saturating_add(table[table.len() - 2]);
        table.push(next);
    }
    table[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn delays<P: IntervalPolicy>(policy: P) -> Vec<Option<u64>> {
        (1..=6)
            .map(|n| policy.delay(n).map(|d| d.as_millis() as u64))
            .collect()
    }

    #[test]
    fn fixed_is_constant_then_stops() {
        assert_eq!(
            delays(fixed(MS * 10, 4)),
            vec![Some(10), Some(10), Some(10), None, None, None]
        );
    }

    #[test]
    fn incrementing_grows_linearly() {
        assert_eq!(
            delays(incrementing(MS * 10, 5)),
            vec![Some(10), Some(20), Some(30), Some(40), None, None]
        );
    }

    #[test]
    fn doubling_grows_geometrically() {
        assert_eq!(
            delays(doubling(MS * 10, 6)),
            vec![Some(10), Some(20), Some(40), Some(80), Some(160), None]
        );
    }

    #[test]
    fn fibonacci_follows_the_sequence() {
        assert_eq!(
            delays(fibonacci(MS * 10, 7)),
            vec![Some(10), Some(10), Some(20), Some(30), Some(50), Some(80)]
        );
    }

    #[test]
    fn one_try_never_waits() {
        assert_eq!(fixed(MS, 1).delay(1), None);
        assert_eq!(fibonacci(MS, 1).delay(1), None);
    }

    #[test]
    fn closures_are_policies() {
        let policy = |attempt: u32| (attempt < 3).then_some(Duration::ZERO);
        assert_eq!(policy.delay(1), Some(Duration::ZERO));
        assert_eq!(policy.delay(3), None);
    }

    #[test]
    fn doubling_saturates_instead_of_overflowing() {
        let policy = doubling(Duration::from_secs(1), u32::MAX);
        assert!(policy.delay(64).is_some());
    }
}
