//! Periodic maintenance sweep scheduler for Parlor.
//!
//! The lobby server runs four recurring duties: the unsolicited heartbeat
//! ping, the directed liveness check with eviction, the slot auto-start
//! check, and ghost-slot reclamation. Each runs on its own cadence; the
//! scheduler multiplexes them into a single awaitable stream so one
//! maintenance task can drive all of them.
//!
//! # Integration
//!
//! ```ignore
//! let mut sched = SweepScheduler::new(SweepConfig::default());
//! loop {
//!     match sched.next_sweep().await {
//!         Sweep::Ping => state.broadcast_ping().await,
//!         Sweep::Liveness => state.liveness_check().await,
//!         Sweep::AutoStart => state.check_auto_start().await,
//!         Sweep::GhostClean => state.clean_ghost_slots().await,
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tokio::time::{self, Instant};
use tracing::warn;

/// The recurring maintenance duties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Unsolicited heartbeat ping to every client.
    Ping,
    /// Directed liveness check; evicts clients that failed the previous
    /// cycle.
    Liveness,
    /// Auto-start check for slots whose wait timer ran out.
    AutoStart,
    /// Reclaims open-for-join slots with no occupants left.
    GhostClean,
}

/// Cadence configuration for the sweeps.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Heartbeat ping interval. Default: 30 s.
    pub ping_interval: Duration,
    /// Liveness check interval. Default: 60 s. Clients that have not
    /// answered within one full cycle are evicted on the next.
    pub liveness_interval: Duration,
    /// Auto-start poll interval. Default: 10 s.
    pub autostart_interval: Duration,
    /// Ghost-slot reclamation interval. Default: 60 s.
    pub ghost_interval: Duration,
    /// Random jitter (0–max) added once to the first deadline of every
    /// cadence so the sweeps don't all fire in the same instant.
    pub initial_jitter: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            liveness_interval: Duration::from_secs(60),
            autostart_interval: Duration::from_secs(10),
            ghost_interval: Duration::from_secs(60),
            initial_jitter: Duration::from_millis(500),
        }
    }
}

impl SweepConfig {
    /// Shortest interval the scheduler accepts; anything below is raised
    /// with a warning.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    /// Clamps out-of-range values so the config is safe to run.
    pub fn validated(mut self) -> Self {
        for (name, interval) in [
            ("ping_interval", &mut self.ping_interval),
            ("liveness_interval", &mut self.liveness_interval),
            ("autostart_interval", &mut self.autostart_interval),
            ("ghost_interval", &mut self.ghost_interval),
        ] {
            if *interval < Self::MIN_INTERVAL {
                warn!(cadence = name, ?interval, "interval too short, clamping");
                *interval = Self::MIN_INTERVAL;
            }
        }
        self
    }
}

struct Cadence {
    sweep: Sweep,
    interval: Duration,
    deadline: Instant,
}

/// Multiplexes the maintenance cadences into one awaitable stream.
pub struct SweepScheduler {
    cadences: Vec<Cadence>,
}

impl SweepScheduler {
    /// Creates a scheduler; the first deadline of every cadence gets an
    /// independent random jitter within `config.initial_jitter`.
    pub fn new(config: SweepConfig) -> Self {
        let config = config.validated();
        let now = Instant::now();
        let mut rng = rand::rng();
        let mut jittered = |interval: Duration| {
            let jitter_max = config.initial_jitter.as_millis() as u64;
            let jitter = if jitter_max == 0 {
                Duration::ZERO
            } else {
                Duration::from_millis(rng.random_range(0..=jitter_max))
            };
            now + interval + jitter
        };

        let cadences = vec![
            Cadence {
                sweep: Sweep::Ping,
                interval: config.ping_interval,
                deadline: jittered(config.ping_interval),
            },
            Cadence {
                sweep: Sweep::Liveness,
                interval: config.liveness_interval,
                deadline: jittered(config.liveness_interval),
            },
            Cadence {
                sweep: Sweep::AutoStart,
                interval: config.autostart_interval,
                deadline: jittered(config.autostart_interval),
            },
            Cadence {
                sweep: Sweep::GhostClean,
                interval: config.ghost_interval,
                deadline: jittered(config.ghost_interval),
            },
        ];

        Self { cadences }
    }

    /// Waits for the next due cadence and returns which sweep to run.
    ///
    /// A cadence that fires re-arms relative to its previous deadline, so
    /// slow sweep bodies delay but never compound drift.
    pub async fn next_sweep(&mut self) -> Sweep {
        let next = self
            .cadences
            .iter_mut()
            .min_by_key(|c| c.deadline)
            .expect("scheduler always has cadences");

        time::sleep_until(next.deadline).await;
        next.deadline += next.interval;
        next.sweep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ping: u64, liveness: u64, auto: u64, ghost: u64) -> SweepConfig {
        SweepConfig {
            ping_interval: Duration::from_secs(ping),
            liveness_interval: Duration::from_secs(liveness),
            autostart_interval: Duration::from_secs(auto),
            ghost_interval: Duration::from_secs(ghost),
            initial_jitter: Duration::ZERO,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_sweep_fires_shortest_cadence_first() {
        let mut sched = SweepScheduler::new(config(30, 60, 10, 60));
        assert_eq!(sched.next_sweep().await, Sweep::AutoStart);
        assert_eq!(sched.next_sweep().await, Sweep::AutoStart);
        assert_eq!(sched.next_sweep().await, Sweep::Ping);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cadences_interleave_on_schedule() {
        let mut sched = SweepScheduler::new(config(30, 60, 10, 60));
        let mut pings = 0;
        let mut liveness = 0;
        let mut autostarts = 0;
        let mut ghosts = 0;

        // Two simulated minutes.
        for _ in 0..(6 + 12 + 2 + 2) {
            match sched.next_sweep().await {
                Sweep::Ping => pings += 1,
                Sweep::Liveness => liveness += 1,
                Sweep::AutoStart => autostarts += 1,
                Sweep::GhostClean => ghosts += 1,
            }
        }

        assert_eq!(pings, 4);
        assert_eq!(liveness, 2);
        assert_eq!(autostarts, 12);
        assert_eq!(ghosts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_intervals_all_fire() {
        let mut sched = SweepScheduler::new(config(10, 10, 10, 10));
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(sched.next_sweep().await);
        }
        for sweep in
            [Sweep::Ping, Sweep::Liveness, Sweep::AutoStart, Sweep::GhostClean]
        {
            assert!(seen.contains(&sweep), "{sweep:?} missing from {seen:?}");
        }
    }

    #[test]
    fn test_validated_clamps_short_intervals() {
        let cfg = SweepConfig {
            ping_interval: Duration::from_millis(1),
            ..SweepConfig::default()
        }
        .validated();
        assert_eq!(cfg.ping_interval, SweepConfig::MIN_INTERVAL);
        // Others untouched.
        assert_eq!(cfg.liveness_interval, Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_jitter_stays_within_bound() {
        let cfg = SweepConfig {
            ping_interval: Duration::from_secs(10),
            liveness_interval: Duration::from_secs(100),
            autostart_interval: Duration::from_secs(100),
            ghost_interval: Duration::from_secs(100),
            initial_jitter: Duration::from_millis(500),
        };
        let start = Instant::now();
        let mut sched = SweepScheduler::new(cfg);
        let sweep = sched.next_sweep().await;
        assert_eq!(sweep, Sweep::Ping);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed <= Duration::from_secs(10) + Duration::from_millis(500));
    }
}
