//! The source of frame callbacks for the simulation. It's a plain deadline that the main event
//! loop sleeps on, so there's no separate timer task to keep in sync.

use orrery_engine::simulation::Scheduler;
use tokio::time::{Duration, Instant};

/// Microseconds in a second.
pub const ONE_MICROSECOND: u64 = 1_000_000;

/// Hands out frame deadlines at a steady frame rate.
#[derive(Debug)]
pub(crate) struct FrameClock {
    /// Target frames per second.
    frame_rate: u32,
    /// When the last frame was fired.
    last_frame_tick: Instant,
    /// When the next frame is due, if one has been asked for.
    next_tick: Option<Instant>,
}

impl FrameClock {
    /// Instantiate
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate,
            last_frame_tick: Instant::now(),
            next_tick: None,
        }
    }

    /// Change the frame rate. Only affects frames scheduled after this.
    pub fn set_frame_rate(&mut self, frame_rate: u32) {
        tracing::debug!("Frame rate changed to {frame_rate}");
        self.frame_rate = frame_rate;
    }

    /// The time between frames. A frame rate of 0 is treated as 1.
    pub fn frame_period(&self) -> Duration {
        let target = ONE_MICROSECOND.wrapping_div(u64::from(self.frame_rate.max(1)));
        Duration::from_micros(target)
    }

    /// When the next frame is due.
    pub const fn deadline(&self) -> Option<Instant> {
        self.next_tick
    }

    /// Mark the pending frame as delivered.
    pub fn fire(&mut self) {
        self.next_tick = None;
        self.last_frame_tick = Instant::now();
    }

    /// Sleep until the given deadline. Without a deadline this never finishes, which is what
    /// lets it sit in a `tokio::select!` whilst paused.
    pub async fn sleep_until(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => core::future::pending().await,
        }
    }
}

impl Scheduler for FrameClock {
    /// Aim for one frame period after the last frame. If that's already passed, because a tick
    /// took too long or the clock was idle, the frame is due straight away.
    fn schedule_next_tick(&mut self) {
        let due = self.last_frame_tick + self.frame_period();
        self.next_tick = Some(due.max(Instant::now()));
    }

    fn cancel_scheduled_tick(&mut self) {
        self.next_tick = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_period() {
        assert_eq!(FrameClock::new(60).frame_period(), Duration::from_micros(16_666));
        assert_eq!(FrameClock::new(1).frame_period(), Duration::from_secs(1));
        assert_eq!(FrameClock::new(0).frame_period(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn scheduling_and_cancelling() {
        let mut clock = FrameClock::new(30);
        assert_eq!(clock.deadline(), None);

        let before = Instant::now();
        clock.schedule_next_tick();
        let deadline = clock.deadline().unwrap();
        assert!(deadline <= before + clock.frame_period());

        clock.cancel_scheduled_tick();
        assert_eq!(clock.deadline(), None);
    }

    #[tokio::test]
    async fn late_frames_are_due_immediately() {
        let mut clock = FrameClock::new(1000);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let now = Instant::now();
        clock.schedule_next_tick();
        assert!(clock.deadline().unwrap() >= now);
        assert!(clock.deadline().unwrap() <= Instant::now());
    }

    #[tokio::test]
    async fn firing_clears_the_deadline() {
        let mut clock = FrameClock::new(60);
        clock.schedule_next_tick();
        FrameClock::sleep_until(clock.deadline()).await;
        clock.fire();
        assert_eq!(clock.deadline(), None);
    }

    #[tokio::test]
    async fn no_deadline_never_wakes() {
        let result =
            tokio::time::timeout(Duration::from_millis(20), FrameClock::sleep_until(None)).await;
        assert!(result.is_err());
    }
}
