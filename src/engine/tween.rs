// Central ticker for timed tween sequences and scheduled one-shot events
//
// A sequence is plain data: what it animates (`K`), when it started and how long it
// runs. The ticker never calls back into game code; `step(now)` hands back what is
// due and the owner applies it. Time is injected, so tests drive it with fake clocks.

/// Milliseconds on whatever clock the owner uses.
pub type Millis = f64;

pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

pub fn ease_out_quad(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(2)
}

/// Tag for a group of scheduled events that can be dropped together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub u32);

#[derive(Debug, Clone)]
pub struct Sequence<K> {
    pub kind: K,
    pub start: Millis,
    pub duration: Millis,
    /// Blocking sequences exclude pointer handling while they run.
    pub blocking: bool,
}

impl<K> Sequence<K> {
    /// Elapsed fraction in [0, 1].
    pub fn progress(&self, now: Millis) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.start) / self.duration).clamp(0.0, 1.0) as f32
    }
}

#[derive(Debug, Clone)]
pub struct ScheduledEvent<A> {
    pub fire_at: Millis,
    pub action: A,
    pub batch: Option<BatchId>,
    order: u64,
}

/// Everything that became due in one `step`.
#[derive(Debug)]
pub struct Step<K, A> {
    /// Scheduled actions whose time has come, in firing order.
    pub fired: Vec<A>,
    /// One `(kind, t)` frame per active sequence, in start order.
    pub frames: Vec<(K, f32)>,
    /// Sequences that reached t = 1 this step. Their last frame is in `frames`.
    pub completed: Vec<K>,
}

pub struct Ticker<K, A> {
    sequences: Vec<Sequence<K>>,
    events: Vec<ScheduledEvent<A>>,
    next_id: u64,
}

impl<K, A> Default for Ticker<K, A> {
    fn default() -> Self {
        Self {
            sequences: Vec::new(),
            events: Vec::new(),
            next_id: 0,
        }
    }
}

impl<K: Clone, A> Ticker<K, A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, kind: K, now: Millis, duration: Millis, blocking: bool) {
        self.sequences.push(Sequence { kind, start: now, duration, blocking });
    }

    pub fn schedule(&mut self, fire_at: Millis, action: A, batch: Option<BatchId>) {
        let order = self.bump();
        self.events.push(ScheduledEvent { fire_at, action, batch, order });
    }

    /// Drop every pending event tagged with `batch`. Returns how many were dropped.
    pub fn cancel_batch(&mut self, batch: BatchId) -> usize {
        let before = self.events.len();
        self.events.retain(|e| e.batch != Some(batch));
        before - self.events.len()
    }

    pub fn has_blocking(&self) -> bool {
        self.sequences.iter().any(|s| s.blocking)
    }

    pub fn active(&self) -> impl Iterator<Item = &Sequence<K>> {
        self.sequences.iter()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    #[cfg(test)]
    pub fn is_idle(&self) -> bool {
        self.sequences.is_empty() && self.events.is_empty()
    }

    pub fn step(&mut self, now: Millis) -> Step<K, A> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.events).into_iter().partition(|e| e.fire_at <= now);
        self.events = pending;
        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at).then(a.order.cmp(&b.order)));
        let fired = due.into_iter().map(|e| e.action).collect();

        let mut frames = Vec::with_capacity(self.sequences.len());
        let mut completed = Vec::new();
        self.sequences.retain(|seq| {
            let t = seq.progress(now);
            frames.push((seq.kind.clone(), t));
            if t >= 1.0 {
                completed.push(seq.kind.clone());
                false
            } else {
                true
            }
        });

        Step { fired, frames, completed }
    }

    fn bump(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        Rise,
        Fade,
    }

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-6);
        assert!((ease_out_quad(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn sequence_frames_then_completes_with_final_frame() {
        let mut ticker: Ticker<Kind, ()> = Ticker::new();
        ticker.start(Kind::Rise, 1000.0, 800.0, true);
        assert!(ticker.has_blocking());

        let step = ticker.step(1400.0);
        assert_eq!(step.frames, vec![(Kind::Rise, 0.5)]);
        assert!(step.completed.is_empty());

        let step = ticker.step(5000.0);
        assert_eq!(step.frames, vec![(Kind::Rise, 1.0)]);
        assert_eq!(step.completed, vec![Kind::Rise]);
        assert!(!ticker.has_blocking());
        assert!(ticker.is_idle());
    }

    #[test]
    fn non_blocking_sequences_do_not_block() {
        let mut ticker: Ticker<Kind, ()> = Ticker::new();
        ticker.start(Kind::Fade, 0.0, 1500.0, false);
        assert!(!ticker.has_blocking());
        assert_eq!(ticker.active().count(), 1);
    }

    #[test]
    fn events_fire_in_time_order() {
        let mut ticker: Ticker<Kind, &str> = Ticker::new();
        ticker.schedule(300.0, "late", None);
        ticker.schedule(100.0, "early", None);
        ticker.schedule(100.0, "early-second", None);
        ticker.schedule(900.0, "later", None);

        let step = ticker.step(300.0);
        assert_eq!(step.fired, vec!["early", "early-second", "late"]);
        assert_eq!(ticker.pending_events(), 1);
    }

    #[test]
    fn cancelled_batch_never_fires() {
        let mut ticker: Ticker<Kind, u32> = Ticker::new();
        let reveal = BatchId(7);
        for i in 0..5 {
            ticker.schedule(i as f64 * 80.0, i, Some(reveal));
        }
        ticker.schedule(50.0, 99, None);
        assert_eq!(ticker.cancel_batch(reveal), 5);

        let step = ticker.step(10_000.0);
        assert_eq!(step.fired, vec![99]);
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut ticker: Ticker<Kind, ()> = Ticker::new();
        ticker.start(Kind::Rise, 10.0, 0.0, true);
        let step = ticker.step(10.0);
        assert_eq!(step.completed, vec![Kind::Rise]);
    }
}
