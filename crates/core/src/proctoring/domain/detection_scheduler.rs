/// Where the detection loop currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Polling sink readiness before the first inference.
    AwaitingReady { attempts: u32, next_at: u64 },
    /// First inference dispatched; the interval is not armed yet.
    AwaitingFirstResult,
    Steady { next_tick: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    Idle,
    Dispatch { generation: u64 },
}

/// Timer logic for the detection loop, driven by explicit clock readings.
///
/// The host calls [`poll`](Self::poll) as often as it likes with the current
/// time and the sink's readiness; the scheduler answers whether an inference
/// should be dispatched now. It never dispatches while a previous inference
/// is outstanding. Every `begin`/`halt` bumps the generation so outcomes from
/// an earlier session can be recognised and dropped.
#[derive(Debug)]
pub struct DetectionScheduler {
    phase: Phase,
    generation: u64,
    in_flight: bool,
    interval_ms: u64,
    retry_limit: u32,
    retry_delay_ms: u64,
}

impl DetectionScheduler {
    pub fn new(interval_ms: u64, retry_limit: u32, retry_delay_ms: u64) -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            in_flight: false,
            interval_ms: interval_ms.max(1),
            retry_limit,
            retry_delay_ms,
        }
    }

    /// Starts the readiness-retry phase; the first check happens at `now`.
    pub fn begin(&mut self, now: u64) -> u64 {
        self.generation += 1;
        self.in_flight = false;
        self.phase = Phase::AwaitingReady {
            attempts: 0,
            next_at: now,
        };
        self.generation
    }

    pub fn halt(&mut self) {
        if self.phase != Phase::Idle || self.in_flight {
            self.generation += 1;
        }
        self.phase = Phase::Idle;
        self.in_flight = false;
    }

    /// New timings apply from the next arming of the timer.
    pub fn set_timing(&mut self, interval_ms: u64, retry_limit: u32, retry_delay_ms: u64) {
        self.interval_ms = interval_ms.max(1);
        self.retry_limit = retry_limit;
        self.retry_delay_ms = retry_delay_ms;
    }

    pub fn poll(&mut self, now: u64, ready: bool) -> TickDecision {
        match self.phase {
            Phase::Idle | Phase::AwaitingFirstResult => TickDecision::Idle,
            Phase::AwaitingReady { attempts, next_at } => {
                if now < next_at {
                    return TickDecision::Idle;
                }
                if ready {
                    self.phase = Phase::AwaitingFirstResult;
                    return self.dispatch();
                }
                let attempts = attempts + 1;
                if attempts >= self.retry_limit {
                    log::warn!(
                        "Video sink not ready after {attempts} checks; continuing on the detection interval"
                    );
                    self.phase = Phase::Steady {
                        next_tick: now + self.interval_ms,
                    };
                } else {
                    self.phase = Phase::AwaitingReady {
                        attempts,
                        next_at: now + self.retry_delay_ms,
                    };
                }
                TickDecision::Idle
            }
            Phase::Steady { next_tick } => {
                if now < next_tick {
                    return TickDecision::Idle;
                }
                // Missed ticks collapse into this one.
                let missed = (now - next_tick) / self.interval_ms;
                self.phase = Phase::Steady {
                    next_tick: next_tick + (missed + 1) * self.interval_ms,
                };
                if self.in_flight {
                    log::debug!("Skipping detection tick; previous inference still running");
                    return TickDecision::Idle;
                }
                if !ready {
                    return TickDecision::Idle;
                }
                self.dispatch()
            }
        }
    }

    /// Records a finished inference. Returns `false` for outcomes from a
    /// stale generation, which the caller must discard.
    pub fn on_completed(&mut self, generation: u64, now: u64) -> bool {
        if generation != self.generation || !self.in_flight {
            return false;
        }
        self.in_flight = false;
        if self.phase == Phase::AwaitingFirstResult {
            self.phase = Phase::Steady {
                next_tick: now + self.interval_ms,
            };
        }
        true
    }

    fn dispatch(&mut self) -> TickDecision {
        self.in_flight = true;
        TickDecision::Dispatch {
            generation: self.generation,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
