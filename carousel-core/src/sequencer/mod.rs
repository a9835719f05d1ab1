//! Carousel sequencer
//!
//! Owns the card registry, the revolution schedule, the position mapper and
//! every counter, and drives the motor one pulse at a time.
//!
//! The control loop calls [`Sequencer::service`] as fast as it can. Each call
//! first drains every pending command line, then advances motion by at most
//! one emitted step. A `halt` therefore takes effect within one pulse even
//! mid-move. Dwells and settle delays are deadlines compared against the
//! caller's clock, never sleeps.
//!
//! # Revolution
//!
//! A revolution walks the [`TaskSchedule`] from `current_task_index`:
//!
//! 1. The revolution counter is incremented and a progress notice queued.
//! 2. Each task steps toward its target at the active card's speed, then
//!    dwells. If the active card's speed reads 0 while halted, en route or
//!    mid-dwell, the task is abandoned: the counter increment is undone and
//!    `current_task_index` stays on that task so `go` resumes it.
//! 3. After the last task the index returns to 0 and the position is
//!    re-zeroed.
//! 4. At the revolution limit the run ends, the counter resets and a settle
//!    delay is armed. Otherwise a pending pause/stop applies.

mod commands;


use heapless::Deque;

use carousel_protocol::{Command, Line, LineError};

use crate::cards::{CardId, CardRegistry};
use crate::config::CarouselConfig;
use crate::motion::{normalize, PositionMapper};
use crate::response::{Notice, Response, Snapshot};
use crate::scheduler::TaskSchedule;
use crate::state::{CommandError, Mode, WindDown};
use crate::traits::{LineSource, StepperDriver, StepperError};

/// Queued responses awaiting the console writer
pub const OUTBOX_LEN: usize = 16;

/// Where the current task is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskPhase {
    /// Target not yet handed to the driver
    Start,
    /// Stepping toward the target
    Moving,
    /// At the target, waiting for the dwell deadline
    Dwelling { until_ms: u64 },
}

/// A revolution in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
struct Revolution {
    phase: TaskPhase,
    /// False once `restart` reset the counter under this revolution
    counted: bool,
}

/// The carousel sequencing engine
#[derive(Debug)]
pub struct Sequencer {
    config: CarouselConfig,
    registry: CardRegistry,
    schedule: TaskSchedule,
    mapper: PositionMapper,
    mode: Mode,
    wind_down: Option<WindDown>,
    rev_num: u32,
    rev_limit: u32,
    max_speed: i32,
    current_task_index: usize,
    revolution: Option<Revolution>,
    /// Target of an operator `move`/`goto` in progress
    displacement: Option<i32>,
    /// Speed parked by `halt`, restored into `halted_card`
    temp_speed: i32,
    halted_card: CardId,
    settle_until_ms: Option<u64>,
    outbox: Deque<Response, OUTBOX_LEN>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(CarouselConfig::default())
    }
}

impl Sequencer {
    /// Create a sequencer from configuration defaults
    pub fn new(config: CarouselConfig) -> Self {
        let registry = CardRegistry::new(&config);
        let schedule = TaskSchedule::build(&registry);
        let mapper = PositionMapper::new(&registry, 0);

        Self {
            config,
            registry,
            schedule,
            mapper,
            mode: Mode::Idle,
            wind_down: None,
            rev_num: 0,
            rev_limit: config.rev_limit,
            max_speed: config.max_speed,
            current_task_index: 0,
            revolution: None,
            displacement: None,
            temp_speed: 0,
            halted_card: CardId::FIRST,
            settle_until_ms: None,
            outbox: Deque::new(),
        }
    }

    /// Bring the driver in line with the sequencer
    ///
    /// Applies the speed ceiling and folds the driver's position into one
    /// revolution. Call once before the first [`service`](Self::service).
    pub fn init<D: StepperDriver>(&mut self, driver: &mut D) {
        driver.set_max_speed(self.max_speed);
        let position = normalize(driver.current_position(), self.registry.pulses_per_rev());
        driver.set_current_position(position);
        self.mapper.resync(&self.registry, position);
        info!("sequencer ready at position {}", position);
    }

    /// Current run mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// True while new revolutions may start
    pub fn run_mode(&self) -> bool {
        self.mode.is_running()
    }

    /// True while frozen by `halt`
    pub fn is_halted(&self) -> bool {
        self.mode.is_halted()
    }

    /// Revolutions started (and not aborted) in this run
    pub fn rev_num(&self) -> u32 {
        self.rev_num
    }

    /// Revolutions per run
    pub fn rev_limit(&self) -> u32 {
        self.rev_limit
    }

    /// Global speed ceiling
    pub fn max_speed(&self) -> i32 {
        self.max_speed
    }

    /// Index of the task the next revolution step works on
    pub fn current_task_index(&self) -> usize {
        self.current_task_index
    }

    /// Phase of the task in progress, if a revolution is active
    pub fn task_phase(&self) -> Option<TaskPhase> {
        self.revolution.map(|r| r.phase)
    }

    /// True while a revolution is active
    pub fn revolution_active(&self) -> bool {
        self.revolution.is_some()
    }

    /// True while an operator `move`/`goto` is in progress
    pub fn displacing(&self) -> bool {
        self.displacement.is_some()
    }

    /// Graceful stop waiting for the revolution to complete
    pub fn pending_wind_down(&self) -> Option<WindDown> {
        self.wind_down
    }

    /// Card currently over the sensor
    pub fn current_card(&self) -> CardId {
        self.mapper.current()
    }

    /// Card table
    pub fn registry(&self) -> &CardRegistry {
        &self.registry
    }

    /// True while a settle delay holds motion back
    pub fn is_settling(&self, now_ms: u64) -> bool {
        self.settle_until_ms.is_some_and(|until| now_ms < until)
    }

    /// Summary for `status`
    pub fn snapshot(&self, position: i32) -> Snapshot {
        Snapshot {
            mode: self.mode,
            rev_num: self.rev_num,
            rev_limit: self.rev_limit,
            task_index: self.current_task_index,
            card: self.mapper.current(),
            position,
        }
    }

    /// Take the oldest queued response
    pub fn pop_response(&mut self) -> Option<Response> {
        self.outbox.pop_front()
    }

    /// One control-loop iteration
    ///
    /// Drains every pending command line, then emits at most one step.
    pub fn service<D, L>(
        &mut self,
        driver: &mut D,
        lines: &mut L,
        now_ms: u64,
    ) -> Result<(), StepperError>
    where
        D: StepperDriver,
        L: LineSource,
    {
        while let Some(line) = lines.next_line() {
            self.handle_line(line, driver, now_ms);
        }
        self.step(driver, now_ms)
    }

    /// Parse and execute one console line
    ///
    /// Failures are queued as `ERROR` responses; state is untouched.
    pub fn handle_line<D: StepperDriver>(
        &mut self,
        line: Result<Line, LineError>,
        driver: &mut D,
        now_ms: u64,
    ) {
        let result = line
            .map_err(CommandError::from)
            .and_then(|l| Command::parse(&l).map_err(CommandError::from))
            .and_then(|cmd| self.execute(cmd, driver, now_ms));

        if let Err(e) = result {
            warn!("command rejected: {}", e);
            self.respond(Response::Error(e));
        }
    }

    /// Advance motion by at most one step
    pub fn step<D: StepperDriver>(&mut self, driver: &mut D, now_ms: u64) -> Result<(), StepperError> {
        if let Some(until) = self.settle_until_ms {
            if now_ms < until {
                return Ok(());
            }
            self.settle_until_ms = None;
        }

        if let Some(target) = self.displacement {
            return self.step_displacement(driver, target);
        }

        if self.revolution.is_none() {
            if !self.mode.is_running() {
                return Ok(());
            }
            if self.rev_num >= self.rev_limit {
                // Limit lowered below the counter mid-run
                self.finish_run(now_ms);
                return Ok(());
            }
            self.begin_revolution();
        }

        self.advance_revolution(driver, now_ms)
    }

    fn respond(&mut self, response: Response) {
        if self.outbox.is_full() {
            warn!("response outbox full, dropping oldest");
            self.outbox.pop_front();
        }
        let _ = self.outbox.push_back(response);
    }

    /// A revolution is active, or one was abandoned part-way
    fn in_flight(&self) -> bool {
        self.revolution.is_some() || self.current_task_index > 0
    }

    fn begin_revolution(&mut self) {
        self.rev_num += 1;
        self.revolution = Some(Revolution {
            phase: TaskPhase::Start,
            counted: true,
        });
        info!(
            "revolution {} of {} from task {}",
            self.rev_num, self.rev_limit, self.current_task_index
        );
        self.respond(Response::Status(Notice::Revolution {
            num: self.rev_num,
            limit: self.rev_limit,
        }));
    }

    fn advance_revolution<D: StepperDriver>(
        &mut self,
        driver: &mut D,
        now_ms: u64,
    ) -> Result<(), StepperError> {
        let Some(mut revolution) = self.revolution else {
            return Ok(());
        };
        let Some(task) = self.schedule.get(self.current_task_index).copied() else {
            self.complete_revolution(driver, now_ms);
            return Ok(());
        };

        match revolution.phase {
            TaskPhase::Start | TaskPhase::Moving => {
                let speed = self.registry.get(self.mapper.current()).running_speed;
                if speed == 0 && self.mode.is_halted() {
                    self.abort_revolution(revolution);
                    return Ok(());
                }

                // `stop()` collapses the driver target; re-assert ours
                if driver.target_position() != task.target {
                    driver.move_to(task.target);
                }
                revolution.phase = TaskPhase::Moving;

                if driver.distance_to_go() != 0 {
                    driver.set_speed(speed);
                    if driver.run_speed_to_position()? {
                        self.mapper
                            .track(&self.registry, driver.current_position());
                    }
                }

                if driver.distance_to_go() == 0 {
                    let dwell = task.dwell_ms(&self.registry);
                    debug!("task {} at {}, dwell {} ms", self.current_task_index, task.target, dwell);
                    revolution.phase = TaskPhase::Dwelling {
                        until_ms: now_ms + u64::from(dwell),
                    };
                }
                self.revolution = Some(revolution);
            }
            TaskPhase::Dwelling { until_ms } => {
                let speed = self.registry.get(self.mapper.current()).running_speed;
                if speed == 0 && self.mode.is_halted() {
                    // Re-dwells at the same task on `go`
                    self.abort_revolution(revolution);
                    return Ok(());
                }
                if now_ms >= until_ms {
                    self.current_task_index += 1;
                    revolution.phase = TaskPhase::Start;
                    self.revolution = Some(revolution);
                    if self.current_task_index >= self.schedule.len() {
                        self.complete_revolution(driver, now_ms);
                    }
                }
            }
        }
        Ok(())
    }

    /// Silent recovery from a halt en route or mid-dwell
    fn abort_revolution(&mut self, revolution: Revolution) {
        if revolution.counted {
            self.rev_num = self.rev_num.saturating_sub(1);
        }
        self.revolution = None;
        debug!(
            "revolution abandoned at task {}, counter back to {}",
            self.current_task_index, self.rev_num
        );
    }

    fn complete_revolution<D: StepperDriver>(&mut self, driver: &mut D, now_ms: u64) {
        let counted = self.revolution.is_some_and(|r| r.counted);
        self.revolution = None;
        self.current_task_index = 0;

        // Fresh origin each revolution
        driver.set_current_position(0);
        self.mapper.resync(&self.registry, 0);

        if counted && self.rev_num >= self.rev_limit {
            self.finish_run(now_ms);
        } else if let Some(wind_down) = self.wind_down.take() {
            self.apply_wind_down(wind_down);
        }
    }

    fn finish_run(&mut self, now_ms: u64) {
        info!("run complete after {} revolutions", self.rev_num);
        let limit = self.rev_limit;
        self.rev_num = 0;
        self.wind_down = None;
        if self.mode.is_running() {
            self.mode = Mode::Idle;
        }
        self.settle_until_ms = Some(now_ms + self.config.settle_ms);
        self.respond(Response::Status(Notice::RunComplete { limit }));
    }

    fn apply_wind_down(&mut self, wind_down: WindDown) {
        self.mode = wind_down.target_mode();
        if wind_down == WindDown::Stop {
            self.rev_num = 0;
        }
        info!("{}", self.mode.label());
        self.respond(Response::Status(Notice::Mode(self.mode)));
    }

    fn step_displacement<D: StepperDriver>(
        &mut self,
        driver: &mut D,
        target: i32,
    ) -> Result<(), StepperError> {
        if driver.target_position() != target {
            driver.move_to(target);
        }

        if driver.distance_to_go() != 0 {
            driver.set_speed(self.max_speed);
            if driver.run_speed_to_position()? {
                self.mapper
                    .track(&self.registry, driver.current_position());
            }
        }

        if driver.distance_to_go() == 0 {
            let position = normalize(driver.current_position(), self.registry.pulses_per_rev());
            driver.set_current_position(position);
            self.mapper.resync(&self.registry, position);
            self.displacement = None;
            self.respond(Response::Displace { position });
        }
        Ok(())
    }

    /// Put the speed parked by `halt` back on its card
    fn restore_speed(&mut self) {
        self.registry.get_mut(self.halted_card).running_speed = self.temp_speed;
    }
}
