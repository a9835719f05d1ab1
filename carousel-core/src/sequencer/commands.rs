//! Command execution
//!
//! Every handler validates before it mutates: a returned error means the
//! sequencer is exactly as it was.

use carousel_protocol::Command;

use super::Sequencer;
use crate::cards::CardId;
use crate::config::CarouselConfig;
use crate::motion::normalize;
use crate::response::{Notice, Reading, Response};
use crate::scheduler::TaskSchedule;
use crate::state::{CommandError, Mode, WindDown};
use crate::traits::StepperDriver;

fn card_id(card: i32) -> Result<CardId, CommandError> {
    CardId::new(card).ok_or(CommandError::InvalidCardId)
}

fn dwell(ms: i32) -> Result<u32, CommandError> {
    u32::try_from(ms).map_err(|_| CommandError::InvalidCommand)
}

impl Sequencer {
    /// Execute one parsed command
    ///
    /// Successful commands queue their responses; errors are returned and
    /// left for the caller to report.
    pub fn execute<D: StepperDriver>(
        &mut self,
        command: Command,
        driver: &mut D,
        now_ms: u64,
    ) -> Result<(), CommandError> {
        debug!("execute {}", command.verb());

        match command {
            Command::Position => {
                self.respond(Response::Get(Reading::Position(driver.current_position())));
            }
            Command::PulsesPerRev(None) => {
                self.respond(Response::Get(Reading::PulsesPerRev(
                    self.registry.pulses_per_rev(),
                )));
            }
            Command::PulsesPerRev(Some(pulses)) => self.set_pulses_per_rev(pulses, driver)?,
            Command::Limit(None) => {
                self.respond(Response::Get(Reading::Limit(self.rev_limit)));
            }
            Command::Limit(Some(limit)) => {
                let limit = u32::try_from(limit).map_err(|_| CommandError::InvalidCommand)?;
                self.rev_limit = limit;
                self.respond(Response::Update(Reading::Limit(limit)));
            }
            Command::MaxSpeed(None) => {
                self.respond(Response::Get(Reading::MaxSpeed(self.max_speed)));
            }
            Command::MaxSpeed(Some(speed)) => self.set_max_speed(speed, driver)?,
            Command::Speed { card, speed: None } => {
                let card = card_id(card)?;
                let speed = self.registry.get(card).running_speed;
                self.respond(Response::Get(Reading::Speed { card, speed }));
            }
            Command::Speed {
                card,
                speed: Some(speed),
            } => {
                let card = card_id(card)?;
                self.set_card_speed(card, speed, driver)?;
            }
            Command::Origin => self.origin(driver)?,
            Command::Move(delta) => {
                self.check_displaceable()?;
                driver.move_by(delta);
                self.begin_displacement(driver.target_position(), driver);
            }
            Command::Goto(target) => {
                self.check_displaceable()?;
                if !(0..=self.registry.pulses_per_rev()).contains(&target) {
                    return Err(CommandError::OutOfBounds);
                }
                self.begin_displacement(target, driver);
            }
            Command::Go => self.go()?,
            Command::Halt => self.halt(driver)?,
            Command::Pause => self.wind_down(WindDown::Pause)?,
            Command::Stop => self.wind_down(WindDown::Stop)?,
            Command::Restart => self.restart(driver, now_ms),
            Command::ScanTime { card, ms: None } => {
                let card = card_id(card)?;
                let ms = self.registry.get(card).scan_time_ms;
                self.respond(Response::Get(Reading::ScanTime { card, ms }));
            }
            Command::ScanTime { card, ms: Some(ms) } => {
                let card = card_id(card)?;
                let ms = dwell(ms)?;
                self.registry.get_mut(card).scan_time_ms = ms;
                self.respond(Response::Update(Reading::ScanTime { card, ms }));
            }
            Command::OffTime { card, ms: None } => {
                let card = card_id(card)?;
                let ms = self.registry.get(card).off_time_ms;
                self.respond(Response::Get(Reading::OffTime { card, ms }));
            }
            Command::OffTime { card, ms: Some(ms) } => {
                let card = card_id(card)?;
                let ms = dwell(ms)?;
                self.registry.get_mut(card).off_time_ms = ms;
                self.respond(Response::Update(Reading::OffTime { card, ms }));
            }
            Command::Status => {
                let snapshot = self.snapshot(driver.current_position());
                self.respond(Response::Get(Reading::Snapshot(snapshot)));
            }
        }
        Ok(())
    }

    /// Rebuild bands and schedule for a new revolution length
    fn set_pulses_per_rev<D: StepperDriver>(
        &mut self,
        pulses: i32,
        driver: &mut D,
    ) -> Result<(), CommandError> {
        if !CarouselConfig::is_valid_pulses_per_rev(pulses) {
            return Err(CommandError::InvalidCommand);
        }
        self.check_displaceable()?;

        self.registry.set_pulses_per_rev(pulses);
        self.schedule = TaskSchedule::build(&self.registry);
        // Task targets moved; an abandoned revolution cannot resume
        self.current_task_index = 0;

        let position = normalize(driver.current_position(), pulses);
        driver.set_current_position(position);
        self.mapper.resync(&self.registry, position);

        info!("revolution length {} pulses", pulses);
        self.respond(Response::Update(Reading::PulsesPerRev(pulses)));
        Ok(())
    }

    fn set_max_speed<D: StepperDriver>(
        &mut self,
        speed: i32,
        driver: &mut D,
    ) -> Result<(), CommandError> {
        if speed <= 0 {
            return Err(CommandError::InvalidCommand);
        }

        self.max_speed = speed;
        driver.set_max_speed(speed);
        let mut count = self.registry.clamp_speeds(speed);
        let parked = self.temp_speed.clamp(-speed, speed);
        if parked != self.temp_speed && self.mode.is_halted() {
            self.temp_speed = parked;
            count += 1;
        }

        self.respond(Response::Update(Reading::MaxSpeed(speed)));
        if count > 0 {
            warn!("{} card speeds clamped to {}", count, speed);
            self.respond(Response::Status(Notice::SpeedsClamped {
                count,
                ceiling: speed,
            }));
        }
        Ok(())
    }

    fn set_card_speed<D: StepperDriver>(
        &mut self,
        card: CardId,
        speed: i32,
        driver: &mut D,
    ) -> Result<(), CommandError> {
        if speed == 0 {
            return self.halt_card(card, driver);
        }

        let limited = speed.clamp(-self.max_speed, self.max_speed);
        if limited != speed {
            warn!("card {} speed {} clamped to {}", card.get(), speed, limited);
            self.respond(Response::Status(Notice::SpeedClamped {
                card,
                requested: speed,
                ceiling: limited,
            }));
        }

        if self.mode.is_halted() && card == self.halted_card {
            // Takes effect on `go`
            self.temp_speed = limited;
        } else {
            self.registry.get_mut(card).running_speed = limited;
        }
        self.respond(Response::Update(Reading::Speed {
            card,
            speed: limited,
        }));
        Ok(())
    }

    fn origin<D: StepperDriver>(&mut self, driver: &mut D) -> Result<(), CommandError> {
        self.check_displaceable()?;

        driver.set_current_position(0);
        self.mapper.resync(&self.registry, 0);
        self.respond(Response::Status(Notice::Origin));
        Ok(())
    }

    /// Manual motion and re-zeroing need the carousel at rest
    fn check_displaceable(&self) -> Result<(), CommandError> {
        if !self.mode.is_at_rest() || self.revolution.is_some() || self.displacement.is_some() {
            Err(CommandError::AlreadyRunning)
        } else {
            Ok(())
        }
    }

    fn begin_displacement<D: StepperDriver>(&mut self, target: i32, driver: &mut D) {
        debug!("displacing to {}", target);
        driver.move_to(target);
        self.displacement = Some(target);
    }

    fn go(&mut self) -> Result<(), CommandError> {
        if self.mode.is_running() {
            if self.wind_down.take().is_some() {
                info!("wind-down cancelled");
                self.respond(Response::Status(Notice::Mode(Mode::Running)));
                return Ok(());
            }
            return Err(CommandError::AlreadyRunning);
        }
        if self.rev_num >= self.rev_limit {
            return Err(CommandError::LimitReached);
        }

        if self.mode.is_halted() {
            self.restore_speed();
        }
        self.mode = Mode::Running;
        info!("running from rev {} task {}", self.rev_num, self.current_task_index);
        self.respond(Response::Status(Notice::Mode(Mode::Running)));
        Ok(())
    }

    fn halt<D: StepperDriver>(&mut self, driver: &mut D) -> Result<(), CommandError> {
        self.mode.check_halt()?;
        let card = self.mapper.current();
        self.freeze(card, driver);
        Ok(())
    }

    /// `speed <card> 0`: halt in that card's context
    fn halt_card<D: StepperDriver>(
        &mut self,
        card: CardId,
        driver: &mut D,
    ) -> Result<(), CommandError> {
        self.mode.check_halt()?;
        self.freeze(card, driver);
        self.respond(Response::Update(Reading::Speed { card, speed: 0 }));
        Ok(())
    }

    fn freeze<D: StepperDriver>(&mut self, card: CardId, driver: &mut D) {
        let speed = &mut self.registry.get_mut(card).running_speed;
        self.temp_speed = *speed;
        *speed = 0;
        self.halted_card = card;

        if card == self.mapper.current() {
            driver.stop();
        }
        if self.displacement.take().is_some() {
            driver.stop();
        }
        self.wind_down = None;
        self.mode = Mode::Halted;

        info!("halted on card {}, parked speed {}", card.get(), self.temp_speed);
        self.respond(Response::Status(Notice::Mode(Mode::Halted)));
    }

    fn wind_down(&mut self, wind_down: WindDown) -> Result<(), CommandError> {
        self.mode.check_wind_down()?;

        if self.mode.is_halted() {
            // Finish the revolution before winding down
            self.restore_speed();
            self.mode = Mode::Running;
        }

        if self.in_flight() {
            self.wind_down = Some(wind_down);
            self.respond(Response::Status(Notice::WindDownPending(wind_down)));
        } else {
            self.wind_down = None;
            self.apply_wind_down(wind_down);
        }
        Ok(())
    }

    fn restart<D: StepperDriver>(&mut self, driver: &mut D, now_ms: u64) {
        if self.mode.is_halted() {
            self.restore_speed();
        }
        if self.displacement.take().is_some() {
            driver.stop();
        }
        if let Some(revolution) = self.revolution.as_mut() {
            revolution.counted = false;
        }

        self.rev_num = 0;
        self.wind_down = None;
        self.mode = Mode::Running;
        self.settle_until_ms = Some(now_ms + self.config.settle_ms);

        info!("restart, settling {} ms", self.config.settle_ms);
        self.respond(Response::Status(Notice::Restarted {
            settle_ms: self.config.settle_ms,
        }));
    }
}
