//! Maximum power point tracker for the panel-fed buck stage.
//!
//! Two phases: an initial duty sweep that locates the best operating point
//! over the configured range, then an endless perturb-and-observe loop that
//! alternates probes below and above that point to follow the panel.

mod clamp;
mod power;

pub use clamp::clamp;
pub use power::{PowerSample, Reading};

use embedded_hal_0_2::blocking::delay::DelayMs;

/// Delivers one engineering-unit sample per request.
pub trait SensorPort {
    fn sample(&mut self) -> Reading;
}

/// Accepts a duty fraction and programs it into the converter.
pub trait ActuatorPort {
    fn set_duty(&mut self, duty: f32);
}

#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// Increment used both for the sweep and for perturb probes.
    pub duty_step: f32,
    /// Where the sweep begins, near the panel's open-circuit end.
    pub duty_start: f32,
    /// Upper bound of the sweep. Reaching it ends the search phase.
    pub duty_max_sweep: f32,
    /// Absolute converter safety bounds, independent of the sweep range.
    pub duty_min: f32,
    pub duty_max: f32,
    /// Wait after every duty change before the effect is measured.
    pub settle_ms: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    DutyStepNotPositive,
    DutyStartOutOfBounds,
    SweepBoundNotAboveStart,
    SafetyBoundsInverted,
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        // Written so that a NaN in any field fails the matching check.
        if !(self.duty_step > 0.0) {
            return Err(ConfigError::DutyStepNotPositive);
        }
        if !(self.duty_min <= self.duty_max) {
            return Err(ConfigError::SafetyBoundsInverted);
        }
        if !(self.duty_start >= self.duty_min && self.duty_start <= self.duty_max) {
            return Err(ConfigError::DutyStartOutOfBounds);
        }
        if !(self.duty_max_sweep > self.duty_start) {
            return Err(ConfigError::SweepBoundNotAboveStart);
        }
        Ok(())
    }
}

/// Best point seen so far. Lives for the whole controller lifetime.
#[derive(Debug, Clone, Copy)]
pub struct OperatingPoint {
    pub duty: f32,
    pub power: f32,
    pub v_in: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Sweeping,
    Tracking,
}

/// Which side of the operating point the next probe goes to.
/// Alternates strictly, so any two consecutive tracking cycles test both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PerturbationCycle {
    AwaitingDecrease,
    AwaitingIncrease,
}

pub struct Mppt<S, A> {
    config: Config,
    sensor: S,
    actuator: A,

    state: State,
    cycle: PerturbationCycle,
    best: OperatingPoint,

    /// Sweep position. Advances unclamped so the sweep terminates even if
    /// the safety range is narrower than the sweep range.
    sweep_duty: f32,
    /// Last duty actually commanded, after clamping.
    duty: f32,
}

impl<S: SensorPort, A: ActuatorPort> Mppt<S, A> {
    pub fn new(config: Config, sensor: S, actuator: A) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut mppt = Self {
            sensor,
            actuator,
            state: State::Sweeping,
            cycle: PerturbationCycle::AwaitingDecrease,
            best: OperatingPoint {
                duty: config.duty_start,
                power: 0.0,
                v_in: 0.0,
            },
            sweep_duty: config.duty_start,
            duty: config.duty_start,
            config,
        };

        // Put the converter at the sweep start right away rather than
        // leaving the switch command undefined until the first cycle.
        mppt.apply_duty(config.duty_start);
        Ok(mppt)
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn operating_point(&self) -> OperatingPoint {
        self.best
    }

    pub fn duty(&self) -> f32 {
        self.duty
    }

    /// One full control cycle. Returns the last sample taken so the caller
    /// can log it without the tracker holding on to it.
    pub fn run_cycle(&mut self, delay: &mut impl DelayMs<u16>) -> PowerSample {
        match self.state {
            State::Sweeping => self.sweep_cycle(delay),
            State::Tracking => self.track_cycle(delay),
        }
    }

    fn sweep_cycle(&mut self, delay: &mut impl DelayMs<u16>) -> PowerSample {
        self.apply_duty(self.sweep_duty);
        delay.delay_ms(self.config.settle_ms);

        let sample = self.measure();
        if sample.p_out > self.best.power {
            self.best = OperatingPoint {
                duty: self.duty,
                power: sample.p_out,
                v_in: sample.v_in,
            };
            println!("New best point: duty {:.3}, {:.2} W", self.best.duty, self.best.power);
        }

        self.sweep_duty += self.config.duty_step;
        if self.sweep_duty >= self.config.duty_max_sweep {
            println!(
                "Sweep finished, tracking from duty {:.3} ({:.2} W)",
                self.best.duty, self.best.power
            );
            let best_duty = self.best.duty;
            self.apply_duty(best_duty);
            self.state = State::Tracking;
            self.cycle = PerturbationCycle::AwaitingDecrease;
        }

        sample
    }

    fn track_cycle(&mut self, delay: &mut impl DelayMs<u16>) -> PowerSample {
        // Go back to the best-known point and take a fresh baseline there.
        // A reading left over from the probe of the previous cycle would
        // make the comparison below meaningless.
        let best_duty = self.best.duty;
        self.apply_duty(best_duty);
        delay.delay_ms(self.config.settle_ms);

        // A NaN baseline never enters the operating point; the comparison
        // below still uses it, so a bad cycle updates nothing at all.
        let baseline_power = self.measure().p_out;
        if baseline_power.is_finite() {
            self.best.power = baseline_power;
        }

        let probe = match self.cycle {
            PerturbationCycle::AwaitingDecrease => {
                self.cycle = PerturbationCycle::AwaitingIncrease;
                self.best.duty - self.config.duty_step
            }
            PerturbationCycle::AwaitingIncrease => {
                self.cycle = PerturbationCycle::AwaitingDecrease;
                self.best.duty + self.config.duty_step
            }
        };
        self.apply_duty(probe);
        delay.delay_ms(self.config.settle_ms);

        let probed = self.measure();
        if probed.p_out > baseline_power {
            // Keep the clamped duty we actually commanded, not the raw probe.
            self.best.duty = self.duty;
            self.best.power = probed.p_out;
            println!(
                "Perturb improved: duty {:.3}, {:.2} W",
                self.best.duty, self.best.power
            );
        }

        probed
    }

    fn measure(&mut self) -> PowerSample {
        PowerSample::compute(self.sensor.sample())
    }

    fn apply_duty(&mut self, duty: f32) {
        let bounded = clamp(duty, self.config.duty_min, self.config.duty_max);
        self.duty = bounded;
        self.actuator.set_duty(bounded);
    }
}
