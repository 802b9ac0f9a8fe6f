pub mod mppt;
mod ports;

use std::time::Duration;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{Gpio17, Gpio21, Gpio22};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver, I2C1};
use esp_idf_hal::ledc::{config::TimerConfig, LEDC};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver};
use esp_idf_hal::prelude::FromValueType;

// Converter limits and search parameters for this buck stage. The safety
// bounds are what the power stage tolerates; the sweep happens to span the
// same range.
const DUTY_STEP: f32 = 0.005;
const DUTY_START: f32 = 0.55;
const DUTY_MAX_SWEEP: f32 = 0.75;
const DUTY_MIN: f32 = 0.55;
const DUTY_MAX: f32 = 0.75;
// Longer than the switching period and the sensor filter time constant.
const SETTLE_MS: u16 = 100;

const STATUS_EVERY: u64 = 50;

pub async fn run_controller(
    display: &'static crate::display::Display<impl embedded_hal_0_2::blocking::i2c::Write + Send>,
    i2c: I2C1,
    sda: Gpio21,
    scl: Gpio22,
    ledc: LEDC,
    pwm_pin: Gpio17,
) -> ! {
    let i2c_config = I2cConfig::new().baudrate(400.kHz().into());
    let i2c = I2cDriver::new(i2c, sda, scl, &i2c_config).unwrap();
    let sensor = ports::PanelSensor::new(i2c);

    let channel = LedcDriver::new(
        ledc.channel0,
        LedcTimerDriver::new(
            ledc.timer0,
            &TimerConfig::new()
                .frequency(50.kHz().into())
                .resolution(esp_idf_hal::ledc::Resolution::Bits10),
        )
        .unwrap(),
        pwm_pin,
    )
    .unwrap();
    let actuator = ports::PwmActuator::new(channel);

    let tracker_config = mppt::Config {
        duty_step: DUTY_STEP,
        duty_start: DUTY_START,
        duty_max_sweep: DUTY_MAX_SWEEP,
        duty_min: DUTY_MIN,
        duty_max: DUTY_MAX,
        settle_ms: SETTLE_MS,
    };
    let mut tracker = match mppt::Mppt::new(tracker_config, sensor, actuator) {
        Ok(tracker) => tracker,
        // The converter must not switch with a broken search range.
        Err(err) => panic!("Refusing to start the MPPT controller: {err:?}"),
    };

    display.push("MPPT controller started".to_owned());

    let mut count: u64 = 0;
    loop {
        let sample = tracker.run_cycle(&mut FreeRtos);

        if count % STATUS_EVERY == 0 {
            let point = tracker.operating_point();
            display.status(format!(
                "{:?} d={:.3} best={:.2}W",
                tracker.state(),
                tracker.duty(),
                point.power,
            ));
            display.push(format!(
                "vout={:.2}V iout={:.2}A eff={:.0}%",
                sample.v_out,
                sample.i_out,
                sample.efficiency * 100.0,
            ));
        }

        // The settle waits inside the cycle dominate; this only paces the
        // loop so the duty is updated at a fixed cadence.
        smol::Timer::after(Duration::from_millis(70)).await;
        count += 1;
    }
}
