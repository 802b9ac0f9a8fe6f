use ads1x1x::{channel, ic, interface::I2cInterface, mode, Ads1x1x, FullScaleRange, SlaveAddr};
use embedded_hal_0_2::adc::{Channel, OneShot};
use esp_idf_hal::i2c::I2cDriver;
use esp_idf_hal::ledc::LedcDriver;

use super::mppt::{ActuatorPort, Reading, SensorPort};

type PanelAdc<'d> = Ads1x1x<I2cInterface<I2cDriver<'d>>, ic::Ads1115, ic::Resolution16Bit, mode::OneShot>;

// ADS1115 at the 1.024 V full-scale range, 32768 counts per side.
const ADC_LSB_V: f32 = 1.024 / 32768.0;
// Sense network on the measurement board.
const VOUT_DIVIDER: f32 = 11.0;
const VIN_DIVIDER: f32 = 21.0;
const IOUT_SENSE_V_PER_A: f32 = 0.0625;
const IIN_SENSE_V_PER_A: f32 = 0.0625;
// One-shot conversions averaged per channel to knock down switching noise.
const AVG_SAMPLES: i32 = 4;

fn read_avg<'d, CH>(adc: &mut PanelAdc<'d>, channel: &mut CH) -> f32
where
    CH: Channel<PanelAdc<'d>>,
    PanelAdc<'d>: OneShot<PanelAdc<'d>, i16, CH>,
    <PanelAdc<'d> as OneShot<PanelAdc<'d>, i16, CH>>::Error: std::fmt::Debug,
{
    let mut acc: i32 = 0;
    for _ in 0..AVG_SAMPLES {
        acc += nb::block!(adc.read(channel)).unwrap() as i32;
    }
    (acc / AVG_SAMPLES).max(0) as f32 * ADC_LSB_V
}

/// Panel and output rail sensing through the four ADS1115 inputs.
pub struct PanelSensor<'d> {
    adc: PanelAdc<'d>,
}

impl<'d> PanelSensor<'d> {
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        let mut adc = Ads1x1x::new_ads1115(i2c, SlaveAddr::default());
        adc.set_full_scale_range(FullScaleRange::Within1_024V)
            .unwrap();
        Self { adc }
    }
}

impl SensorPort for PanelSensor<'_> {
    fn sample(&mut self) -> Reading {
        Reading {
            v_out: read_avg(&mut self.adc, &mut channel::SingleA0) * VOUT_DIVIDER,
            i_out: read_avg(&mut self.adc, &mut channel::SingleA1) / IOUT_SENSE_V_PER_A,
            v_in: read_avg(&mut self.adc, &mut channel::SingleA2) * VIN_DIVIDER,
            i_in: read_avg(&mut self.adc, &mut channel::SingleA3) / IIN_SENSE_V_PER_A,
        }
    }
}

/// Switch command through an LEDC channel. Dead-time lives in the gate
/// driver hardware, not here.
pub struct PwmActuator<'d> {
    channel: LedcDriver<'d>,
}

impl<'d> PwmActuator<'d> {
    pub fn new(channel: LedcDriver<'d>) -> Self {
        Self { channel }
    }
}

impl ActuatorPort for PwmActuator<'_> {
    fn set_duty(&mut self, mut duty: f32) {
        // The peripheral accepts [0, 1] no matter what the tracker was
        // configured with.
        duty = duty.min(1.0).max(0.0);
        let counts = (self.channel.get_max_duty() as f32 * duty) as u32;
        self.channel.set_duty(counts).unwrap();
    }
}
