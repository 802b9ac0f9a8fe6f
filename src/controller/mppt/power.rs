/// One engineering-unit sensor reading, taken once per control cycle.
///
/// A build without input-side sensing reports zeros on the input pair;
/// the tracker only needs the output pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reading {
    pub v_out: f32,
    pub i_out: f32,
    pub v_in: f32,
    pub i_in: f32,
}

/// Instantaneous power figures derived from a [`Reading`].
///
/// Recomputed every cycle, never retained. `p_out` is what the tracker
/// optimizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerSample {
    pub v_out: f32,
    pub i_out: f32,
    pub v_in: f32,
    pub i_in: f32,
    pub p_out: f32,
    pub p_in: f32,
    pub efficiency: f32,
}

impl PowerSample {
    pub fn compute(reading: Reading) -> Self {
        let p_out = reading.v_out * reading.i_out;
        let p_in = reading.v_in * reading.i_in;
        let efficiency = if p_in > 0.0 { p_out / p_in } else { 0.0 };

        Self {
            v_out: reading.v_out,
            i_out: reading.i_out,
            v_in: reading.v_in,
            i_in: reading.i_in,
            p_out,
            p_in,
            efficiency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_power_is_v_times_i() {
        let sample = PowerSample::compute(Reading {
            v_out: 12.0,
            i_out: 1.5,
            v_in: 24.0,
            i_in: 0.8,
        });
        assert_eq!(sample.p_out, 18.0);
        assert_eq!(sample.p_in, 19.2);
        assert!((sample.efficiency - 18.0 / 19.2).abs() < 1e-6);
    }

    #[test]
    fn missing_input_side_yields_zero_input_power() {
        let sample = PowerSample::compute(Reading {
            v_out: 12.0,
            i_out: 1.5,
            v_in: 0.0,
            i_in: 0.0,
        });
        assert_eq!(sample.p_out, 18.0);
        assert_eq!(sample.p_in, 0.0);
        assert_eq!(sample.efficiency, 0.0);
    }

    #[test]
    fn nan_reading_propagates_into_power() {
        let sample = PowerSample::compute(Reading {
            v_out: f32::NAN,
            i_out: 1.0,
            v_in: 0.0,
            i_in: 0.0,
        });
        assert!(sample.p_out.is_nan());
        // NaN input power must not produce a NaN efficiency
        assert_eq!(sample.efficiency, 0.0);
    }
}
