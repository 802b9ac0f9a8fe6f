use embedded_graphics::{
    mono_font::{iso_8859_1::FONT_4X6, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};
use std::sync::Mutex;

const LINE_HEIGHT: usize = 6;
// Top row is reserved for the live controller status.
const FIT_MESSAGES: usize = 64 / LINE_HEIGHT - 1;
const FIT_CHARACTERS: usize = 128 / 4;

struct Inner<I2C: embedded_hal_0_2::blocking::i2c::Write> {
    driver: Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>,
    status: String,
    messages: Vec<String>,
}

impl<I2C: embedded_hal_0_2::blocking::i2c::Write> Inner<I2C> {
    fn redraw(&mut self) {
        self.driver.clear();

        let text_style = MonoTextStyleBuilder::new()
            .font(&FONT_4X6)
            .text_color(BinaryColor::On)
            .build();

        Text::with_baseline(&self.status, Point::zero(), text_style, Baseline::Top)
            .draw(&mut self.driver)
            .unwrap();

        for (i, value) in self.messages.iter().enumerate() {
            let y = (i + 1) * LINE_HEIGHT;

            Text::with_baseline(value, Point::new(0, y as i32), text_style, Baseline::Top)
                .draw(&mut self.driver)
                .unwrap();
        }

        self.driver.flush().unwrap();
    }

    fn do_push(&mut self, message: String) {
        if self.messages.len() == FIT_MESSAGES {
            self.messages.remove(0);
        }
        println!("DISPLAY: {message}");
        self.messages.push(message);
    }

    fn push(&mut self, message: String) {
        if message.len() > FIT_CHARACTERS {
            let chars = message.chars().collect::<Vec<_>>();
            for chunk in chars.chunks(FIT_CHARACTERS) {
                self.do_push(chunk.iter().collect::<String>().trim().to_owned());
            }
        } else {
            self.do_push(message);
        }
        self.redraw();
    }
}

pub struct Display<I2C: embedded_hal_0_2::blocking::i2c::Write> {
    inner: Option<Mutex<Inner<I2C>>>,
}

impl<I2C: embedded_hal_0_2::blocking::i2c::Write> Display<I2C> {
    pub fn new(i2c: I2C) -> Self {
        const USE_DISPLAY: bool = {
            match option_env!("USE_DISPLAY") {
                Some(val) => {
                    if !konst::eq_str(val, "true") && !konst::eq_str(val, "false") {
                        panic!("Environment variable USE_DISPLAY must be true or false");
                    }
                    konst::eq_str(val, "true")
                }
                // No display fitted unless the build says otherwise.
                None => false,
            }
        };

        if !USE_DISPLAY {
            Self { inner: None }
        } else {
            let interface = I2CDisplayInterface::new(i2c);
            let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
                .into_buffered_graphics_mode();
            driver.init().unwrap();

            Self {
                inner: Some(Mutex::new(Inner {
                    driver,
                    status: String::new(),
                    messages: Vec::with_capacity(FIT_MESSAGES),
                })),
            }
        }
    }

    /// Replaces the pinned top line. Used for the live tracker state.
    pub fn status(&self, line: String) {
        if let Some(inner) = self.inner.as_ref() {
            let mut locked = inner.lock().unwrap();
            locked.status = line;
            locked.redraw();
        }
    }

    /// Appends to the scrolling log under the status line.
    pub fn push(&self, message: String) {
        if let Some(inner) = self.inner.as_ref() {
            let mut locked = inner.lock().unwrap();
            locked.push(message);
        }
    }
}
