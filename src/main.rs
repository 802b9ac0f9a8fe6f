#![feature(panic_info_message)]
#![allow(unused)]

mod controller;
mod display;
mod panic_hook;

use esp_idf_sys as _; // If using the `binstart` feature of `esp-idf-sys`, always keep this module imported

use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::prelude::*;

async fn do_main() -> ! {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_sys::link_patches();
    // This registration is required for delays/timers to function
    esp_idf_sys::esp!(unsafe {
        esp_idf_sys::esp_vfs_eventfd_register(&esp_idf_sys::esp_vfs_eventfd_config_t {
            max_fds: 50,
        })
    })
    .unwrap();
    // Enable backtrace (improved output for panic)
    std::env::set_var("RUST_BACKTRACE", "1");
    // Increase stack size of spawned threads
    std::env::set_var("RUST_MIN_STACK", "7000");

    let peripherals = Peripherals::take().unwrap();

    // SETUP DISPLAY -------------------------------------------------------------------------------------------------

    let i2c = peripherals.i2c0;
    let sda = peripherals.pins.gpio4;
    let scl = peripherals.pins.gpio15;

    let config = I2cConfig::new().baudrate(400.kHz().into());
    let i2c = I2cDriver::new(i2c, sda, scl, &config).unwrap();

    let display: &'static _ = Box::leak(Box::new(display::Display::new(i2c)));
    panic_hook::setup_panic_hook(display);

    // RUN THE MPPT CONTROLLER ---------------------------------------------------------------------------------------

    controller::run_controller(
        display,
        peripherals.i2c1,
        peripherals.pins.gpio21,
        peripherals.pins.gpio22,
        peripherals.ledc,
        peripherals.pins.gpio17,
    )
    .await
}

fn main() {
    smol::block_on(do_main());
}
