use esp_idf_hal::delay::FreeRtos;

/// Routes panics to the status display before the device restarts, so a
/// crash in the field can be read off the front panel.
pub fn setup_panic_hook(
    display: &'static crate::display::Display<impl embedded_hal_0_2::blocking::i2c::Write + Send>,
) {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(message) = panic_info.message() {
            format!("{message}")
        } else if let Some(payload) = panic_info.payload().downcast_ref::<&'static str>() {
            (*payload).to_owned()
        } else {
            "Unknown panic message".to_owned()
        };

        println!("Fatal error, restarting after display timeout - {panic_info}");

        match panic_info.location() {
            Some(location) => display.push(format!(
                "FATAL at {}:{}: {message}",
                location.file(),
                location.line(),
            )),
            None => display.push(format!("FATAL: {message}")),
        }

        FreeRtos::delay_ms(10000);
        display.push("Restarting device".to_owned());
        FreeRtos::delay_ms(3000);
        orig_hook(panic_info)
    }));
}
