//! Status LED
//!
//! Lit while the attached device is initialised.

use keyconv_hal_rp2040::StatusLed;

use crate::channels::DEVICE_READY;

#[embassy_executor::task]
pub async fn status_led_task(mut led: StatusLed<'static>) {
    loop {
        led.set_on(DEVICE_READY.wait().await);
    }
}
