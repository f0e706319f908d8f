//! Manual/automatic toggle button
//!
//! Every debounced press flips the operation mode. Switching to manual stops a
//! running replay after its current command; switching to automatic starts a
//! new replay.

use chassis_control::console::Reply;
use defmt::info;
use embassy_rp::gpio::{Input, Level, Pull};
use embassy_time::{Duration, Timer};

use crate::system::event;
use crate::system::resources::ModeButtonResources;
use crate::system::state::{self, MODE};

const DEBOUNCE_DURATION: Duration = Duration::from_millis(30);

#[embassy_executor::task]
pub async fn mode_button(r: ModeButtonResources) {
    let mut button = Input::new(r.button_pin, Pull::Down);
    loop {
        if debounce(&mut button).await != Level::High {
            continue;
        }
        let mode = MODE.toggle();
        info!("Mode button pressed, now {}", mode);
        state::mode_switched(mode);
        event::try_send_status(Reply::Mode(mode).text());
    }
}

/// Waits for the next edge that leaves the button in a new stable level
async fn debounce(button: &mut Input<'static>) -> Level {
    loop {
        let start_level = button.get_level();
        button.wait_for_any_edge().await;
        Timer::after(DEBOUNCE_DURATION).await;
        let end_level = button.get_level();
        if start_level != end_level {
            break end_level;
        }
    }
}
