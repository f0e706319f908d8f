//! Hardware Resource Management
//!
//! Allocates pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Drivetrain: two TB6612FNG drivers, one PWM channel and two direction pins per wheel
//! - Pulse sensors: one optical slot sensor per wheel
//! - Lights: one output per wheel position
//! - Serial link: UART to the BLE module
//! - Status bus: I2C to the receiving display controller
//! - Mode button: manual/automatic toggle
//!
//! # Pin map (Pico 2)
//! | Function            | Pins                       |
//! |---------------------|----------------------------|
//! | wheel PWM           | GP0 GP1 GP2 GP3            |
//! | wheel direction     | GP6..GP13 (in1/in2 pairs)  |
//! | driver standby      | GP14 (shared)              |
//! | mode button         | GP15                       |
//! | pulse sensors       | GP16 GP17 GP18 GP19        |
//! | status bus SDA/SCL  | GP20 GP21                  |
//! | lights              | GP22 GP26 GP27 GP28        |
//! | BLE UART TX/RX      | GP4 GP5                    |

use assign_resources::assign_resources;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{self, Async, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{self, I2C0, UART1};
use embassy_rp::uart::{
    self, BufferedInterruptHandler, BufferedUart, BufferedUartRx, BufferedUartTx,
};
use static_cell::StaticCell;

/// Baud rate of the BLE module
const SERIAL_BAUD_RATE: u32 = 9600;

/// The receiving end runs the bus in standard mode
const STATUS_BUS_FREQUENCY: u32 = 100_000;

const SERIAL_BUFFER_SIZE: usize = 128;

static SERIAL_TX_BUFFER: StaticCell<[u8; SERIAL_BUFFER_SIZE]> = StaticCell::new();
static SERIAL_RX_BUFFER: StaticCell<[u8; SERIAL_BUFFER_SIZE]> = StaticCell::new();

assign_resources! {
    /// TB6612FNG motor drivers, front driver on PWM slice 0, rear driver on slice 1
    drivetrain: DrivetrainResources {
        standby_pin: PIN_14,
        front_slice: PWM_SLICE0,
        front_left_pwm_pin: PIN_0,
        front_right_pwm_pin: PIN_1,
        rear_slice: PWM_SLICE1,
        rear_left_pwm_pin: PIN_2,
        rear_right_pwm_pin: PIN_3,
        front_left_in1: PIN_6,
        front_left_in2: PIN_7,
        front_right_in1: PIN_8,
        front_right_in2: PIN_9,
        rear_left_in1: PIN_10,
        rear_left_in2: PIN_11,
        rear_right_in1: PIN_12,
        rear_right_in2: PIN_13,
    },
    /// Wheel slot sensors, one rising edge per slot
    pulse_sensors: PulseSensorResources {
        front_left: PIN_16,
        front_right: PIN_17,
        rear_left: PIN_18,
        rear_right: PIN_19,
    },
    /// Light outputs in wheel order
    lights: LightResources {
        front_left: PIN_22,
        front_right: PIN_26,
        rear_left: PIN_27,
        rear_right: PIN_28,
    },
    /// UART to the BLE module
    serial: SerialResources {
        uart: UART1,
        tx_pin: PIN_4,
        rx_pin: PIN_5,
    },
    /// I2C link carrying framed status messages
    status_bus: StatusBusResources {
        i2c: I2C0,
        sda_pin: PIN_20,
        scl_pin: PIN_21,
    },
    /// Manual/automatic toggle button
    mode_button: ModeButtonResources {
        button_pin: PIN_15,
    },
}

bind_interrupts!(pub struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
});

/// Opens the BLE serial link and splits it into its two directions
///
/// Must only be called once; the buffers are handed out for the lifetime of the program.
pub fn init_serial(
    r: SerialResources,
) -> (
    BufferedUartTx<'static, UART1>,
    BufferedUartRx<'static, UART1>,
) {
    let mut config = uart::Config::default();
    config.baudrate = SERIAL_BAUD_RATE;

    let tx_buffer = &mut SERIAL_TX_BUFFER.init([0; SERIAL_BUFFER_SIZE])[..];
    let rx_buffer = &mut SERIAL_RX_BUFFER.init([0; SERIAL_BUFFER_SIZE])[..];
    let uart = BufferedUart::new(r.uart, Irqs, r.tx_pin, r.rx_pin, tx_buffer, rx_buffer, config);
    uart.split()
}

/// Opens the status bus as I2C controller
pub fn init_status_bus(r: StatusBusResources) -> I2c<'static, I2C0, Async> {
    let mut config = i2c::Config::default();
    config.frequency = STATUS_BUS_FREQUENCY;
    I2c::new_async(r.i2c, r.scl_pin, r.sda_pin, Irqs, config)
}
