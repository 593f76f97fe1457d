//! One-shot GPIO configuration and interrupt registration.
//!
//! Uses raw ESP-IDF sys calls on the board.  The host build logs and
//! skips, and its pin reads return the idle (pulled-up) level.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;
use crate::system::RealtimeFlags;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(_: HwInitError) -> Self {
        Self::Init("GPIO")
    }
}

// ── Peripherals ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from bootstrap before interrupts are enabled;
    // single-threaded.
    unsafe {
        init_gpio_outputs()?;
        init_gpio_inputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let outputs = pins::STEP_GPIO.iter().chain(pins::DIR_GPIO.iter()).chain(
        [
            pins::STEPPER_ENABLE_GPIO,
            pins::SPINDLE_ENABLE_GPIO,
            pins::SPINDLE_DIR_GPIO,
            pins::SPINDLE2_ENABLE_GPIO,
            pins::COOLANT_FLOOD_GPIO,
            pins::COOLANT_MIST_GPIO,
        ]
        .iter(),
    );

    for &pin in outputs {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an output configured during
    // init_gpio_outputs(); main-context only.
    unsafe { gpio_set_level(pin, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Limit switches: any edge, so both trip and release are seen
    for &pin in &pins::LIMIT_GPIO {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    }

    let probe_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PROBE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&probe_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    let btn_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::RESET_BUTTON_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_NEGEDGE,
    };
    let ret = unsafe { gpio_config(&btn_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn limit_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static RealtimeFlags` registered below.
    let rt = unsafe { &*(arg as *const RealtimeFlags) };
    super::limits::limits_isr(rt);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn reset_button_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static RealtimeFlags` registered below.
    let rt = unsafe { &*(arg as *const RealtimeFlags) };
    super::reset_button::reset_button_isr(rt);
}

/// Install the per-pin GPIO ISR service and register the limit and
/// reset-button handlers.  Handlers only touch `rt`.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(rt: &'static RealtimeFlags) -> Result<(), HwInitError> {
    let arg = core::ptr::from_ref(rt).cast_mut().cast::<core::ffi::c_void>();

    // SAFETY: ESP_ERR_INVALID_STATE means the service was already
    // installed.  Handlers are plain functions over a 'static registry.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for &pin in &pins::LIMIT_GPIO {
            let ret = gpio_isr_handler_add(pin, Some(limit_gpio_isr), arg);
            if ret != ESP_OK as i32 { return Err(HwInitError::IsrAddFailed(ret)); }
            gpio_intr_enable(pin);
        }

        let ret = gpio_isr_handler_add(pins::RESET_BUTTON_GPIO, Some(reset_button_gpio_isr), arg);
        if ret != ESP_OK as i32 { return Err(HwInitError::IsrAddFailed(ret)); }
        gpio_intr_enable(pins::RESET_BUTTON_GPIO);
    }

    info!("hw_init: ISR service installed (limits×6, reset button)");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(_rt: &'static RealtimeFlags) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
