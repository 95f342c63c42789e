//! Tone and boost timers.
//!
//! The piezo is driven by an MCPWM timer counting up from zero to the
//! period (`top`): the generator goes high at zero and low when the
//! comparator matches `compare`.  The timer's empty event (counter back at
//! zero) is the overflow interrupt that applies double-buffered frequency
//! changes via [`service_overflow`].
//!
//! The boost converter runs from an 8-bit LEDC channel configured in
//! [`hw_init`](super::hw_init).
//!
//! MCPWM cannot mask a single timer event, so "masking" the overflow
//! interrupt clears an atomic gate the callback checks first.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::app::ports::{ToneRegisters, ToneTimerPort};
use crate::drivers::hw_init::{HwInitError, ledc_off, ledc_set};
use crate::pins;
use crate::sound::tone::{ToneState, service_overflow};

#[cfg(target_os = "espidf")]
use core::sync::atomic::AtomicPtr;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

/// Double buffer shared between the main loop and the tone ISR.
pub static TONE_STATE: ToneState = ToneState::new();

/// Overflow "interrupt enable".  Written by the main loop and the ISR.
static OVERFLOW_ARMED: AtomicBool = AtomicBool::new(false);

#[cfg(target_os = "espidf")]
static TONE_TIMER: AtomicPtr<mcpwm_timer_t> = AtomicPtr::new(core::ptr::null_mut());
#[cfg(target_os = "espidf")]
static TONE_COMPARATOR: AtomicPtr<mcpwm_cmpr_t> = AtomicPtr::new(core::ptr::null_mut());
#[cfg(target_os = "espidf")]
static TONE_GENERATOR: AtomicPtr<mcpwm_gen_t> = AtomicPtr::new(core::ptr::null_mut());

// ── Raw register access ───────────────────────────────────────

#[cfg(target_os = "espidf")]
fn write_period_and_compare(top: u16, compare: u16) {
    // SAFETY: handles are created once in HwToneTimer::new() before the
    // callback is registered and never freed.  Both calls only write
    // shadow registers latched at the next timer-empty event.
    unsafe {
        mcpwm_timer_set_period(TONE_TIMER.load(Ordering::Acquire), u32::from(top));
        mcpwm_comparator_set_compare_value(
            TONE_COMPARATOR.load(Ordering::Acquire),
            u32::from(compare),
        );
    }
}

#[cfg(not(target_os = "espidf"))]
fn write_period_and_compare(_top: u16, _compare: u16) {}

/// Register view used from the ISR.  Touches nothing but the tone timer.
struct IsrRegisters;

impl ToneRegisters for IsrRegisters {
    fn write_tone_registers(&mut self, top: u16, compare: u16) {
        write_period_and_compare(top, compare);
    }

    fn set_overflow_interrupt(&mut self, enabled: bool) {
        OVERFLOW_ARMED.store(enabled, Ordering::Release);
    }
}

/// Body of the timer-empty callback.
pub fn on_tone_overflow() {
    if OVERFLOW_ARMED.load(Ordering::Acquire) {
        service_overflow(&TONE_STATE, &mut IsrRegisters);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tone_empty_isr(
    _timer: mcpwm_timer_handle_t,
    _edata: *const mcpwm_timer_event_data_t,
    _ctx: *mut core::ffi::c_void,
) -> bool {
    on_tone_overflow();
    false
}

// ── HwToneTimer ───────────────────────────────────────────────

/// The board's tone + boost timers behind [`ToneTimerPort`].
pub struct HwToneTimer {
    top: u16,
    compare: u16,
    boost_compare: u8,
    tone_running: bool,
    boost_enabled: bool,
}

impl HwToneTimer {
    /// Create the MCPWM timer, operator, comparator and generator and
    /// hook up the overflow callback.  The timer is left stopped with the
    /// piezo pin forced low.
    #[cfg(target_os = "espidf")]
    pub fn new(resolution_hz: u32) -> Result<Self, HwInitError> {
        // SAFETY: called once from main() before anything else touches
        // MCPWM group 0.  Handles are published through atomics after
        // creation and never freed.
        unsafe {
            let mut timer: mcpwm_timer_handle_t = core::ptr::null_mut();
            let mut timer_cfg = mcpwm_timer_config_t {
                group_id: pins::TONE_MCPWM_GROUP,
                clk_src: soc_periph_mcpwm_timer_clk_src_t_MCPWM_TIMER_CLK_SRC_DEFAULT,
                resolution_hz,
                count_mode: mcpwm_timer_count_mode_t_MCPWM_TIMER_COUNT_MODE_UP,
                period_ticks: u32::from(u16::MAX),
                ..Default::default()
            };
            timer_cfg.flags.set_update_period_on_empty(1);
            check(mcpwm_new_timer(&timer_cfg, &mut timer))?;

            let mut oper: mcpwm_oper_handle_t = core::ptr::null_mut();
            let oper_cfg = mcpwm_operator_config_t {
                group_id: pins::TONE_MCPWM_GROUP,
                ..Default::default()
            };
            check(mcpwm_new_operator(&oper_cfg, &mut oper))?;
            check(mcpwm_operator_connect_timer(oper, timer))?;

            let mut cmpr: mcpwm_cmpr_handle_t = core::ptr::null_mut();
            let mut cmpr_cfg = mcpwm_comparator_config_t::default();
            cmpr_cfg.flags.set_update_cmp_on_tez(1);
            check(mcpwm_new_comparator(oper, &cmpr_cfg, &mut cmpr))?;

            let mut generator: mcpwm_gen_handle_t = core::ptr::null_mut();
            let gen_cfg = mcpwm_generator_config_t {
                gen_gpio_num: pins::PIEZO_GPIO,
                ..Default::default()
            };
            check(mcpwm_new_generator(oper, &gen_cfg, &mut generator))?;

            check(mcpwm_generator_set_action_on_timer_event(
                generator,
                mcpwm_gen_timer_event_action_t {
                    direction: mcpwm_timer_direction_t_MCPWM_TIMER_DIRECTION_UP,
                    event: mcpwm_timer_event_t_MCPWM_TIMER_EVENT_EMPTY,
                    action: mcpwm_generator_action_t_MCPWM_GEN_ACTION_HIGH,
                },
            ))?;
            check(mcpwm_generator_set_action_on_compare_event(
                generator,
                mcpwm_gen_compare_event_action_t {
                    direction: mcpwm_timer_direction_t_MCPWM_TIMER_DIRECTION_UP,
                    comparator: cmpr,
                    action: mcpwm_generator_action_t_MCPWM_GEN_ACTION_LOW,
                },
            ))?;
            check(mcpwm_generator_set_force_level(generator, 0, true))?;

            TONE_TIMER.store(timer, Ordering::Release);
            TONE_COMPARATOR.store(cmpr, Ordering::Release);
            TONE_GENERATOR.store(generator, Ordering::Release);

            let callbacks = mcpwm_timer_event_callbacks_t {
                on_empty: Some(tone_empty_isr),
                ..Default::default()
            };
            check(mcpwm_timer_register_event_callbacks(
                timer,
                &callbacks,
                core::ptr::null_mut(),
            ))?;
            check(mcpwm_timer_enable(timer))?;
        }

        info!("tone_timer: MCPWM tone timer ready ({} Hz resolution)", resolution_hz);
        Ok(Self::stopped())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(resolution_hz: u32) -> Result<Self, HwInitError> {
        log::info!("tone_timer(sim): {} Hz resolution, no output", resolution_hz);
        Ok(Self::stopped())
    }

    fn stopped() -> Self {
        Self {
            top: 0,
            compare: 0,
            boost_compare: 0,
            tone_running: false,
            boost_enabled: false,
        }
    }

    /// `(top, compare)` last programmed from the main loop.
    pub fn programmed(&self) -> (u16, u16) {
        (self.top, self.compare)
    }

    pub fn is_tone_running(&self) -> bool {
        self.tone_running
    }

    pub fn is_boost_enabled(&self) -> bool {
        self.boost_enabled
    }

    pub fn boost_compare(&self) -> u8 {
        self.boost_compare
    }

    #[cfg(target_os = "espidf")]
    fn start_counter(&self) {
        // SAFETY: handles published in new(); main-loop only.
        unsafe {
            let timer = TONE_TIMER.load(Ordering::Acquire);
            mcpwm_timer_start_stop(timer, mcpwm_timer_start_stop_cmd_t_MCPWM_TIMER_STOP_EMPTY);
            mcpwm_generator_set_force_level(TONE_GENERATOR.load(Ordering::Acquire), -1, true);
            mcpwm_timer_start_stop(timer, mcpwm_timer_start_stop_cmd_t_MCPWM_TIMER_START_NO_STOP);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn start_counter(&self) {}

    #[cfg(target_os = "espidf")]
    fn stop_counter(&self) {
        // SAFETY: handles published in new(); main-loop only.
        unsafe {
            mcpwm_generator_set_force_level(TONE_GENERATOR.load(Ordering::Acquire), 0, true);
            mcpwm_timer_start_stop(
                TONE_TIMER.load(Ordering::Acquire),
                mcpwm_timer_start_stop_cmd_t_MCPWM_TIMER_STOP_EMPTY,
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn stop_counter(&self) {}
}

#[cfg(target_os = "espidf")]
fn check(rc: esp_err_t) -> Result<(), HwInitError> {
    if rc == ESP_OK {
        Ok(())
    } else {
        Err(HwInitError::ToneTimerFailed(rc))
    }
}

impl ToneRegisters for HwToneTimer {
    fn write_tone_registers(&mut self, top: u16, compare: u16) {
        self.top = top;
        self.compare = compare;
        write_period_and_compare(top, compare);
    }

    fn set_overflow_interrupt(&mut self, enabled: bool) {
        OVERFLOW_ARMED.store(enabled, Ordering::Release);
    }
}

impl ToneTimerPort for HwToneTimer {
    fn configure_tone(&mut self, top: u16, compare: u16) {
        self.write_tone_registers(top, compare);
        self.start_counter();
        self.tone_running = true;
    }

    fn set_boost_compare(&mut self, compare: u8) {
        self.boost_compare = compare;
        if self.boost_enabled {
            ledc_set(pins::BOOST_LEDC_CHANNEL, compare);
        }
    }

    fn disable_tone(&mut self) {
        self.stop_counter();
        self.tone_running = false;
    }

    fn enable_boost(&mut self) {
        self.boost_enabled = true;
        ledc_set(pins::BOOST_LEDC_CHANNEL, self.boost_compare);
    }

    fn disable_boost(&mut self) {
        self.boost_enabled = false;
        ledc_off(pins::BOOST_LEDC_CHANNEL);
    }
}
