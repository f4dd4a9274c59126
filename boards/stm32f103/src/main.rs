#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtclock_core::AlarmHandler;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod console;
mod hw;

stm32_tim2_monotonic!(Mono, 1_000_000);

/// Shared between the task that arms the alarm and the alarm interrupt
static ALARM: AlarmHandler = AlarmHandler::new();

// The counter holds Unix seconds once set, so log lines carry wall-clock time
defmt::timestamp!("{=u64:iso8601s}", { hw::counter_now() as u64 });

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART3, UART4])]
mod app {
    use super::*;
    use core::fmt::Write as _;
    use defmt::{info, warn};
    use embassy_stm32::gpio::{Input, Pull};
    use embassy_stm32::rcc::{
        AHBPrescaler, APBPrescaler, Hse, HseMode, LsConfig, Pll, PllMul, PllPreDiv, PllSource,
        Sysclk,
    };
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, Uart};
    use embassy_time::Delay;
    use heapless::String;
    use rtclock_core::{
        clock_source, CounterBackend, Rtc, RtcConfig, TimeSetConfig, TimeSetOutcome,
        TimeSetProtocol, Timestamp,
    };

    use crate::console::Console;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        clocks: hw::ClockControl,
        console: Console,
        key: Input<'static>,
    }

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local) {
        info!("rtclock starting on STM32F103");

        // 8 MHz HSE, 72 MHz SYSCLK
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll = Some(Pll {
            src: PllSource::HSE,
            prediv: PllPreDiv::DIV1,
            mul: PllMul::MUL9,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1; // 72 MHz
        config.rcc.apb1_pre = APBPrescaler::DIV2; // 36 MHz
        config.rcc.apb2_pre = APBPrescaler::DIV1; // 72 MHz

        // The RTC clock is chosen by clock_source::initialize and must
        // survive resets; keep embassy away from the backup domain
        config.rcc.ls = LsConfig::off();

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2*APB1
        Mono::start(72_000_000);

        let mut uart_config = usart::Config::default();
        uart_config.baudrate = 115_200;
        let uart = defmt::unwrap!(Uart::new_blocking(p.USART1, p.PA10, p.PA9, uart_config));

        // KEY0 pulls PE4 to ground
        let key = Input::new(p.PE4, Pull::Up);

        clock::spawn().ok();

        (
            Shared {},
            Local {
                clocks: hw::ClockControl::new(),
                console: Console::new(uart),
                key,
            },
        )
    }

    /// Clock bring-up, operator time setting, then a once-per-second print
    #[task(priority = 1, local = [clocks, console, key])]
    async fn clock(cx: clock::Context) {
        let config = RtcConfig::default();
        let backend = CounterBackend::new(hw::CounterRtc::new(), &config);
        let mut rtc = Rtc::new(backend, Delay, config);

        let report = clock_source::initialize_with_report(cx.local.clocks, &mut rtc);
        info!("RTC clock source: {}, reset: {}", report.source, report.reset);

        let mut dialogue = TimeSetProtocol::new(
            &mut *cx.local.key,
            &mut *cx.local.console,
            TimeSetConfig::default(),
        );
        match dialogue.run(&mut rtc) {
            TimeSetOutcome::Committed(time) => info!("Operator set time to {}", time),
            outcome => info!("Time-set dialogue ended: {}", outcome),
        }
        drop(dialogue);

        let console = cx.local.console;
        loop {
            match rtc.get_time() {
                Ok(now) => {
                    let mut line: String<32> = String::new();
                    if write!(line, "{}\r\n", now).is_ok() {
                        console.print(&line);
                    }
                }
                Err(e) => warn!("RTC read failed: {}", e),
            }
            Mono::delay(1.secs()).await;
        }
    }

    /// RTC alarm match (EXTI line 17)
    #[task(binds = RTC_ALARM, priority = 2)]
    fn rtc_alarm(_cx: rtc_alarm::Context) {
        ALARM.on_interrupt(&mut hw::AlarmLine::new(), Timestamp::from(hw::counter_now()));
    }

    /// RTIC idle task - WFI sleep mode when no tasks active
    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
