#![deny(unsafe_code)]
#![deny(warnings)]
#![no_main]
#![no_std]

use defmt_rtt as _; // global logger
use panic_probe as _;
use rtic::app;
use rtic_monotonics::stm32::prelude::*;

mod console;
mod hw;

stm32_tim2_monotonic!(Mono, 1_000_000);

#[app(device = embassy_stm32, peripherals = true, dispatchers = [USART3, UART4])]
mod app {
    use super::*;
    use core::fmt::Write as _;
    use defmt::{info, warn};
    use embassy_stm32::gpio::{Input, Pull};
    use embassy_stm32::rcc::{
        AHBPrescaler, APBPrescaler, Hse, HseMode, LsConfig, Pll, PllMul, PllPDiv, PllPreDiv,
        PllSource, Sysclk,
    };
    use embassy_stm32::time::Hertz;
    use embassy_stm32::usart::{self, Uart};
    use embassy_time::Delay;
    use heapless::String;
    use rtclock_core::{
        clock_source, CalendarBackend, Rtc, RtcConfig, TimeSetConfig, TimeSetOutcome,
        TimeSetProtocol,
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
        info!("rtclock starting on STM32F429");

        // 25 MHz HSE
        // HSE / PREDIV(25) = 1 MHz (PLL input)
        // 1 MHz * MUL(336) = 336 MHz (VCO)
        // VCO / DIVP(2) = 168 MHz (SYSCLK)
        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(25_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV25,
            mul: PllMul::MUL336,
            divp: Some(PllPDiv::DIV2),
            divq: None,
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1; // 168 MHz
        config.rcc.apb1_pre = APBPrescaler::DIV4; // 42 MHz
        config.rcc.apb2_pre = APBPrescaler::DIV2; // 84 MHz

        // The RTC clock is chosen by clock_source::initialize and must
        // survive resets; keep embassy away from the backup domain
        config.rcc.ls = LsConfig::off();

        let p = embassy_stm32::init(config);

        // TIM2 on APB1: timer clock = 2*APB1
        Mono::start(84_000_000);

        let mut uart_config = usart::Config::default();
        uart_config.baudrate = 115_200;
        let uart = defmt::unwrap!(Uart::new_blocking(p.USART1, p.PA10, p.PA9, uart_config));

        // KEY0 pulls PH3 to ground
        let key = Input::new(p.PH3, Pull::Up);

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
        let backend = CalendarBackend::new(hw::CalendarRtc::new(), &config);
        let mut rtc = Rtc::new(backend, Delay, config);

        let source = clock_source::initialize(cx.local.clocks, &mut rtc);
        info!("RTC clock source: {}", source);

        let outcome = TimeSetProtocol::new(
            &mut *cx.local.key,
            &mut *cx.local.console,
            TimeSetConfig::default(),
        )
        .run(&mut rtc);
        if let TimeSetOutcome::Committed(time) = outcome {
            info!("Operator set time to {}", time);
        }

        // Calendar registers carry no alarm; report rather than assume
        if let Err(e) = rtc.get_alarm_t() {
            info!("RTC alarm not available: {}", e);
        }

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

    #[idle]
    fn idle(_cx: idle::Context) -> ! {
        loop {
            cortex_m::asm::wfi();
        }
    }
}
