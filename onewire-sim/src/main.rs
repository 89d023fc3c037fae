mod sim_line;

use std::cell::RefCell;
use std::thread;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use core::task::Poll;
use ds18b20::Ds18b20;
use onewire_core::{OneWireBus, OneWireDevice};

use sim_line::{ResetFault, SimulatedLine, WallClockTimer};

/// Drive the onewire-core bus/device engine against a software-simulated
/// 1-Wire line, printing temperatures as they're converted and read back.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of simulated DS18B20 sensors, each on its own simulated line.
    #[arg(short, long, default_value_t = 1)]
    devices: u32,

    /// Fault to inject into every simulated device's reset response.
    #[arg(short, long, value_enum, default_value_t = FaultArg::None)]
    fault: FaultArg,

    /// How long a simulated device holds the line low after a convert-T
    /// command before releasing it, in milliseconds.
    #[arg(long, default_value_t = 50)]
    conversion_ms: u64,

    /// How many convert/read cycles to run before exiting. 0 means run
    /// forever.
    #[arg(short, long, default_value_t = 3)]
    cycles: u32,

    /// Delay between poll cadence ticks, in microseconds. The engine never
    /// blocks longer than a single bit slot regardless of this value; it
    /// only throttles how often the main loop calls into the topmost
    /// active `continue_operation`.
    #[arg(short, long, default_value_t = 50)]
    poll_interval_us: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FaultArg {
    None,
    NoResponse,
    BusDown,
}

impl From<FaultArg> for ResetFault {
    fn from(value: FaultArg) -> Self {
        match value {
            FaultArg::None => ResetFault::None,
            FaultArg::NoResponse => ResetFault::NoResponse,
            FaultArg::BusDown => ResetFault::BusDown,
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let lines: Vec<SimulatedLine> = (0..args.devices)
        .map(|_| SimulatedLine::new(args.fault.into()))
        .collect();

    let mut sensors = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let rom = simulated_rom(index as u8);
        let bus = RefCell::new(OneWireBus::new(line, WallClockTimer::new()));
        sensors.push((line, rom, bus));
    }

    // Build the device/sensor wrappers after every bus has a stable address,
    // since OneWireDevice borrows its bus for the whole run.
    let mut devices: Vec<Ds18b20<&SimulatedLine, WallClockTimer>> = sensors
        .iter()
        .map(|(_, rom, bus)| {
            let mut device = OneWireDevice::new(bus);
            device.set_address(*rom);
            Ds18b20::new(device)
        })
        .collect();

    log::info!("enumerated {} simulated device(s)", devices.len());

    let mut cycle = 0u32;
    loop {
        for (index, (sensor, (line, rom, _))) in devices.iter_mut().zip(sensors.iter()).enumerate() {
            line.arm_conversion(Duration::from_millis(args.conversion_ms));
            if let Err(e) = sensor.convert_temperature() {
                log::warn!("device {index} ({rom:02x?}): convert_temperature failed: {e:?}");
                continue;
            }
            match poll_to_completion(sensor, args.poll_interval_us) {
                Ok(()) => {}
                Err(e) => {
                    log::warn!("device {index} ({rom:02x?}): conversion failed: {e:?}");
                    continue;
                }
            }

            line.arm_response_bytes(&simulated_scratchpad(index as u8));
            if let Err(e) = sensor.read_scratchpad() {
                log::warn!("device {index} ({rom:02x?}): read_scratchpad failed: {e:?}");
                continue;
            }
            match poll_to_completion(sensor, args.poll_interval_us) {
                Ok(()) => match sensor.temperature() {
                    Ok(temp) => log::info!("device {index} ({rom:02x?}): {temp}"),
                    Err(e) => log::warn!("device {index} ({rom:02x?}): {e:?}"),
                },
                Err(e) => log::warn!("device {index} ({rom:02x?}): read_scratchpad failed: {e:?}"),
            }
        }

        cycle += 1;
        if args.cycles != 0 && cycle >= args.cycles {
            break;
        }
    }
}

fn poll_to_completion(
    sensor: &mut Ds18b20<&SimulatedLine, WallClockTimer>,
    poll_interval_us: u64,
) -> Result<(), ds18b20::Ds18b20Error> {
    loop {
        match sensor.continue_operation() {
            Poll::Pending => thread::sleep(Duration::from_micros(poll_interval_us)),
            Poll::Ready(result) => return result,
        }
    }
}

fn simulated_rom(index: u8) -> [u8; 8] {
    let mut rom = [0x28, index, 0x11, 0x22, 0x33, 0x44, 0x55, 0x00];
    rom[7] = crc_of(&rom[..7]);
    rom
}

fn simulated_scratchpad(index: u8) -> [u8; 9] {
    // A plausible raw DS18B20 reading: 25.0625 * (index + 1) degC encoded as
    // a signed Q12.4 fixed-point register pair, LSB first.
    let raw = (25_0625i32 * (index as i32 + 1) / 10_000 * 16) as i16;
    let bytes = raw.to_le_bytes();
    let mut scratchpad = [bytes[0], bytes[1], 0x4B, 0xD8, 0x7F, 0xFF, 0xFF, 0x10, 0x00];
    scratchpad[8] = crc_of(&scratchpad[..8]);
    scratchpad
}

fn crc_of(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x01 == 0x01 {
                crc = (crc >> 1) ^ 0x8C;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
