//! Control-period benchmarks for the RRBot adapter.
//!
//! Measures one `read`, one `read` + `write` period on the in-memory serial
//! device, and token selection. Target: full period well under 10µs.

use criterion::{Criterion, criterion_group, criterion_main};
use rrbot_common::prelude::*;
use rrbot_hal::drivers::rrbot::{RrbotSystemWithGpio, select_token};
use rrbot_hal::serial::LoopbackSerial;
use std::collections::HashMap;
use std::hint::black_box;
use std::time::{Duration, Instant};

const PERIOD: Duration = Duration::from_millis(10);

fn rrbot_hardware() -> HardwareInfo {
    HardwareInfo {
        name: "RRBotSystemWithGPIO".to_string(),
        hardware_parameters: HashMap::from([
            ("port".to_string(), "/dev/ttyBENCH".to_string()),
            ("gpio_noise_seed".to_string(), "1".to_string()),
        ]),
        joints: vec![
            ComponentInfo::new("joint1", &["position"], &["position"]),
            ComponentInfo::new("joint2", &["position"], &["position"]),
        ],
        gpios: vec![
            ComponentInfo::new(
                "flange_analog_IOs",
                &["analog_output1"],
                &["analog_output1", "analog_input1", "analog_input2"],
            ),
            ComponentInfo::new("flange_vacuum", &["vacuum"], &["vacuum"]),
        ],
    }
}

fn active_adapter(serial: LoopbackSerial) -> RrbotSystemWithGpio<LoopbackSerial> {
    let hw = rrbot_hardware();
    let mut adapter = RrbotSystemWithGpio::new(serial);
    adapter
        .on_init(&hw, HalContext::new(&hw.name))
        .expect("init");
    adapter.on_configure().expect("configure");
    adapter.on_activate().expect("activate");
    adapter
}

fn bench_read(c: &mut Criterion) {
    let mut adapter = active_adapter(LoopbackSerial::new());
    let commands = adapter.export_command_interfaces();
    commands[0].set_value(1.0);

    c.bench_function("rrbot_read_no_serial_data", |b| {
        b.iter(|| {
            adapter.read(black_box(Instant::now()), PERIOD).unwrap();
        });
    });
}

fn bench_read_write_cycle(c: &mut Criterion) {
    let mut adapter = active_adapter(LoopbackSerial::echoing());
    let commands = adapter.export_command_interfaces();
    commands[3].set_value(0.27);

    c.bench_function("rrbot_read_write_cycle", |b| {
        b.iter(|| {
            let now = Instant::now();
            adapter.read(black_box(now), PERIOD).unwrap();
            adapter.write(black_box(now), PERIOD).unwrap();
        });
    });
}

fn bench_select_token(c: &mut Criterion) {
    c.bench_function("rrbot_select_token", |b| {
        b.iter(|| black_box(select_token(black_box(0.27))));
    });
}

criterion_group!(
    benches,
    bench_read,
    bench_read_write_cycle,
    bench_select_token
);
criterion_main!(benches);
