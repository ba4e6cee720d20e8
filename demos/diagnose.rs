//! Lists visible HID interfaces and marks the ones the device signature selects.
//!
//! Usage: `cargo run --example diagnose [config.toml]`

use ftouch::backends::hid::HidEnumerator;
use ftouch::{DeviceEnumerator, TouchConfig};

fn main() {
    let config = match std::env::args().nth(1) {
        Some(path) => TouchConfig::load(path).expect("load config"),
        None => TouchConfig::default(),
    };
    let pattern = config.pattern().expect("compile device pattern");
    let mut hid = HidEnumerator::new().expect("init hidapi");
    let devices = hid.enumerate().expect("enumerate hid devices");

    println!("signature: {}", pattern.as_str());
    for m in &devices {
        let signature = m.signature();
        let mark = if pattern.matches(&signature) { "*" } else { " " };
        println!(
            "{mark} VID:PID={:04x}:{:04x} up=0x{:02x} u=0x{:02x} iface={:?} prod={:?} match={}",
            m.vid.unwrap_or_default(),
            m.pid.unwrap_or_default(),
            m.usage_page.unwrap_or_default(),
            m.usage.unwrap_or_default(),
            m.interface_number,
            m.product_string,
            signature
        );
    }
}
