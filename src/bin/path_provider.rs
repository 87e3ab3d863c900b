//! CLI tool for exercising a running bridge.
//!
//! Replays indicator commands from a small script file and optionally
//! prints the telemetry stream, so a flight path can be tried without
//! any client application.
//!
//! # Usage
//!
//! ```bash
//! path_provider approach.fpl
//! path_provider --listen 10988
//! path_provider -t 192.168.1.20:10388 -l 10988 approach.fpl
//! ```

use std::env;
use std::fmt;
use std::fs;
use std::net::{SocketAddr, UdpSocket};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use flightpath_io::protocol::command::{
    OFFSET_ALTITUDE, OFFSET_BANK, OFFSET_COMMAND, OFFSET_HEADING, OFFSET_INDICATOR_ID,
    OFFSET_LATITUDE, OFFSET_LONGITUDE, OFFSET_PITCH, OFFSET_TYPE_ID,
};
use flightpath_io::protocol::{
    CMD_REMOVE_INDICATORS, CMD_SET_INDICATOR, SET_COMMAND_LEN, TELEMETRY_LEN, codec, decode_state,
};

fn main() {
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage(&args[0]);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

struct Config {
    script: Option<String>,
    target: String,
    listen: Option<u16>,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut script = None;
    let mut target = "127.0.0.1:10388".to_string();
    let mut listen = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--target" | "-t" => {
                i += 1;
                target = args.get(i).ok_or("--target needs an address")?.clone();
            }
            "--listen" | "-l" => {
                i += 1;
                let raw = args.get(i).ok_or("--listen needs a port")?;
                listen = Some(
                    raw.parse::<u16>()
                        .map_err(|e| format!("bad listen port: {}", e))?,
                );
            }
            "--help" | "-h" => {
                return Err("Help requested".to_string());
            }
            arg if !arg.starts_with('-') => {
                if script.is_some() {
                    return Err("Multiple scripts specified".to_string());
                }
                script = Some(arg.to_string());
            }
            _ => {
                return Err(format!("Unknown argument: {}", args[i]));
            }
        }
        i += 1;
    }

    if script.is_none() && listen.is_none() {
        return Err("Nothing to do: give a script or --listen".to_string());
    }

    Ok(Config {
        script,
        target,
        listen,
    })
}

fn print_usage(program: &str) {
    eprintln!(
        r#"
Usage: {} [OPTIONS] [SCRIPT]

Send indicator commands to a running bridge and print telemetry.

Script lines (values separated by semicolons):
    set;<id>;<type>;<lat>;<lon>;<alt>;<heading>;<bank>;<pitch>
    remove[;<id>...]      remove listed indicators, or all when bare
    wait;<ms>             pause before the next command
    # comment

OPTIONS:
    -t, --target <ADDR>   Bridge command address (default 127.0.0.1:10388)
    -l, --listen <PORT>   Print telemetry received on this UDP port
    -h, --help            Show this help message

EXAMPLES:
    {} approach.fpl
    {} --listen 10988
    {} -t 192.168.1.20:10388 -l 10988 approach.fpl
"#,
        program, program, program, program
    );
}

fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(port) = config.listen {
        if config.script.is_some() {
            // Print telemetry in the background while the script plays
            thread::spawn(move || {
                if let Err(e) = listen_telemetry(port) {
                    eprintln!("Telemetry listener error: {}", e);
                }
            });
        } else {
            return listen_telemetry(port);
        }
    }

    if let Some(ref script) = config.script {
        replay_script(script, &config.target)?;
    }
    Ok(())
}

fn listen_telemetry(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    println!("Listening for telemetry on udp://0.0.0.0:{}", port);
    println!(
        "{:>12} {:>12} {:>9} {:>8} {:>7} {:>7} {:>7}",
        "latitude", "longitude", "altitude", "heading", "bank", "pitch", "speed"
    );

    let mut buf = [0u8; 128];
    loop {
        let (len, _) = socket.recv_from(&mut buf)?;
        match decode_state(&buf[..len]) {
            Some(state) => println!(
                "{:>12.6} {:>12.6} {:>9.1} {:>8.1} {:>7.2} {:>7.2} {:>7.1}",
                state.position.latitude,
                state.position.longitude,
                state.position.altitude,
                state.position.heading,
                state.position.bank,
                state.position.pitch,
                state.speed
            ),
            None => eprintln!(
                "Ignoring {}-byte datagram (expected {})",
                len, TELEMETRY_LEN
            ),
        }
    }
}

fn replay_script(path: &str, target: &str) -> Result<(), Box<dyn std::error::Error>> {
    let target: SocketAddr = target.parse()?;
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    let script = fs::read_to_string(path)?;

    for (line_no, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(';').collect();
        match fields[0].trim() {
            "set" => {
                let datagram =
                    build_set(&fields).map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                socket.send_to(&datagram, target)?;
                println!("set indicator {} (type {})", fields[1], fields[2]);
            }
            "remove" => {
                let datagram =
                    build_remove(&fields).map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                socket.send_to(&datagram, target)?;
                if fields.len() > 1 {
                    println!("remove indicators {}", fields[1..].join(", "));
                } else {
                    println!("remove all indicators");
                }
            }
            "wait" => {
                let raw = fields
                    .get(1)
                    .ok_or_else(|| format!("line {}: wait needs milliseconds", line_no + 1))?;
                let ms: u64 = parse_field(raw, "wait time")
                    .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
                thread::sleep(Duration::from_millis(ms));
            }
            other => {
                return Err(format!("line {}: unknown command {:?}", line_no + 1, other).into());
            }
        }
    }

    println!("Script complete");
    Ok(())
}

fn build_set(fields: &[&str]) -> Result<[u8; SET_COMMAND_LEN], String> {
    if fields.len() != 9 {
        return Err(format!(
            "set needs 8 values (id;type;lat;lon;alt;heading;bank;pitch), got {}",
            fields.len() - 1
        ));
    }

    let id: u16 = parse_field(fields[1], "id")?;
    let type_id: u32 = parse_field(fields[2], "type")?;
    let latitude: f64 = parse_field(fields[3], "latitude")?;
    let longitude: f64 = parse_field(fields[4], "longitude")?;
    let altitude: f64 = parse_field(fields[5], "altitude")?;
    let heading: f64 = parse_field(fields[6], "heading")?;
    let bank: f64 = parse_field(fields[7], "bank")?;
    let pitch: f64 = parse_field(fields[8], "pitch")?;

    let mut buf = [0u8; SET_COMMAND_LEN];
    codec::write_u16(&mut buf, OFFSET_COMMAND, CMD_SET_INDICATOR);
    codec::write_u16(&mut buf, OFFSET_INDICATOR_ID, id);
    codec::write_u32(&mut buf, OFFSET_TYPE_ID, type_id);
    codec::write_f64(&mut buf, OFFSET_LATITUDE, latitude);
    codec::write_f64(&mut buf, OFFSET_LONGITUDE, longitude);
    codec::write_f64(&mut buf, OFFSET_ALTITUDE, altitude);
    codec::write_f64(&mut buf, OFFSET_HEADING, heading);
    codec::write_f64(&mut buf, OFFSET_BANK, bank);
    codec::write_f64(&mut buf, OFFSET_PITCH, pitch);
    Ok(buf)
}

fn build_remove(fields: &[&str]) -> Result<Vec<u8>, String> {
    let mut buf = vec![0u8; 2 + 2 * (fields.len() - 1)];
    codec::write_u16(&mut buf, OFFSET_COMMAND, CMD_REMOVE_INDICATORS);
    for (slot, raw) in fields[1..].iter().enumerate() {
        let id: u16 = parse_field(raw, "id")?;
        codec::write_u16(&mut buf, 2 + slot * 2, id);
    }
    Ok(buf)
}

fn parse_field<T: FromStr>(raw: &str, name: &str) -> Result<T, String>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("bad {} {:?}: {}", name, raw, e))
}
