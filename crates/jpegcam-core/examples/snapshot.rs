//! Camera Snapshot Tool
//!
//! A standalone tool to exercise a serial JPEG camera module end to end:
//! reset, capture, chunked readout, and a JPEG file on disk.
//!
//! Usage:
//!   cargo run --example snapshot -- [OPTIONS]
//!
//! Options:
//!   --port PORT       Serial port (default: first detected, else /dev/ttyUSB0)
//!   --baud RATE       Baud rate (default: 38400)
//!   --chunk BYTES     Transfer chunk size, multiple of 8 (default: 56)
//!   --out FILE        Output file (default: snapshot.jpg)
//!   --size RES        Capture resolution: vga, qvga, qqvga

use jpegcam_core::{list_ports, Camera, CameraConfig, ImageSize};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = CameraConfig::default();
    let mut out_file = "snapshot.jpg".to_string();
    let mut resolution: Option<ImageSize> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    config.port_name = args[i].clone();
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    config.baud_rate = args[i].parse().unwrap_or(config.baud_rate);
                }
            }
            "--chunk" | "-c" => {
                i += 1;
                if i < args.len() {
                    config.chunk_size = args[i].parse().unwrap_or(config.chunk_size);
                }
            }
            "--out" | "-o" => {
                i += 1;
                if i < args.len() {
                    out_file = args[i].clone();
                }
            }
            "--size" | "-s" => {
                i += 1;
                resolution = match args.get(i).map(String::as_str) {
                    Some("vga") => Some(ImageSize::Vga),
                    Some("qvga") => Some(ImageSize::Qvga),
                    Some("qqvga") => Some(ImageSize::Qqvga),
                    other => {
                        eprintln!("unknown resolution: {other:?}");
                        std::process::exit(1);
                    }
                };
            }
            other => {
                eprintln!("unknown option: {other}");
                std::process::exit(1);
            }
        }
        i += 1;
    }

    if config.port_name.is_empty() {
        config.port_name = list_ports()
            .first()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "/dev/ttyUSB0".to_string());
    }

    println!("Opening {} at {} baud", config.port_name, config.baud_rate);
    let mut camera = match Camera::open(&config) {
        Ok(camera) => camera,
        Err(e) => {
            eprintln!("failed to open camera: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = camera.reset() {
        eprintln!("reset failed: {e}");
        std::process::exit(1);
    }

    if let Some(size) = resolution {
        if let Err(e) = camera.set_image_size(size) {
            eprintln!("resolution change failed: {e}");
            std::process::exit(1);
        }
    }

    let image = camera
        .take_picture()
        .and_then(|_| camera.read_image())
        .and_then(|image| {
            camera.stop_picture()?;
            Ok(image)
        });

    match image {
        Ok(image) => {
            println!("Read {} bytes", image.len());
            if let Err(e) = std::fs::write(&out_file, &image) {
                eprintln!("failed to write {out_file}: {e}");
                std::process::exit(1);
            }
            println!("Wrote {out_file}");
        }
        Err(e) => {
            eprintln!("capture failed: {e}");
            std::process::exit(1);
        }
    }
}
