use std::env;
use std::fs;

use prism_emu_core::{apu::SAMPLE_RATE, cartridge::Cartridge, gameboy::GameBoy, input::JoypadState};

const DEFAULT_SECONDS: f64 = 3.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let rom_path = args
        .next()
        .ok_or("expected <rom> <output wav> [--seconds=N] [--cgb] [--dmg]")?;
    let out_path = args
        .next()
        .ok_or("expected <rom> <output wav> [--seconds=N] [--cgb] [--dmg]")?;

    let mut seconds = DEFAULT_SECONDS;
    let mut override_cgb = None;

    for arg in args {
        if let Some(value) = arg.strip_prefix("--seconds=") {
            seconds = value.parse()?;
        } else if arg == "--cgb" {
            override_cgb = Some(true);
        } else if arg == "--dmg" {
            override_cgb = Some(false);
        } else {
            return Err(format!("unrecognised flag: {arg}").into());
        }
    }
    if seconds <= 0.0 {
        return Err("seconds must be positive".into());
    }

    let rom = fs::read(&rom_path)?;
    let cart = Cartridge::load(rom)?;
    println!("Loaded ROM: {}", cart.title());

    let mut gb = match override_cgb {
        Some(cgb) => {
            let mut gb = GameBoy::new(cgb);
            gb.load_cart(cart);
            gb
        }
        None => GameBoy::for_cartridge(cart),
    };

    let consumer = gb.mmu.apu.enable_output(SAMPLE_RATE);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&out_path, spec)?;

    let total_frames = (seconds * SAMPLE_RATE as f64).ceil() as usize;
    let mut frames_written = 0usize;
    let input = JoypadState::default();

    while frames_written < total_frames {
        gb.run_frame(&input);
        while let Some((left, right)) = consumer.pop_stereo() {
            writer.write_sample(left)?;
            writer.write_sample(right)?;
            frames_written += 1;
            if frames_written >= total_frames {
                break;
            }
        }
    }

    writer.finalize()?;
    println!("Wrote {frames_written} stereo frames to {out_path}");
    Ok(())
}
