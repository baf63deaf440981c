//! Cycle-driven Game Boy / Game Boy Color emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU/APU
//! and friends). Frontends (window, GL texture upload, audio device, debug UI)
//! live elsewhere and drive the core via the [`gameboy`] facade: run a frame,
//! take the framebuffer, drain the audio queue.

/// Audio Processing Unit (APU) emulation.
pub mod apu;

/// Lossy single-producer/single-consumer ring buffer used by the APU.
pub mod audio_queue;

/// Cartridge header parsing, mappers (MBC) and the MBC3 real-time clock.
pub mod cartridge;

/// LR35902 CPU core.
pub mod cpu;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Joypad input register and edge-triggered interrupt behavior.
pub mod input;

/// Memory map and hardware plumbing.
pub mod mmu;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// Serial unit and link port plumbing.
pub mod serial;

/// Divider/timer unit.
pub mod timer;

/// Interrupt request bits as they appear in the IF/IE registers.
pub mod interrupts {
    pub const VBLANK: u8 = 0x01;
    pub const STAT: u8 = 0x02;
    pub const TIMER: u8 = 0x04;
    pub const SERIAL: u8 = 0x08;
    pub const JOYPAD: u8 = 0x10;
}
