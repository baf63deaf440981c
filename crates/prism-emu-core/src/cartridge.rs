use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::warn;
use thiserror::Error;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

// Header layout (addresses into the ROM image).
const HEADER_TITLE_START: usize = 0x0134;
const HEADER_TITLE_END: usize = 0x0143;
const HEADER_CGB_FLAG: usize = 0x0143;
const HEADER_CART_TYPE: usize = 0x0147;
const HEADER_ROM_SIZE: usize = 0x0148;
const HEADER_RAM_SIZE: usize = 0x0149;
const HEADER_CHECKSUM: usize = 0x014D;
const HEADER_GLOBAL_CHECKSUM: usize = 0x014E;
const HEADER_END: usize = 0x0150;

#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("cartridge image too small for a header ({len} bytes)")]
    TooSmall { len: usize },
    #[error("header checksum mismatch (expected {expected:#04X}, computed {actual:#04X})")]
    HeaderChecksum { expected: u8, actual: u8 },
}

/// Color-model compatibility declared by the cartridge header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgbSupport {
    DmgOnly,
    Compatible,
    ColorOnly,
}

impl CgbSupport {
    pub fn supports_cgb(self) -> bool {
        !matches!(self, CgbSupport::DmgOnly)
    }
}

/// Monotonic wall-second source injected into the MBC3 RTC.
///
/// `Clock::manual` hands tests a counter they can advance deterministically.
#[derive(Clone)]
pub struct Clock(ClockSource);

#[derive(Clone)]
enum ClockSource {
    System,
    Manual(Arc<AtomicU64>),
}

impl Clock {
    pub fn system() -> Self {
        Clock(ClockSource::System)
    }

    pub fn manual() -> (Self, Arc<AtomicU64>) {
        let counter = Arc::new(AtomicU64::new(0));
        (Clock(ClockSource::Manual(Arc::clone(&counter))), counter)
    }

    pub fn now(&self) -> u64 {
        match &self.0 {
            ClockSource::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            ClockSource::Manual(counter) => counter.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RtcRegisters {
    seconds: u8,
    minutes: u8,
    hours: u8,
    days: u16,
    halt: bool,
    carry: bool,
}

impl RtcRegisters {
    fn control_byte(&self) -> u8 {
        let mut out = ((self.days >> 8) as u8) & 0x01;
        if self.halt {
            out |= 0x40;
        }
        if self.carry {
            out |= 0x80;
        }
        out
    }

    fn total_seconds(&self) -> i64 {
        (self.days as i64 & 0x1FF) * 86_400
            + (self.hours as i64) * 3_600
            + (self.minutes as i64) * 60
            + self.seconds as i64
    }
}

/// MBC3 real-time clock.
///
/// The running counter is `now - base`; register writes move `base` so that
/// subsequent reads return the written value plus elapsed time. Halting
/// freezes `now` at the halt instant and shifts `base` on resume.
struct Rtc {
    clock: Clock,
    base: i64,
    halted: bool,
    halt_at: u64,
    carry: bool,
    latched: RtcRegisters,
    latch_armed: bool,
}

impl Rtc {
    fn new(clock: Clock) -> Self {
        let base = clock.now() as i64;
        Self {
            clock,
            base,
            halted: false,
            halt_at: 0,
            carry: false,
            latched: RtcRegisters::default(),
            latch_armed: false,
        }
    }

    fn effective_now(&self) -> u64 {
        if self.halted {
            self.halt_at
        } else {
            self.clock.now()
        }
    }

    fn current(&mut self) -> RtcRegisters {
        let total = (self.effective_now() as i64 - self.base).max(0);
        let days = total / 86_400;
        if days > 0x1FF {
            self.carry = true;
        }
        RtcRegisters {
            seconds: (total % 60) as u8,
            minutes: (total / 60 % 60) as u8,
            hours: (total / 3_600 % 24) as u8,
            days: (days & 0x1FF) as u16,
            halt: self.halted,
            carry: self.carry,
        }
    }

    fn latch_write(&mut self, val: u8) {
        if val == 0x00 {
            self.latch_armed = true;
        } else if val == 0x01 && self.latch_armed {
            self.latched = self.current();
            self.latch_armed = false;
        } else {
            self.latch_armed = false;
        }
    }

    fn read(&self, reg: u8) -> u8 {
        match reg {
            0x08 => self.latched.seconds & 0x3F,
            0x09 => self.latched.minutes & 0x3F,
            0x0A => self.latched.hours & 0x1F,
            0x0B => (self.latched.days & 0x00FF) as u8,
            0x0C => self.latched.control_byte(),
            _ => 0xFF,
        }
    }

    fn write(&mut self, reg: u8, val: u8) {
        let mut regs = self.current();
        match reg {
            0x08 => regs.seconds = val & 0x3F,
            0x09 => regs.minutes = val & 0x3F,
            0x0A => regs.hours = val & 0x1F,
            0x0B => regs.days = (regs.days & 0x0100) | val as u16,
            0x0C => {
                regs.days = (regs.days & 0x00FF) | (((val & 0x01) as u16) << 8);
                self.carry = val & 0x80 != 0;
                let halt = val & 0x40 != 0;
                if halt && !self.halted {
                    self.halt_at = self.clock.now();
                    self.halted = true;
                } else if !halt && self.halted {
                    // Skip the span spent halted.
                    self.base += self.clock.now() as i64 - self.halt_at as i64;
                    self.halted = false;
                }
            }
            _ => return,
        }
        self.base = self.effective_now() as i64 - regs.total_seconds();
        self.latched = self.current();
    }
}

/// Per-variant banking state. A closed set dispatched by match; the dispatch
/// point is on every cartridge access, so no trait objects here.
enum Mbc {
    None,
    Mbc1 {
        rom_bank: u8,
        upper: u8,
        mode: u8,
        ram_enable: bool,
    },
    Mbc2 {
        rom_bank: u8,
        ram_enable: bool,
    },
    Mbc3 {
        rom_bank: u8,
        ram_bank: u8,
        ram_enable: bool,
        rtc: Option<Rtc>,
    },
    Mbc5 {
        rom_bank: u16,
        ram_bank: u8,
        ram_enable: bool,
        has_rumble: bool,
        rumble: bool,
    },
}

pub struct Cartridge {
    rom: Vec<u8>,
    ram: Vec<u8>,
    mbc: Mbc,
    title: String,
    cgb: CgbSupport,
    cart_type: u8,
}

impl Cartridge {
    /// Parse and validate a ROM image, using the host clock for any RTC.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        Self::load_with_clock(data, Clock::system())
    }

    pub fn load_with_clock(data: Vec<u8>, clock: Clock) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall { len: data.len() });
        }
        let expected = data[HEADER_CHECKSUM];
        let actual = header_checksum(&data);
        if expected != actual {
            return Err(CartridgeError::HeaderChecksum { expected, actual });
        }

        let cart_type = data[HEADER_CART_TYPE];
        let title = parse_title(&data);
        let cgb = match data[HEADER_CGB_FLAG] {
            0xC0 => CgbSupport::ColorOnly,
            v if v & 0x80 != 0 => CgbSupport::Compatible,
            _ => CgbSupport::DmgOnly,
        };

        let ram_size = match cart_type {
            // MBC2 carries its own 512x4-bit RAM regardless of the header.
            0x05 | 0x06 => 0x200,
            _ => match data[HEADER_RAM_SIZE] {
                0x00 => 0,
                0x01 => 0x800,
                0x02 => RAM_BANK_SIZE,
                0x03 => 4 * RAM_BANK_SIZE,
                0x04 => 16 * RAM_BANK_SIZE,
                0x05 => 8 * RAM_BANK_SIZE,
                code => {
                    warn!(target: "cartridge", "unknown RAM size code {code:#04X}, assuming 8 KiB");
                    RAM_BANK_SIZE
                }
            },
        };

        let mbc = match cart_type {
            0x00 => Mbc::None,
            0x01..=0x03 => Mbc::Mbc1 {
                rom_bank: 1,
                upper: 0,
                mode: 0,
                ram_enable: false,
            },
            0x05 | 0x06 => Mbc::Mbc2 {
                rom_bank: 1,
                ram_enable: false,
            },
            0x0F..=0x13 => Mbc::Mbc3 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                rtc: matches!(cart_type, 0x0F | 0x10).then(|| Rtc::new(clock)),
            },
            0x19..=0x1E => Mbc::Mbc5 {
                rom_bank: 1,
                ram_bank: 0,
                ram_enable: false,
                has_rumble: matches!(cart_type, 0x1C..=0x1E),
                rumble: false,
            },
            code => {
                warn!(
                    target: "cartridge",
                    "unsupported cartridge type {code:#04X}, falling back to plain mapping"
                );
                Mbc::None
            }
        };

        Ok(Self {
            rom: data,
            ram: vec![0; ram_size],
            mbc,
            title,
            cgb,
            cart_type,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cgb_support(&self) -> CgbSupport {
        self.cgb
    }

    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }

    /// Declared ROM size in bytes (32 KiB << code).
    pub fn declared_rom_size(&self) -> usize {
        let code = self.rom.get(HEADER_ROM_SIZE).copied().unwrap_or(0);
        (32 * 1024) << code.min(8)
    }

    /// Current state of the rumble motor bit (MBC5 rumble variants only).
    pub fn rumble(&self) -> bool {
        matches!(self.mbc, Mbc::Mbc5 { rumble: true, .. })
    }

    /// Check the 16-bit global checksum. Informational: many real cartridges
    /// ship with a bad one, so a mismatch is logged and tolerated.
    pub fn verify_global_checksum(&self) -> bool {
        let stored = ((self.rom[HEADER_GLOBAL_CHECKSUM] as u16) << 8)
            | self.rom[HEADER_GLOBAL_CHECKSUM + 1] as u16;
        let mut sum = 0u16;
        for (i, &b) in self.rom.iter().enumerate() {
            if i == HEADER_GLOBAL_CHECKSUM || i == HEADER_GLOBAL_CHECKSUM + 1 {
                continue;
            }
            sum = sum.wrapping_add(b as u16);
        }
        if sum != stored {
            warn!(
                target: "cartridge",
                "global checksum mismatch (header {stored:#06X}, computed {sum:#06X})"
            );
        }
        sum == stored
    }

    fn rom_bank_count(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    fn ram_bank_count(&self) -> usize {
        self.ram.len().div_ceil(RAM_BANK_SIZE)
    }

    fn read_rom_banked(&self, bank: usize, addr: u16) -> u8 {
        let offset = bank * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1));
        match self.rom.get(offset) {
            Some(&b) => b,
            None => {
                warn!(
                    target: "cartridge",
                    "ROM read out of bounds (bank {bank}, offset {offset:#07X})"
                );
                0xFF
            }
        }
    }

    /// Read from the cartridge address space (0x0000-0x7FFF, 0xA000-0xBFFF).
    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x3FFF => {
                let bank = match &self.mbc {
                    // In RAM-banking mode the fixed region follows the upper
                    // selector bits.
                    Mbc::Mbc1 { upper, mode: 1, .. } => {
                        ((*upper as usize) << 5) % self.rom_bank_count()
                    }
                    _ => 0,
                };
                self.read_rom_banked(bank, addr)
            }
            0x4000..=0x7FFF => {
                let count = self.rom_bank_count();
                let bank = match &self.mbc {
                    Mbc::None => 1,
                    Mbc::Mbc1 {
                        rom_bank, upper, ..
                    } => (((*upper as usize) << 5) | *rom_bank as usize) % count,
                    Mbc::Mbc2 { rom_bank, .. } => (*rom_bank as usize) % count,
                    Mbc::Mbc3 { rom_bank, .. } => (*rom_bank as usize) % count,
                    Mbc::Mbc5 { rom_bank, .. } => (*rom_bank as usize) % count,
                };
                self.read_rom_banked(bank, addr)
            }
            0xA000..=0xBFFF => self.read_ram(addr),
            _ => 0xFF,
        }
    }

    fn read_ram(&self, addr: u16) -> u8 {
        match &self.mbc {
            Mbc::None => self
                .ram
                .get(addr as usize - 0xA000)
                .copied()
                .unwrap_or(0xFF),
            Mbc::Mbc1 {
                ram_enable: false, ..
            }
            | Mbc::Mbc2 {
                ram_enable: false, ..
            }
            | Mbc::Mbc3 {
                ram_enable: false, ..
            }
            | Mbc::Mbc5 {
                ram_enable: false, ..
            } => 0xFF,
            Mbc::Mbc2 { .. } => {
                // 512x4-bit RAM, mirrored across the window; upper nibble open.
                let idx = (addr as usize - 0xA000) & 0x01FF;
                0xF0 | (self.ram.get(idx).copied().unwrap_or(0x0F) & 0x0F)
            }
            Mbc::Mbc1 { upper, mode, .. } => {
                let count = self.ram_bank_count();
                if count == 0 {
                    return 0xFF;
                }
                let bank = if *mode == 1 { *upper as usize % count } else { 0 };
                let idx = bank * RAM_BANK_SIZE + (addr as usize - 0xA000);
                self.ram.get(idx).copied().unwrap_or(0xFF)
            }
            Mbc::Mbc3 { ram_bank, rtc, .. } => match *ram_bank {
                0x00..=0x03 => {
                    let idx = (*ram_bank as usize) * RAM_BANK_SIZE + (addr as usize - 0xA000);
                    self.ram.get(idx).copied().unwrap_or(0xFF)
                }
                0x08..=0x0C => rtc.as_ref().map(|r| r.read(*ram_bank)).unwrap_or(0xFF),
                _ => 0xFF,
            },
            Mbc::Mbc5 { ram_bank, .. } => {
                let idx = (*ram_bank as usize) * RAM_BANK_SIZE + (addr as usize - 0xA000);
                self.ram.get(idx).copied().unwrap_or(0xFF)
            }
        }
    }

    /// Write to the cartridge address space. Writes below 0x8000 configure
    /// the mapper and never reach ROM.
    pub fn write(&mut self, addr: u16, val: u8) {
        match (&mut self.mbc, addr) {
            (Mbc::None, 0xA000..=0xBFFF) => {
                if let Some(b) = self.ram.get_mut(addr as usize - 0xA000) {
                    *b = val;
                }
            }
            (Mbc::Mbc1 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (Mbc::Mbc1 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x1F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (Mbc::Mbc1 { upper, .. }, 0x4000..=0x5FFF) => *upper = val & 0x03,
            (Mbc::Mbc1 { mode, .. }, 0x6000..=0x7FFF) => *mode = val & 0x01,
            (
                Mbc::Mbc1 {
                    ram_enable: true,
                    upper,
                    mode,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                let bank = if *mode == 1 { *upper as usize } else { 0 };
                let count = self.ram.len().div_ceil(RAM_BANK_SIZE);
                if count != 0 {
                    let idx = (bank % count) * RAM_BANK_SIZE + (addr as usize - 0xA000);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
            }
            (
                Mbc::Mbc2 {
                    rom_bank,
                    ram_enable,
                },
                0x0000..=0x3FFF,
            ) => {
                // Address bit 8 selects between RAM enable and ROM bank.
                if addr & 0x0100 == 0 {
                    *ram_enable = val & 0x0F == 0x0A;
                } else {
                    *rom_bank = val & 0x0F;
                    if *rom_bank == 0 {
                        *rom_bank = 1;
                    }
                }
            }
            (
                Mbc::Mbc2 {
                    ram_enable: true, ..
                },
                0xA000..=0xBFFF,
            ) => {
                let idx = (addr as usize - 0xA000) & 0x01FF;
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val & 0x0F;
                }
            }
            (Mbc::Mbc3 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (Mbc::Mbc3 { rom_bank, .. }, 0x2000..=0x3FFF) => {
                *rom_bank = val & 0x7F;
                if *rom_bank == 0 {
                    *rom_bank = 1;
                }
            }
            (Mbc::Mbc3 { ram_bank, .. }, 0x4000..=0x5FFF) => *ram_bank = val,
            (Mbc::Mbc3 { rtc, .. }, 0x6000..=0x7FFF) => {
                if let Some(rtc) = rtc {
                    rtc.latch_write(val);
                }
            }
            (
                Mbc::Mbc3 {
                    ram_enable: true,
                    ram_bank,
                    rtc,
                    ..
                },
                0xA000..=0xBFFF,
            ) => match *ram_bank {
                0x00..=0x03 => {
                    let idx = (*ram_bank as usize) * RAM_BANK_SIZE + (addr as usize - 0xA000);
                    if let Some(b) = self.ram.get_mut(idx) {
                        *b = val;
                    }
                }
                0x08..=0x0C => {
                    if let Some(rtc) = rtc.as_mut() {
                        rtc.write(*ram_bank, val);
                    }
                }
                _ => {}
            },
            (Mbc::Mbc5 { ram_enable, .. }, 0x0000..=0x1FFF) => {
                *ram_enable = val & 0x0F == 0x0A;
            }
            (Mbc::Mbc5 { rom_bank, .. }, 0x2000..=0x2FFF) => {
                *rom_bank = (*rom_bank & 0x100) | val as u16;
            }
            (Mbc::Mbc5 { rom_bank, .. }, 0x3000..=0x3FFF) => {
                *rom_bank = (*rom_bank & 0x0FF) | (((val & 0x01) as u16) << 8);
            }
            (
                Mbc::Mbc5 {
                    ram_bank,
                    has_rumble,
                    rumble,
                    ..
                },
                0x4000..=0x5FFF,
            ) => {
                if *has_rumble {
                    *rumble = val & 0x08 != 0;
                    *ram_bank = val & 0x07;
                } else {
                    *ram_bank = val & 0x0F;
                }
            }
            (
                Mbc::Mbc5 {
                    ram_enable: true,
                    ram_bank,
                    ..
                },
                0xA000..=0xBFFF,
            ) => {
                let idx = (*ram_bank as usize) * RAM_BANK_SIZE + (addr as usize - 0xA000);
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val;
                }
            }
            _ => {}
        }
    }
}

/// Header checksum over 0x0134..=0x014C: `sum = sum - byte - 1` per byte.
pub fn header_checksum(data: &[u8]) -> u8 {
    let mut sum = 0u8;
    for &b in &data[HEADER_TITLE_START..=0x014C] {
        sum = sum.wrapping_sub(b).wrapping_sub(1);
    }
    sum
}

fn parse_title(data: &[u8]) -> String {
    let mut slice = &data[HEADER_TITLE_START..HEADER_TITLE_END];
    if let Some(pos) = slice.iter().position(|&b| b == 0) {
        slice = &slice[..pos];
    }
    String::from_utf8_lossy(slice).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_header(cart_type: u8, banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * ROM_BANK_SIZE];
        rom[HEADER_CART_TYPE] = cart_type;
        rom[HEADER_RAM_SIZE] = 0x03;
        rom[HEADER_CHECKSUM] = header_checksum(&rom);
        rom
    }

    #[test]
    fn zeroed_header_checksum_is_e7() {
        let rom = vec![0u8; 0x8000];
        assert_eq!(header_checksum(&rom), 0xE7);
    }

    #[test]
    fn load_rejects_bad_checksum() {
        let mut rom = vec![0u8; 0x8000];
        rom[HEADER_CHECKSUM] = 0x12;
        assert!(matches!(
            Cartridge::load(rom),
            Err(CartridgeError::HeaderChecksum { .. })
        ));
    }

    #[test]
    fn load_rejects_truncated_image() {
        assert!(matches!(
            Cartridge::load(vec![0u8; 0x100]),
            Err(CartridgeError::TooSmall { .. })
        ));
    }

    #[test]
    fn rtc_counts_injected_seconds() {
        let (clock, secs) = Clock::manual();
        let mut rtc = Rtc::new(clock);
        secs.store(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5, Ordering::Relaxed);
        rtc.latch_write(0x00);
        rtc.latch_write(0x01);
        assert_eq!(rtc.read(0x08), 5);
        assert_eq!(rtc.read(0x09), 4);
        assert_eq!(rtc.read(0x0A), 3);
        assert_eq!(rtc.read(0x0B), 2);
        assert_eq!(rtc.read(0x0C) & 0x01, 0);
    }

    #[test]
    fn rtc_write_rebases_counter() {
        let (clock, secs) = Clock::manual();
        let mut rtc = Rtc::new(clock);
        rtc.write(0x08, 30);
        secs.store(10, Ordering::Relaxed);
        rtc.latch_write(0x00);
        rtc.latch_write(0x01);
        assert_eq!(rtc.read(0x08), 40);
    }

    #[test]
    fn rtc_halt_freezes_and_resumes() {
        let (clock, secs) = Clock::manual();
        let mut rtc = Rtc::new(clock);
        secs.store(5, Ordering::Relaxed);
        rtc.write(0x0C, 0x40); // halt
        secs.store(500, Ordering::Relaxed);
        rtc.latch_write(0x00);
        rtc.latch_write(0x01);
        assert_eq!(rtc.read(0x08), 5);
        assert_ne!(rtc.read(0x0C) & 0x40, 0);

        rtc.write(0x0C, 0x00); // resume: halted span is skipped
        secs.store(510, Ordering::Relaxed);
        rtc.latch_write(0x00);
        rtc.latch_write(0x01);
        assert_eq!(rtc.read(0x08), 15);
    }

    #[test]
    fn rtc_day_overflow_sets_carry() {
        let (clock, secs) = Clock::manual();
        let mut rtc = Rtc::new(clock);
        secs.store(513 * 86_400, Ordering::Relaxed);
        rtc.latch_write(0x00);
        rtc.latch_write(0x01);
        assert_eq!(rtc.read(0x0B), 1);
        assert_ne!(rtc.read(0x0C) & 0x80, 0);
    }

    #[test]
    fn unknown_cart_type_falls_back_to_plain() {
        let mut rom = rom_with_header(0xFC, 2);
        rom[0x4123] = 0x5A;
        rom[HEADER_CHECKSUM] = header_checksum(&rom);
        let mut cart = Cartridge::load(rom).unwrap();
        assert_eq!(cart.read(0x4123), 0x5A);
        cart.write(0x2000, 0x02);
        assert_eq!(cart.read(0x4123), 0x5A);
    }

    #[test]
    fn mbc5_rumble_bit_latches() {
        let rom = rom_with_header(0x1C, 2);
        let mut cart = Cartridge::load(rom).unwrap();
        assert!(!cart.rumble());
        cart.write(0x4000, 0x08);
        assert!(cart.rumble());
        cart.write(0x4000, 0x00);
        assert!(!cart.rumble());
    }

    #[test]
    fn global_checksum_roundtrip() {
        // Header checksum first; it covers 0x0134..=0x014C, so the global
        // checksum bytes can be filled in afterwards.
        let mut rom = rom_with_header(0x00, 2);
        let mut sum = 0u16;
        for (i, &b) in rom.iter().enumerate() {
            if i == HEADER_GLOBAL_CHECKSUM || i == HEADER_GLOBAL_CHECKSUM + 1 {
                continue;
            }
            sum = sum.wrapping_add(b as u16);
        }
        rom[HEADER_GLOBAL_CHECKSUM] = (sum >> 8) as u8;
        rom[HEADER_GLOBAL_CHECKSUM + 1] = sum as u8;
        let cart = Cartridge::load(rom).unwrap();
        assert!(cart.verify_global_checksum());
    }
}
