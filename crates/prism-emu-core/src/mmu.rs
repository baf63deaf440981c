use log::warn;

use crate::{apu::Apu, cartridge::Cartridge, input::Input, ppu::Ppu, serial::Serial, timer::Timer};

const WRAM_BANK_SIZE: usize = 0x1000;
const OAM_DMA_LEN: u16 = 0xA0;
const HDMA_BLOCK: u16 = 0x10;

/// Transfer mode for CGB VRAM DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DmaMode {
    /// General DMA (immediate)
    Gdma,
    /// HBlank DMA
    Hdma,
}

#[derive(Debug)]
struct HdmaState {
    /// 16-byte-aligned source pointer
    src: u16,
    /// Destination in VRAM (0x8000 | (dst & 0x1FF0))
    dst: u16,
    /// Remaining 0x10-byte blocks
    blocks: u8,
    mode: DmaMode,
    active: bool,
}

/// Address-space router.
///
/// Owns work RAM, high RAM and every peripheral; `read_byte`/`write_byte`
/// dispatch by region. Peripheral advancement goes through [`Mmu::tick`]
/// once per retired CPU instruction.
pub struct Mmu {
    pub wram: [[u8; WRAM_BANK_SIZE]; 8],
    pub wram_bank: usize,
    pub hram: [u8; 0x7F],
    pub cart: Option<Cartridge>,
    pub if_reg: u8,
    pub ie_reg: u8,
    pub serial: Serial,
    pub ppu: Ppu,
    pub apu: Apu,
    pub timer: Timer,
    pub input: Input,
    hdma: HdmaState,
    pub key1: u8,
    rp: u8,
    cgb_mode: bool,
}

impl Mmu {
    pub fn new(cgb: bool) -> Self {
        Self {
            wram: [[0; WRAM_BANK_SIZE]; 8],
            wram_bank: 1,
            hram: [0; 0x7F],
            cart: None,
            if_reg: 0xE1,
            ie_reg: 0,
            serial: Serial::new(cgb),
            ppu: Ppu::new(cgb),
            apu: Apu::new(),
            timer: Timer::new(),
            input: Input::new(),
            hdma: HdmaState {
                src: 0,
                dst: Self::sanitize_vram_dma_dest(0),
                blocks: 0,
                mode: DmaMode::Gdma,
                active: false,
            },
            key1: 0,
            rp: 0,
            cgb_mode: cgb,
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
    }

    pub fn cgb_mode(&self) -> bool {
        self.cgb_mode
    }

    pub fn double_speed(&self) -> bool {
        self.key1 & 0x80 != 0
    }

    /// Raise an interrupt-request bit (see [`crate::interrupts`]).
    pub fn request_interrupt(&mut self, bit: u8) {
        self.if_reg |= bit & 0x1F;
    }

    /// Advance every peripheral by `cycles` machine cycles, between two CPU
    /// instructions.
    pub fn tick(&mut self, cycles: u32) {
        let mut remaining = cycles;
        while remaining > 0 {
            let chunk = remaining.min(u16::MAX as u32) as u16;
            self.timer.step(chunk, &mut self.if_reg);
            self.serial.step(chunk, &mut self.if_reg);
            self.apu.step(chunk);
            if self.ppu.step(chunk, &mut self.if_reg) {
                self.tick_hblank_dma();
            }
            remaining -= chunk as u32;
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_mut().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize]
                } else {
                    0xFF
                }
            }
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize],
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize],
            0xF000..=0xFDFF => self.wram[self.wram_bank][(addr - 0xF000) as usize],
            0xFE00..=0xFE9F => {
                if self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize]
                } else {
                    0xFF
                }
            }
            0xFEA0..=0xFEFF => 0xFF,
            0xFF00 => self.input.read(),
            0xFF01 | 0xFF02 => self.serial.read(addr),
            0xFF04..=0xFF07 => self.timer.read(addr),
            0xFF0F => self.if_reg | 0xE0,
            0xFF10..=0xFF3F => self.apu.read_reg(addr),
            0xFF40..=0xFF4B | 0xFF68..=0xFF6B => self.ppu.read_reg(addr),
            0xFF4D => {
                if self.cgb_mode {
                    (self.key1 & 0x81) | 0x7E
                } else {
                    0xFF
                }
            }
            0xFF4F => {
                if self.cgb_mode {
                    0xFE | self.ppu.vram_bank as u8
                } else {
                    0xFF
                }
            }
            0xFF51..=0xFF55 => self.read_hdma_reg(addr),
            0xFF56 => {
                if self.cgb_mode {
                    self.rp | 0xC0
                } else {
                    0xFF
                }
            }
            0xFF70 => {
                if self.cgb_mode {
                    0xF8 | self.wram_bank as u8
                } else {
                    0xFF
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize],
            0xFFFF => self.ie_reg,
            _ => 0xFF,
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                if let Some(cart) = self.cart.as_mut() {
                    cart.write(addr, val);
                }
            }
            0x8000..=0x9FFF => {
                if self.ppu.vram_accessible() {
                    self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize] = val;
                }
            }
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize] = val,
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize] = val,
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize] = val,
            0xF000..=0xFDFF => self.wram[self.wram_bank][(addr - 0xF000) as usize] = val,
            0xFE00..=0xFE9F => {
                if self.ppu.oam_accessible() {
                    self.ppu.oam[(addr - 0xFE00) as usize] = val;
                }
            }
            0xFEA0..=0xFEFF => {}
            0xFF00 => self.input.write(val),
            0xFF01 | 0xFF02 => self.serial.write(addr, val),
            0xFF04..=0xFF07 => self.timer.write(addr, val, &mut self.if_reg),
            0xFF0F => self.if_reg = (val & 0x1F) | (self.if_reg & 0xE0),
            0xFF10..=0xFF3F => self.apu.write_reg(addr, val),
            0xFF40 => {
                let lcd_was_on = self.ppu.lcd_enabled();
                self.ppu.write_reg(addr, val, &mut self.if_reg);
                if lcd_was_on && !self.ppu.lcd_enabled() {
                    // The PPU will never reach HBlank again; flush any armed
                    // HBlank transfer so the program is not left waiting.
                    self.complete_active_hdma();
                }
            }
            0xFF46 => {
                self.ppu.write_reg(addr, val, &mut self.if_reg);
                self.oam_dma(val);
            }
            0xFF41..=0xFF45 | 0xFF47..=0xFF4B | 0xFF68..=0xFF6B => {
                self.ppu.write_reg(addr, val, &mut self.if_reg)
            }
            0xFF4D => {
                if self.cgb_mode {
                    self.key1 = (self.key1 & 0x80) | (val & 0x01);
                }
            }
            0xFF4F => {
                if self.cgb_mode {
                    self.ppu.vram_bank = (val & 0x01) as usize;
                }
            }
            0xFF51..=0xFF55 => self.write_hdma_reg(addr, val),
            0xFF56 => {
                if self.cgb_mode {
                    self.rp = val & 0xC1;
                }
            }
            0xFF70 => {
                if self.cgb_mode {
                    let bank = (val & 0x07) as usize;
                    self.wram_bank = if bank == 0 { 1 } else { bank };
                }
            }
            0xFF80..=0xFFFE => self.hram[(addr - 0xFF80) as usize] = val,
            0xFFFF => self.ie_reg = val,
            _ => {}
        }
    }

    /// Little-endian 16-bit read.
    pub fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Little-endian 16-bit write.
    pub fn write_word(&mut self, addr: u16, val: u16) {
        self.write_byte(addr, val as u8);
        self.write_byte(addr.wrapping_add(1), (val >> 8) as u8);
    }

    pub fn reset_div(&mut self) {
        self.timer.reset_div(&mut self.if_reg);
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.serial.take_output()
    }

    /// Apply a freshly polled button snapshot; press edges raise the Joypad
    /// interrupt.
    pub fn set_input(&mut self, state: crate::input::JoypadState) {
        self.input.set_state(state, &mut self.if_reg);
    }

    /// Reads with DMA bus priority: the engines see memory regardless of the
    /// PPU mode, and echo addresses fold back into work RAM.
    fn dma_read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x7FFF | 0xA000..=0xBFFF => {
                self.cart.as_mut().map(|c| c.read(addr)).unwrap_or(0xFF)
            }
            0x8000..=0x9FFF => self.ppu.vram[self.ppu.vram_bank][(addr - 0x8000) as usize],
            0xC000..=0xCFFF => self.wram[0][(addr - 0xC000) as usize],
            0xD000..=0xDFFF => self.wram[self.wram_bank][(addr - 0xD000) as usize],
            0xE000..=0xEFFF => self.wram[0][(addr - 0xE000) as usize],
            0xF000..=0xFDFF => self.wram[self.wram_bank][(addr - 0xF000) as usize],
            _ => 0xFF,
        }
    }

    /// Object-attribute DMA (write to 0xFF46): one atomic 160-byte copy.
    fn oam_dma(&mut self, val: u8) {
        let src = (val as u16) << 8;
        if src > 0xFD00 {
            warn!(target: "mmu", "OAM DMA from invalid source {src:#06X}");
        }
        for i in 0..OAM_DMA_LEN {
            let byte = self.dma_read(src.wrapping_add(i));
            self.ppu.oam[i as usize] = byte;
        }
    }

    fn read_hdma_reg(&self, addr: u16) -> u8 {
        if !self.cgb_mode {
            return 0xFF;
        }
        match addr {
            0xFF51 => (self.hdma.src >> 8) as u8,
            0xFF52 => (self.hdma.src & 0x00F0) as u8,
            0xFF53 => ((self.hdma.dst & 0x1F00) >> 8) as u8,
            0xFF54 => (self.hdma.dst & 0x00F0) as u8,
            0xFF55 => {
                if self.hdma.active {
                    // Busy: remaining block count, bit 7 clear.
                    self.hdma.blocks.wrapping_sub(1) & 0x7F
                } else {
                    0xFF
                }
            }
            _ => 0xFF,
        }
    }

    fn write_hdma_reg(&mut self, addr: u16, val: u8) {
        if !self.cgb_mode {
            return;
        }
        match addr {
            0xFF51 => {
                if !self.hdma.active {
                    self.hdma.src = ((val as u16) << 8) | (self.hdma.src & 0x00FF);
                }
            }
            0xFF52 => {
                if !self.hdma.active {
                    self.hdma.src = (self.hdma.src & 0xFF00) | (val & 0xF0) as u16;
                }
            }
            0xFF53 => {
                if !self.hdma.active {
                    let raw = (((val & 0x1F) as u16) << 8) | (self.hdma.dst & 0x00F0);
                    self.hdma.dst = Self::sanitize_vram_dma_dest(raw);
                }
            }
            0xFF54 => {
                if !self.hdma.active {
                    let raw = (self.hdma.dst & 0x1F00) | (val & 0xF0) as u16;
                    self.hdma.dst = Self::sanitize_vram_dma_dest(raw);
                }
            }
            0xFF55 => {
                let blocks = (val & 0x7F) + 1;
                if self.hdma.active && val & 0x80 == 0 {
                    // Cancel an ongoing HBlank transfer.
                    self.hdma.active = false;
                } else if val & 0x80 == 0 {
                    self.start_gdma(blocks);
                } else {
                    self.hdma.mode = DmaMode::Hdma;
                    self.hdma.blocks = blocks;
                    self.hdma.active = true;
                    if !self.ppu.lcd_enabled() || self.ppu.in_hblank() {
                        self.tick_hblank_dma();
                    }
                }
            }
            _ => {}
        }
    }

    #[inline]
    fn sanitize_vram_dma_dest(addr: u16) -> u16 {
        0x8000 | (addr & 0x1FF0)
    }

    fn vram_dma_source_valid(src: u16) -> bool {
        matches!(src, 0x0000..=0x7FF0 | 0xA000..=0xDFF0)
    }

    /// General-purpose DMA: the whole block is copied immediately.
    fn start_gdma(&mut self, blocks: u8) {
        if !Self::vram_dma_source_valid(self.hdma.src) {
            warn!(target: "mmu", "GDMA from invalid source {:#06X}", self.hdma.src);
        }
        for _ in 0..blocks {
            self.copy_hdma_block();
        }
        self.hdma.blocks = 0;
        self.hdma.active = false;
    }

    /// Copy one 16-byte block during HBlank if an HBlank transfer is armed.
    /// The PPU's HBlank transition calls this.
    pub fn tick_hblank_dma(&mut self) {
        if !(self.hdma.active && self.hdma.mode == DmaMode::Hdma) {
            return;
        }
        self.copy_hdma_block();
        self.hdma.blocks = self.hdma.blocks.saturating_sub(1);
        if self.hdma.blocks == 0 {
            self.hdma.active = false;
        }
    }

    fn copy_hdma_block(&mut self) {
        self.hdma.dst = Self::sanitize_vram_dma_dest(self.hdma.dst);
        for _ in 0..HDMA_BLOCK {
            let byte = self.dma_read(self.hdma.src);
            self.ppu.vram[self.ppu.vram_bank][(self.hdma.dst - 0x8000) as usize] = byte;
            self.hdma.src = self.hdma.src.wrapping_add(1);
            self.hdma.dst = 0x8000 | ((self.hdma.dst.wrapping_add(1)) & 0x1FFF);
        }
        self.hdma.dst = Self::sanitize_vram_dma_dest(self.hdma.dst);
    }

    fn complete_active_hdma(&mut self) {
        while self.hdma.active && self.hdma.mode == DmaMode::Hdma {
            self.tick_hblank_dma();
        }
    }
}
