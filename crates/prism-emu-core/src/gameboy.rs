use crate::{cartridge::Cartridge, cpu::Cpu, input::JoypadState, mmu::Mmu};

/// Machine cycles in one video frame (154 lines x 456 cycles).
pub const CYCLES_PER_FRAME: u32 = 70_224;

/// The assembled machine: CPU plus address space, stepped cooperatively.
pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    pub cgb: bool,
}

impl GameBoy {
    /// Create a machine in the post-boot state for the selected hardware
    /// model.
    pub fn new(cgb: bool) -> Self {
        Self {
            cpu: Cpu::new(cgb),
            mmu: Mmu::new(cgb),
            cgb,
        }
    }

    pub fn new_dmg() -> Self {
        Self::new(false)
    }

    pub fn new_cgb() -> Self {
        Self::new(true)
    }

    /// Pick the hardware model from the cartridge's compatibility flag and
    /// insert it.
    pub fn for_cartridge(cart: Cartridge) -> Self {
        let mut gb = Self::new(cart.cgb_support().supports_cgb());
        gb.mmu.load_cart(cart);
        gb
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Reset to the post-boot state, preserving the loaded cartridge.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        self.cpu = Cpu::new(self.cgb);
        self.mmu = Mmu::new(self.cgb);
        if let Some(cart) = cart {
            self.mmu.load_cart(cart);
        }
    }

    /// Execute one CPU instruction and advance every peripheral by the
    /// machine cycles it consumed. Returns the machine-cycle count.
    ///
    /// In double-speed mode the CPU packs twice the work into a frame while
    /// peripherals advance at half the CPU cycle count.
    pub fn step(&mut self) -> u32 {
        let cpu_cycles = self.cpu.step(&mut self.mmu);
        let machine_cycles = if self.mmu.double_speed() {
            cpu_cycles / 2
        } else {
            cpu_cycles
        };
        self.mmu.tick(machine_cycles);
        machine_cycles
    }

    /// Run one video frame: apply the polled input, then step until the PPU
    /// emits a frame or the cycle budget expires (LCD off).
    ///
    /// Returns true when a fresh frame is in the framebuffer.
    pub fn run_frame(&mut self, input: &JoypadState) -> bool {
        self.mmu.set_input(*input);
        self.mmu.ppu.clear_frame_flag();

        let mut budget = CYCLES_PER_FRAME;
        while budget > 0 {
            let spent = self.step();
            if self.mmu.ppu.frame_ready() {
                return true;
            }
            budget = budget.saturating_sub(spent);
        }
        false
    }

    /// Completed 160x144 frame, one 0xAABBGGRR pixel per entry.
    pub fn framebuffer(&self) -> &[u32] {
        self.mmu.ppu.framebuffer()
    }

    /// Drain the serial output captured so far.
    pub fn take_serial(&mut self) -> Vec<u8> {
        self.mmu.take_serial()
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new_dmg()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::header_checksum;

    fn idle_gb() -> GameBoy {
        // JR -2 at the entry point: spin forever without touching I/O.
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0x18;
        rom[0x0101] = 0xFE;
        rom[0x014D] = header_checksum(&rom);
        GameBoy::for_cartridge(Cartridge::load(rom).unwrap())
    }

    #[test]
    fn frame_loop_emits_one_frame() {
        let mut gb = idle_gb();
        let produced = gb.run_frame(&JoypadState::default());
        assert!(produced);
        assert_eq!(gb.mmu.ppu.frames(), 1);
    }

    #[test]
    fn frame_loop_times_out_with_lcd_off() {
        let mut gb = idle_gb();
        gb.mmu.write_byte(0xFF40, 0x00);
        let produced = gb.run_frame(&JoypadState::default());
        assert!(!produced);
    }

    #[test]
    fn button_press_raises_joypad_interrupt() {
        let mut gb = GameBoy::new_dmg();
        gb.mmu.if_reg = 0;
        gb.mmu.set_input(JoypadState {
            start: true,
            ..Default::default()
        });
        assert_eq!(
            gb.mmu.if_reg & crate::interrupts::JOYPAD,
            crate::interrupts::JOYPAD
        );
    }

    #[test]
    fn reset_preserves_cartridge() {
        use crate::cartridge::{header_checksum, Cartridge};
        let mut rom = vec![0u8; 0x8000];
        rom[0x0134] = b'X';
        rom[0x2000] = 0x42;
        rom[0x014D] = header_checksum(&rom);
        let mut gb = GameBoy::for_cartridge(Cartridge::load(rom).unwrap());
        gb.run_frame(&JoypadState::default());
        gb.reset();
        assert_eq!(gb.mmu.read_byte(0x2000), 0x42);
        assert_eq!(gb.cpu.pc, 0x0100);
    }
}
