use crate::interrupts;

/// One frame's worth of polled button states, `true` = held down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoypadState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub a: bool,
    pub b: bool,
    pub start: bool,
    pub select: bool,
}

/// Joypad register (0xFF00).
///
/// The program selects the direction or action nibble by writing bits 4/5
/// (active low); button bits always read active low. A press edge on any
/// button requests the Joypad interrupt regardless of the current selection.
pub struct Input {
    state: JoypadState,
    /// Group-select bits as last written (bits 4-5, active low).
    select: u8,
}

impl Input {
    pub fn new() -> Self {
        Self {
            state: JoypadState::default(),
            select: 0x30,
        }
    }

    pub fn read(&self) -> u8 {
        let mut val = 0xC0 | self.select | 0x0F;
        if self.select & 0x10 == 0 {
            if self.state.right {
                val &= !0x01;
            }
            if self.state.left {
                val &= !0x02;
            }
            if self.state.up {
                val &= !0x04;
            }
            if self.state.down {
                val &= !0x08;
            }
        }
        if self.select & 0x20 == 0 {
            if self.state.a {
                val &= !0x01;
            }
            if self.state.b {
                val &= !0x02;
            }
            if self.state.select {
                val &= !0x04;
            }
            if self.state.start {
                val &= !0x08;
            }
        }
        val
    }

    pub fn write(&mut self, val: u8) {
        self.select = val & 0x30;
    }

    /// Apply a freshly polled button snapshot, requesting the Joypad
    /// interrupt on any press edge.
    pub fn set_state(&mut self, new: JoypadState, if_reg: &mut u8) {
        let pressed = |was: bool, now: bool| !was && now;
        let edge = pressed(self.state.up, new.up)
            || pressed(self.state.down, new.down)
            || pressed(self.state.left, new.left)
            || pressed(self.state.right, new.right)
            || pressed(self.state.a, new.a)
            || pressed(self.state.b, new.b)
            || pressed(self.state.start, new.start)
            || pressed(self.state.select, new.select);
        self.state = new;
        if edge {
            *if_reg |= interrupts::JOYPAD;
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_register_reads_high() {
        let input = Input::new();
        assert_eq!(input.read(), 0xFF);
    }

    #[test]
    fn direction_nibble_active_low() {
        let mut input = Input::new();
        let mut if_reg = 0;
        input.set_state(
            JoypadState {
                left: true,
                down: true,
                ..Default::default()
            },
            &mut if_reg,
        );
        input.write(0x20); // select directions (bit 4 low)
        assert_eq!(input.read() & 0x0F, 0x05);
        input.write(0x10); // select actions: no action buttons held
        assert_eq!(input.read() & 0x0F, 0x0F);
    }

    #[test]
    fn select_bits_read_back() {
        let mut input = Input::new();
        input.write(0x10);
        assert_eq!(input.read() & 0x30, 0x10);
        input.write(0x20);
        assert_eq!(input.read() & 0x30, 0x20);
    }

    #[test]
    fn press_edge_raises_interrupt() {
        let mut input = Input::new();
        let mut if_reg = 0;
        input.set_state(
            JoypadState {
                a: true,
                ..Default::default()
            },
            &mut if_reg,
        );
        assert_eq!(if_reg & interrupts::JOYPAD, interrupts::JOYPAD);

        // Holding does not retrigger, release does not trigger.
        if_reg = 0;
        input.set_state(
            JoypadState {
                a: true,
                ..Default::default()
            },
            &mut if_reg,
        );
        input.set_state(JoypadState::default(), &mut if_reg);
        assert_eq!(if_reg, 0);
    }
}
