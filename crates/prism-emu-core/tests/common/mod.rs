use prism_emu_core::cartridge::header_checksum;

#[allow(dead_code)]
pub const ROM_BANK_SIZE: usize = 0x4000;

/// Build a synthetic ROM image: requested mapper type and RAM size code,
/// each bank fingerprinted with its own number at the bank's first byte,
/// and a valid header checksum.
#[allow(dead_code)]
pub fn build_rom(cart_type: u8, ram_size_code: u8, banks: usize) -> Vec<u8> {
    let mut rom = vec![0u8; banks.max(2) * 0x4000];
    for bank in 0..banks.max(2) {
        rom[bank * 0x4000] = bank as u8;
    }
    rom[0x0147] = cart_type;
    rom[0x0149] = ram_size_code;
    fix_header_checksum(&mut rom);
    rom
}

/// Place a program at the entry point (0x0100) of a 32 KiB plain ROM.
#[allow(dead_code)]
pub fn rom_with_program(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0100..0x0100 + program.len()].copy_from_slice(program);
    fix_header_checksum(&mut rom);
    rom
}

pub fn fix_header_checksum(rom: &mut [u8]) {
    rom[0x014D] = header_checksum(rom);
}
