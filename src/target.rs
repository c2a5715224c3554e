//! `TargetArchitecture`: the tag selecting instruction-set table,
//! addressing-mode defaults, and ROM-builder class for a compilation.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArchitecture {
    Mos6502,
    Mos6507,
    Wdc65Sc02,
    Wdc65816,
    Sm83,
    Motorola68000,
    Z80,
    HuC6280,
    Arm7Tdmi,
    Spc700,
    V30Mz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

impl TargetArchitecture {
    pub fn endianness(self) -> Endianness {
        match self {
            TargetArchitecture::Motorola68000 => Endianness::Big,
            _ => Endianness::Little,
        }
    }

    /// The platform a target is conventionally paired with, used to pick
    /// the default ROM builder when `CompilerOptions::platform` is unset.
    pub fn default_platform(self) -> &'static str {
        match self {
            TargetArchitecture::Mos6502 => "nes",
            TargetArchitecture::Mos6507 => "atari2600",
            TargetArchitecture::Wdc65Sc02 => "nes",
            TargetArchitecture::Wdc65816 => "snes",
            TargetArchitecture::Sm83 => "gb",
            TargetArchitecture::Motorola68000 => "genesis",
            TargetArchitecture::Z80 => "gb",
            TargetArchitecture::HuC6280 => "tg16",
            TargetArchitecture::Arm7Tdmi => "gba",
            TargetArchitecture::Spc700 => "spc",
            TargetArchitecture::V30Mz => "lynx",
        }
    }
}

impl fmt::Display for TargetArchitecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetArchitecture::Mos6502 => "6502",
            TargetArchitecture::Mos6507 => "6507",
            TargetArchitecture::Wdc65Sc02 => "65sc02",
            TargetArchitecture::Wdc65816 => "65816",
            TargetArchitecture::Sm83 => "sm83",
            TargetArchitecture::Motorola68000 => "m68000",
            TargetArchitecture::Z80 => "z80",
            TargetArchitecture::HuC6280 => "huc6280",
            TargetArchitecture::Arm7Tdmi => "arm7tdmi",
            TargetArchitecture::Spc700 => "spc700",
            TargetArchitecture::V30Mz => "v30mz",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TargetArchitecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "6502" | "mos6502" | "nes" => Ok(TargetArchitecture::Mos6502),
            "6507" | "atari2600" => Ok(TargetArchitecture::Mos6507),
            "65sc02" | "65c02" => Ok(TargetArchitecture::Wdc65Sc02),
            "65816" | "wdc65816" | "snes" => Ok(TargetArchitecture::Wdc65816),
            "sm83" | "gb" | "gameboy" => Ok(TargetArchitecture::Sm83),
            "m68000" | "68000" | "genesis" => Ok(TargetArchitecture::Motorola68000),
            "z80" => Ok(TargetArchitecture::Z80),
            "huc6280" | "tg16" | "pce" => Ok(TargetArchitecture::HuC6280),
            "arm7tdmi" | "gba" => Ok(TargetArchitecture::Arm7Tdmi),
            "spc700" | "spc" => Ok(TargetArchitecture::Spc700),
            "v30mz" | "lynx" => Ok(TargetArchitecture::V30Mz),
            other => Err(format!("unrecognized target architecture: {}", other)),
        }
    }
}
