//! Registers, program counter and condition code.
use std::fmt::{self, Display, Formatter};

/// Number of general registers.
pub(crate) const REGISTER_COUNT: usize = 8;

/// Reinterpret a register value as a word.
pub(crate) fn to_word(value: i16) -> u16 {
    #[allow(clippy::cast_sign_loss)]
    let word = value as u16;
    word
}

/// Reinterpret a word as a register value.
pub(crate) fn from_word(word: u16) -> i16 {
    #[allow(clippy::cast_possible_wrap)]
    let value = word as i16;
    value
}

/// The condition code records the sign of the value most recently
/// written to a register.  Exactly one of N, Z and P is set at any
/// time, so it is represented as a single value rather than as three
/// flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionCode {
    Negative,
    Zero,
    Positive,
}

impl ConditionCode {
    #[must_use]
    pub fn from_value(value: i16) -> ConditionCode {
        match value {
            v if v < 0 => ConditionCode::Negative,
            0 => ConditionCode::Zero,
            _ => ConditionCode::Positive,
        }
    }

    /// The bit for this condition in a branch's N Z P mask.
    #[must_use]
    pub fn mask(self) -> u16 {
        match self {
            ConditionCode::Negative => 0b100,
            ConditionCode::Zero => 0b010,
            ConditionCode::Positive => 0b001,
        }
    }

    /// True if a branch with condition mask `mask` is taken.
    #[must_use]
    pub fn matches(self, mask: u16) -> bool {
        mask & self.mask() != 0
    }

    #[must_use]
    pub fn negative(self) -> bool {
        self == ConditionCode::Negative
    }

    #[must_use]
    pub fn zero(self) -> bool {
        self == ConditionCode::Zero
    }

    #[must_use]
    pub fn positive(self) -> bool {
        self == ConditionCode::Positive
    }
}

/// The programmer-visible state of the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub registers: [i16; REGISTER_COUNT],
    pub condition: ConditionCode,
    pub pc: u16,
    /// Cleared by the HALT trap.
    pub executing: bool,
}

impl MachineState {
    /// All registers are zero (so Z is set) and execution will begin
    /// at `pc`.
    #[must_use]
    pub fn new(pc: u16) -> MachineState {
        MachineState {
            registers: [0; REGISTER_COUNT],
            condition: ConditionCode::Zero,
            pc,
            executing: true,
        }
    }

    /// Register numbers come from 3-bit fields, so `r` is below 8.
    #[must_use]
    pub fn register(&self, r: usize) -> i16 {
        self.registers[r % REGISTER_COUNT]
    }

    /// The contents of register `r` as an unsigned word, which is how
    /// addresses held in registers are used.
    #[must_use]
    pub fn register_word(&self, r: usize) -> u16 {
        to_word(self.register(r))
    }

    /// Write register `r` and set the condition code from the new
    /// value.
    pub fn set_register(&mut self, r: usize, value: i16) {
        self.registers[r % REGISTER_COUNT] = value;
        self.condition = ConditionCode::from_value(value);
    }

    pub fn set_register_word(&mut self, r: usize, value: u16) {
        self.set_register(r, from_word(value));
    }
}

/// The format of the DBUG instruction's dump.
impl Display for MachineState {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        writeln!(f, "Program Counter = 0x{:04X}", self.pc)?;
        for (i, value) in self.registers.iter().enumerate() {
            writeln!(f, "Register {i} = 0x{:04X}", to_word(*value))?;
        }
        writeln!(
            f,
            "CCR: N = {} Z = {} P = {}",
            u8::from(self.condition.negative()),
            u8::from(self.condition.zero()),
            u8::from(self.condition.positive())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn test_initial_state() {
        let state = MachineState::new(0x3000);
        assert_eq!(state.registers, [0; 8]);
        assert_eq!(state.condition, ConditionCode::Zero);
        assert!(state.executing);
    }

    #[test]
    fn test_branch_masks() {
        assert!(!ConditionCode::Zero.matches(0b000));
        assert!(ConditionCode::Zero.matches(0b111));
        assert!(ConditionCode::Negative.matches(0b110));
        assert!(!ConditionCode::Positive.matches(0b110));
    }

    #[test]
    fn test_dump() {
        let mut state = MachineState::new(0x3001);
        state.set_register(1, 0x6B);
        state.set_register(2, -1);
        let dump = state.to_string();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "Program Counter = 0x3001");
        assert_eq!(lines[2], "Register 1 = 0x006B");
        assert_eq!(lines[3], "Register 2 = 0xFFFF");
        assert_eq!(lines[9], "CCR: N = 1 Z = 0 P = 0");
    }

    #[proptest]
    fn exactly_one_condition_is_set(value: i16, r: u8) {
        let mut state = MachineState::new(0);
        let r = usize::from(r % 8);
        state.set_register(r, value);
        let c = state.condition;
        let set = [c.negative(), c.zero(), c.positive()]
            .iter()
            .filter(|b| **b)
            .count();
        assert_eq!(set, 1);
        assert_eq!(c.negative(), value < 0);
        assert_eq!(c.zero(), value == 0);
        assert_eq!(c.positive(), value > 0);
        assert_eq!(state.register(r), value);
    }
}
