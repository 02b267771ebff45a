use tracing::{event, Level};

use base::bitfield::page_replace;
use base::instruction::Instruction;

use crate::control::Machine;
use crate::state::from_word;

/// The link register of subroutine calls.
const LINK_REGISTER: usize = 7;

/// ## Control transfer
///
/// Page-relative targets replace the low nine bits of the
/// (already incremented) program counter.
impl Machine {
    pub(crate) fn op_br(&mut self, inst: Instruction) {
        if self.state.condition.matches(inst.condition()) {
            self.state.pc = page_replace(self.state.pc, inst.page_offset());
        }
    }

    fn link(&mut self, inst: Instruction) {
        if inst.link() {
            // Saving the return address does not change the
            // condition code.
            self.state.registers[LINK_REGISTER] = from_word(self.state.pc);
        }
    }

    /// JSR, and JMP when the link bit is clear.
    pub(crate) fn op_jsr(&mut self, inst: Instruction) {
        self.link(inst);
        self.state.pc = page_replace(self.state.pc, inst.page_offset());
    }

    /// JSRR, and JMPR when the link bit is clear.  The target is the
    /// word at base + index, not base + index itself.
    pub(crate) fn op_jsrr(&mut self, inst: Instruction) {
        let pointer = u32::from(self.state.register_word(inst.base())) + u32::from(inst.index6());
        let target = self.load(pointer);
        self.link(inst);
        event!(Level::DEBUG, "JSRR via {pointer:04X} to {target:04X}");
        self.state.pc = target;
    }

    pub(crate) fn op_ret(&mut self) {
        self.state.pc = self.state.register_word(LINK_REGISTER);
    }
}
