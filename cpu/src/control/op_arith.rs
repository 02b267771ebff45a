use base::instruction::Instruction;

use crate::control::Machine;

/// ## Arithmetic and logic
///
/// Each of these writes its result to a register and so sets the
/// condition code.
impl Machine {
    /// The second operand of ADD and AND: a register, or a
    /// sign-extended 5-bit immediate.
    fn second_operand(&self, inst: Instruction) -> i16 {
        if inst.immediate_mode() {
            inst.imm5()
        } else {
            self.state.register(inst.src2())
        }
    }

    pub(crate) fn op_add(&mut self, inst: Instruction) {
        let value = self
            .state
            .register(inst.src1())
            .wrapping_add(self.second_operand(inst));
        self.state.set_register(inst.dst(), value);
    }

    pub(crate) fn op_and(&mut self, inst: Instruction) {
        let value = self.state.register(inst.src1()) & self.second_operand(inst);
        self.state.set_register(inst.dst(), value);
    }

    pub(crate) fn op_not(&mut self, inst: Instruction) {
        let value = !self.state.register(inst.src1());
        self.state.set_register(inst.dst(), value);
    }
}
