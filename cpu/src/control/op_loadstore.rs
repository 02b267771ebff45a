use base::bitfield::page_replace;
use base::instruction::Instruction;

use crate::alarm::Alarm;
use crate::control::Machine;

/// ## Loads and stores
///
/// Loads set the condition code from the value loaded; stores leave
/// it alone.
impl Machine {
    /// The address named by a page-relative operand.
    fn page_address(&self, inst: Instruction) -> u16 {
        page_replace(self.state.pc, inst.page_offset())
    }

    /// Base register plus zero-extended index.  This can be beyond
    /// the end of memory.
    fn indexed_address(&self, inst: Instruction) -> u32 {
        u32::from(self.state.register_word(inst.base())) + u32::from(inst.index6())
    }

    pub(crate) fn op_ld(&mut self, inst: Instruction) {
        let value = self.memory.read(self.page_address(inst));
        self.state.set_register_word(inst.dst(), value);
    }

    pub(crate) fn op_ldi(&mut self, inst: Instruction) {
        let pointer = self.memory.read(self.page_address(inst));
        let value = self.memory.read(pointer);
        self.state.set_register_word(inst.dst(), value);
    }

    pub(crate) fn op_ldr(&mut self, inst: Instruction) {
        let value = self.load(self.indexed_address(inst));
        self.state.set_register_word(inst.dst(), value);
    }

    pub(crate) fn op_lea(&mut self, inst: Instruction) {
        let address = self.page_address(inst);
        self.state.set_register_word(inst.dst(), address);
    }

    pub(crate) fn op_st(&mut self, inst: Instruction) -> Result<(), Alarm> {
        let address = self.page_address(inst);
        let value = self.state.register_word(inst.dst());
        self.store(u32::from(address), value)
    }

    pub(crate) fn op_sti(&mut self, inst: Instruction) -> Result<(), Alarm> {
        let pointer = self.memory.read(self.page_address(inst));
        let value = self.state.register_word(inst.dst());
        self.store(u32::from(pointer), value)
    }

    pub(crate) fn op_str(&mut self, inst: Instruction) -> Result<(), Alarm> {
        let address = self.indexed_address(inst);
        let value = self.state.register_word(inst.dst());
        self.store(address, value)
    }
}
