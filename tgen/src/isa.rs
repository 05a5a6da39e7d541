use crate::error::Result;
use crate::template::{ArgMode, Primitive};

/// Processor model the generator drives during presimulation.
pub trait Model {
    /// Size of an instruction in address units.
    fn size_of(&self, op: &Primitive) -> Result<u64>;
    /// Assembly text of a fully bound instruction.
    fn text_of(&self, op: &Primitive) -> Result<String>;
    fn execute(&mut self, op: &Primitive) -> Result<()>;

    fn pc(&self) -> u64;
    fn set_pc(&mut self, pc: u64);

    /// Location behind an addressing mode.
    fn read(&self, mode: &Primitive) -> Result<u64>;
    fn write(&mut self, mode: &Primitive, value: u64) -> Result<()>;

    /// Width in bits of the location behind a mode.
    fn data_width(&self, mode: &Primitive) -> u32;
    /// Width in bits of an immediate argument.
    fn arg_width(&self, prim: &Primitive, arg: &str) -> u32;

    /// Direction of an operation argument.
    fn arg_mode(&self, _op: &str, _arg: &str) -> ArgMode {
        ArgMode::In
    }

    /// Enters (`true`) or leaves (`false`) a scratch copy of the state.
    /// Leaving discards everything done since entering.
    fn use_temp_state(&mut self, temp: bool);
}
