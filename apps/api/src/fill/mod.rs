// Document population: placeholder substitution, choice marking and the
// fixed exit interview assembly sequence built on top of them.

pub mod assembly;
pub mod marker;
pub mod substitute;

pub use assembly::assemble;
