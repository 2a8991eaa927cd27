// Exit interview answer record and the checks run before a document is built.

pub mod answers;
pub mod validation;
