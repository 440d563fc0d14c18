pub mod code_generator;
pub mod js;
pub mod name_manager;
pub mod transformers;
