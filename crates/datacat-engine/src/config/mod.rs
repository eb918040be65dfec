pub mod parser;
pub mod resolve;
pub mod types;
pub mod validator;
