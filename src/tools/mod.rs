pub mod listparsers;
pub mod parse;
