pub mod rest;

pub use rest::TinkoffClient;
