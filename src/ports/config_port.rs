//! Configuration access port trait.
//!
//! Typed getters return the supplied default only when the key is absent.
//! A key that is present but does not parse is a `ConfigInvalid` error.

use crate::domain::error::StratlangError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Finite numbers only; `nan` and `inf` are rejected.
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, StratlangError>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, StratlangError>;
}
