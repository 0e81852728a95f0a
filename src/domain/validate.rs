// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-bind validation hook.

use crate::domain::errors::ValidationError;

/// A record that can check its own contents after binding.
///
/// [`Config::bind_with`](crate::service::Config::bind_with) calls `validate`
/// on the freshly bound record unless validation is switched off in the
/// [`BindOptions`](crate::service::BindOptions).
///
/// # Examples
///
/// ```
/// use mergecfg::domain::errors::ValidationError;
/// use mergecfg::domain::validate::Validate;
///
/// struct Pool {
///     min: u32,
///     max: u32,
/// }
///
/// impl Validate for Pool {
///     fn validate(&self) -> Result<(), ValidationError> {
///         if self.min > self.max {
///             return Err(ValidationError::new("min", "must not exceed max"));
///         }
///         Ok(())
///     }
/// }
///
/// assert!(Pool { min: 5, max: 1 }.validate().is_err());
/// ```
pub trait Validate {
    /// Checks the record, naming the first offending field on failure.
    fn validate(&self) -> Result<(), ValidationError>;
}
