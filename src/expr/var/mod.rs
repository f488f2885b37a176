
use regex::Regex;
use once_cell::sync::Lazy;
use serde::{Serialize, Deserialize};

use std::error::{Error as StdError};
use std::fmt::{self, Display, Formatter};

/// A variable name, left intentionally un-evaluated until it is
/// looked up in an [environment](crate::env::Env).
///
/// Variables are identified by strings. A variable's name must begin
/// with a letter, followed by zero or more letters, digits, or
/// apostrophes. This structure enforces these constraints.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Var(String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidVarName {
  original_string: String,
}

pub static VALID_NAME_RE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^[a-zA-Z][a-zA-Z0-9']*$").unwrap()
});

impl Var {
  pub fn new(name: impl Into<String>) -> Option<Self> {
    Self::try_from(name.into()).ok()
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl TryFrom<String> for Var {
  type Error = InvalidVarName;

  fn try_from(name: String) -> Result<Self, Self::Error> {
    if VALID_NAME_RE.is_match(&name) {
      Ok(Self(name))
    } else {
      Err(InvalidVarName { original_string: name })
    }
  }
}

impl From<Var> for String {
  fn from(v: Var) -> Self {
    v.0
  }
}

impl Display for Var {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", &self.0)
  }
}

impl Display for InvalidVarName {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "invalid variable name '{}'", self.original_string)
  }
}

impl StdError for InvalidVarName {}
