use std::fmt;
use std::result;

use failure::Fail;

/// The stage a shader source belongs to, reported with compile diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
        }
    }
}

/// The recoverable errors of this crate. Contract violations, like freeing a
/// GPU resource that still has users, are programming bugs and panic instead.
#[derive(Debug, Fail)]
pub enum Error {
    #[fail(display = "{} is invalid.", _0)]
    HandleInvalid(String),
    #[fail(display = "Failed to compile the {} shader.\n{}", _0, _1)]
    ShaderCompile(ShaderStage, String),
    #[fail(display = "Failed to link the shader program.\n{}", _0)]
    ProgramLink(String),
    #[fail(display = "The uniform {:?} expects a {}.", _0, _1)]
    UniformTypeMismatch(String, &'static str),
    #[fail(display = "Out of bounds.")]
    OutOfBounds,
}

/// A specialized `Result` type for this crate.
pub type Result<T> = result::Result<T, Error>;
