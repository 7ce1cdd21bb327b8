use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::Path,
};

use crate::grain::params::{GrainParameters, format_decimal};

/// Argument vector for one `filmgrainer` run, one token per element.
///
/// Tokens are passed to the child process as-is; nothing here is ever shell-interpreted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GrainArgs {
    tokens: Vec<OsString>,
}

impl GrainArgs {
    /// Tokens for the tuning flags in `params`, without output/input paths.
    pub fn from_params(params: &GrainParameters) -> Self {
        let mut args = Self::default();
        if let Some(scale) = params.scale {
            args.option("--scale", format_decimal(scale));
        }
        if let Some(grain_type) = params.grain_type {
            args.option("--type", grain_type.to_string());
        }
        if let Some(sat) = params.grain_saturation {
            args.option("--sat", format_decimal(sat));
        }
        if let Some(sharpen) = params.sharpen {
            args.option("--sharpen", sharpen.to_string());
        }
        if params.gray {
            args.flag("--gray");
        }
        args.option("--power", params.intensity().to_string());
        args
    }

    /// Append `-o <output> <input>`. Must be the last step.
    pub fn output_input(mut self, output: &Path, input: &Path) -> Self {
        self.option("-o", output);
        self.tokens.push(input.as_os_str().to_owned());
        self
    }

    /// Tokens in order.
    pub fn as_slice(&self) -> &[OsString] {
        &self.tokens
    }

    /// Number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn flag(&mut self, name: &str) {
        self.tokens.push(name.into());
    }

    fn option(&mut self, name: &str, value: impl AsRef<OsStr>) {
        self.tokens.push(name.into());
        self.tokens.push(value.as_ref().to_owned());
    }
}

impl fmt::Display for GrainArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", token.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Map grain parameters to `filmgrainer` flags.
///
/// Deterministic and free of I/O. The `--power` entry is always present.
pub fn map_to_arguments(params: &GrainParameters) -> Vec<String> {
    GrainArgs::from_params(params)
        .tokens
        .into_iter()
        .map(|t| t.to_string_lossy().into_owned())
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/grain/args.rs"]
mod tests;
