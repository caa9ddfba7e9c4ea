//! Emitters for the four generated files.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::model::Model;

mod commands;
mod reflect;

/// One generated output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Wrappers and proc-address functions.
    CommandSource,

    /// Dispatch tables and wrapper declarations.
    CommandHeader,

    StructJsonHeader,
    StructJsonSource,
}

impl Target {
    pub const ALL: [Target; 4] = [
        Target::CommandSource,
        Target::CommandHeader,
        Target::StructJsonHeader,
        Target::StructJsonSource,
    ];

    /// Selector accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Target::CommandSource => "cpp",
            Target::CommandHeader => "hpp",
            Target::StructJsonHeader => "struct_json_hpp",
            Target::StructJsonSource => "struct_json_cpp",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Target::CommandSource => "VulkanCommands.cpp",
            Target::CommandHeader => "VulkanCommands.hpp",
            Target::StructJsonHeader => "VulkanStructToJson.hpp",
            Target::StructJsonSource => "VulkanStructToJson.cpp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown target '{0}', expected one of cpp, hpp, struct_json_hpp, struct_json_cpp")]
pub struct UnknownTarget(pub String);

impl FromStr for Target {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Target, UnknownTarget> {
        Target::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTarget(s.to_owned()))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Drives the emitters over a built model.
pub struct Generator<'a> {
    model: &'a Model,
    config: &'a Config,
}

impl<'a> Generator<'a> {
    pub fn new(model: &'a Model, config: &'a Config) -> Generator<'a> {
        Generator { model, config }
    }

    pub fn emit<W: Write>(&self, target: Target, out: &mut W) -> io::Result<()> {
        match target {
            Target::CommandSource => commands::emit_source(self.model, self.config, out),
            Target::CommandHeader => commands::emit_header(self.model, self.config, out),
            Target::StructJsonHeader => reflect::emit_header(self.model, self.config, out),
            Target::StructJsonSource => reflect::emit_source(self.model, self.config, out),
        }
    }

    pub fn emit_to_string(&self, target: Target) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.emit(target, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Writes each target into `dir`, creating it if needed. Returns the
    /// written paths.
    pub fn write_targets(&self, targets: &[Target], dir: &Path) -> io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(targets.len());
        for &target in targets {
            let path = dir.join(target.file_name());
            let mut file = io::BufWriter::new(std::fs::File::create(&path)?);
            self.emit(target, &mut file)?;
            file.flush()?;
            info!(output = %target, path = %path.display(), "wrote");
            written.push(path);
        }
        Ok(written)
    }
}

pub(crate) fn banner<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "// This file is generated by vk-layer-gen. Do not edit.")
}

pub(crate) fn includes<W: Write>(out: &mut W, includes: &[String]) -> io::Result<()> {
    for include in includes {
        writeln!(out, "#include {}", include)?;
    }
    writeln!(out)
}

pub(crate) fn open_guard<W: Write>(out: &mut W, guard: Option<&str>) -> io::Result<()> {
    match guard {
        Some(guard) => writeln!(out, "#if {}", guard),
        None => Ok(()),
    }
}

pub(crate) fn close_guard<W: Write>(out: &mut W, guard: Option<&str>) -> io::Result<()> {
    match guard {
        Some(guard) => writeln!(out, "#endif // {}", guard),
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_target_names() {
        for target in Target::ALL.iter() {
            assert_eq!(target.name().parse::<Target>(), Ok(*target));
        }
        assert_eq!(
            "json".parse::<Target>(),
            Err(UnknownTarget(String::from("json")))
        );
        assert_eq!(Target::StructJsonHeader.to_string(), "struct_json_hpp");
    }

    #[test]
    fn test_guards() {
        let mut out = Vec::new();
        open_guard(&mut out, Some("defined(A)")).unwrap();
        writeln!(out, "x").unwrap();
        close_guard(&mut out, Some("defined(A)")).unwrap();
        open_guard(&mut out, None).unwrap();
        close_guard(&mut out, None).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "#if defined(A)\nx\n#endif // defined(A)\n"
        );
    }
}
